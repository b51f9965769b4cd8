//! Query keys for cached lists.

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fmt;

/// Identifier under which a list's pages are cached.
///
/// Keys are compared by value: the sort and filter parts hold the canonical
/// JSON of the typed specs, so two specs built independently but equal in
/// content land on the same entry.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey {
  resource: String,
  sort: Option<String>,
  filter: Option<String>,
}

/// Build the cache key for `resource` with optional sort and filter specs.
///
/// Empty specs (`{}`, `[]`, `null`) are folded into "absent" so that an
/// empty filter and no filter share an entry.
pub fn build_key<S, F>(resource: &str, sort: Option<&S>, filter: Option<&F>) -> QueryKey
where
  S: Serialize + ?Sized,
  F: Serialize + ?Sized,
{
  QueryKey {
    resource: resource.to_string(),
    sort: sort.and_then(canonical_part),
    filter: filter.and_then(canonical_part),
  }
}

fn canonical_part<T: Serialize + ?Sized>(part: &T) -> Option<String> {
  // Sort and filter types always serialize
  let value = serde_json::to_value(part).unwrap_or(Value::Null);
  let empty = match &value {
    Value::Null => true,
    Value::Object(map) => map.is_empty(),
    Value::Array(items) => items.is_empty(),
    _ => false,
  };
  if empty {
    None
  } else {
    Some(value.to_string())
  }
}

impl QueryKey {
  /// Key covering a whole resource, with no sort or filter.
  #[cfg(test)]
  pub fn resource_root(resource: &str) -> Self {
    Self {
      resource: resource.to_string(),
      sort: None,
      filter: None,
    }
  }

  /// Whether this key sits under the given resource in the key hierarchy.
  pub fn belongs_to(&self, resource: &str) -> bool {
    self.resource == resource
  }

  /// Stable, fixed-length hash of the key, used in logs.
  pub fn cache_hash(&self) -> String {
    let mut hasher = Sha256::new();
    hasher.update(self.resource.as_bytes());
    hasher.update([0u8]);
    hasher.update(self.sort.as_deref().unwrap_or("").as_bytes());
    hasher.update([0u8]);
    hasher.update(self.filter.as_deref().unwrap_or("").as_bytes());
    hex::encode(hasher.finalize())
  }

  /// Human readable description.
  pub fn description(&self) -> String {
    let mut out = self.resource.clone();
    if let Some(sort) = &self.sort {
      out.push_str(&format!(" sorted by {}", sort));
    }
    if let Some(filter) = &self.filter {
      out.push_str(&format!(" where {}", filter));
    }
    out
  }
}

impl fmt::Display for QueryKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.description())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_equal_specs_give_equal_keys() {
    let a = json!({ "orderBy": "courseName", "order": "ASC" });
    let b = json!({ "orderBy": "courseName", "order": "ASC" });
    let ka = build_key::<_, Value>("courses", Some(&a), None);
    let kb = build_key::<_, Value>("courses", Some(&b), None);
    assert_eq!(ka, kb);
    assert_eq!(ka.cache_hash(), kb.cache_hash());
  }

  #[test]
  fn test_different_specs_give_different_keys() {
    let asc = json!({ "orderBy": "id", "order": "ASC" });
    let desc = json!({ "orderBy": "id", "order": "DESC" });
    assert_ne!(
      build_key::<_, Value>("courses", Some(&asc), None),
      build_key::<_, Value>("courses", Some(&desc), None)
    );
  }

  #[test]
  fn test_empty_filter_is_no_filter() {
    let empty = json!({});
    let with_empty = build_key::<Value, _>("grades", None, Some(&empty));
    let without = build_key::<Value, Value>("grades", None, None);
    assert_eq!(with_empty, without);
    assert_eq!(without, QueryKey::resource_root("grades"));
  }

  #[test]
  fn test_resource_is_part_of_key() {
    let a = build_key::<Value, Value>("courses", None, None);
    let b = build_key::<Value, Value>("lectures", None, None);
    assert_ne!(a, b);
    assert!(a.belongs_to("courses"));
    assert!(!a.belongs_to("lectures"));
  }

  #[test]
  fn test_description() {
    let filter = json!({ "courses": [{ "id": "5" }] });
    let key = build_key::<Value, _>("lectures", None, Some(&filter));
    assert_eq!(key.description(), r#"lectures where {"courses":[{"id":"5"}]}"#);
  }
}
