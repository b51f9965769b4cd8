//! Typed sort and filter specs for list requests.
//!
//! Each resource gets its own sort-field enum and filter struct (see
//! `resource.rs`). The specs serialize to the JSON the backend expects and
//! parse from the short text forms used on the command line:
//! `courseName:asc` for sorts and `courses=1,2 students=7` for filters.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::hash::Hash;
use thiserror::Error;

use crate::cache::ItemId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamError {
  #[error("unknown sort field '{field}', expected one of: {expected}")]
  UnknownSortField { field: String, expected: String },
  #[error("unknown sort order '{0}', expected asc or desc")]
  UnknownOrder(String),
  #[error("unknown filter relation '{relation}', expected one of: {expected}")]
  UnknownRelation { relation: String, expected: String },
  #[error("malformed filter '{0}', expected relation=id[,id...]")]
  MalformedFilter(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortOrder {
  Asc,
  #[default]
  Desc,
}

impl SortOrder {
  pub fn toggled(self) -> Self {
    match self {
      SortOrder::Asc => SortOrder::Desc,
      SortOrder::Desc => SortOrder::Asc,
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      SortOrder::Asc => "asc",
      SortOrder::Desc => "desc",
    }
  }

  fn parse(raw: &str) -> Result<Self, ParamError> {
    match raw.trim().to_lowercase().as_str() {
      "asc" => Ok(SortOrder::Asc),
      "desc" => Ok(SortOrder::Desc),
      other => Err(ParamError::UnknownOrder(other.to_string())),
    }
  }
}

/// Sortable attributes of a resource item. The first entry of `ALL` is the
/// default sort field.
pub trait SortField:
  Copy + Eq + Hash + fmt::Debug + Send + Sync + Serialize + DeserializeOwned + 'static
{
  const ALL: &'static [Self];

  /// Attribute name on the wire
  fn as_str(self) -> &'static str;

  fn from_name(name: &str) -> Option<Self> {
    Self::ALL
      .iter()
      .copied()
      .find(|f| f.as_str().eq_ignore_ascii_case(name.trim()))
  }

  /// The field after this one, wrapping around
  fn next(self) -> Self {
    let idx = Self::ALL.iter().position(|f| *f == self).unwrap_or(0);
    Self::ALL[(idx + 1) % Self::ALL.len()]
  }
}

/// `{ orderBy, order }` with a single active field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortSpec<F> {
  pub order_by: F,
  pub order: SortOrder,
}

impl<F: SortField> SortSpec<F> {
  pub fn new(order_by: F, order: SortOrder) -> Self {
    Self { order_by, order }
  }

  /// Parse `field[:asc|desc]`; the order defaults to descending.
  pub fn parse(input: &str) -> Result<Self, ParamError> {
    let (field, order) = match input.split_once(':') {
      Some((field, order)) => (field, SortOrder::parse(order)?),
      None => (input, SortOrder::default()),
    };
    let order_by = F::from_name(field).ok_or_else(|| ParamError::UnknownSortField {
      field: field.trim().to_string(),
      expected: F::ALL
        .iter()
        .map(|f| f.as_str())
        .collect::<Vec<_>>()
        .join(", "),
    })?;
    Ok(Self { order_by, order })
  }
}

impl<F: SortField> Default for SortSpec<F> {
  fn default() -> Self {
    Self {
      order_by: F::ALL[0],
      order: SortOrder::Desc,
    }
  }
}

impl<F: SortField> fmt::Display for SortSpec<F> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}", self.order_by.as_str(), self.order.as_str())
  }
}

/// Relation filter of a resource: relation name to a set of ids.
pub trait Filter:
  Clone + fmt::Debug + Default + PartialEq + Eq + Hash + Send + Sync + Serialize + DeserializeOwned + 'static
{
  /// Relation names on the wire
  const RELATIONS: &'static [&'static str];

  fn relation(&self, name: &str) -> Option<&BTreeSet<ItemId>>;

  fn relation_mut(&mut self, name: &str) -> Option<&mut BTreeSet<ItemId>>;

  fn is_empty(&self) -> bool {
    Self::RELATIONS
      .iter()
      .all(|r| self.relation(r).map_or(true, BTreeSet::is_empty))
  }

  /// Parse `relation=id,id relation=id`; pairs may also be split by `;`.
  /// Ids are kept as typed text, the form every relation target uses.
  fn parse(input: &str) -> Result<Self, ParamError> {
    let mut filter = Self::default();
    for pair in input.split([' ', ';']).filter(|p| !p.trim().is_empty()) {
      let (relation, ids) = pair
        .split_once('=')
        .ok_or_else(|| ParamError::MalformedFilter(pair.to_string()))?;
      let set = filter
        .relation_mut(relation.trim())
        .ok_or_else(|| ParamError::UnknownRelation {
          relation: relation.trim().to_string(),
          expected: Self::RELATIONS.join(", "),
        })?;
      set.extend(
        ids
          .split(',')
          .map(str::trim)
          .filter(|id| !id.is_empty())
          .map(ItemId::from),
      );
    }
    Ok(filter)
  }

  /// Text form accepted by [`Filter::parse`].
  fn to_text(&self) -> String {
    Self::RELATIONS
      .iter()
      .filter_map(|r| {
        let ids = self.relation(r)?;
        if ids.is_empty() {
          return None;
        }
        let ids: Vec<String> = ids.iter().map(ItemId::to_string).collect();
        Some(format!("{}={}", r, ids.join(",")))
      })
      .collect::<Vec<_>>()
      .join(" ")
  }
}

/// Filter of resources that have no relations to filter on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NoFilter {}

impl Filter for NoFilter {
  const RELATIONS: &'static [&'static str] = &[];

  fn relation(&self, _name: &str) -> Option<&BTreeSet<ItemId>> {
    None
  }

  fn relation_mut(&mut self, _name: &str) -> Option<&mut BTreeSet<ItemId>> {
    None
  }
}

/// Relation ids as sent on the wire: always strings, so `5` and `"5"`
/// give one filter value and one cache key.
fn canonical(ids: &BTreeSet<ItemId>) -> BTreeSet<ItemId> {
  ids
    .iter()
    .map(|id| ItemId::Str(id.to_string()))
    .collect()
}

/// Id sets encoded as `[{ "id": ... }]`, the shape of related records.
pub mod id_refs {
  use super::*;
  use serde::{Deserializer, Serializer};

  #[derive(Serialize, Deserialize)]
  struct IdRef {
    id: ItemId,
  }

  #[derive(Deserialize)]
  #[serde(untagged)]
  enum RefOrId {
    Ref(IdRef),
    Id(ItemId),
  }

  pub fn serialize<S: Serializer>(ids: &BTreeSet<ItemId>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(canonical(ids).into_iter().map(|id| IdRef { id }))
  }

  pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BTreeSet<ItemId>, D::Error> {
    let items: Vec<RefOrId> = Vec::deserialize(deserializer)?;
    Ok(
      items
        .into_iter()
        .map(|item| match item {
          RefOrId::Ref(r) => ItemId::Str(r.id.to_string()),
          RefOrId::Id(id) => ItemId::Str(id.to_string()),
        })
        .collect(),
    )
  }
}

/// Id sets encoded as plain `[id, ...]`.
pub mod plain_ids {
  use super::*;
  use serde::{Deserializer, Serializer};

  pub fn serialize<S: Serializer>(ids: &BTreeSet<ItemId>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(canonical(ids))
  }

  pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BTreeSet<ItemId>, D::Error> {
    let ids: Vec<ItemId> = Vec::deserialize(deserializer)?;
    Ok(ids.iter().map(|id| ItemId::Str(id.to_string())).collect())
  }
}

/// Declare a sort-field enum whose variants map to wire attribute names.
macro_rules! sort_fields {
  ($(#[$meta:meta])* $name:ident { $($variant:ident => $wire:literal),+ $(,)? }) => {
    $(#[$meta])*
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
    pub enum $name {
      $(
        #[serde(rename = $wire)]
        $variant,
      )+
    }

    impl $crate::api::params::SortField for $name {
      const ALL: &'static [Self] = &[$($name::$variant),+];

      fn as_str(self) -> &'static str {
        match self {
          $($name::$variant => $wire),+
        }
      }
    }
  };
}

/// Declare a filter struct of id sets, one per relation.
macro_rules! relation_filter {
  ($(#[$meta:meta])* $name:ident { $($field:ident => $wire:literal with $codec:literal),+ $(,)? }) => {
    $(#[$meta])*
    #[derive(Debug, Clone, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
    pub struct $name {
      $(
        #[serde(
          rename = $wire,
          default,
          skip_serializing_if = "std::collections::BTreeSet::is_empty",
          with = $codec
        )]
        pub $field: std::collections::BTreeSet<$crate::cache::ItemId>,
      )+
    }

    impl $crate::api::params::Filter for $name {
      const RELATIONS: &'static [&'static str] = &[$($wire),+];

      fn relation(&self, name: &str) -> Option<&std::collections::BTreeSet<$crate::cache::ItemId>> {
        match name {
          $($wire => Some(&self.$field),)+
          _ => None,
        }
      }

      fn relation_mut(
        &mut self,
        name: &str,
      ) -> Option<&mut std::collections::BTreeSet<$crate::cache::ItemId>> {
        match name {
          $($wire => Some(&mut self.$field),)+
          _ => None,
        }
      }
    }
  };
}

pub(crate) use relation_filter;
pub(crate) use sort_fields;

#[cfg(test)]
mod tests {
  use super::*;

  sort_fields!(TestSort {
    Id => "id",
    CourseName => "courseName",
  });

  relation_filter!(TestFilter {
    courses => "courses" with "crate::api::params::id_refs",
    quizzes => "quizzes" with "crate::api::params::plain_ids",
  });

  #[test]
  fn test_sort_spec_json() {
    let sort = SortSpec::new(TestSort::CourseName, SortOrder::Asc);
    assert_eq!(
      serde_json::to_string(&sort).unwrap(),
      r#"{"orderBy":"courseName","order":"ASC"}"#
    );
    let back: SortSpec<TestSort> =
      serde_json::from_str(r#"{"orderBy":"courseName","order":"ASC"}"#).unwrap();
    assert_eq!(back, sort);
  }

  #[test]
  fn test_sort_spec_text() {
    let sort = SortSpec::<TestSort>::parse("coursename:ASC").unwrap();
    assert_eq!(sort, SortSpec::new(TestSort::CourseName, SortOrder::Asc));
    assert_eq!(sort.to_string(), "courseName:asc");
    assert_eq!(
      SortSpec::<TestSort>::parse("id").unwrap().order,
      SortOrder::Desc
    );
  }

  #[test]
  fn test_sort_spec_rejects_unknown_field() {
    let err = SortSpec::<TestSort>::parse("price:asc").unwrap_err();
    assert_eq!(
      err,
      ParamError::UnknownSortField {
        field: "price".to_string(),
        expected: "id, courseName".to_string()
      }
    );
    assert!(SortSpec::<TestSort>::parse("id:up").is_err());
  }

  #[test]
  fn test_default_sort_is_id_desc() {
    let sort = SortSpec::<TestSort>::default();
    assert_eq!(sort.order_by, TestSort::Id);
    assert_eq!(sort.order, SortOrder::Desc);
  }

  #[test]
  fn test_sort_field_cycles() {
    assert_eq!(TestSort::Id.next(), TestSort::CourseName);
    assert_eq!(TestSort::CourseName.next(), TestSort::Id);
  }

  #[test]
  fn test_filter_json_shapes() {
    let filter = TestFilter::parse("courses=5 quizzes=q1").unwrap();
    assert_eq!(
      serde_json::to_string(&filter).unwrap(),
      r#"{"courses":[{"id":"5"}],"quizzes":["q1"]}"#
    );
    let empty = TestFilter::default();
    assert_eq!(serde_json::to_string(&empty).unwrap(), "{}");
    assert!(empty.is_empty());
  }

  #[test]
  fn test_numeric_and_text_ids_serialize_alike() {
    let mut typed = TestFilter::default();
    typed.relation_mut("quizzes").unwrap().insert(ItemId::Num(5));
    let parsed = TestFilter::parse("quizzes=5").unwrap();
    assert_eq!(
      serde_json::to_string(&typed).unwrap(),
      serde_json::to_string(&parsed).unwrap()
    );
    assert_eq!(serde_json::to_string(&parsed).unwrap(), r#"{"quizzes":["5"]}"#);
  }

  #[test]
  fn test_filter_deserializes_refs_and_bare_ids() {
    let filter: TestFilter =
      serde_json::from_str(r#"{"courses":[{"id":"a"},"b"],"quizzes":[3]}"#).unwrap();
    assert_eq!(filter.to_text(), "courses=a,b quizzes=3");
  }

  #[test]
  fn test_filter_is_a_set() {
    let a = TestFilter::parse("courses=3,1,3").unwrap();
    let b = TestFilter::parse("courses=1;courses=3").unwrap();
    assert_eq!(a, b);
    assert_eq!(a.to_text(), "courses=1,3");
  }

  #[test]
  fn test_filter_errors() {
    assert!(matches!(
      TestFilter::parse("teachers=1"),
      Err(ParamError::UnknownRelation { .. })
    ));
    assert_eq!(
      TestFilter::parse("courses"),
      Err(ParamError::MalformedFilter("courses".to_string()))
    );
  }

  #[test]
  fn test_no_filter() {
    assert!(NoFilter::default().is_empty());
    assert!(NoFilter::parse("").is_ok());
    assert!(NoFilter::parse("courses=1").is_err());
  }
}
