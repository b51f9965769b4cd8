//! Core traits and types for the caching system.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt;

/// Identifier of a cached entity.
///
/// The backend hands out string ids for most collections and numeric ids for
/// a few (quiz questions), so both are accepted and compared by value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemId {
  Num(i64),
  Str(String),
}

impl ItemId {
  /// Parse an item id typed by the user for a request path: all-digit
  /// input becomes numeric. Relation ids in filters stay text.
  pub fn parse(raw: &str) -> Self {
    let raw = raw.trim();
    match raw.parse::<i64>() {
      Ok(n) => ItemId::Num(n),
      Err(_) => ItemId::Str(raw.to_string()),
    }
  }

  /// Loose comparison used when the two sides may disagree on the id
  /// representation (`42` vs `"42"`).
  pub fn matches(&self, other: &ItemId) -> bool {
    self == other || self.to_string() == other.to_string()
  }
}

impl fmt::Display for ItemId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ItemId::Num(n) => write!(f, "{}", n),
      ItemId::Str(s) => f.write_str(s),
    }
  }
}

impl From<&str> for ItemId {
  fn from(value: &str) -> Self {
    ItemId::Str(value.to_string())
  }
}

impl From<i64> for ItemId {
  fn from(value: i64) -> Self {
    ItemId::Num(value)
  }
}

/// Trait for entities that can be cached.
pub trait Entity: Clone + fmt::Debug + Send + Sync + Serialize + DeserializeOwned + 'static {
  /// Unique identifier for this entity
  fn id(&self) -> &ItemId;

  /// Entity type name, used in log fields
  fn entity_type() -> &'static str;
}

/// Errors of page fetchers, which report cancellation in-band.
pub trait FetchError: fmt::Display {
  /// True when the request was cancelled rather than failed.
  fn is_cancelled(&self) -> bool;
}
