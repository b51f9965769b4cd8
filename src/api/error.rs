//! Errors returned by the API client.

use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use crate::cache::{FetchError, ItemId};

/// Why a single HTTP exchange failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestFailure {
  #[error("unexpected status {0}")]
  Status(u16),
  #[error("transport error: {0}")]
  Transport(String),
  #[error("malformed response body: {0}")]
  Decode(String),
}

/// Per-field error codes from a `422 Unprocessable Entity` response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
  pub fields: BTreeMap<String, String>,
}

impl ValidationErrors {
  /// Read `{ "errors": { field: code } }`. Codes that are not strings are
  /// kept as their JSON text.
  pub fn from_body(body: &[u8]) -> Self {
    let fields = serde_json::from_slice::<Value>(body)
      .ok()
      .and_then(|v| v.get("errors").and_then(Value::as_object).cloned())
      .map(|errors| {
        errors
          .into_iter()
          .map(|(field, code)| {
            let code = match code {
              Value::String(s) => s,
              other => other.to_string(),
            };
            (field, code)
          })
          .collect()
      })
      .unwrap_or_default();
    Self { fields }
  }

  pub fn get(&self, field: &str) -> Option<&str> {
    self.fields.get(field).map(String::as_str)
  }

  pub fn is_empty(&self) -> bool {
    self.fields.is_empty()
  }
}

impl fmt::Display for ValidationErrors {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.fields.is_empty() {
      return f.write_str("no field details");
    }
    let parts: Vec<String> = self
      .fields
      .iter()
      .map(|(field, code)| format!("{}: {}", field, code))
      .collect();
    f.write_str(&parts.join(", "))
  }
}

/// Failure taxonomy of the client.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
  /// List or detail fetch failed. Cached data stays on screen.
  #[error("failed to load {resource}: {source}")]
  Fetch {
    resource: &'static str,
    #[source]
    source: RequestFailure,
  },
  /// Create/update rejected with per-field codes.
  #[error("invalid {resource}: {errors}")]
  Validation {
    resource: &'static str,
    errors: ValidationErrors,
  },
  /// Create/update failed for another reason.
  #[error("failed to save {resource}: {source}")]
  Write {
    resource: &'static str,
    #[source]
    source: RequestFailure,
  },
  /// Delete failed after the item was already hidden locally.
  #[error("failed to delete {resource} {id}: {source}")]
  Delete {
    resource: &'static str,
    id: ItemId,
    #[source]
    source: RequestFailure,
  },
  /// The AI service did not return a prediction.
  #[error("failed to get a prediction: {source}")]
  Predict {
    #[source]
    source: RequestFailure,
  },
  #[error("no AI service configured, set api.ai_url")]
  AiNotConfigured,
  /// Request cancelled before its response arrived. Never shown.
  #[error("request cancelled")]
  Cancelled,
}

impl FetchError for ApiError {
  fn is_cancelled(&self) -> bool {
    matches!(self, ApiError::Cancelled)
  }
}
