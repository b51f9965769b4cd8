//! Serde types of request and response envelopes.
//!
//! Kept apart from the domain records in `types.rs`, which are what the rest
//! of the crate works with.

use serde::{Deserialize, Serialize};

use super::types::Ref;

/// Body of a `200` list response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiPage<T> {
  pub data: Vec<T>,
  #[serde(default)]
  pub has_next_page: bool,
}

/// Body of `POST /v1/enrollments`.
#[derive(Debug, Clone, Serialize)]
pub struct ApiEnrollmentRequest {
  pub student: Ref,
  pub course: Ref,
}

/// Body of `POST <ai_url>/predict/`.
#[derive(Debug, Clone, Serialize)]
pub struct ApiPredictRequest<'a> {
  pub text: &'a str,
}

/// Answer of the AI service: likelihood in percent that the text was
/// machine-written.
#[derive(Debug, Deserialize)]
pub struct ApiPrediction {
  pub prediction: f64,
}
