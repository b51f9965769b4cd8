//! Domain records of the learning-management backend.
//!
//! Field names follow the backend's camelCase JSON. Relations are optional:
//! list endpoints embed them only partially, and create bodies reference
//! other records by id alone.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::cache::{Entity, ItemId};

/// Reference to another record by id, the shape the backend expects in
/// request bodies (`{ "id": ... }`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ref {
  pub id: ItemId,
}

impl Ref {
  pub fn new(id: impl Into<ItemId>) -> Self {
    Self { id: id.into() }
  }
}

impl From<ItemId> for Ref {
  fn from(id: ItemId) -> Self {
    Self { id }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
  pub id: ItemId,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub first_name: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub last_name: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub email: Option<String>,
}

impl User {
  /// "First Last", falling back to the email, then the id.
  pub fn display_name(&self) -> String {
    let name = [self.first_name.as_deref(), self.last_name.as_deref()]
      .into_iter()
      .flatten()
      .collect::<Vec<_>>()
      .join(" ");
    if !name.is_empty() {
      return name;
    }
    self
      .email
      .clone()
      .unwrap_or_else(|| self.id.to_string())
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntity {
  pub id: ItemId,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
  pub id: ItemId,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub course_name: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub category_type: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub course_price: Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub course_creator: Option<User>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub course_lecture: Vec<Lecture>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lecture {
  pub id: ItemId,
  #[serde(default)]
  pub lecture_name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub lecture_time: Option<String>,
  #[serde(default, with = "flexible_date", skip_serializing_if = "Option::is_none")]
  pub lecture_date: Option<DateTime<Utc>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub markdown_content: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub course: Option<Box<Course>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub previous_lecture: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub next_lecture: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub created_at: Option<DateTime<Utc>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
  pub id: ItemId,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(default, with = "flexible_date", skip_serializing_if = "Option::is_none")]
  pub deadline: Option<DateTime<Utc>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub status: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub course: Option<Box<Course>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentMaterial {
  pub id: ItemId,
  #[serde(default)]
  pub name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub file: Option<FileEntity>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub assignment: Option<Box<Assignment>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentSubmission {
  pub id: ItemId,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub assignment: Option<Box<Assignment>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub student: Option<User>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub file: Option<FileEntity>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub status: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
  pub id: ItemId,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub title: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub course: Option<Box<Course>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub is_taken: Option<bool>,
}

/// Multiple-choice question. The backend numbers these instead of using
/// string ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
  pub id: ItemId,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub question_text: Option<String>,
  #[serde(default)]
  pub options: Vec<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub answer: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub quiz_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Grade {
  pub id: ItemId,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub feedback: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub grade: Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub max_grade: Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub student: Option<User>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub assignment: Option<Box<Assignment>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub quiz: Option<Box<Quiz>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub course: Option<Box<Course>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub created_at: Option<DateTime<Utc>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub updated_at: Option<DateTime<Utc>>,
}

/// Record of the `tests` scaffold collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestRecord {
  pub id: ItemId,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
  pub id: ItemId,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub student: Option<User>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub course: Option<Box<Course>>,
}

macro_rules! entity {
  ($($ty:ident => $name:literal),+ $(,)?) => {
    $(
      impl Entity for $ty {
        fn id(&self) -> &ItemId {
          &self.id
        }

        fn entity_type() -> &'static str {
          $name
        }
      }
    )+
  };
}

entity!(
  Course => "course",
  Lecture => "lecture",
  Assignment => "assignment",
  AssignmentMaterial => "assignment_material",
  AssignmentSubmission => "assignment_submission",
  Quiz => "quiz",
  QuizQuestion => "quiz_question",
  Grade => "grade",
  TestRecord => "test",
  Enrollment => "enrollment",
);

/// Timestamps that may come as full RFC 3339 values or as bare
/// `YYYY-MM-DD` dates (taken as midnight UTC).
pub mod flexible_date {
  use super::*;
  use serde::{Deserializer, Serializer};

  pub fn serialize<S: Serializer>(
    value: &Option<DateTime<Utc>>,
    serializer: S,
  ) -> Result<S::Ok, S::Error> {
    match value {
      Some(dt) => serializer.serialize_str(&dt.to_rfc3339()),
      None => serializer.serialize_none(),
    }
  }

  pub fn deserialize<'de, D: Deserializer<'de>>(
    deserializer: D,
  ) -> Result<Option<DateTime<Utc>>, D::Error> {
    let raw: Option<String> = Option::deserialize(deserializer)?;
    let Some(raw) = raw.filter(|s| !s.trim().is_empty()) else {
      return Ok(None);
    };
    parse(&raw)
      .map(Some)
      .ok_or_else(|| serde::de::Error::custom(format!("invalid date '{}'", raw)))
  }

  pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
      return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
      .ok()
      .and_then(|d| d.and_hms_opt(0, 0, 0))
      .map(|dt| dt.and_utc())
  }
}
