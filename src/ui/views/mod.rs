mod item_detail;
mod predict;
mod quiz_take;
mod resource_list;

pub use item_detail::ItemDetailView;
pub use predict::PredictView;
pub use quiz_take::QuizTakeView;
pub use resource_list::ResourceListView;

use crate::api::params::Filter;
use crate::api::resource::{
  with_resource, AssignmentMaterials, AssignmentSubmissions, Assignments, Courses, Grades,
  Lectures, QuizQuestions, Quizzes, Tests,
};
use crate::api::{CachedClient, ListParams, Resource, ResourceKind};
use crate::display::Tabular;
use crate::scoring::running_percentage;
use crate::ui::view::{ShortcutInfo, View};
use crossterm::event::{KeyCode, KeyEvent};

/// Per-resource additions to the generic list and detail views.
pub trait ResourceView: Resource {
  /// Line under the list computed from the loaded rows
  fn summary(_items: &[Self::Item]) -> Option<String> {
    None
  }

  /// View opened by a resource-specific key on the detail page
  fn detail_action(
    _client: &CachedClient,
    _item: &Self::Item,
    _key: KeyEvent,
  ) -> Option<Box<dyn View>> {
    None
  }

  fn detail_shortcuts() -> Vec<ShortcutInfo> {
    Vec::new()
  }
}

impl ResourceView for Courses {}
impl ResourceView for Lectures {}
impl ResourceView for Assignments {}
impl ResourceView for AssignmentMaterials {}
impl ResourceView for QuizQuestions {}
impl ResourceView for Tests {}

impl ResourceView for Grades {
  fn summary(items: &[Self::Item]) -> Option<String> {
    if items.is_empty() {
      return None;
    }
    Some(format!(
      "Running percentage: {:.1}%",
      running_percentage(items)
    ))
  }
}

impl ResourceView for AssignmentSubmissions {
  fn detail_action(
    client: &CachedClient,
    item: &Self::Item,
    key: KeyEvent,
  ) -> Option<Box<dyn View>> {
    match key.code {
      KeyCode::Char('p') => Some(Box::new(PredictView::new(client.clone(), item))),
      _ => None,
    }
  }

  fn detail_shortcuts() -> Vec<ShortcutInfo> {
    vec![ShortcutInfo::new("p", "AI check").with_priority(40)]
  }
}

impl ResourceView for Quizzes {
  fn detail_action(
    client: &CachedClient,
    item: &Self::Item,
    key: KeyEvent,
  ) -> Option<Box<dyn View>> {
    match key.code {
      KeyCode::Char('t') => Some(Box::new(QuizTakeView::new(client.clone(), item))),
      _ => None,
    }
  }

  fn detail_shortcuts() -> Vec<ShortcutInfo> {
    vec![ShortcutInfo::new("t", "take quiz").with_priority(40)]
  }
}

/// Root list view of `kind`, filtered by `filter` in `relation=id,id` form.
pub fn open_list(
  client: &CachedClient,
  kind: ResourceKind,
  filter: &str,
) -> Result<Box<dyn View>, String> {
  with_resource!(kind, R => list_view::<R>(client, filter))
}

fn list_view<R>(client: &CachedClient, filter: &str) -> Result<Box<dyn View>, String>
where
  R: ResourceView,
  R::Item: Tabular,
{
  let mut params = ListParams::<R>::sorted_default();
  params.filter = R::Filter::parse(filter).map_err(|e| e.to_string())?;
  Ok(Box::new(ResourceListView::new(client.clone(), params)))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::transport::testing::FakeTransport;
  use crate::api::transport::HttpResponse;
  use crate::api::ApiClient;
  use crate::cache::QueryStore;
  use serde_json::json;
  use std::sync::Arc;
  use url::Url;

  fn client() -> CachedClient {
    let transport = Arc::new(FakeTransport::new(|_| {
      Ok(HttpResponse::json(200, &json!({ "data": [], "hasNextPage": false })))
    }));
    let base = Url::parse("https://lms.example.com/api").unwrap();
    CachedClient::new(ApiClient::new(transport, base, 10), Arc::new(QueryStore::new()))
  }

  #[tokio::test]
  async fn test_open_list_with_filter() {
    let view = open_list(&client(), ResourceKind::Grades, "students=7").unwrap();
    assert_eq!(view.breadcrumb_label(), "Grades");
    assert_eq!(view.context().as_deref(), Some("sort id:desc  filter students=7"));
  }

  #[tokio::test]
  async fn test_open_list_rejects_unknown_relation() {
    let err = open_list(&client(), ResourceKind::Courses, "students=7")
      .err()
      .unwrap();
    assert!(err.contains("courseCreators"));
  }

  #[tokio::test]
  async fn test_submission_detail_opens_ai_check() {
    use crossterm::event::KeyModifiers;
    let submission: crate::api::types::AssignmentSubmission =
      serde_json::from_value(json!({ "id": "s1" })).unwrap();
    let press = |c| KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE);

    let view = AssignmentSubmissions::detail_action(&client(), &submission, press('p')).unwrap();
    assert_eq!(view.breadcrumb_label(), "AI check");
    assert!(view.captures_input());
    assert!(AssignmentSubmissions::detail_action(&client(), &submission, press('t')).is_none());
  }

  #[test]
  fn test_grade_summary() {
    let grades: Vec<crate::api::types::Grade> = serde_json::from_value(json!([
      { "id": "1", "grade": 9.0, "maxGrade": 10.0 },
      { "id": "2", "grade": 6.0, "maxGrade": 10.0 },
    ]))
    .unwrap();
    assert_eq!(
      Grades::summary(&grades).as_deref(),
      Some("Running percentage: 75.0%")
    );
    assert_eq!(Grades::summary(&[]), None);
  }
}
