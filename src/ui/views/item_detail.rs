use super::ResourceView;
use crate::api::CachedClient;
use crate::cache::ItemId;
use crate::display::Tabular;
use crate::list_query::Notice;
use crate::query::{Query, QueryState};
use crate::ui::renderfns::status_color;
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

/// Detail page of one record. Shows the copy from a cached list right away
/// and replaces it when the fresh record arrives.
pub struct ItemDetailView<R: ResourceView> {
  client: CachedClient,
  id: ItemId,
  query: Query<R::Item>,
  scroll: u16,
  notices: Vec<Notice>,
}

impl<R> ItemDetailView<R>
where
  R: ResourceView,
  R::Item: Tabular,
{
  pub fn new(client: CachedClient, id: ItemId) -> Self {
    let fetch_client = client.clone();
    let fetch_id = id.clone();
    let mut query = Query::new(move || {
      let client = fetch_client.clone();
      let id = fetch_id.clone();
      async move { client.get::<R>(&id).await.map_err(|e| e.to_string()) }
    })
    .with_placeholder(client.cached_item::<R>(&id));

    // Start fetching immediately
    query.fetch();

    Self {
      client,
      id,
      query,
      scroll: 0,
      notices: Vec::new(),
    }
  }

  fn render_detail(&self, frame: &mut Frame, area: Rect) {
    let label = R::LABEL.to_lowercase();
    let title = match self.query.state() {
      QueryState::Loading if self.query.is_placeholder() => {
        format!(" {} {} (cached, refreshing...) ", label, self.id)
      }
      QueryState::Loading => format!(" {} {} (loading...) ", label, self.id),
      QueryState::Error(e) => format!(" {} {} (error: {}) ", label, self.id, e),
      _ => format!(" {} {} ", label, self.id),
    };

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let Some(item) = self.query.display_data() else {
      let (text, color) = match self.query.error() {
        Some(error) => (format!("Error: {}\n\nPress 'r' to retry.", error), Color::Red),
        None => ("Loading...".to_string(), Color::DarkGray),
      };
      frame.render_widget(
        Paragraph::new(text).style(Style::default().fg(color)),
        inner,
      );
      return;
    };

    let mut lines: Vec<Line> = vec![Line::from(Span::styled(
      item.title(),
      Style::default().add_modifier(Modifier::BOLD),
    ))];
    lines.push(Line::from(""));

    for (name, value) in item.fields() {
      let value_style = if Some(value.as_str()) == item.status() {
        Style::default().fg(status_color(&value))
      } else {
        Style::default()
      };
      lines.push(Line::from(vec![
        Span::styled(format!("{}: ", name), Style::default().fg(Color::DarkGray)),
        Span::styled(value, value_style),
      ]));
    }

    if let Some(body) = item.body() {
      lines.push(Line::from(Span::styled(
        "─".repeat(inner.width as usize),
        Style::default().fg(Color::DarkGray),
      )));
      lines.extend(body.lines().map(|l| Line::from(l.to_string())));
    }

    let paragraph = Paragraph::new(lines)
      .wrap(Wrap { trim: false })
      .scroll((self.scroll, 0));
    frame.render_widget(paragraph, inner);
  }
}

impl<R> View for ItemDetailView<R>
where
  R: ResourceView,
  R::Item: Tabular,
{
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('r') => self.query.refetch(),
      KeyCode::Char('j') | KeyCode::Down => self.scroll = self.scroll.saturating_add(1),
      KeyCode::Char('k') | KeyCode::Up => self.scroll = self.scroll.saturating_sub(1),
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {
        if let Some(item) = self.query.display_data() {
          if let Some(view) = R::detail_action(&self.client, item, key) {
            return ViewAction::Push(view);
          }
        }
      }
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_detail(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    self.id.to_string()
  }

  fn tick(&mut self) {
    if self.query.poll() {
      if let Some(error) = self.query.error() {
        self.notices.push(Notice::Error(error.to_string()));
      }
    }
  }

  fn take_notices(&mut self) -> Vec<Notice> {
    std::mem::take(&mut self.notices)
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    let mut shortcuts = vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("j/k", "scroll").with_priority(20),
      ShortcutInfo::new("r", "refresh").with_priority(50),
      ShortcutInfo::new("q", "back").with_priority(90),
    ];
    shortcuts.extend(R::detail_shortcuts());
    shortcuts
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::resource::Courses;
  use crate::api::transport::testing::FakeTransport;
  use crate::api::types::Course;
  use crate::api::transport::HttpResponse;
  use crate::api::{ApiClient, ListParams};
  use crate::cache::{Page, QueryStore};
  use serde_json::json;
  use std::sync::Arc;
  use std::time::Duration;
  use url::Url;

  fn client(transport: FakeTransport) -> CachedClient {
    let base = Url::parse("https://lms.example.com/api").unwrap();
    CachedClient::new(
      ApiClient::new(Arc::new(transport), base, 10),
      Arc::new(QueryStore::new()),
    )
  }

  #[tokio::test]
  async fn test_placeholder_from_cached_list() {
    let client = client(FakeTransport::new(|_| {
      Ok(HttpResponse::json(200, &json!({ "id": "7", "courseName": "Fresh" })))
    }));
    let params = ListParams::<Courses>::sorted_default();
    let _sub = client.subscribe(&params);
    let cached: Course = serde_json::from_value(json!({ "id": "7", "courseName": "Cached" })).unwrap();
    client.store().append_page(&params.key(), Page::new(vec![cached], None));

    let mut view = ItemDetailView::<Courses>::new(client, ItemId::from("7"));
    let name = |view: &ItemDetailView<Courses>| {
      view.query.display_data().and_then(|c| c.course_name.clone())
    };
    assert_eq!(name(&view).as_deref(), Some("Cached"));
    assert!(view.query.is_placeholder());

    for _ in 0..20 {
      tokio::time::sleep(Duration::from_millis(5)).await;
      view.tick();
    }
    assert_eq!(name(&view).as_deref(), Some("Fresh"));
  }

  #[tokio::test]
  async fn test_fetch_error_becomes_notice() {
    let client = client(FakeTransport::new(|_| Ok(HttpResponse::new(404, ""))));
    let mut view = ItemDetailView::<Courses>::new(client, ItemId::from("missing"));
    for _ in 0..20 {
      tokio::time::sleep(Duration::from_millis(5)).await;
      view.tick();
    }
    assert!(view.query.is_error());
    assert_eq!(view.take_notices().len(), 1);
    assert!(view.take_notices().is_empty());
  }
}
