use super::{ItemDetailView, ResourceView};
use crate::api::params::{Filter, SortField, SortSpec};
use crate::api::{CachedClient, ListParams};
use crate::cache::{Entity, ListState as FetchState};
use crate::display::{format_header, format_row, Tabular};
use crate::list_query::{ListQuery, Notice};
use crate::ui::components::{ConfirmDialog, ConfirmEvent, KeyResult, Prompt, PromptEvent};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::status_color;
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};
use tokio::sync::oneshot;

/// Paginated, sortable, filterable list of one resource
pub struct ResourceListView<R: ResourceView> {
  client: CachedClient,
  query: ListQuery<R>,
  list_state: ListState,
  filter_prompt: Prompt,
  confirm: ConfirmDialog,
  pending_delete: Option<oneshot::Sender<bool>>,
  notices: Vec<Notice>,
}

impl<R> ResourceListView<R>
where
  R: ResourceView,
  R::Item: Tabular,
{
  pub fn new(client: CachedClient, params: ListParams<R>) -> Self {
    Self {
      query: ListQuery::new(client.clone(), params),
      client,
      list_state: ListState::default(),
      filter_prompt: Prompt::new(),
      confirm: ConfirmDialog::new(),
      pending_delete: None,
      notices: Vec::new(),
    }
  }

  fn selected_item(&self) -> Option<&R::Item> {
    self
      .list_state
      .selected()
      .and_then(|i| self.query.items().get(i))
  }

  fn move_selection(&mut self, down: bool) {
    if down {
      self.list_state.select_next();
    } else {
      self.list_state.select_previous();
    }
    ensure_valid_selection(&mut self.list_state, self.query.items().len());
    if let Some(selected) = self.list_state.selected() {
      self.query.near_end(selected);
    }
  }

  fn change_params(&mut self, params: ListParams<R>) {
    self.query.set_params(params);
    self.list_state.select(Some(0));
  }

  fn cycle_sort_field(&mut self) {
    let current = self.query.params().effective_sort();
    let mut params = self.query.params().clone();
    params.sort = Some(SortSpec::new(current.order_by.next(), current.order));
    self.change_params(params);
  }

  fn toggle_sort_order(&mut self) {
    let current = self.query.params().effective_sort();
    let mut params = self.query.params().clone();
    params.sort = Some(SortSpec::new(current.order_by, current.order.toggled()));
    self.change_params(params);
  }

  fn open_filter(&mut self) {
    if R::Filter::RELATIONS.is_empty() {
      self
        .notices
        .push(Notice::Info(format!("{} cannot be filtered", R::LABEL)));
      return;
    }
    let hint = format!("{}=id,id ...", R::Filter::RELATIONS.join("|"));
    let current = self.query.params().filter.to_text();
    self.filter_prompt.open("Filter", &hint, &current);
  }

  fn apply_filter(&mut self, text: &str) {
    match R::Filter::parse(text) {
      Ok(filter) => {
        let mut params = self.query.params().clone();
        params.filter = filter;
        self.change_params(params);
      }
      Err(e) => self.notices.push(Notice::Error(e.to_string())),
    }
  }

  fn ask_delete(&mut self) {
    let Some(item) = self.selected_item() else {
      return;
    };
    let id = item.id().clone();
    let message = format!("Delete {} '{}'?", R::LABEL.to_lowercase(), item.title());
    self.pending_delete = Some(self.query.begin_delete(id));
    self.confirm.show(message);
  }

  fn answer_delete(&mut self, confirmed: bool) {
    if let Some(confirm) = self.pending_delete.take() {
      let _ = confirm.send(confirmed);
    }
  }

  fn title(&self) -> String {
    let count = self.query.items().len();
    let more = if self.query.has_next_page() { "+" } else { "" };
    match self.query.state() {
      FetchState::LoadingFirstPage => format!(" {} (loading...) ", R::LABEL),
      FetchState::LoadingNextPage => format!(" {} ({}{}, loading more...) ", R::LABEL, count, more),
      _ => match self.query.last_error() {
        Some(e) => format!(" {} ({}) (error: {}) ", R::LABEL, count, e),
        None => format!(" {} ({}{}) ", R::LABEL, count, more),
      },
    }
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    let len = self.query.items().len();
    ensure_valid_selection(&mut self.list_state, len);

    let block = Block::default()
      .title(self.title())
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if len == 0 {
      let content = match self.query.state() {
        FetchState::LoadingFirstPage => "Loading...".to_string(),
        _ if self.query.last_error().is_some() => "Failed to load. Press 'r' to retry.".to_string(),
        _ => format!("No {} found.", R::LABEL.to_lowercase()),
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let summary = R::summary(self.query.items());
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(1), // Column headers
        Constraint::Min(1),    // Rows
        Constraint::Length(u16::from(summary.is_some())),
      ])
      .split(inner);

    let header = Paragraph::new(format!("  {}", format_header::<R::Item>()))
      .style(Style::default().fg(Color::DarkGray).add_modifier(Modifier::BOLD));
    frame.render_widget(header, chunks[0]);

    let items: Vec<ListItem> = self
      .query
      .items()
      .iter()
      .map(|item| {
        let row = format_row::<R::Item>(&item.cells());
        let style = match item.status() {
          Some(status) => Style::default().fg(status_color(status)),
          None => Style::default(),
        };
        ListItem::new(Line::from(Span::styled(row, style)))
      })
      .collect();

    let list = List::new(items)
      .highlight_style(
        Style::default()
          .bg(Color::DarkGray)
          .add_modifier(Modifier::BOLD),
      )
      .highlight_symbol("> ");

    frame.render_stateful_widget(list, chunks[1], &mut self.list_state);

    if let Some(summary) = summary {
      let line = Paragraph::new(summary).style(Style::default().fg(Color::Yellow));
      frame.render_widget(line, chunks[2]);
    }
  }
}

impl<R> View for ResourceListView<R>
where
  R: ResourceView,
  R::Item: Tabular,
{
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match self.confirm.handle_key(key) {
      KeyResult::Event(ConfirmEvent::Confirmed) => {
        self.answer_delete(true);
        return ViewAction::None;
      }
      KeyResult::Event(ConfirmEvent::Declined) => {
        self.answer_delete(false);
        return ViewAction::None;
      }
      KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    match self.filter_prompt.handle_key(key) {
      KeyResult::Event(PromptEvent::Submitted(text)) => {
        self.apply_filter(&text);
        return ViewAction::None;
      }
      KeyResult::Event(PromptEvent::Cancelled) | KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.move_selection(true),
      KeyCode::Char('k') | KeyCode::Up => self.move_selection(false),
      KeyCode::Char('g') | KeyCode::Home => self.list_state.select_first(),
      KeyCode::Char('G') | KeyCode::End => {
        let len = self.query.items().len();
        if len > 0 {
          self.list_state.select(Some(len - 1));
          self.query.near_end(len - 1);
        }
      }
      KeyCode::Char('s') => self.cycle_sort_field(),
      KeyCode::Char('o') => self.toggle_sort_order(),
      KeyCode::Char('f') => self.open_filter(),
      KeyCode::Char('r') => self.query.refresh(),
      KeyCode::Char('d') => self.ask_delete(),
      KeyCode::Enter => {
        if let Some(item) = self.selected_item() {
          return ViewAction::Push(Box::new(ItemDetailView::<R>::new(
            self.client.clone(),
            item.id().clone(),
          )));
        }
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_list(frame, area);
    self.filter_prompt.render_overlay(frame, area);
    self.confirm.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    R::LABEL.to_string()
  }

  fn context(&self) -> Option<String> {
    let params = self.query.params();
    let mut context = format!("sort {}", params.effective_sort());
    if !params.filter.is_empty() {
      context.push_str(&format!("  filter {}", params.filter.to_text()));
    }
    Some(context)
  }

  fn tick(&mut self) {
    self.query.poll();
    let notices = self.query.take_notices();
    self.notices.extend(notices);
  }

  fn captures_input(&self) -> bool {
    self.confirm.is_active() || self.filter_prompt.is_active()
  }

  fn take_notices(&mut self) -> Vec<Notice> {
    std::mem::take(&mut self.notices)
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("enter", "open").with_priority(20),
      ShortcutInfo::new("s/o", "sort").with_priority(30),
      ShortcutInfo::new("f", "filter").with_priority(40),
      ShortcutInfo::new("r", "refresh").with_priority(50),
      ShortcutInfo::new("d", "delete").with_priority(60),
      ShortcutInfo::new("q", "back").with_priority(90),
      ShortcutInfo::new("enter", "apply").when_active(),
      ShortcutInfo::new("y/n", "confirm").when_active(),
      ShortcutInfo::new("esc", "cancel").when_active(),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::resource::Courses;
  use crate::api::transport::testing::{query_param, FakeTransport};
  use crate::api::transport::HttpResponse;
  use crate::api::ApiClient;
  use crate::cache::QueryStore;
  use crossterm::event::KeyModifiers;
  use reqwest::Method;
  use serde_json::json;
  use std::sync::Arc;
  use std::time::Duration;
  use url::Url;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn setup() -> (ResourceListView<Courses>, Arc<FakeTransport>) {
    let transport = Arc::new(FakeTransport::new(|req| {
      if req.method == Method::DELETE {
        return Ok(HttpResponse::new(500, ""));
      }
      let data: Vec<_> = (1..=5)
        .map(|i| json!({ "id": i.to_string(), "courseName": format!("Course {}", i) }))
        .collect();
      Ok(HttpResponse::json(200, &json!({ "data": data, "hasNextPage": false })))
    }));
    let base = Url::parse("https://lms.example.com/api").unwrap();
    let client = CachedClient::new(
      ApiClient::new(transport.clone(), base, 10),
      Arc::new(QueryStore::new()),
    );
    (
      ResourceListView::new(client, ListParams::sorted_default()),
      transport,
    )
  }

  async fn settle(view: &mut ResourceListView<Courses>) {
    for _ in 0..20 {
      tokio::time::sleep(Duration::from_millis(5)).await;
      view.tick();
    }
  }

  #[tokio::test]
  async fn test_sort_keys_refetch_with_new_sort() {
    let (mut view, transport) = setup();
    settle(&mut view).await;
    view.handle_key(key(KeyCode::Char('s')));
    settle(&mut view).await;
    assert_eq!(view.context().as_deref(), Some("sort courseName:desc"));
    view.handle_key(key(KeyCode::Char('o')));
    settle(&mut view).await;
    assert_eq!(view.context().as_deref(), Some("sort courseName:asc"));

    let last = transport.requests().pop().unwrap();
    let sort = query_param(&last, "sort").unwrap();
    assert_eq!(sort, r#"[{"orderBy":"courseName","order":"ASC"}]"#);
  }

  #[tokio::test]
  async fn test_bad_filter_becomes_notice() {
    let (mut view, _) = setup();
    view.handle_key(key(KeyCode::Char('f')));
    assert!(view.captures_input());
    for c in "teachers=1".chars() {
      view.handle_key(key(KeyCode::Char(c)));
    }
    view.handle_key(key(KeyCode::Enter));
    assert!(!view.captures_input());
    let notices = view.take_notices();
    assert!(matches!(&notices[..], [Notice::Error(msg)] if msg.contains("teachers")));
  }

  #[tokio::test]
  async fn test_delete_waits_for_confirmation() {
    let (mut view, transport) = setup();
    settle(&mut view).await;
    view.list_state.select(Some(1));

    view.handle_key(key(KeyCode::Char('d')));
    assert!(view.captures_input());
    settle(&mut view).await;
    assert_eq!(transport.count(&Method::DELETE), 0);
    assert_eq!(view.query.items().len(), 5);

    view.handle_key(key(KeyCode::Char('y')));
    settle(&mut view).await;
    assert_eq!(transport.count(&Method::DELETE), 1);
    // Server refused; the row stays hidden and the failure is reported
    assert_eq!(view.query.items().len(), 4);
    let notices = view.take_notices();
    assert!(matches!(&notices[..], [Notice::Error(msg)] if msg.contains("refresh")));
  }

  #[tokio::test]
  async fn test_declined_delete_keeps_row() {
    let (mut view, transport) = setup();
    settle(&mut view).await;
    view.list_state.select(Some(0));
    view.handle_key(key(KeyCode::Char('d')));
    assert!(view.captures_input());
    view.handle_key(key(KeyCode::Char('n')));
    settle(&mut view).await;
    assert_eq!(transport.count(&Method::DELETE), 0);
    assert_eq!(view.query.items().len(), 5);
  }
}
