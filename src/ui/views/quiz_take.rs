use crate::api::params::{SortOrder, SortSpec};
use crate::api::resource::{QuizQuestionFilter, QuizQuestionSort, QuizQuestions};
use crate::api::types::{Quiz, QuizQuestion};
use crate::api::{CachedClient, ListParams};
use crate::cache::{ItemId, ListState as FetchState};
use crate::list_query::{ListQuery, Notice};
use crate::scoring::{score_quiz, Band, QuizScore};
use crate::ui::ensure_valid_selection;
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};
use std::collections::HashMap;

/// Answer the questions of one quiz and score the attempt locally
pub struct QuizTakeView {
  quiz_title: String,
  questions: ListQuery<QuizQuestions>,
  list_state: ListState,
  /// Chosen option index per question
  choices: HashMap<ItemId, usize>,
  score: Option<QuizScore>,
  notices: Vec<Notice>,
}

impl QuizTakeView {
  pub fn new(client: CachedClient, quiz: &Quiz) -> Self {
    let mut filter = QuizQuestionFilter::default();
    filter.quizzes.insert(quiz.id.clone());
    let params = ListParams::new(
      Some(SortSpec::new(QuizQuestionSort::Id, SortOrder::Asc)),
      filter,
    );
    Self {
      quiz_title: quiz.title.clone().unwrap_or_else(|| format!("Quiz {}", quiz.id)),
      questions: ListQuery::new(client, params),
      list_state: ListState::default(),
      choices: HashMap::new(),
      score: None,
      notices: Vec::new(),
    }
  }

  fn selected_question(&self) -> Option<&QuizQuestion> {
    self
      .list_state
      .selected()
      .and_then(|i| self.questions.items().get(i))
  }

  fn fully_loaded(&self) -> bool {
    self.questions.state() == FetchState::Idle && !self.questions.has_next_page()
  }

  /// Move the choice of the selected question by `delta` options, wrapping
  fn shift_choice(&mut self, delta: isize) {
    let Some(question) = self.selected_question() else {
      return;
    };
    let count = question.options.len() as isize;
    if count == 0 {
      return;
    }
    let id = question.id.clone();
    let next = match self.choices.get(&id) {
      Some(&current) => (current as isize + delta).rem_euclid(count),
      None if delta < 0 => count - 1,
      None => 0,
    };
    self.choices.insert(id, next as usize);
  }

  fn choose(&mut self, index: usize) {
    let Some(question) = self.selected_question() else {
      return;
    };
    if index < question.options.len() {
      let id = question.id.clone();
      self.choices.insert(id, index);
    }
  }

  fn submit(&mut self) {
    if !self.fully_loaded() {
      self
        .notices
        .push(Notice::Info("Questions are still loading".to_string()));
      return;
    }
    let chosen: HashMap<ItemId, String> = self
      .questions
      .items()
      .iter()
      .filter_map(|q| {
        let idx = self.choices.get(&q.id)?;
        Some((q.id.clone(), q.options.get(*idx)?.clone()))
      })
      .collect();
    let score = score_quiz(self.questions.items(), &chosen);
    self.notices.push(Notice::Info(score.to_string()));
    self.score = Some(score);
  }

  fn question_item(&self, number: usize, question: &QuizQuestion) -> ListItem<'static> {
    let chosen = self.choices.get(&question.id).copied();
    let mut options = vec![Span::raw("   ")];
    for (i, option) in question.options.iter().enumerate() {
      let is_chosen = chosen == Some(i);
      let is_answer = question.answer.as_deref() == Some(option.as_str());
      let style = match (self.score.is_some(), is_chosen, is_answer) {
        (true, _, true) => Style::default().fg(Color::Green).bold(),
        (true, true, false) => Style::default().fg(Color::Red).bold(),
        (false, true, _) => Style::default().fg(Color::Cyan).bold(),
        _ => Style::default().fg(Color::DarkGray),
      };
      let marker = if is_chosen { "(*)" } else { "( )" };
      options.push(Span::styled(format!("{} {}", marker, option), style));
      options.push(Span::raw("  "));
    }
    let text = question.question_text.clone().unwrap_or_default();
    ListItem::new(vec![
      Line::from(format!("{}. {}", number, text)),
      Line::from(options),
    ])
  }

  fn render_quiz(&mut self, frame: &mut Frame, area: Rect) {
    let total = self.questions.items().len();
    ensure_valid_selection(&mut self.list_state, total);

    let title = match self.questions.state() {
      FetchState::LoadingFirstPage | FetchState::LoadingNextPage => {
        format!(" {} (loading...) ", self.quiz_title)
      }
      _ => format!(
        " {} ({}/{} answered) ",
        self.quiz_title,
        self.choices.len(),
        total
      ),
    };
    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if total == 0 {
      let content = if self.fully_loaded() {
        "This quiz has no questions."
      } else {
        "Loading questions..."
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Min(1), Constraint::Length(1)])
      .split(inner);

    let items: Vec<ListItem> = self
      .questions
      .items()
      .iter()
      .enumerate()
      .map(|(i, q)| self.question_item(i + 1, q))
      .collect();
    let list = List::new(items)
      .highlight_style(Style::default().add_modifier(Modifier::BOLD))
      .highlight_symbol("> ");
    frame.render_stateful_widget(list, chunks[0], &mut self.list_state);

    let footer = match &self.score {
      Some(score) => {
        let color = match score.band() {
          Band::Excellent | Band::Good => Color::Green,
          Band::NeedsImprovement => Color::Yellow,
          Band::Poor => Color::Red,
        };
        Paragraph::new(score.to_string()).style(Style::default().fg(color).bold())
      }
      None => Paragraph::new("Pick an option for each question, then press enter to submit.")
        .style(Style::default().fg(Color::DarkGray)),
    };
    frame.render_widget(footer, chunks[1]);
  }
}

impl View for QuizTakeView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.list_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.list_state.select_previous(),
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      KeyCode::Char('r') => self.questions.fetch_next(),
      _ if self.score.is_some() => {}
      KeyCode::Char('l') | KeyCode::Right => self.shift_choice(1),
      KeyCode::Char('h') | KeyCode::Left => self.shift_choice(-1),
      KeyCode::Char(c @ '1'..='9') => self.choose(c as usize - '1' as usize),
      KeyCode::Enter => self.submit(),
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_quiz(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    format!("Take: {}", self.quiz_title)
  }

  fn tick(&mut self) {
    self.questions.poll();
    // A quiz is answered as a whole, so every page is loaded. A failed page
    // waits for `r` instead of being requested again on every tick.
    if self.questions.has_next_page() && self.questions.last_error().is_none() {
      self.questions.fetch_next();
    }
    let notices = self.questions.take_notices();
    self.notices.extend(notices);
  }

  fn take_notices(&mut self) -> Vec<Notice> {
    std::mem::take(&mut self.notices)
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("j/k", "question").with_priority(20),
      ShortcutInfo::new("h/l", "option").with_priority(30),
      ShortcutInfo::new("enter", "submit").with_priority(40),
      ShortcutInfo::new("r", "retry").with_priority(50),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::transport::testing::{query_param, FakeTransport};
  use crate::api::transport::HttpResponse;
  use crate::api::ApiClient;
  use crate::cache::QueryStore;
  use crossterm::event::KeyModifiers;
  use serde_json::json;
  use std::sync::Arc;
  use std::time::Duration;
  use url::Url;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn setup() -> (QuizTakeView, Arc<FakeTransport>) {
    with_transport(FakeTransport::new(|req| {
      let page = query_param(req, "page").unwrap_or_default();
      let body = if page == "1" {
        json!({
          "data": [{ "id": 1, "questionText": "2+2?", "options": ["3", "4"], "answer": "4" }],
          "hasNextPage": true
        })
      } else {
        json!({
          "data": [{ "id": 2, "questionText": "Capital of France?", "options": ["Paris", "Rome"], "answer": "Paris" }],
          "hasNextPage": false
        })
      };
      Ok(HttpResponse::json(200, &body))
    }))
  }

  fn with_transport(transport: FakeTransport) -> (QuizTakeView, Arc<FakeTransport>) {
    let transport = Arc::new(transport);
    let base = Url::parse("https://lms.example.com/api").unwrap();
    let client = CachedClient::new(
      ApiClient::new(transport.clone(), base, 10),
      Arc::new(QueryStore::new()),
    );
    let quiz: Quiz = serde_json::from_value(json!({ "id": "5", "title": "Basics" })).unwrap();
    (QuizTakeView::new(client, &quiz), transport)
  }

  async fn settle(view: &mut QuizTakeView) {
    for _ in 0..30 {
      tokio::time::sleep(Duration::from_millis(5)).await;
      view.tick();
    }
  }

  #[tokio::test]
  async fn test_loads_every_page_filtered_by_quiz() {
    let (mut view, transport) = setup();
    settle(&mut view).await;
    assert_eq!(view.questions.items().len(), 2);
    assert!(view.fully_loaded());
    let first = &transport.requests()[0];
    assert_eq!(query_param(first, "filters").as_deref(), Some(r#"{"quizzes":["5"]}"#));
  }

  #[tokio::test]
  async fn test_submit_scores_attempt() {
    let (mut view, _) = setup();
    settle(&mut view).await;
    view.list_state.select(Some(0));

    // "4" on the first question, "Rome" on the second
    view.handle_key(key(KeyCode::Char('2')));
    view.handle_key(key(KeyCode::Char('j')));
    view.handle_key(key(KeyCode::Char('l')));
    view.handle_key(key(KeyCode::Char('l')));
    view.handle_key(key(KeyCode::Enter));

    let score = view.score.unwrap();
    assert_eq!(score, QuizScore { correct: 1, total: 2 });
    assert_eq!(
      view.take_notices(),
      vec![Notice::Info("Correct answers: 1 out of 2. Good job!".to_string())]
    );

    // Answers are locked once scored
    view.handle_key(key(KeyCode::Char('1')));
    assert_eq!(view.choices.get(&ItemId::Num(2)), Some(&1));
  }

  fn second_pages(transport: &FakeTransport) -> usize {
    transport
      .requests()
      .iter()
      .filter(|r| query_param(r, "page").as_deref() == Some("2"))
      .count()
  }

  #[tokio::test]
  async fn test_failed_page_waits_for_retry_key() {
    let (mut view, transport) = with_transport(FakeTransport::new(|req| {
      if query_param(req, "page").as_deref() == Some("1") {
        Ok(HttpResponse::json(
          200,
          &json!({
            "data": [{ "id": 1, "questionText": "2+2?", "options": ["3", "4"], "answer": "4" }],
            "hasNextPage": true
          }),
        ))
      } else {
        Ok(HttpResponse::new(500, "down"))
      }
    }));
    settle(&mut view).await;
    assert_eq!(second_pages(&transport), 1);
    assert_eq!(view.questions.items().len(), 1);
    let notices = view.take_notices();
    assert!(matches!(&notices[..], [Notice::Error(_)]));
    assert!(!view.fully_loaded());

    view.handle_key(key(KeyCode::Char('r')));
    settle(&mut view).await;
    assert_eq!(second_pages(&transport), 2);
    assert_eq!(view.take_notices().len(), 1);
  }
}
