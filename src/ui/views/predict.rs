use crate::api::types::AssignmentSubmission;
use crate::api::CachedClient;
use crate::list_query::Notice;
use crate::query::{Query, QueryState};
use crate::scoring::{Likelihood, Prediction};
use crate::ui::components::{KeyResult, Prompt, PromptEvent};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

/// AI-likelihood check of the text of one submission. The text is pasted
/// into a prompt since submissions only carry an uploaded file.
pub struct PredictView {
  client: CachedClient,
  label: String,
  prompt: Prompt,
  /// Last text sent, kept for retries
  text: Option<String>,
  query: Option<Query<Prediction>>,
  notices: Vec<Notice>,
}

impl PredictView {
  pub fn new(client: CachedClient, submission: &AssignmentSubmission) -> Self {
    let mut view = Self {
      client,
      label: format!("Submission {}", submission.id),
      prompt: Prompt::new(),
      text: None,
      query: None,
      notices: Vec::new(),
    };
    view.open_prompt();
    view
  }

  fn open_prompt(&mut self) {
    let initial = self.text.clone().unwrap_or_default();
    self
      .prompt
      .open("Text to check", "paste the submission text, enter to send", &initial);
  }

  fn send(&mut self, text: String) {
    if text.is_empty() {
      self
        .notices
        .push(Notice::Info("Nothing to check: the text is empty".to_string()));
      return;
    }
    let client = self.client.clone();
    let sent = text.clone();
    let mut query = Query::new(move || {
      let client = client.clone();
      let text = sent.clone();
      async move { client.predict(&text).await.map_err(|e| e.to_string()) }
    });
    query.fetch();
    self.query = Some(query);
    self.text = Some(text);
  }

  fn render_result(&self, frame: &mut Frame, area: Rect) {
    let block = Block::default()
      .title(format!(" Prediction score: {} ", self.label))
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let state = self.query.as_ref().map(Query::state);
    let lines = match state {
      Some(QueryState::Success(prediction)) => {
        let color = likelihood_color(prediction.likelihood());
        vec![
          Line::from(Span::styled(
            format!("Score: {}%", prediction.score),
            Style::default().fg(color).bold(),
          )),
          Line::from(""),
          Line::from(prediction.likelihood().message()),
        ]
      }
      Some(QueryState::Loading) => vec![Line::from("Checking...")],
      Some(QueryState::Error(e)) => vec![
        Line::from(Span::styled(format!("Error: {}", e), Style::default().fg(Color::Red))),
        Line::from(""),
        Line::from("Press 'r' to retry."),
      ],
      Some(QueryState::Idle) | None => vec![Line::from(Span::styled(
        "No prediction score available. Press 'e' to enter the text.",
        Style::default().fg(Color::DarkGray),
      ))],
    };

    frame.render_widget(
      Paragraph::new(lines)
        .block(block)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: false }),
      area,
    );
  }
}

fn likelihood_color(likelihood: Likelihood) -> Color {
  match likelihood {
    Likelihood::High => Color::Red,
    Likelihood::Medium => Color::Yellow,
    Likelihood::Low => Color::Green,
    Likelihood::Authentic => Color::Blue,
  }
}

impl View for PredictView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match self.prompt.handle_key(key) {
      KeyResult::Event(PromptEvent::Submitted(text)) => {
        self.send(text);
        return ViewAction::None;
      }
      KeyResult::Event(PromptEvent::Cancelled) | KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    match key.code {
      KeyCode::Char('e') => self.open_prompt(),
      KeyCode::Char('r') => {
        if let Some(query) = self.query.as_mut() {
          query.refetch();
        }
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_result(frame, area);
    self.prompt.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    "AI check".to_string()
  }

  fn tick(&mut self) {
    let Some(query) = self.query.as_mut() else {
      return;
    };
    if query.poll() {
      if let Some(error) = query.error() {
        self.notices.push(Notice::Error(error.to_string()));
      }
    }
  }

  fn captures_input(&self) -> bool {
    self.prompt.is_active()
  }

  fn take_notices(&mut self) -> Vec<Notice> {
    std::mem::take(&mut self.notices)
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("e", "edit text").with_priority(30),
      ShortcutInfo::new("r", "retry").with_priority(50),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}
