use super::input::{InputResult, TextInput};
use super::KeyResult;
use crossterm::event::KeyEvent;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

/// Events emitted by a prompt that the parent view handles
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptEvent {
  Submitted(String),
  Cancelled,
}

/// One-line prompt overlay, e.g. the filter editor of list views
#[derive(Debug, Clone, Default)]
pub struct Prompt {
  input: TextInput,
  title: String,
  hint: String,
  active: bool,
}

impl Prompt {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_active(&self) -> bool {
    self.active
  }

  /// Open the prompt prefilled with `initial`
  pub fn open(&mut self, title: &str, hint: &str, initial: &str) {
    self.active = true;
    self.title = title.to_string();
    self.hint = hint.to_string();
    self.input.set_value(initial);
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<PromptEvent> {
    if !self.active {
      return KeyResult::NotHandled;
    }
    match self.input.handle_key(key) {
      InputResult::Submitted(value) => {
        self.active = false;
        self.input.clear();
        KeyResult::Event(PromptEvent::Submitted(value.trim().to_string()))
      }
      InputResult::Cancelled => {
        self.active = false;
        self.input.clear();
        KeyResult::Event(PromptEvent::Cancelled)
      }
      // Swallow everything else while open
      InputResult::Consumed | InputResult::NotHandled => KeyResult::Handled,
    }
  }

  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    if !self.active {
      return;
    }

    let width = (area.width * 60 / 100).clamp(30, 70).min(area.width);
    let height = 4;
    let overlay_area = Rect::new(area.x + 1, area.y + 1, width, height.min(area.height));

    frame.render_widget(Clear, overlay_area);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow))
      .title(format!(" {} ", self.title));

    let inner = block.inner(overlay_area);
    frame.render_widget(block, overlay_area);

    if inner.height == 0 {
      return;
    }

    let lines = vec![
      Line::from(vec![
        Span::raw(self.input.value()),
        Span::styled("_", Style::default().fg(Color::Yellow)), // Cursor
      ]),
      Line::from(Span::styled(
        self.hint.as_str(),
        Style::default().fg(Color::DarkGray),
      )),
    ];
    frame.render_widget(Paragraph::new(lines), inner);
  }
}
