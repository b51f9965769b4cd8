use crate::list_query::Notice;
use crate::ui::renderfns::truncate;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

const INFO_TTL: Duration = Duration::from_secs(3);
const ERROR_TTL: Duration = Duration::from_secs(10);
const MAX_TOASTS: usize = 4;

#[derive(Debug, Clone)]
struct Toast {
  notice: Notice,
  shown_at: Instant,
}

impl Toast {
  fn expired(&self, now: Instant) -> bool {
    let ttl = match self.notice {
      Notice::Info(_) => INFO_TTL,
      Notice::Error(_) => ERROR_TTL,
    };
    now.duration_since(self.shown_at) >= ttl
  }
}

/// Stack of transient notifications in the bottom-right corner. Errors stay
/// longer than info messages and can be dismissed early.
#[derive(Debug, Clone, Default)]
pub struct Toasts {
  toasts: VecDeque<Toast>,
}

impl Toasts {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_empty(&self) -> bool {
    self.toasts.is_empty()
  }

  pub fn len(&self) -> usize {
    self.toasts.len()
  }

  pub fn push(&mut self, notice: Notice) {
    self.push_at(notice, Instant::now());
  }

  fn push_at(&mut self, notice: Notice, shown_at: Instant) {
    if self.toasts.len() == MAX_TOASTS {
      self.toasts.pop_front();
    }
    self.toasts.push_back(Toast { notice, shown_at });
  }

  pub fn dismiss_all(&mut self) {
    self.toasts.clear();
  }

  /// Drop expired toasts
  pub fn prune(&mut self, now: Instant) {
    self.toasts.retain(|t| !t.expired(now));
  }

  pub fn render(&self, frame: &mut Frame, area: Rect) {
    let width = (area.width / 2).clamp(20, 60).min(area.width);
    let mut bottom = area.y + area.height;

    for toast in self.toasts.iter().rev() {
      if bottom < area.y + 3 {
        break;
      }
      let (text, color, title) = match &toast.notice {
        Notice::Info(text) => (text, Color::Green, " Info "),
        Notice::Error(text) => (text, Color::Red, " Error "),
      };
      let rect = Rect::new(area.x + area.width - width, bottom - 3, width, 3);
      frame.render_widget(Clear, rect);
      let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color))
        .title(title);
      let body = truncate(text, width.saturating_sub(2) as usize);
      frame.render_widget(Paragraph::new(body).block(block), rect);
      bottom -= 3;
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_prune_by_level() {
    let start = Instant::now();
    let mut toasts = Toasts::new();
    toasts.push_at(Notice::Info("saved".to_string()), start);
    toasts.push_at(Notice::Error("failed".to_string()), start);

    toasts.prune(start + Duration::from_secs(5));
    assert_eq!(toasts.len(), 1);

    toasts.prune(start + Duration::from_secs(11));
    assert!(toasts.is_empty());
  }

  #[test]
  fn test_oldest_dropped_when_full() {
    let mut toasts = Toasts::new();
    for i in 0..6 {
      toasts.push(Notice::Info(i.to_string()));
    }
    assert_eq!(toasts.len(), MAX_TOASTS);
    assert!(matches!(&toasts.toasts[0].notice, Notice::Info(t) if t == "2"));
  }
}
