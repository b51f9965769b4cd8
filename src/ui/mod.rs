pub mod components;
pub mod renderfns;
pub mod view;
pub mod views;

use crate::app::App;
use ratatui::prelude::*;
use ratatui::widgets::ListState;
use renderfns::{draw_footer, draw_header};

/// Main draw function
pub fn draw(frame: &mut Frame, app: &mut App) {
  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // Header
      Constraint::Min(1),    // Main content
      Constraint::Length(1), // Footer
    ])
    .split(frame.area());

  let (context, shortcuts) = match app.current_view() {
    Some(view) => (view.context(), view.shortcuts()),
    None => (None, Vec::new()),
  };
  let overlay_active = app.captures_input() || app.command_input().is_active();
  draw_header(
    frame,
    chunks[0],
    app.title(),
    context.as_deref(),
    &shortcuts,
    overlay_active,
  );

  if let Some(view) = app.current_view_mut() {
    view.render(frame, chunks[1]);
  }

  let status = app.status();
  draw_footer(frame, chunks[2], &app.view_breadcrumb(), status.as_deref());

  app.command_input().render_overlay(frame, chunks[1]);
  app.toasts().render(frame, chunks[1]);
}

/// Keep a list selection inside `0..len`, selecting the first row when
/// there is one and nothing is selected.
pub fn ensure_valid_selection(state: &mut ListState, len: usize) {
  if len == 0 {
    state.select(None);
    return;
  }
  match state.selected() {
    Some(i) if i >= len => state.select(Some(len - 1)),
    None => state.select(Some(0)),
    _ => {}
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_ensure_valid_selection() {
    let mut state = ListState::default();
    ensure_valid_selection(&mut state, 3);
    assert_eq!(state.selected(), Some(0));

    state.select(Some(7));
    ensure_valid_selection(&mut state, 3);
    assert_eq!(state.selected(), Some(2));

    ensure_valid_selection(&mut state, 0);
    assert_eq!(state.selected(), None);
  }
}
