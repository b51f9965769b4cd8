use crate::ui::view::{ShortcutInfo, ShortcutVisibility};
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Draw the header bar with logo, title, context, and shortcuts
pub fn draw_header(
  frame: &mut Frame,
  area: Rect,
  title: &str,
  context: Option<&str>,
  shortcuts: &[ShortcutInfo],
  overlay_active: bool,
) {
  let mut spans = vec![
    Span::styled(" courseterm ", Style::default().fg(Color::Cyan).bold()),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::styled(format!(" {} ", title), Style::default().fg(Color::White)),
  ];

  if let Some(context) = context.filter(|c| !c.is_empty()) {
    spans.push(Span::styled("│", Style::default().fg(Color::DarkGray)));
    spans.push(Span::styled(
      format!(" {} ", context),
      Style::default().fg(Color::Yellow).bold(),
    ));
  }
  spans.push(Span::raw("  "));

  // Keys highlighted, descriptions dimmed
  for shortcut in visible_shortcuts(shortcuts, overlay_active) {
    spans.push(Span::styled(
      format!("<{}>", shortcut.key),
      Style::default().fg(Color::Cyan),
    ));
    spans.push(Span::styled(
      format!(" {}", shortcut.label),
      Style::default().fg(Color::DarkGray),
    ));
    spans.push(Span::raw("   "));
  }

  let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));

  frame.render_widget(paragraph, area);
}

/// Shortcuts to show, ordered by priority. While an overlay is open only
/// its own shortcuts are shown.
fn visible_shortcuts(shortcuts: &[ShortcutInfo], overlay_active: bool) -> Vec<&ShortcutInfo> {
  let wanted = if overlay_active {
    ShortcutVisibility::WhenActive
  } else {
    ShortcutVisibility::Always
  };
  let mut visible: Vec<&ShortcutInfo> = shortcuts.iter().filter(|s| s.visibility == wanted).collect();
  visible.sort_by_key(|s| s.priority);
  visible
}
