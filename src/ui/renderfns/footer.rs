use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Draw the footer bar with the view breadcrumb and, when set, a status
/// message on the right
pub fn draw_footer(frame: &mut Frame, area: Rect, breadcrumb: &[String], status: Option<&str>) {
  let mut spans = vec![Span::raw(" ")];

  for (i, part) in breadcrumb.iter().enumerate() {
    if i > 0 {
      spans.push(Span::styled(" > ", Style::default().fg(Color::DarkGray)));
    }

    let style = if i == breadcrumb.len() - 1 {
      Style::default().fg(Color::Cyan).bold()
    } else {
      Style::default().fg(Color::White)
    };

    spans.push(Span::styled(part.clone(), style));
  }

  let chunks = Layout::default()
    .direction(Direction::Horizontal)
    .constraints([Constraint::Min(1), Constraint::Length(status_width(status))])
    .split(area);

  let left = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
  frame.render_widget(left, chunks[0]);

  if let Some(status) = status {
    let right = Paragraph::new(format!("{} ", status))
      .alignment(Alignment::Right)
      .style(Style::default().bg(Color::Black).fg(Color::DarkGray));
    frame.render_widget(right, chunks[1]);
  }
}

fn status_width(status: Option<&str>) -> u16 {
  status
    .map(|s| (s.chars().count() + 1).min(u16::MAX as usize) as u16)
    .unwrap_or(0)
}
