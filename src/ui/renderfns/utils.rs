use chrono::{DateTime, Utc};
use ratatui::prelude::Color;

/// Truncate a string to a maximum number of characters, adding "..." if
/// truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Dates are shown as MM/DD/YYYY
pub fn format_date(date: Option<&DateTime<Utc>>) -> String {
  date
    .map(|d| d.format("%m/%d/%Y").to_string())
    .unwrap_or_default()
}

/// Get the display color for an assignment or submission status
pub fn status_color(status: &str) -> Color {
  match status.to_lowercase().as_str() {
    "graded" | "completed" | "submitted" | "done" => Color::Green,
    "not graded" | "pending" | "in progress" => Color::Yellow,
    "late" | "missing" | "overdue" => Color::Red,
    _ => Color::White,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  #[test]
  fn test_truncate_short_string() {
    assert_eq!(truncate("hello", 10), "hello");
  }

  #[test]
  fn test_truncate_exact_length() {
    assert_eq!(truncate("hello", 5), "hello");
  }

  #[test]
  fn test_truncate_long_string() {
    assert_eq!(truncate("hello world", 8), "hello...");
  }

  #[test]
  fn test_truncate_multibyte() {
    assert_eq!(truncate("héllo wörld", 8), "héllo...");
  }

  #[test]
  fn test_format_date() {
    let date = Utc.with_ymd_and_hms(2024, 3, 9, 23, 0, 0).unwrap();
    assert_eq!(format_date(Some(&date)), "03/09/2024");
    assert_eq!(format_date(None), "");
  }

  #[test]
  fn test_status_color() {
    assert_eq!(status_color("Graded"), Color::Green);
    assert_eq!(status_color("Not Graded"), Color::Yellow);
    assert_eq!(status_color("late"), Color::Red);
    assert_eq!(status_color("draft"), Color::White);
  }
}
