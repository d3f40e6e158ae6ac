use chrono::{DateTime, Utc};
use ratatui::prelude::Color;

use crate::api::types::StatusKind;

/// Truncate a string to a maximum length, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let cut: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", cut)
  }
}

/// Display color for a job status
pub fn status_color(status: StatusKind) -> Color {
  match status {
    StatusKind::Pending => Color::Yellow,
    StatusKind::Running => Color::Blue,
    StatusKind::Completed => Color::Green,
    StatusKind::Failed => Color::Red,
  }
}

/// Compact timestamp for table cells
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
  ts.format("%Y-%m-%d %H:%M").to_string()
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
  fn test_status_colors() {
    assert_eq!(status_color(StatusKind::Pending), Color::Yellow);
    assert_eq!(status_color(StatusKind::Running), Color::Blue);
    assert_eq!(status_color(StatusKind::Completed), Color::Green);
    assert_eq!(status_color(StatusKind::Failed), Color::Red);
  }

  #[test]
  fn test_format_timestamp() {
    let ts = Utc.with_ymd_and_hms(2026, 1, 10, 8, 30, 0).unwrap();
    assert_eq!(format_timestamp(ts), "2026-01-10 08:30");
  }
}
