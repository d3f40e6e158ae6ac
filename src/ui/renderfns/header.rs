use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

use crate::ui::view::Shortcut;

/// Draw the header bar with logo, API host, and view shortcuts
pub fn draw_header(frame: &mut Frame, area: Rect, title: &str, shortcuts: &[Shortcut]) {
  let mut spans = vec![
    Span::styled(" jobdash ", Style::default().fg(Color::Cyan).bold()),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::styled(format!(" {} ", title), Style::default().fg(Color::White)),
    Span::raw("  "),
  ];

  for shortcut in shortcuts {
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
