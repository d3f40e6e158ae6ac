use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use super::KeyResult;
use crate::api::types::JobId;

/// Events emitted by the delete confirmation dialog
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmEvent {
  Confirmed(JobId),
  Cancelled,
}

/// Yes/no overlay guarding job deletion
#[derive(Debug, Clone, Default)]
pub struct ConfirmDialog {
  target: Option<JobId>,
  message: String,
}

impl ConfirmDialog {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_active(&self) -> bool {
    self.target.is_some()
  }

  pub fn show(&mut self, id: JobId, name: &str) {
    self.target = Some(id);
    self.message = format!("Delete job '{}'?", name);
  }

  pub fn hide(&mut self) {
    self.target = None;
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<ConfirmEvent> {
    let Some(id) = self.target else {
      return KeyResult::NotHandled;
    };

    match key.code {
      KeyCode::Char('y') | KeyCode::Enter => {
        self.hide();
        KeyResult::Event(ConfirmEvent::Confirmed(id))
      }
      KeyCode::Char('n') | KeyCode::Esc | KeyCode::Char('q') => {
        self.hide();
        KeyResult::Event(ConfirmEvent::Cancelled)
      }
      _ => KeyResult::Handled,
    }
  }

  /// Render the dialog overlay if active
  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    if self.target.is_none() {
      return;
    }

    let width = (self.message.len() as u16 + 6).clamp(24, area.width.saturating_sub(4));
    let height = 4u16.min(area.height);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    let overlay_area = Rect::new(x, y, width, height);

    frame.render_widget(Clear, overlay_area);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Red))
      .title(" Confirm ");

    let inner = block.inner(overlay_area);
    frame.render_widget(block, overlay_area);

    let lines = vec![
      Line::from(self.message.clone()),
      Line::from(vec![
        Span::styled("y", Style::default().fg(Color::Red).bold()),
        Span::styled(" delete   ", Style::default().fg(Color::DarkGray)),
        Span::styled("n", Style::default().fg(Color::Cyan).bold()),
        Span::styled(" cancel", Style::default().fg(Color::DarkGray)),
      ]),
    ];
    frame.render_widget(Paragraph::new(lines), inner);
  }
}
