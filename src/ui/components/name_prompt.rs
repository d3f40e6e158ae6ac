use crossterm::event::KeyEvent;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use super::input::{InputEvent, TextInput};
use super::KeyResult;

/// Events emitted by the new-job prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptEvent {
  /// A non-empty job name was submitted
  Submitted(String),
  Cancelled,
}

/// Overlay prompting for a new job's name
#[derive(Debug, Clone, Default)]
pub struct NamePrompt {
  active: bool,
  input: TextInput,
}

impl NamePrompt {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_active(&self) -> bool {
    self.active
  }

  pub fn show(&mut self) {
    self.active = true;
    self.input.clear();
  }

  pub fn hide(&mut self) {
    self.active = false;
    self.input.clear();
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<PromptEvent> {
    if !self.active {
      return KeyResult::NotHandled;
    }

    match self.input.handle_key(key) {
      KeyResult::Event(InputEvent::Submitted(name)) => {
        let name = name.trim().to_string();
        if name.is_empty() {
          // Nothing to create yet; keep the prompt open
          KeyResult::Handled
        } else {
          self.hide();
          KeyResult::Event(PromptEvent::Submitted(name))
        }
      }
      KeyResult::Event(InputEvent::Cancelled) => {
        self.hide();
        KeyResult::Event(PromptEvent::Cancelled)
      }
      _ => KeyResult::Handled,
    }
  }

  /// Render the prompt overlay if active
  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    if !self.active {
      return;
    }

    let width = (area.width.saturating_sub(8)).clamp(24, 60);
    let height = 3u16.min(area.height);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    let overlay_area = Rect::new(x, y, width, height);

    frame.render_widget(Clear, overlay_area);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow))
      .title(" New Job ");

    let inner = block.inner(overlay_area);
    frame.render_widget(block, overlay_area);

    let paragraph = Paragraph::new(self.input.value());
    frame.render_widget(paragraph, inner);

    if inner.width > 0 {
      let cursor_x = inner.x + (self.input.cursor_position() as u16).min(inner.width - 1);
      frame.set_cursor_position((cursor_x, inner.y));
    }
  }
}
