use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use super::KeyResult;

/// Events produced by a text input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
  /// Enter pressed, here's the submitted value
  Submitted(String),
  /// Escape pressed, input cancelled
  Cancelled,
}

/// Single-line text input with cursor editing
#[derive(Debug, Clone, Default)]
pub struct TextInput {
  text: String,
  cursor: usize,
}

impl TextInput {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn value(&self) -> &str {
    &self.text
  }

  pub fn is_empty(&self) -> bool {
    self.text.is_empty()
  }

  pub fn clear(&mut self) {
    self.text.clear();
    self.cursor = 0;
  }

  /// Cursor position in characters, for rendering
  pub fn cursor_position(&self) -> usize {
    self.cursor
  }

  fn byte_index(&self) -> usize {
    self
      .text
      .char_indices()
      .nth(self.cursor)
      .map(|(i, _)| i)
      .unwrap_or(self.text.len())
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<InputEvent> {
    match key.code {
      KeyCode::Esc => KeyResult::Event(InputEvent::Cancelled),
      KeyCode::Enter => KeyResult::Event(InputEvent::Submitted(self.text.clone())),
      KeyCode::Backspace => {
        if self.cursor > 0 {
          self.cursor -= 1;
          let at = self.byte_index();
          self.text.remove(at);
        }
        KeyResult::Handled
      }
      KeyCode::Delete => {
        if self.cursor < self.text.chars().count() {
          let at = self.byte_index();
          self.text.remove(at);
        }
        KeyResult::Handled
      }
      KeyCode::Left => {
        self.cursor = self.cursor.saturating_sub(1);
        KeyResult::Handled
      }
      KeyCode::Right => {
        if self.cursor < self.text.chars().count() {
          self.cursor += 1;
        }
        KeyResult::Handled
      }
      KeyCode::Home => {
        self.cursor = 0;
        KeyResult::Handled
      }
      KeyCode::End => {
        self.cursor = self.text.chars().count();
        KeyResult::Handled
      }
      KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
        let at = self.byte_index();
        self.text = self.text[at..].to_string();
        self.cursor = 0;
        KeyResult::Handled
      }
      KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
        let at = self.byte_index();
        self.text.insert(at, c);
        self.cursor += 1;
        KeyResult::Handled
      }
      _ => KeyResult::NotHandled,
    }
  }
}
