use crossterm::event::KeyEvent;
use ratatui::prelude::*;

/// A keyboard shortcut hint for display in the header
#[derive(Debug, Clone, Copy)]
pub struct Shortcut {
  pub key: &'static str,
  pub label: &'static str,
}

impl Shortcut {
  pub const fn new(key: &'static str, label: &'static str) -> Self {
    Self { key, label }
  }
}

/// Actions that a view can request in response to user input
pub enum ViewAction {
  /// No action needed
  None,
  /// Push a new view onto the stack
  Push(Box<dyn View>),
  /// Pop current view from stack (go back)
  Pop,
}

/// Trait for view behavior
///
/// Views handle their own input modes (overlays, prompts) and return
/// actions for the App to execute: App → View → Components.
///
/// Views that load data asynchronously poll their channels in tick().
pub trait View {
  /// Handle a key event, returning an action for App to execute
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction;

  /// Render the view to the frame
  fn render(&mut self, frame: &mut Frame, area: Rect);

  /// Get the breadcrumb label for this view
  fn breadcrumb_label(&self) -> String;

  /// Called on each tick to let views apply async completions
  fn tick(&mut self) {}

  /// Transient message for the footer (mutation outcomes)
  fn flash(&self) -> Option<&str> {
    None
  }

  /// Keyboard shortcuts to display in the header
  fn shortcuts(&self) -> Vec<Shortcut> {
    vec![Shortcut::new("q", "back")]
  }
}
