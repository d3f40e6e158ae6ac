pub mod components;
pub mod renderfns;
pub mod view;
pub mod views;

use crate::app::App;
use ratatui::prelude::*;

/// Main draw function: header bar, active view, footer bar
pub fn draw(frame: &mut Frame, app: &mut App) {
  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // Header
      Constraint::Min(1),    // Main content
      Constraint::Length(1), // Footer
    ])
    .split(frame.area());

  let title = app.title().to_string();
  let shortcuts = app.shortcuts();
  let breadcrumb = app.breadcrumb();
  let flash = app.flash().map(String::from);

  renderfns::draw_header(frame, chunks[0], &title, &shortcuts);

  if let Some(view) = app.current_view_mut() {
    view.render(frame, chunks[1]);
  }

  renderfns::draw_footer(frame, chunks[2], &breadcrumb, flash.as_deref());
}
