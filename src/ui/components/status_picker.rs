use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState};

use super::KeyResult;
use crate::api::types::{JobId, StatusKind};
use crate::ui::renderfns::status_color;

/// Events emitted by the status picker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusPickerEvent {
  /// New status chosen for the job
  Selected(JobId, StatusKind),
  /// Picker dismissed
  Cancelled,
}

/// Overlay for choosing a job's next status
#[derive(Debug, Clone, Default)]
pub struct StatusPicker {
  target: Option<JobId>,
  selected: usize,
  title: String,
}

impl StatusPicker {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_active(&self) -> bool {
    self.target.is_some()
  }

  /// Show the picker for a job, pre-selecting its current status
  pub fn show(&mut self, id: JobId, name: &str, current: StatusKind) {
    self.target = Some(id);
    self.selected = StatusKind::ALL
      .iter()
      .position(|&s| s == current)
      .unwrap_or(0);
    self.title = format!("Status: {}", name);
  }

  pub fn hide(&mut self) {
    self.target = None;
    self.selected = 0;
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<StatusPickerEvent> {
    let Some(id) = self.target else {
      return KeyResult::NotHandled;
    };

    match key.code {
      KeyCode::Esc | KeyCode::Char('q') => {
        self.hide();
        KeyResult::Event(StatusPickerEvent::Cancelled)
      }
      KeyCode::Enter => {
        let status = StatusKind::ALL[self.selected];
        self.hide();
        KeyResult::Event(StatusPickerEvent::Selected(id, status))
      }
      KeyCode::Char('j') | KeyCode::Down => {
        self.selected = (self.selected + 1) % StatusKind::ALL.len();
        KeyResult::Handled
      }
      KeyCode::Char('k') | KeyCode::Up => {
        self.selected = if self.selected == 0 {
          StatusKind::ALL.len() - 1
        } else {
          self.selected - 1
        };
        KeyResult::Handled
      }
      _ => KeyResult::Handled,
    }
  }

  /// Render the picker overlay if active
  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    if self.target.is_none() {
      return;
    }

    let width = (self.title.len() as u16 + 6).clamp(24, area.width.saturating_sub(4));
    let height = (StatusKind::ALL.len() as u16 + 2).min(area.height.saturating_sub(4));

    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    let overlay_area = Rect::new(x, y, width, height);

    frame.render_widget(Clear, overlay_area);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow))
      .title(format!(" {} ", self.title));

    let inner = block.inner(overlay_area);
    frame.render_widget(block, overlay_area);

    if inner.height == 0 {
      return;
    }

    let items: Vec<ListItem> = StatusKind::ALL
      .iter()
      .map(|&status| {
        ListItem::new(Line::from(Span::styled(
          status.as_str(),
          Style::default().fg(status_color(status)),
        )))
      })
      .collect();

    let list =
      List::new(items).highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD));

    let mut state = ListState::default();
    state.select(Some(self.selected));

    frame.render_stateful_widget(list, inner, &mut state);
  }
}
