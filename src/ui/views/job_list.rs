use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState};
use tokio::sync::mpsc;

use crate::api::types::Job;
use crate::api::JobsClient;
use crate::config::Config;
use crate::engine::{MutationHandle, MutationIntent, MutationOutcome, SyncEngine, Viewport};
use crate::ui::components::{
  ConfirmDialog, ConfirmEvent, KeyResult, NamePrompt, PromptEvent, StatusPicker, StatusPickerEvent,
};
use crate::ui::renderfns::{format_timestamp, status_color, truncate};
use crate::ui::view::{Shortcut, View, ViewAction};
use crate::ui::views::JobDetailView;

/// Outcome messages for one kind of mutation
struct OutcomeLabels {
  ok: &'static str,
  failed: &'static str,
}

const CREATE_LABELS: OutcomeLabels = OutcomeLabels {
  ok: "Job created",
  failed: "Failed to create job",
};
const UPDATE_LABELS: OutcomeLabels = OutcomeLabels {
  ok: "Job status updated",
  failed: "Failed to update status",
};
const DELETE_LABELS: OutcomeLabels = OutcomeLabels {
  ok: "Job deleted",
  failed: "Failed to delete job",
};

/// Root view: the virtualized job table over the sync engine
pub struct JobListView {
  engine: SyncEngine<JobsClient>,
  client: JobsClient,
  /// Store change notifications; selection is re-validated on arrival
  changes: mpsc::UnboundedReceiver<()>,
  selected: usize,
  /// Scroll offset in rows
  scroll: u32,
  /// Row area height from the last render
  rows_height: u32,
  prompt: NamePrompt,
  picker: StatusPicker,
  confirm: ConfirmDialog,
  pending: Vec<(MutationHandle, &'static OutcomeLabels)>,
  flash: Option<String>,
}

impl JobListView {
  pub fn new(client: JobsClient, config: &Config) -> Self {
    let mut engine = SyncEngine::new(client.clone(), config.list.windower_options());
    let changes = engine.subscribe();
    engine.start();

    Self {
      engine,
      client,
      changes,
      selected: 0,
      scroll: 0,
      rows_height: 0,
      prompt: NamePrompt::new(),
      picker: StatusPicker::new(),
      confirm: ConfirmDialog::new(),
      pending: Vec::new(),
      flash: None,
    }
  }

  fn submit(&mut self, intent: MutationIntent, labels: &'static OutcomeLabels) {
    let handle = self.engine.submit(intent);
    tracing::debug!(seq = handle.seq(), "mutation submitted");
    self.pending.push((handle, labels));
  }

  fn selected_job(&self) -> Option<&Job> {
    self.engine.job_at(self.selected)
  }

  fn move_selection(&mut self, delta: i64) {
    let len = self.engine.job_count();
    if len == 0 {
      self.selected = 0;
      return;
    }
    self.selected = (self.selected as i64 + delta).clamp(0, len as i64 - 1) as usize;
    self.ensure_selected_visible();
  }

  fn ensure_selected_visible(&mut self) {
    let height = self.rows_height.max(1);
    let selected = self.selected as u32;
    if selected < self.scroll {
      self.scroll = selected;
    } else if selected >= self.scroll + height {
      self.scroll = selected + 1 - height;
    }
  }

  fn handle_overlays(&mut self, key: KeyEvent) -> Option<ViewAction> {
    match self.prompt.handle_key(key) {
      KeyResult::Event(PromptEvent::Submitted(name)) => {
        self.submit(MutationIntent::Create { name }, &CREATE_LABELS);
        return Some(ViewAction::None);
      }
      KeyResult::Event(PromptEvent::Cancelled) | KeyResult::Handled => {
        return Some(ViewAction::None);
      }
      KeyResult::NotHandled => {}
    }

    match self.picker.handle_key(key) {
      KeyResult::Event(StatusPickerEvent::Selected(id, status)) => {
        self.submit(MutationIntent::UpdateStatus { id, status }, &UPDATE_LABELS);
        return Some(ViewAction::None);
      }
      KeyResult::Event(StatusPickerEvent::Cancelled) | KeyResult::Handled => {
        return Some(ViewAction::None);
      }
      KeyResult::NotHandled => {}
    }

    match self.confirm.handle_key(key) {
      KeyResult::Event(ConfirmEvent::Confirmed(id)) => {
        self.submit(MutationIntent::Delete { id }, &DELETE_LABELS);
        return Some(ViewAction::None);
      }
      KeyResult::Event(ConfirmEvent::Cancelled) | KeyResult::Handled => {
        return Some(ViewAction::None);
      }
      KeyResult::NotHandled => {}
    }

    None
  }

  fn header_line(name_width: usize) -> Line<'static> {
    let text = format!(
      " {:<6} {:<9} {:<width$} {:<16} {:<16}",
      "ID",
      "STATUS",
      "NAME",
      "CREATED",
      "UPDATED",
      width = name_width
    );
    Line::from(Span::styled(
      text,
      Style::default().fg(Color::DarkGray).add_modifier(Modifier::BOLD),
    ))
  }

  fn row_line(&self, job: &Job, selected: bool, name_width: usize) -> Line<'static> {
    // Unconfirmed rows have no server id to show yet
    let id_cell = if job.is_synthetic() {
      Span::styled(" #---- ", Style::default().fg(Color::DarkGray))
    } else {
      Span::styled(format!(" #{:<5}", job.id), Style::default().fg(Color::Cyan))
    };

    let status = job.current_status.status;
    let mut spans = vec![
      id_cell,
      Span::styled(
        format!("{:<9} ", status.as_str()),
        Style::default().fg(status_color(status)),
      ),
      Span::raw(format!(
        "{:<width$} ",
        truncate(&job.name, name_width),
        width = name_width
      )),
      Span::styled(
        format!("{:<16} ", format_timestamp(job.created_at)),
        Style::default().fg(Color::DarkGray),
      ),
      Span::styled(
        format_timestamp(job.updated_at),
        Style::default().fg(Color::DarkGray),
      ),
    ];

    if selected {
      spans.insert(0, Span::styled("> ", Style::default().fg(Color::White)));
    } else {
      spans.insert(0, Span::raw("  "));
    }

    let line = Line::from(spans);
    if selected {
      line.style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
    } else {
      line
    }
  }

  fn render_table(&mut self, frame: &mut Frame, area: Rect) {
    let count = self.engine.job_count();

    let title = if self.engine.is_empty() && self.engine.is_fetching() {
      " Jobs (loading...) ".to_string()
    } else if let Some(err) = self.engine.load_error() {
      format!(" Jobs ({}) (error: {}) ", count, err)
    } else if self.engine.has_pending_mutations() {
      format!(" Jobs ({}) (saving...) ", count)
    } else if self.engine.is_fetching() {
      format!(" Jobs ({}) (loading...) ", count)
    } else {
      format!(" Jobs ({}) ", count)
    };

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    if inner.height < 2 || inner.width == 0 {
      return;
    }

    let header_area = Rect::new(inner.x, inner.y, inner.width, 1);
    let rows_area = Rect::new(inner.x, inner.y + 1, inner.width, inner.height - 1);
    self.rows_height = rows_area.height as u32;

    if count == 0 {
      let content = if self.engine.is_fetching() {
        "Loading jobs..."
      } else if self.engine.load_error().is_some() {
        "Failed to load jobs. Press 'r' to retry."
      } else {
        "No jobs found. Press 'n' to create one."
      };
      let paragraph = Paragraph::new(content).style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, rows_area);
      return;
    }

    // Keep scroll and selection inside the list
    let max_scroll = (count as u32).saturating_sub(self.rows_height);
    self.scroll = self.scroll.min(max_scroll);
    self.ensure_selected_visible();

    // Fixed columns: marker 2, id 7, status 10, timestamps 17 each
    let name_width = (inner.width as usize).saturating_sub(2 + 7 + 10 + 17 + 17).max(8);

    frame.render_widget(Paragraph::new(Self::header_line(name_width)), header_area);

    let window = self.engine.visible_rows(Viewport {
      offset: self.scroll,
      height: self.rows_height,
    });

    let mut lines: Vec<Line> = vec![Line::default(); self.rows_height as usize];
    for row in &window.rows {
      let y = row.slot.offset as i64 - self.scroll as i64;
      if (0..self.rows_height as i64).contains(&y) {
        lines[y as usize] = self.row_line(&row.job, row.slot.index == self.selected, name_width);
      }
    }
    frame.render_widget(Paragraph::new(lines), rows_area);

    if window.total_size > self.rows_height {
      let mut scrollbar_state =
        ScrollbarState::new(window.total_size as usize).position(self.scroll as usize);
      frame.render_stateful_widget(
        Scrollbar::new(ScrollbarOrientation::VerticalRight),
        area,
        &mut scrollbar_state,
      );
    }
  }
}

impl View for JobListView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    self.flash = None;

    if let Some(action) = self.handle_overlays(key) {
      return action;
    }

    // Unconfirmed rows have no server id yet; detail/status/delete
    // only make sense once the create is confirmed
    let selected = self
      .selected_job()
      .filter(|job| !job.is_synthetic())
      .map(|job| (job.id, job.name.clone(), job.current_status.status));

    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.move_selection(1),
      KeyCode::Char('k') | KeyCode::Up => self.move_selection(-1),
      KeyCode::Char('g') => {
        self.selected = 0;
        self.scroll = 0;
      }
      KeyCode::Char('G') => {
        let len = self.engine.job_count();
        self.selected = len.saturating_sub(1);
        self.ensure_selected_visible();
      }
      KeyCode::Enter => {
        if let Some((id, name, _)) = selected {
          return ViewAction::Push(Box::new(JobDetailView::new(id, name, self.client.clone())));
        }
      }
      KeyCode::Char('s') => {
        if let Some((id, name, status)) = selected {
          self.picker.show(id, &name, status);
        }
      }
      KeyCode::Char('d') => {
        if let Some((id, name, _)) = selected {
          self.confirm.show(id, &name);
        }
      }
      KeyCode::Char('n') => self.prompt.show(),
      KeyCode::Char('r') => self.engine.refetch(),
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_table(frame, area);
    self.prompt.render_overlay(frame, area);
    self.picker.render_overlay(frame, area);
    self.confirm.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    "Jobs".to_string()
  }

  fn tick(&mut self) {
    self.engine.poll();

    // Re-validate the selection whenever the store changed shape
    let mut changed = false;
    while self.changes.try_recv().is_ok() {
      changed = true;
    }
    if changed {
      let len = self.engine.job_count();
      if self.selected >= len {
        self.selected = len.saturating_sub(1);
      }
    }

    let mut message = None;
    self.pending.retain_mut(|(handle, labels)| match handle.try_outcome() {
      Some(MutationOutcome::Confirmed) => {
        message = Some(labels.ok.to_string());
        false
      }
      Some(MutationOutcome::RolledBack { message: reason }) => {
        message = Some(format!("{}: {}", labels.failed, reason));
        false
      }
      None => true,
    });
    if message.is_some() {
      self.flash = message;
    }
  }

  fn flash(&self) -> Option<&str> {
    self.flash.as_deref()
  }

  fn shortcuts(&self) -> Vec<Shortcut> {
    vec![
      Shortcut::new("n", "new"),
      Shortcut::new("s", "status"),
      Shortcut::new("d", "delete"),
      Shortcut::new("Enter", "details"),
      Shortcut::new("r", "refresh"),
      Shortcut::new("q", "quit"),
    ]
  }
}
