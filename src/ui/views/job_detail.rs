use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};
use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;

use crate::api::error::ApiResult;
use crate::api::types::{Job, JobId};
use crate::api::JobsClient;
use crate::ui::renderfns::{format_timestamp, status_color, truncate};
use crate::ui::view::{Shortcut, View, ViewAction};

/// Detail view for one job, with its lazily fetched status history
pub struct JobDetailView {
  id: JobId,
  name: String,
  client: JobsClient,
  job: Option<Job>,
  error: Option<String>,
  loading: bool,
  rx: Option<oneshot::Receiver<ApiResult<Job>>>,
}

impl JobDetailView {
  pub fn new(id: JobId, name: String, client: JobsClient) -> Self {
    let mut view = Self {
      id,
      name,
      client,
      job: None,
      error: None,
      loading: false,
      rx: None,
    };
    view.fetch();
    view
  }

  fn fetch(&mut self) {
    let (tx, rx) = oneshot::channel();
    let client = self.client.clone();
    let id = self.id;
    tokio::spawn(async move {
      let _ = tx.send(client.get(id).await);
    });
    self.rx = Some(rx);
    self.loading = true;
    self.error = None;
  }

  fn render_detail(&self, frame: &mut Frame, area: Rect) {
    let title = if self.loading {
      format!(" Job #{} (loading...) ", self.id)
    } else {
      format!(" Job #{} ", self.id)
    };

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    if let Some(error) = &self.error {
      let paragraph = Paragraph::new(format!("Error: {}\n\nPress 'r' to retry.", error))
        .style(Style::default().fg(Color::Red));
      frame.render_widget(paragraph, inner);
      return;
    }

    let Some(job) = &self.job else {
      let paragraph =
        Paragraph::new("Loading job details...").style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, inner);
      return;
    };

    let label = Style::default().fg(Color::DarkGray);
    let status = job.current_status.status;

    let mut lines = vec![
      Line::from(vec![Span::styled("Name:    ", label), Span::raw(job.name.clone())]),
      Line::from(vec![
        Span::styled("Status:  ", label),
        Span::styled(status.as_str(), Style::default().fg(status_color(status))),
        Span::raw("  since "),
        Span::raw(format_timestamp(job.current_status.timestamp)),
      ]),
      Line::from(vec![
        Span::styled("Created: ", label),
        Span::raw(format_timestamp(job.created_at)),
      ]),
      Line::from(vec![
        Span::styled("Updated: ", label),
        Span::raw(format_timestamp(job.updated_at)),
      ]),
      Line::default(),
      Line::from(Span::styled(
        "Status History",
        Style::default().add_modifier(Modifier::BOLD),
      )),
    ];

    match &job.status_history {
      Some(history) if !history.is_empty() => {
        // Oldest first, the order the server reports
        for entry in history {
          lines.push(Line::from(vec![
            Span::raw("  "),
            Span::styled(
              format!("{:<10}", entry.status.as_str()),
              Style::default().fg(status_color(entry.status)),
            ),
            Span::styled(format_timestamp(entry.timestamp), label),
          ]));
        }
      }
      _ => lines.push(Line::from(Span::styled("  (no history)", label))),
    }

    frame.render_widget(Paragraph::new(lines), inner);
  }
}

impl View for JobDetailView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('r') => {
        self.fetch();
        ViewAction::None
      }
      KeyCode::Char('q') | KeyCode::Esc => ViewAction::Pop,
      _ => ViewAction::None,
    }
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_detail(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    truncate(&self.name, 24)
  }

  fn tick(&mut self) {
    let Some(rx) = &mut self.rx else {
      return;
    };
    match rx.try_recv() {
      Ok(result) => {
        self.rx = None;
        self.loading = false;
        match result {
          Ok(job) => self.job = Some(job),
          Err(err) => self.error = Some(err.to_string()),
        }
      }
      Err(TryRecvError::Empty) => {}
      Err(TryRecvError::Closed) => {
        self.rx = None;
        self.loading = false;
        self.error = Some("Request was dropped".to_string());
      }
    }
  }

  fn shortcuts(&self) -> Vec<Shortcut> {
    vec![Shortcut::new("r", "refresh"), Shortcut::new("q", "back")]
  }
}
