use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Server-assigned job ids are positive. Negative ids are synthetic,
/// reserved for optimistic rows that the server has not confirmed yet.
pub type JobId = i64;

/// Lifecycle status of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusKind {
  Pending,
  Running,
  Completed,
  Failed,
}

impl StatusKind {
  /// All statuses, in pipeline order (used by the status picker)
  pub const ALL: [StatusKind; 4] = [
    StatusKind::Pending,
    StatusKind::Running,
    StatusKind::Completed,
    StatusKind::Failed,
  ];

  /// Wire representation (`status_type` in the API)
  pub fn as_str(&self) -> &'static str {
    match self {
      StatusKind::Pending => "PENDING",
      StatusKind::Running => "RUNNING",
      StatusKind::Completed => "COMPLETED",
      StatusKind::Failed => "FAILED",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    match s {
      "PENDING" => Some(StatusKind::Pending),
      "RUNNING" => Some(StatusKind::Running),
      "COMPLETED" => Some(StatusKind::Completed),
      "FAILED" => Some(StatusKind::Failed),
      _ => None,
    }
  }
}

impl fmt::Display for StatusKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// A status value together with the instant it was recorded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusStamp {
  pub status: StatusKind,
  pub timestamp: DateTime<Utc>,
}

/// One job record
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
  pub id: JobId,
  pub name: String,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
  pub current_status: StatusStamp,
  /// Full transition history, oldest first. Only populated by the
  /// detail fetch; list pages leave it as None.
  pub status_history: Option<Vec<StatusStamp>>,
}

impl Job {
  /// True for optimistic rows that have not been confirmed by the server
  pub fn is_synthetic(&self) -> bool {
    self.id < 0
  }
}

/// A cursor-delimited slice of the server's job list
#[derive(Debug, Clone, PartialEq)]
pub struct JobPage {
  pub jobs: Vec<Job>,
  /// Opaque continuation cursor; None means this is the last page
  pub next_cursor: Option<String>,
}
