//! Serde-deserializable types matching the jobs API responses.
//!
//! These types are separate from domain types to allow clean
//! deserialization while keeping domain types focused on application
//! needs.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::types::{Job, JobId, JobPage, StatusKind, StatusStamp};

#[derive(Debug, Deserialize)]
pub struct ApiCurrentStatus {
  #[serde(default)]
  pub status_type: String,
  pub timestamp: DateTime<Utc>,
}

/// One entry of a job's status history
#[derive(Debug, Deserialize)]
pub struct ApiJobStatus {
  #[allow(dead_code)]
  pub id: i64,
  #[serde(default)]
  pub status_type: String,
  pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct ApiJob {
  pub id: JobId,
  #[serde(default)]
  pub name: String,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
  pub current_status: Option<ApiCurrentStatus>,
  pub statuses: Option<Vec<ApiJobStatus>>,
}

impl ApiJob {
  pub fn into_job(self) -> Job {
    // Jobs are created with an initial PENDING status server-side; a
    // missing current_status only happens for legacy rows.
    let current_status = match self.current_status {
      Some(cs) => StatusStamp {
        status: StatusKind::parse(&cs.status_type).unwrap_or(StatusKind::Pending),
        timestamp: cs.timestamp,
      },
      None => StatusStamp {
        status: StatusKind::Pending,
        timestamp: self.created_at,
      },
    };

    let status_history = self.statuses.map(|entries| {
      entries
        .into_iter()
        .map(|s| StatusStamp {
          status: StatusKind::parse(&s.status_type).unwrap_or(StatusKind::Pending),
          timestamp: s.timestamp,
        })
        .collect()
    });

    Job {
      id: self.id,
      name: self.name,
      created_at: self.created_at,
      updated_at: self.updated_at,
      current_status,
      status_history,
    }
  }
}

/// Cursor-paginated list response: `next`/`previous` are full URLs
#[derive(Debug, Deserialize)]
pub struct ApiJobPage {
  pub next: Option<String>,
  #[allow(dead_code)]
  pub previous: Option<String>,
  #[serde(default)]
  pub results: Vec<ApiJob>,
}

impl ApiJobPage {
  pub fn into_page(self) -> JobPage {
    JobPage {
      jobs: self.results.into_iter().map(ApiJob::into_job).collect(),
      next_cursor: self.next,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_job_deserialization() {
    let raw = r#"{
      "id": 7,
      "name": "fluid-sim",
      "created_at": "2026-01-10T08:30:00Z",
      "updated_at": "2026-01-10T09:00:00Z",
      "current_status": { "status_type": "RUNNING", "timestamp": "2026-01-10T09:00:00Z" },
      "statuses": [
        { "id": 1, "status_type": "PENDING", "timestamp": "2026-01-10T08:30:00Z" },
        { "id": 2, "status_type": "RUNNING", "timestamp": "2026-01-10T09:00:00Z" }
      ]
    }"#;

    let job = serde_json::from_str::<ApiJob>(raw).unwrap().into_job();
    assert_eq!(job.id, 7);
    assert_eq!(job.name, "fluid-sim");
    assert_eq!(job.current_status.status, StatusKind::Running);
    let history = job.status_history.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].status, StatusKind::Pending);
  }

  #[test]
  fn test_missing_current_status_defaults_to_pending() {
    let raw = r#"{
      "id": 3,
      "name": "orphan",
      "created_at": "2026-01-10T08:30:00Z",
      "updated_at": "2026-01-10T08:30:00Z",
      "current_status": null,
      "statuses": null
    }"#;

    let job = serde_json::from_str::<ApiJob>(raw).unwrap().into_job();
    assert_eq!(job.current_status.status, StatusKind::Pending);
    assert_eq!(job.current_status.timestamp, job.created_at);
    assert!(job.status_history.is_none());
  }

  #[test]
  fn test_page_deserialization() {
    let raw = r#"{
      "next": "http://localhost:8000/api/jobs/?cursor=abc",
      "previous": null,
      "results": []
    }"#;

    let page = serde_json::from_str::<ApiJobPage>(raw).unwrap().into_page();
    assert!(page.jobs.is_empty());
    assert_eq!(
      page.next_cursor.as_deref(),
      Some("http://localhost:8000/api/jobs/?cursor=abc")
    );
  }
}
