//! In-memory paginated cache of job records.
//!
//! The store owns the canonical client-side view of the job list: an
//! ordered sequence of fetched pages plus any unconfirmed optimistic
//! rows. It is not thread-safe by contract; all access happens on the
//! main loop between suspension points, serialized by the coordinator.

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::api::types::{Job, JobId, JobPage, StatusKind, StatusStamp};

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
  /// A fetched page contained an id the collection already holds.
  /// Signals a cursor/ordering bug upstream; the page is discarded.
  #[error("duplicate job id {0} in fetched page")]
  DuplicateRecord(JobId),

  /// The target record is not in the loaded collection
  #[error("job {0} is not loaded")]
  RecordNotFound(JobId),
}

/// Immutable copy of the whole collection, captured before an
/// optimistic mutation and restored verbatim if it fails.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
  pages: Vec<JobPage>,
}

/// Status fields applied by an optimistic update
#[derive(Debug, Clone, Copy)]
pub struct StatusPatch {
  pub status: StatusKind,
  pub timestamp: DateTime<Utc>,
}

/// A record removed optimistically, with enough position information
/// to re-insert it exactly where it was.
#[derive(Debug, Clone)]
pub struct RemovedJob {
  pub page: usize,
  pub index: usize,
  pub job: Job,
}

pub struct JobStore {
  pages: Vec<JobPage>,
  /// Next synthetic id for unconfirmed optimistic inserts; always
  /// negative so it can never collide with a server id.
  next_synthetic: JobId,
  subscribers: Vec<mpsc::UnboundedSender<()>>,
}

impl JobStore {
  pub fn new() -> Self {
    Self {
      pages: Vec::new(),
      next_synthetic: -1,
      subscribers: Vec::new(),
    }
  }

  /// Total record count across all pages
  pub fn len(&self) -> usize {
    self.pages.iter().map(|p| p.jobs.len()).sum()
  }

  pub fn is_empty(&self) -> bool {
    self.pages.iter().all(|p| p.jobs.is_empty())
  }

  /// Lazy, restartable sequence of records in page order. This is the
  /// read surface for rendering and for the windower.
  pub fn flatten(&self) -> impl Iterator<Item = &Job> + '_ {
    self.pages.iter().flat_map(|p| p.jobs.iter())
  }

  pub fn get(&self, id: JobId) -> Option<&Job> {
    self.flatten().find(|j| j.id == id)
  }

  /// Continuation cursor of the last fetched page; None once the
  /// server reported the end of the list (or nothing is loaded yet).
  pub fn next_cursor(&self) -> Option<&str> {
    self.pages.last().and_then(|p| p.next_cursor.as_deref())
  }

  /// Register for change notifications. One message is sent after
  /// every successful structural mutation; consumers re-derive their
  /// view from `flatten()`.
  pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<()> {
    let (tx, rx) = mpsc::unbounded_channel();
    self.subscribers.push(tx);
    rx
  }

  fn touched(&mut self) {
    self.subscribers.retain(|tx| tx.send(()).is_ok());
  }

  /// Append a fetched page to the tail of the collection. The page is
  /// discarded and the collection left unchanged if any incoming id is
  /// already present.
  pub fn append_page(&mut self, page: JobPage) -> StoreResult<()> {
    let mut seen: HashSet<JobId> = self.flatten().map(|j| j.id).collect();
    for job in &page.jobs {
      if !seen.insert(job.id) {
        return Err(StoreError::DuplicateRecord(job.id));
      }
    }
    self.pages.push(page);
    self.touched();
    Ok(())
  }

  /// Replace the whole collection with a freshly fetched first page
  /// (invalidate-then-refetch).
  pub fn reset(&mut self, page: JobPage) {
    self.pages = vec![page];
    self.touched();
  }

  /// Insert an optimistic record at the head of the first page,
  /// assigning a synthetic negative id when none is supplied (id 0).
  /// Returns the id to reconcile or roll back with.
  pub fn prepend_optimistic(&mut self, mut job: Job) -> JobId {
    if job.id == 0 {
      job.id = self.next_synthetic;
      self.next_synthetic -= 1;
    }
    let id = job.id;
    if self.pages.is_empty() {
      self.pages.push(JobPage {
        jobs: Vec::new(),
        next_cursor: None,
      });
    }
    self.pages[0].jobs.insert(0, job);
    self.touched();
    id
  }

  /// Apply a status patch in place, returning the previous record for
  /// rollback capture. `RecordNotFound` means the row is not loaded
  /// and there is nothing to roll back.
  pub fn apply_optimistic(&mut self, id: JobId, patch: StatusPatch) -> StoreResult<Job> {
    let job = self
      .pages
      .iter_mut()
      .flat_map(|p| p.jobs.iter_mut())
      .find(|j| j.id == id)
      .ok_or(StoreError::RecordNotFound(id))?;

    let prev = job.clone();
    let stamp = StatusStamp {
      status: patch.status,
      timestamp: patch.timestamp,
    };
    job.current_status = stamp.clone();
    job.updated_at = patch.timestamp;
    if let Some(history) = &mut job.status_history {
      history.push(stamp);
    }
    self.touched();
    Ok(prev)
  }

  /// Remove a record from whichever page holds it, returning its exact
  /// slot for re-insertion on rollback.
  pub fn remove_optimistic(&mut self, id: JobId) -> StoreResult<RemovedJob> {
    for (page, entry) in self.pages.iter_mut().enumerate() {
      if let Some(index) = entry.jobs.iter().position(|j| j.id == id) {
        let job = entry.jobs.remove(index);
        self.touched();
        return Ok(RemovedJob { page, index, job });
      }
    }
    Err(StoreError::RecordNotFound(id))
  }

  /// Undo a `remove_optimistic`, restoring the record at its original
  /// position among its original siblings.
  pub fn reinsert(&mut self, removed: RemovedJob) {
    if self.pages.is_empty() {
      self.pages.push(JobPage {
        jobs: Vec::new(),
        next_cursor: None,
      });
    }
    let page = removed.page.min(self.pages.len() - 1);
    let jobs = &mut self.pages[page].jobs;
    let index = removed.index.min(jobs.len());
    jobs.insert(index, removed.job);
    self.touched();
  }

  /// Replace the record matching `id` with an authoritative one,
  /// keeping its position (confirm-merge). If the server record's id
  /// is already present elsewhere the placeholder is dropped instead,
  /// preserving the no-duplicate-ids invariant. Returns false when
  /// `id` is no longer in the collection.
  pub fn replace(&mut self, id: JobId, job: Job) -> bool {
    if job.id != id && self.get(job.id).is_some() {
      let removed = self.remove_optimistic(id).is_ok();
      return removed;
    }
    for page in &mut self.pages {
      if let Some(slot) = page.jobs.iter_mut().find(|j| j.id == id) {
        *slot = job;
        self.touched();
        return true;
      }
    }
    false
  }

  /// Immutable copy of the whole collection
  pub fn snapshot(&self) -> Snapshot {
    Snapshot {
      pages: self.pages.clone(),
    }
  }

  /// Atomically replace the collection with a snapshot's contents
  pub fn restore(&mut self, snapshot: Snapshot) {
    self.pages = snapshot.pages;
    self.touched();
  }
}

impl Default for JobStore {
  fn default() -> Self {
    Self::new()
  }
}
