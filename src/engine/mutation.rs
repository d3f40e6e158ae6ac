//! Optimistic-then-confirm mutation protocol.
//!
//! Every intent is applied to the local store immediately, the remote
//! call runs in the background, and the completion is reconciled at
//! poll time on the main loop. Failures undo exactly the optimistic
//! step; completions that lost a sequence race apply nothing.

use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::{mpsc, oneshot};

use crate::api::error::ApiResult;
use crate::api::types::{Job, JobId, StatusKind, StatusStamp};
use crate::engine::store::{JobStore, RemovedJob, Snapshot, StatusPatch};
use crate::engine::JobsApi;

/// What the caller wants done to the remote collection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationIntent {
  Create { name: String },
  UpdateStatus { id: JobId, status: StatusKind },
  Delete { id: JobId },
}

/// Terminal state of a mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
  /// The server accepted the mutation
  Confirmed,
  /// The remote call failed and the optimistic change was undone
  RolledBack { message: String },
}

/// Handle resolving to the mutation's terminal state. The outcome is
/// delivered by `MutationCoordinator::poll`, never by the network task
/// itself, so local state is always reconciled first.
#[derive(Debug)]
pub struct MutationHandle {
  seq: u64,
  rx: Option<oneshot::Receiver<MutationOutcome>>,
  outcome: Option<MutationOutcome>,
}

impl MutationHandle {
  /// Sequence number of this mutation intent
  pub fn seq(&self) -> u64 {
    self.seq
  }

  /// Non-blocking check; returns the outcome once resolved and keeps
  /// returning it on later calls.
  pub fn try_outcome(&mut self) -> Option<&MutationOutcome> {
    if self.outcome.is_none() {
      if let Some(rx) = &mut self.rx {
        if let Ok(outcome) = rx.try_recv() {
          self.outcome = Some(outcome);
          self.rx = None;
        }
      }
    }
    self.outcome.as_ref()
  }

  /// Await the outcome. Resolves to RolledBack if the coordinator was
  /// dropped before the completion arrived.
  #[allow(dead_code)]
  pub async fn wait(mut self) -> MutationOutcome {
    if let Some(outcome) = self.outcome {
      return outcome;
    }
    match self.rx.take() {
      Some(rx) => rx.await.unwrap_or(MutationOutcome::RolledBack {
        message: "mutation abandoned".to_string(),
      }),
      None => MutationOutcome::RolledBack {
        message: "mutation abandoned".to_string(),
      },
    }
  }
}

/// Inverse of the optimistic step, captured at apply time
enum Undo {
  /// Create: put the whole collection back (a structural insert cannot
  /// conflict with concurrent single-record mutations elsewhere)
  ReplaceCollection(Snapshot),
  /// UpdateStatus: restore the single previous record
  RestoreRecord { id: JobId, prev: Box<Job> },
  /// Delete: re-insert the record at its original slot
  Reinsert(RemovedJob),
  /// The record was not loaded locally; nothing to roll back
  None,
}

/// Network result ferried back to the poll loop
enum Completion {
  Job(ApiResult<Job>),
  Unit(ApiResult<()>),
}

struct Pending {
  seq: u64,
  /// Record whose last-touched sequence governs staleness; the
  /// placeholder id for creates
  target: JobId,
  undo: Undo,
  done: oneshot::Sender<MutationOutcome>,
}

pub struct MutationCoordinator<C: JobsApi> {
  client: C,
  next_seq: u64,
  pending: Vec<Pending>,
  /// Highest sequence number that touched each record. A completion
  /// below the record's entry lost the race and is discarded.
  last_touched: HashMap<JobId, u64>,
  refetch_due: bool,
  tx: mpsc::UnboundedSender<(u64, Completion)>,
  rx: mpsc::UnboundedReceiver<(u64, Completion)>,
}

impl<C: JobsApi> MutationCoordinator<C> {
  pub fn new(client: C) -> Self {
    let (tx, rx) = mpsc::unbounded_channel();
    Self {
      client,
      next_seq: 1,
      pending: Vec::new(),
      last_touched: HashMap::new(),
      refetch_due: false,
      tx,
      rx,
    }
  }

  pub fn has_pending(&self) -> bool {
    !self.pending.is_empty()
  }

  /// A confirmed mutation marks the collection due for a reconciling
  /// refetch; the owner runs it once the pipeline drains.
  pub fn refetch_due(&self) -> bool {
    self.refetch_due
  }

  pub fn clear_refetch_due(&mut self) {
    self.refetch_due = false;
  }

  /// Apply `intent` optimistically and start the remote call. The
  /// caller must have superseded any in-flight page fetch first.
  pub fn submit(&mut self, intent: MutationIntent, store: &mut JobStore) -> MutationHandle {
    let seq = self.next_seq;
    self.next_seq += 1;
    let (done, done_rx) = oneshot::channel();

    let (target, undo) = match intent {
      MutationIntent::Create { name } => {
        let snapshot = store.snapshot();
        let now = Utc::now();
        let placeholder = store.prepend_optimistic(Job {
          id: 0,
          name: name.clone(),
          created_at: now,
          updated_at: now,
          current_status: StatusStamp {
            status: StatusKind::Pending,
            timestamp: now,
          },
          status_history: None,
        });
        self.spawn_job(seq, self.client.create(name));
        (placeholder, Undo::ReplaceCollection(snapshot))
      }
      MutationIntent::UpdateStatus { id, status } => {
        let patch = StatusPatch {
          status,
          timestamp: Utc::now(),
        };
        let undo = match store.apply_optimistic(id, patch) {
          Ok(prev) => Undo::RestoreRecord {
            id,
            prev: Box::new(prev),
          },
          Err(_) => Undo::None,
        };
        self.spawn_job(seq, self.client.update_status(id, status));
        (id, undo)
      }
      MutationIntent::Delete { id } => {
        let undo = match store.remove_optimistic(id) {
          Ok(removed) => Undo::Reinsert(removed),
          Err(_) => Undo::None,
        };
        self.spawn_unit(seq, self.client.delete(id));
        (id, undo)
      }
    };

    self.last_touched.insert(target, seq);
    self.pending.push(Pending {
      seq,
      target,
      undo,
      done,
    });

    MutationHandle {
      seq,
      rx: Some(done_rx),
      outcome: None,
    }
  }

  fn spawn_job(&self, seq: u64, fut: impl std::future::Future<Output = ApiResult<Job>> + Send + 'static) {
    let tx = self.tx.clone();
    tokio::spawn(async move {
      let _ = tx.send((seq, Completion::Job(fut.await)));
    });
  }

  fn spawn_unit(&self, seq: u64, fut: impl std::future::Future<Output = ApiResult<()>> + Send + 'static) {
    let tx = self.tx.clone();
    tokio::spawn(async move {
      let _ = tx.send((seq, Completion::Unit(fut.await)));
    });
  }

  /// Drain arrived completions and reconcile the store. Returns true
  /// if anything changed.
  pub fn poll(&mut self, store: &mut JobStore) -> bool {
    let mut changed = false;
    while let Ok((seq, completion)) = self.rx.try_recv() {
      let Some(idx) = self.pending.iter().position(|p| p.seq == seq) else {
        continue;
      };
      let pending = self.pending.remove(idx);

      // A later mutation touched the same record; this completion must
      // not overwrite its state, whichever way it went.
      let superseded = self
        .last_touched
        .get(&pending.target)
        .is_some_and(|&latest| latest > seq);

      let outcome = match completion {
        Completion::Job(Ok(job)) => {
          if superseded {
            tracing::debug!(seq, target = pending.target, "stale mutation result discarded");
          } else {
            store.replace(pending.target, job);
          }
          self.refetch_due = true;
          MutationOutcome::Confirmed
        }
        Completion::Unit(Ok(())) => {
          // Delete: the record is already gone locally
          self.refetch_due = true;
          MutationOutcome::Confirmed
        }
        Completion::Job(Err(err)) | Completion::Unit(Err(err)) => {
          if superseded {
            tracing::debug!(seq, target = pending.target, "stale mutation rollback discarded");
          } else {
            Self::rollback(store, pending.undo);
          }
          MutationOutcome::RolledBack {
            message: err.to_string(),
          }
        }
      };

      let _ = pending.done.send(outcome);
      changed = true;
    }

    if self.pending.is_empty() {
      self.last_touched.clear();
    }
    changed
  }

  fn rollback(store: &mut JobStore, undo: Undo) {
    match undo {
      Undo::ReplaceCollection(snapshot) => store.restore(snapshot),
      Undo::RestoreRecord { id, prev } => {
        store.replace(id, *prev);
      }
      Undo::Reinsert(removed) => store.reinsert(removed),
      Undo::None => {}
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::error::ApiError;
  use crate::engine::stub::{job, page, StubApi};
  use std::time::Duration;

  async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
  }

  fn seeded_store(ids: &[JobId]) -> JobStore {
    let mut store = JobStore::new();
    store.append_page(page(ids, None)).unwrap();
    store
  }

  #[tokio::test]
  async fn test_create_is_visible_immediately_then_converges() {
    let api = StubApi::new();
    let gate = api.gate_create();
    let mut store = seeded_store(&[1]);
    let mut coordinator = MutationCoordinator::new(api);

    let mut handle = coordinator.submit(
      MutationIntent::Create {
        name: "X".to_string(),
      },
      &mut store,
    );

    // Optimistic row at the head, PENDING, synthetic id
    let head = store.flatten().next().unwrap();
    assert_eq!(head.name, "X");
    assert_eq!(head.current_status.status, StatusKind::Pending);
    assert!(head.is_synthetic());
    assert_eq!(handle.seq(), 1);
    assert!(handle.try_outcome().is_none());

    gate.send(Ok(job(42, "X", StatusKind::Pending))).unwrap();
    settle().await;
    assert!(coordinator.poll(&mut store));

    // Same visual position, server id, no duplicate "X"
    let head = store.flatten().next().unwrap();
    assert_eq!(head.id, 42);
    assert_eq!(store.flatten().filter(|j| j.name == "X").count(), 1);
    assert_eq!(handle.try_outcome(), Some(&MutationOutcome::Confirmed));
    assert!(coordinator.refetch_due());
  }

  #[tokio::test]
  async fn test_create_failure_rolls_back_exactly() {
    let api = StubApi::new();
    api.push_create(Err(ApiError::Server { status: 500 }));
    let mut store = seeded_store(&[1, 2]);
    let before = store.snapshot();
    let mut coordinator = MutationCoordinator::new(api);

    let handle = coordinator.submit(
      MutationIntent::Create {
        name: "doomed".to_string(),
      },
      &mut store,
    );
    assert_eq!(store.len(), 3);

    settle().await;
    coordinator.poll(&mut store);

    assert_eq!(store.snapshot(), before);
    assert_eq!(
      handle.wait().await,
      MutationOutcome::RolledBack {
        message: "Server error - please try again later".to_string()
      }
    );
  }

  #[tokio::test]
  async fn test_update_failure_restores_previous_record() {
    let api = StubApi::new();
    api.push_update(Err(ApiError::Timeout));
    let mut store = seeded_store(&[1, 2]);
    let before = store.get(1).unwrap().clone();
    let mut coordinator = MutationCoordinator::new(api);

    coordinator.submit(
      MutationIntent::UpdateStatus {
        id: 1,
        status: StatusKind::Running,
      },
      &mut store,
    );
    assert_eq!(store.get(1).unwrap().current_status.status, StatusKind::Running);

    settle().await;
    coordinator.poll(&mut store);

    assert_eq!(store.get(1).unwrap(), &before);
  }

  #[tokio::test]
  async fn test_staleness_later_mutation_wins_either_order() {
    for first_resolves_first in [true, false] {
      let api = StubApi::new();
      let first_gate = api.gate_update();
      let second_gate = api.gate_update();
      let mut store = seeded_store(&[1]);
      let mut coordinator = MutationCoordinator::new(api);

      coordinator.submit(
        MutationIntent::UpdateStatus {
          id: 1,
          status: StatusKind::Running,
        },
        &mut store,
      );
      coordinator.submit(
        MutationIntent::UpdateStatus {
          id: 1,
          status: StatusKind::Failed,
        },
        &mut store,
      );

      let first_reply = Ok(job(1, "job-1", StatusKind::Running));
      let second_reply = Ok(job(1, "job-1", StatusKind::Failed));
      if first_resolves_first {
        first_gate.send(first_reply).unwrap();
        settle().await;
        coordinator.poll(&mut store);
        second_gate.send(second_reply).unwrap();
      } else {
        second_gate.send(second_reply).unwrap();
        settle().await;
        coordinator.poll(&mut store);
        first_gate.send(first_reply).unwrap();
      }
      settle().await;
      coordinator.poll(&mut store);

      assert_eq!(
        store.get(1).unwrap().current_status.status,
        StatusKind::Failed,
        "first_resolves_first={}",
        first_resolves_first
      );
      assert!(!coordinator.has_pending());
    }
  }

  #[tokio::test]
  async fn test_stale_failure_does_not_clobber_later_mutation() {
    let api = StubApi::new();
    let first_gate = api.gate_update();
    let second_gate = api.gate_update();
    let mut store = seeded_store(&[1]);
    let mut coordinator = MutationCoordinator::new(api);

    coordinator.submit(
      MutationIntent::UpdateStatus {
        id: 1,
        status: StatusKind::Running,
      },
      &mut store,
    );
    coordinator.submit(
      MutationIntent::UpdateStatus {
        id: 1,
        status: StatusKind::Failed,
      },
      &mut store,
    );

    second_gate.send(Ok(job(1, "job-1", StatusKind::Failed))).unwrap();
    settle().await;
    coordinator.poll(&mut store);

    // The first mutation fails late; rolling it back would resurrect
    // the pre-RUNNING state over the confirmed FAILED one.
    first_gate.send(Err(ApiError::Network)).unwrap();
    settle().await;
    coordinator.poll(&mut store);

    assert_eq!(store.get(1).unwrap().current_status.status, StatusKind::Failed);
  }

  #[tokio::test]
  async fn test_delete_rollback_reinserts_among_siblings() {
    let api = StubApi::new();
    api.push_delete(Err(ApiError::Server { status: 502 }));
    let mut store = seeded_store(&[5, 6, 7, 8, 9]);
    let mut coordinator = MutationCoordinator::new(api);

    coordinator.submit(MutationIntent::Delete { id: 7 }, &mut store);
    let ids: Vec<JobId> = store.flatten().map(|j| j.id).collect();
    assert_eq!(ids, vec![5, 6, 8, 9]);

    settle().await;
    coordinator.poll(&mut store);

    let ids: Vec<JobId> = store.flatten().map(|j| j.id).collect();
    assert_eq!(ids, vec![5, 6, 7, 8, 9]);
  }

  #[tokio::test]
  async fn test_delete_success_leaves_record_removed() {
    let api = StubApi::new();
    api.push_delete(Ok(()));
    let mut store = seeded_store(&[1, 2]);
    let mut coordinator = MutationCoordinator::new(api);

    let handle = coordinator.submit(MutationIntent::Delete { id: 2 }, &mut store);
    settle().await;
    coordinator.poll(&mut store);

    assert!(store.get(2).is_none());
    assert_eq!(handle.wait().await, MutationOutcome::Confirmed);
    assert!(coordinator.refetch_due());
  }

  #[tokio::test]
  async fn test_update_on_unloaded_record_has_nothing_to_roll_back() {
    let api = StubApi::new();
    api.push_update(Err(ApiError::client(404)));
    let mut store = seeded_store(&[1]);
    let before = store.snapshot();
    let mut coordinator = MutationCoordinator::new(api);

    // Record 99 is not in the loaded collection
    let handle = coordinator.submit(
      MutationIntent::UpdateStatus {
        id: 99,
        status: StatusKind::Completed,
      },
      &mut store,
    );
    assert_eq!(store.snapshot(), before);

    settle().await;
    coordinator.poll(&mut store);

    assert_eq!(store.snapshot(), before);
    assert_eq!(
      handle.wait().await,
      MutationOutcome::RolledBack {
        message: "Resource not found".to_string()
      }
    );
  }
}
