//! Client-side synchronization engine for the remote job list.
//!
//! Owns the paginated in-memory cache (`JobStore`), the optimistic
//! mutation protocol (`MutationCoordinator`), and the viewport-driven
//! incremental loading controller (`ViewportWindower`), composed
//! behind the `SyncEngine` facade the UI talks to.
//!
//! Everything runs on one logical thread: remote calls are spawned on
//! the runtime, but their results are only applied inside `poll()` on
//! the main loop, so the store is never mutated concurrently. In-flight
//! work that loses a sequence race completes normally and is discarded
//! at apply time; nothing is ever aborted mid-request.

pub mod mutation;
pub mod store;
pub mod window;

#[cfg(test)]
pub(crate) mod stub;

use std::future::Future;
use tokio::sync::mpsc;

use crate::api::error::ApiResult;
use crate::api::types::{Job, JobId, JobPage, StatusKind};

pub use mutation::{MutationHandle, MutationIntent, MutationOutcome};
pub use window::{Viewport, VirtualRow, WindowerOptions};

use mutation::MutationCoordinator;
use store::JobStore;
use window::ViewportWindower;

/// The remote operations the engine needs from the jobs service.
/// Returned futures own their state (no borrow of the client), so the
/// engine can run them to completion in background tasks.
pub trait JobsApi: Clone + Send + 'static {
  fn list(&self, cursor: Option<String>) -> impl Future<Output = ApiResult<JobPage>> + Send + 'static;
  fn create(&self, name: String) -> impl Future<Output = ApiResult<Job>> + Send + 'static;
  fn update_status(&self, id: JobId, status: StatusKind) -> impl Future<Output = ApiResult<Job>> + Send + 'static;
  fn delete(&self, id: JobId) -> impl Future<Output = ApiResult<()>> + Send + 'static;
}

/// A materialized row: the record plus its render slot
#[derive(Debug, Clone)]
pub struct VisibleRow {
  pub job: Job,
  pub slot: VirtualRow,
}

/// Output of one windowing pass over the engine
#[derive(Debug, Clone)]
pub struct RowWindow {
  pub rows: Vec<VisibleRow>,
  pub total_size: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FetchKind {
  /// Append the fetched page to the tail of the collection
  Append,
  /// Wholesale replace the collection (initial load / reconciliation)
  Replace,
}

/// The page-fetch path. Each fetch carries a sequence number; a result
/// whose number no longer matches the in-flight one arrived too late
/// and is dropped on the floor.
struct PageLoader {
  seq: u64,
  in_flight: Option<u64>,
  last_error: Option<String>,
  tx: mpsc::UnboundedSender<(u64, FetchKind, ApiResult<JobPage>)>,
  rx: mpsc::UnboundedReceiver<(u64, FetchKind, ApiResult<JobPage>)>,
}

impl PageLoader {
  fn new() -> Self {
    let (tx, rx) = mpsc::unbounded_channel();
    Self {
      seq: 0,
      in_flight: None,
      last_error: None,
      tx,
      rx,
    }
  }

  fn is_fetching(&self) -> bool {
    self.in_flight.is_some()
  }

  /// Mark any in-flight fetch as superseded; its result will be
  /// discarded when it arrives. There is no true cancellation.
  fn supersede(&mut self) {
    if self.in_flight.take().is_some() {
      tracing::debug!("in-flight page fetch superseded");
    }
  }

  fn fetch<C: JobsApi>(&mut self, client: &C, cursor: Option<String>, kind: FetchKind) {
    self.seq += 1;
    let seq = self.seq;
    self.in_flight = Some(seq);
    self.last_error = None;

    let tx = self.tx.clone();
    let client = client.clone();
    tokio::spawn(async move {
      let result = client.list(cursor).await;
      let _ = tx.send((seq, kind, result));
    });
  }

  fn poll(&mut self, store: &mut JobStore) -> bool {
    let mut changed = false;
    while let Ok((seq, kind, result)) = self.rx.try_recv() {
      if self.in_flight != Some(seq) {
        tracing::debug!(seq, "stale page fetch discarded");
        continue;
      }
      self.in_flight = None;

      match result {
        Ok(page) => match kind {
          FetchKind::Replace => {
            store.reset(page);
            changed = true;
          }
          FetchKind::Append => match store.append_page(page) {
            Ok(()) => changed = true,
            Err(err) => {
              tracing::warn!(%err, "fetched page rejected");
              self.last_error = Some(err.to_string());
            }
          },
        },
        // A failed fetch leaves the collection unchanged; the caller
        // retries manually.
        Err(err) => self.last_error = Some(err.to_string()),
      }
    }
    changed
  }
}

/// Facade over store, coordinator, loader, and windower; the surface
/// the rendering layer consumes.
pub struct SyncEngine<C: JobsApi> {
  client: C,
  store: JobStore,
  coordinator: MutationCoordinator<C>,
  loader: PageLoader,
  windower: ViewportWindower,
}

impl<C: JobsApi> SyncEngine<C> {
  pub fn new(client: C, options: WindowerOptions) -> Self {
    Self {
      client: client.clone(),
      store: JobStore::new(),
      coordinator: MutationCoordinator::new(client),
      loader: PageLoader::new(),
      windower: ViewportWindower::new(options),
    }
  }

  /// Kick off the initial page load. No-op once data is present or a
  /// fetch is already running.
  pub fn start(&mut self) {
    if self.loader.is_fetching() || !self.store.is_empty() {
      return;
    }
    self.loader.fetch(&self.client, None, FetchKind::Replace);
  }

  /// Invalidate-then-refetch: fetch a fresh first page and replace the
  /// whole collection when it arrives.
  pub fn refetch(&mut self) {
    self.loader.fetch(&self.client, None, FetchKind::Replace);
  }

  /// Submit a mutation intent. The optimistic effect is visible
  /// immediately; the handle resolves once the remote call completes
  /// and the store has been reconciled.
  pub fn submit(&mut self, intent: MutationIntent) -> MutationHandle {
    // Pause: a fetch racing this mutation must not clobber the
    // optimistic state when it lands.
    self.loader.supersede();
    self.coordinator.submit(intent, &mut self.store)
  }

  /// Apply any arrived fetch/mutation completions. Returns true when
  /// the collection changed. Call once per event-loop tick.
  pub fn poll(&mut self) -> bool {
    let mut changed = self.loader.poll(&mut self.store);
    changed |= self.coordinator.poll(&mut self.store);

    // Reconcile drift once the mutation pipeline has drained
    if self.coordinator.refetch_due() && !self.coordinator.has_pending() && !self.loader.is_fetching() {
      self.coordinator.clear_refetch_due();
      self.loader.fetch(&self.client, None, FetchKind::Replace);
    }
    changed
  }

  /// Rows to materialize for the viewport, with absolute offsets.
  /// Approaching the trailing edge of loaded data triggers the next
  /// page fetch (edge-triggered, at most one in flight).
  pub fn visible_rows(&mut self, viewport: Viewport) -> RowWindow {
    let fetching = self.loader.is_fetching() || self.coordinator.has_pending();
    let has_next = self.store.next_cursor().is_some();
    let window = self.windower.window(self.store.len(), viewport, has_next, fetching);

    if window.load_more {
      let cursor = self.store.next_cursor().map(str::to_string);
      self.loader.fetch(&self.client, cursor, FetchKind::Append);
    }

    let lo = window.rows.first().map(|r| r.index).unwrap_or(0);
    let rows = self
      .store
      .flatten()
      .skip(lo)
      .zip(window.rows.iter())
      .map(|(job, slot)| VisibleRow {
        job: job.clone(),
        slot: *slot,
      })
      .collect();

    RowWindow {
      rows,
      total_size: window.total_size,
    }
  }

  pub fn job_count(&self) -> usize {
    self.store.len()
  }

  pub fn is_empty(&self) -> bool {
    self.store.is_empty()
  }

  /// Record at a flattened index (selection handling)
  pub fn job_at(&self, index: usize) -> Option<&Job> {
    self.store.flatten().nth(index)
  }

  pub fn is_fetching(&self) -> bool {
    self.loader.is_fetching()
  }

  pub fn has_pending_mutations(&self) -> bool {
    self.coordinator.has_pending()
  }

  /// Message from the most recent failed or rejected page fetch
  pub fn load_error(&self) -> Option<&str> {
    self.loader.last_error.as_deref()
  }

  /// Change notifications; one message per structural store mutation
  pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<()> {
    self.store.subscribe()
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

  fn engine_with_first_page(api: &StubApi, ids: &[JobId], next: Option<&str>) -> SyncEngine<StubApi> {
    api.push_list(Ok(page(ids, next)));
    SyncEngine::new(api.clone(), WindowerOptions::default())
  }

  async fn load_first_page(engine: &mut SyncEngine<StubApi>) {
    engine.start();
    settle().await;
    assert!(engine.poll());
  }

  fn full_viewport(offset: u32) -> Viewport {
    Viewport { offset, height: 10 }
  }

  #[tokio::test]
  async fn test_initial_load() {
    let api = StubApi::new();
    let mut engine = engine_with_first_page(&api, &[1, 2, 3], Some("c1"));

    load_first_page(&mut engine).await;

    assert_eq!(engine.job_count(), 3);
    assert!(!engine.is_fetching());
    // start() is idempotent once data is present
    engine.start();
    assert!(!engine.is_fetching());
    assert_eq!(api.list_calls(), 1);
  }

  #[tokio::test]
  async fn test_scrolling_near_end_fetches_next_page_once() {
    let api = StubApi::new();
    let first: Vec<JobId> = (1..=20).collect();
    let mut engine = engine_with_first_page(&api, &first, Some("c1"));
    load_first_page(&mut engine).await;

    let gate = api.gate_list();

    // Crossing the trailing threshold issues exactly one fetch, no
    // matter how many frames render while it is in flight
    let window = engine.visible_rows(full_viewport(10));
    assert!(!window.rows.is_empty());
    assert!(engine.is_fetching());
    engine.visible_rows(full_viewport(11));
    engine.visible_rows(full_viewport(12));

    let second: Vec<JobId> = (21..=40).collect();
    gate.send(Ok(page(&second, None))).unwrap();
    settle().await;
    assert!(engine.poll());

    assert_eq!(engine.job_count(), 40);
    assert_eq!(api.list_calls(), 2);
    // Last page reached: scrolling further fetches nothing
    engine.visible_rows(full_viewport(35));
    settle().await;
    assert_eq!(api.list_calls(), 2);
  }

  #[tokio::test]
  async fn test_failed_page_fetch_leaves_collection_unchanged() {
    let api = StubApi::new();
    let first: Vec<JobId> = (1..=20).collect();
    let mut engine = engine_with_first_page(&api, &first, Some("c1"));
    load_first_page(&mut engine).await;

    api.push_list(Err(ApiError::Network));
    engine.visible_rows(full_viewport(10));
    settle().await;
    engine.poll();

    assert_eq!(engine.job_count(), 20);
    assert_eq!(
      engine.load_error(),
      Some("Network error - please check your connection")
    );
  }

  #[tokio::test]
  async fn test_duplicate_page_is_rejected_and_surfaced() {
    let api = StubApi::new();
    let first: Vec<JobId> = (1..=20).collect();
    let mut engine = engine_with_first_page(&api, &first, Some("c1"));
    load_first_page(&mut engine).await;

    // Cursor bug upstream: the next page re-serves id 20
    api.push_list(Ok(page(&[20, 21], None)));
    engine.visible_rows(full_viewport(10));
    settle().await;
    engine.poll();

    assert_eq!(engine.job_count(), 20);
    assert!(engine.load_error().unwrap().contains("duplicate job id 20"));
  }

  #[tokio::test]
  async fn test_mutation_supersedes_in_flight_fetch() {
    let api = StubApi::new();
    let first: Vec<JobId> = (1..=20).collect();
    let mut engine = engine_with_first_page(&api, &first, Some("c1"));
    load_first_page(&mut engine).await;

    // A next-page fetch is in flight...
    let gate = api.gate_list();
    engine.visible_rows(full_viewport(10));
    assert!(engine.is_fetching());

    // ...when a create is submitted; the stale page must not land
    let create_gate = api.gate_create();
    engine.submit(MutationIntent::Create {
      name: "fresh".to_string(),
    });
    assert_eq!(engine.job_count(), 21);

    let second: Vec<JobId> = (21..=40).collect();
    gate.send(Ok(page(&second, None))).unwrap();
    settle().await;
    engine.poll();

    assert_eq!(engine.job_count(), 21);
    assert!(engine.job_at(0).unwrap().is_synthetic());
    drop(create_gate);
  }

  #[tokio::test]
  async fn test_confirmed_mutation_triggers_one_reconciling_refetch() {
    let api = StubApi::new();
    let mut engine = engine_with_first_page(&api, &[1], None);
    load_first_page(&mut engine).await;

    // Queue the page the reconciling refetch will serve
    api.push_list(Ok(page(&[42, 1], None)));
    api.push_create(Ok(job(42, "fresh", StatusKind::Pending)));
    let mut handle = engine.submit(MutationIntent::Create {
      name: "fresh".to_string(),
    });

    settle().await;
    engine.poll();
    assert_eq!(handle.try_outcome(), Some(&MutationOutcome::Confirmed));

    // The reconciling refetch replaces the collection wholesale
    assert!(engine.is_fetching());
    settle().await;
    engine.poll();

    assert_eq!(engine.job_count(), 2);
    assert_eq!(engine.job_at(0).unwrap().id, 42);
    assert_eq!(api.list_calls(), 2);
  }
}
