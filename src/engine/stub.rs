//! Scripted in-memory jobs API for engine tests.
//!
//! Replies are queued per operation, in call order. A plain reply
//! resolves immediately; a gated reply suspends the call until the
//! test fires the returned sender, which is how tests control the
//! completion order of overlapping requests.

use chrono::Utc;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

use crate::api::error::{ApiError, ApiResult};
use crate::api::types::{Job, JobId, JobPage, StatusKind, StatusStamp};
use crate::engine::JobsApi;

pub fn job(id: JobId, name: &str, status: StatusKind) -> Job {
  let now = Utc::now();
  Job {
    id,
    name: name.to_string(),
    created_at: now,
    updated_at: now,
    current_status: StatusStamp {
      status,
      timestamp: now,
    },
    status_history: None,
  }
}

pub fn page(ids: &[JobId], next: Option<&str>) -> JobPage {
  JobPage {
    jobs: ids
      .iter()
      .map(|&id| job(id, &format!("job-{}", id), StatusKind::Pending))
      .collect(),
    next_cursor: next.map(String::from),
  }
}

enum Scripted<T> {
  Ready(ApiResult<T>),
  Gated(oneshot::Receiver<ApiResult<T>>),
}

#[derive(Default)]
struct Script {
  lists: VecDeque<Scripted<JobPage>>,
  creates: VecDeque<Scripted<Job>>,
  updates: VecDeque<Scripted<Job>>,
  deletes: VecDeque<Scripted<()>>,
  list_calls: u32,
}

#[derive(Clone, Default)]
pub struct StubApi {
  script: Arc<Mutex<Script>>,
}

impl StubApi {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn push_list(&self, reply: ApiResult<JobPage>) {
    self.script.lock().unwrap().lists.push_back(Scripted::Ready(reply));
  }

  pub fn gate_list(&self) -> oneshot::Sender<ApiResult<JobPage>> {
    let (tx, rx) = oneshot::channel();
    self.script.lock().unwrap().lists.push_back(Scripted::Gated(rx));
    tx
  }

  pub fn push_create(&self, reply: ApiResult<Job>) {
    self.script.lock().unwrap().creates.push_back(Scripted::Ready(reply));
  }

  pub fn gate_create(&self) -> oneshot::Sender<ApiResult<Job>> {
    let (tx, rx) = oneshot::channel();
    self.script.lock().unwrap().creates.push_back(Scripted::Gated(rx));
    tx
  }

  pub fn push_update(&self, reply: ApiResult<Job>) {
    self.script.lock().unwrap().updates.push_back(Scripted::Ready(reply));
  }

  pub fn gate_update(&self) -> oneshot::Sender<ApiResult<Job>> {
    let (tx, rx) = oneshot::channel();
    self.script.lock().unwrap().updates.push_back(Scripted::Gated(rx));
    tx
  }

  pub fn push_delete(&self, reply: ApiResult<()>) {
    self.script.lock().unwrap().deletes.push_back(Scripted::Ready(reply));
  }

  /// How many list fetches the engine has issued
  pub fn list_calls(&self) -> u32 {
    self.script.lock().unwrap().list_calls
  }
}

async fn resolve<T>(next: Option<Scripted<T>>) -> ApiResult<T> {
  match next {
    Some(Scripted::Ready(reply)) => reply,
    Some(Scripted::Gated(rx)) => rx.await.unwrap_or(Err(ApiError::Network)),
    // An unscripted call is a test bug; fail it loudly but safely
    None => Err(ApiError::Network),
  }
}

impl JobsApi for StubApi {
  fn list(&self, _cursor: Option<String>) -> impl Future<Output = ApiResult<JobPage>> + Send + 'static {
    let next = {
      let mut script = self.script.lock().unwrap();
      script.list_calls += 1;
      script.lists.pop_front()
    };
    resolve(next)
  }

  fn create(&self, _name: String) -> impl Future<Output = ApiResult<Job>> + Send + 'static {
    let next = self.script.lock().unwrap().creates.pop_front();
    resolve(next)
  }

  fn update_status(&self, _id: JobId, _status: StatusKind) -> impl Future<Output = ApiResult<Job>> + Send + 'static {
    let next = self.script.lock().unwrap().updates.pop_front();
    resolve(next)
  }

  fn delete(&self, _id: JobId) -> impl Future<Output = ApiResult<()>> + Send + 'static {
    let next = self.script.lock().unwrap().deletes.pop_front();
    resolve(next)
  }
}
