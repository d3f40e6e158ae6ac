use crate::config::Config;
use crate::engine::JobsApi;
use color_eyre::{eyre::eyre, Result};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::Duration;
use url::Url;

use super::api_types::{ApiJob, ApiJobPage};
use super::error::{ApiError, ApiResult};
use super::types::{Job, JobId, JobPage, StatusKind};

/// HTTP client for the jobs API
#[derive(Clone)]
pub struct JobsClient {
  http: reqwest::Client,
  /// Base API URL, normalized with a trailing slash
  base: String,
}

impl JobsClient {
  pub fn new(config: &Config) -> Result<Self> {
    let mut base = config.api.url.clone();
    if !base.ends_with('/') {
      base.push('/');
    }
    Url::parse(&base).map_err(|e| eyre!("Invalid API URL {}: {}", base, e))?;

    let http = reqwest::Client::builder()
      .timeout(Duration::from_secs(config.api.timeout_secs))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self { http, base })
  }

  fn endpoint(&self, path: &str) -> String {
    format!("{}{}", self.base, path)
  }

  /// Fetch one page of jobs. The cursor is the full `next` URL from a
  /// previous page; None fetches the first page.
  pub async fn list(&self, cursor: Option<String>) -> ApiResult<JobPage> {
    let url = cursor.unwrap_or_else(|| self.endpoint("jobs/"));
    let resp = self.http.get(&url).send().await.map_err(transport_error)?;
    parse_json::<ApiJobPage>(resp).await.map(ApiJobPage::into_page)
  }

  /// Create a job; the server assigns the id and an initial PENDING status
  pub async fn create(&self, name: String) -> ApiResult<Job> {
    let resp = self
      .http
      .post(self.endpoint("jobs/"))
      .json(&serde_json::json!({ "name": name }))
      .send()
      .await
      .map_err(transport_error)?;
    parse_json::<ApiJob>(resp).await.map(ApiJob::into_job)
  }

  /// Record a new status for a job, returning the updated record
  pub async fn update_status(&self, id: JobId, status: StatusKind) -> ApiResult<Job> {
    let resp = self
      .http
      .patch(self.endpoint(&format!("jobs/{}/", id)))
      .json(&serde_json::json!({ "status_type": status.as_str() }))
      .send()
      .await
      .map_err(transport_error)?;
    parse_json::<ApiJob>(resp).await.map(ApiJob::into_job)
  }

  pub async fn delete(&self, id: JobId) -> ApiResult<()> {
    let resp = self
      .http
      .delete(self.endpoint(&format!("jobs/{}/", id)))
      .send()
      .await
      .map_err(transport_error)?;
    let status = resp.status();
    if !status.is_success() {
      let body = resp.text().await.unwrap_or_default();
      return Err(classify_failure(status, &body));
    }
    Ok(())
  }

  /// Fetch a single job with its full status history
  pub async fn get(&self, id: JobId) -> ApiResult<Job> {
    let resp = self
      .http
      .get(self.endpoint(&format!("jobs/{}/", id)))
      .send()
      .await
      .map_err(transport_error)?;
    parse_json::<ApiJob>(resp).await.map(ApiJob::into_job)
  }
}

impl JobsApi for JobsClient {
  fn list(&self, cursor: Option<String>) -> impl Future<Output = ApiResult<JobPage>> + Send + 'static {
    let client = self.clone();
    async move { client.list(cursor).await }
  }

  fn create(&self, name: String) -> impl Future<Output = ApiResult<Job>> + Send + 'static {
    let client = self.clone();
    async move { client.create(name).await }
  }

  fn update_status(&self, id: JobId, status: StatusKind) -> impl Future<Output = ApiResult<Job>> + Send + 'static {
    let client = self.clone();
    async move { client.update_status(id, status).await }
  }

  fn delete(&self, id: JobId) -> impl Future<Output = ApiResult<()>> + Send + 'static {
    let client = self.clone();
    async move { client.delete(id).await }
  }
}

fn transport_error(err: reqwest::Error) -> ApiError {
  if err.is_timeout() {
    ApiError::Timeout
  } else {
    ApiError::Network
  }
}

async fn parse_json<T: DeserializeOwned>(resp: Response) -> ApiResult<T> {
  let status = resp.status();
  if !status.is_success() {
    let body = resp.text().await.unwrap_or_default();
    return Err(classify_failure(status, &body));
  }
  // A body the client cannot decode is treated as a server fault
  resp.json::<T>().await.map_err(|_| ApiError::Server {
    status: status.as_u16(),
  })
}

fn classify_failure(status: StatusCode, body: &str) -> ApiError {
  if status.is_server_error() {
    return ApiError::Server {
      status: status.as_u16(),
    };
  }
  match extract_message(body) {
    Some(message) => ApiError::Client {
      status: status.as_u16(),
      message,
    },
    None => ApiError::client(status.as_u16()),
  }
}

/// Pull the most specific human-readable message out of an error body.
/// The API reports validation problems under varying keys.
fn extract_message(body: &str) -> Option<String> {
  let value: serde_json::Value = serde_json::from_str(body).ok()?;
  if let Some(s) = value.as_str() {
    return Some(s.to_string());
  }
  for key in ["message", "error", "detail"] {
    if let Some(s) = value.get(key).and_then(|v| v.as_str()) {
      return Some(s.to_string());
    }
  }
  None
}
