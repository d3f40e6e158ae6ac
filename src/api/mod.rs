//! Remote jobs API: domain types, wire DTOs, and the HTTP client.

pub mod api_types;
pub mod client;
pub mod error;
pub mod types;

pub use client::JobsClient;
pub use error::{ApiError, ApiResult};
