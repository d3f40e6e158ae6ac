//! Transport error classification for the jobs API.
//!
//! Every remote failure collapses into one of four user-facing
//! categories derived from the HTTP outcome. The engine never retries;
//! it rolls back and surfaces the message to the caller.

use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

/// Classified transport failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
  /// Connection failure or no response at all
  #[error("Network error - please check your connection")]
  Network,

  /// The request exceeded the client timeout
  #[error("Request timeout - please try again")]
  Timeout,

  /// 5xx response
  #[error("Server error - please try again later")]
  Server { status: u16 },

  /// 4xx response, with the most specific message the body offered
  #[error("{message}")]
  Client { status: u16, message: String },
}

impl ApiError {
  /// Build a client error with the stock message for a status code,
  /// used when the response body carried nothing better.
  pub fn client(status: u16) -> Self {
    let message = match status {
      400 => "Invalid request data",
      403 => "Access denied",
      404 => "Resource not found",
      _ => "An unexpected error occurred",
    };
    ApiError::Client {
      status,
      message: message.to_string(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_stock_client_messages() {
    assert_eq!(ApiError::client(404).to_string(), "Resource not found");
    assert_eq!(ApiError::client(400).to_string(), "Invalid request data");
    assert_eq!(ApiError::client(403).to_string(), "Access denied");
    assert_eq!(
      ApiError::client(418).to_string(),
      "An unexpected error occurred"
    );
  }

  #[test]
  fn test_transport_messages() {
    assert_eq!(
      ApiError::Network.to_string(),
      "Network error - please check your connection"
    );
    assert_eq!(
      ApiError::Timeout.to_string(),
      "Request timeout - please try again"
    );
    assert_eq!(
      ApiError::Server { status: 500 }.to_string(),
      "Server error - please try again later"
    );
  }
}
