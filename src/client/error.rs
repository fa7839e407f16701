//! Error types for backend requests.

use thiserror::Error;

use crate::data::SnapshotError;

/// Errors that can occur when talking to the metrics backend.
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Connection failed.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Timeout waiting for response.
    #[error("Request timed out")]
    Timeout,

    /// The backend answered with a non-success status.
    #[error("Backend returned status {status}")]
    Status { status: u16 },

    /// The backend refused the request body (4xx with an explanation).
    #[error("Rejected with status {status}: {reason}")]
    Rejected { status: u16, reason: String },

    /// The metrics payload failed decoding or validation.
    #[error("Invalid metrics payload: {0}")]
    Snapshot(#[from] SnapshotError),

    /// Any other response body that could not be decoded.
    #[error("Failed to parse response: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout
        } else if err.is_connect() {
            ClientError::Connection(err.to_string())
        } else {
            ClientError::Http(err.to_string())
        }
    }
}
