use std::sync::Arc;

use reqwest::StatusCode;
use thiserror::Error;

/// Errors that can occur while talking to the fleet service
#[derive(Error, Debug)]
pub enum ClientError {
    /// Transport error from reqwest (connection refused, timeout, ...)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status
    #[error("Request to {url} failed with status {status}: {body}")]
    Status {
        status: StatusCode,
        url: String,
        body: String,
    },

    /// A response body could not be decoded into the expected shape
    #[error("Decode error for {url}: {message}")]
    Decode { url: String, message: String },

    /// A base URL or `next` link could not be parsed
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The producer side of a stream went away without a terminal event
    #[error("Stream closed")]
    StreamClosed,

    /// A background retrieval task died before finishing its stream
    #[error("Retrieval task failed: {0}")]
    Task(String),
}

impl ClientError {
    /// HTTP status carried by the error, if the service answered at all
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            ClientError::Http(e) => e.status(),
            _ => None,
        }
    }
}

/// Error handed to stream subscribers. Shared because every `on_error`
/// callback and every `wait()` caller observes the same failure.
pub type SharedError = Arc<ClientError>;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;
