//! Transport-specific error types.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Errors that can occur while talking to the ingestion service.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The HTTP request could not be sent or its body could not be read.
    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),

    /// No response within the configured timeout.
    #[error("request timed out after {0} seconds")]
    Timeout(u64),

    /// The service answered with a failure status.
    #[error("service error (status {status}): {}", .detail.as_deref().unwrap_or("no detail"))]
    Remote {
        /// HTTP status code.
        status: u16,
        /// Human-readable detail from the failure body, if any.
        detail: Option<String>,
    },

    /// The response body did not match the expected shape.
    #[error("failed to decode response: {0}")]
    Decode(#[source] serde_json::Error),

    /// The flat file to upload could not be read.
    #[error("failed to read upload {}: {source}", .path.display())]
    Upload {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The configured service base URL cannot carry a path.
    #[error("invalid service URL: {0}")]
    InvalidUrl(String),
}

impl TransportError {
    /// Create a remote error from a failure response.
    pub fn remote(status: u16, detail: Option<impl Into<String>>) -> Self {
        Self::Remote {
            status,
            detail: detail.map(Into::into),
        }
    }

    /// The service-provided detail to surface verbatim, if there is one.
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Remote { detail, .. } => detail.as_deref().filter(|d| !d.trim().is_empty()),
            _ => None,
        }
    }

    /// Check if this error means the service never answered in time.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err)
    }
}
