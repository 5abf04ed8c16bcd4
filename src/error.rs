//! Muninn error types

use std::time::Duration;

/// Muninn error types
#[derive(Debug, thiserror::Error)]
pub enum MuninnError {
    // Budget errors
    /// The usage tracker denied the call. Displays the tracker's reason verbatim.
    #[error("{reason}")]
    RateLimitExceeded { reason: String },

    // Upstream/network errors
    #[error("network error: {0}")]
    Http(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// A single attempt outlived its time box.
    #[error("request timed out after {after:?}")]
    Timeout { after: Duration },

    // Data errors
    /// The upstream call succeeded but its payload could not be used.
    #[error("invalid response from model: {0}")]
    InvalidResponse(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    // Configuration errors
    #[error("no upstream transport configured")]
    NoTransport,

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl MuninnError {
    /// HTTP status carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            MuninnError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether this error can never succeed on a repeated attempt,
    /// regardless of what its message says.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            MuninnError::RateLimitExceeded { .. }
                | MuninnError::InvalidResponse(_)
                | MuninnError::Json(_)
                | MuninnError::InvalidInput(_)
                | MuninnError::NoTransport
                | MuninnError::Configuration(_)
        )
    }
}

/// Result type alias for Muninn operations
pub type Result<T> = std::result::Result<T, MuninnError>;
