//! Error type shared by every object store and job registry backend.

use thiserror::Error;

/// Failures raised by a storage or registry backend.
///
/// Listing failures abort a run; delete failures are collected per key.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The backend answered with a non-success HTTP status.
    #[error("backend returned status {status}: {message}")]
    Status { status: u16, message: String },

    /// Transport failure underneath the backend (DNS, connect, timeout).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("invalid backend URL: {0}")]
    InvalidUrl(String),

    /// The backend answered but the body could not be interpreted.
    #[error("malformed backend response: {0}")]
    Decode(String),

    #[error("backend unavailable: {0}")]
    Unavailable(String),
}
