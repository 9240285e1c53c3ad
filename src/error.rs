//! Error Types
//!
//! Failure taxonomy for the synchronization layer. Network and server errors
//! are recoverable by design: callers log them and rely on the next periodic
//! or user-triggered attempt. Malformed data read back from the shared store
//! is never an error anywhere in this crate; it is treated as absent state.

use thiserror::Error;

/// Errors produced by the sync coordinator and its HTTP client.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Transport-level failure or undecodable response body.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-2xx status.
    #[error("server returned {0}")]
    Status(reqwest::StatusCode),
}

/// Result type alias for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
