//! Unified error type for the seat tracker.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("upstream returned {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("term document error: {0}")]
    Document(String),

    #[error("markup parse error: {0}")]
    Markup(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("snapshot store error: {0}")]
    Snapshot(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failure propagated from a deduplicated fetch shared by several callers.
    #[error("{0}")]
    Shared(String),

    #[error("{0}")]
    Other(String),
}
