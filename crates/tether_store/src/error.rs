//! Error types for tether_store.

use miette::Diagnostic;
use tether_core::SinkError;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur talking to the remote credential store.
#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    /// Token or target repository missing or unparsable.
    #[error("store configuration error: {reason}")]
    #[diagnostic(
        code(tether_store::configuration),
        help(
            "Set TETHER_GITHUB_TOKEN and TETHER_GITHUB_REPO (owner/repo or a full repository URL)"
        )
    )]
    Configuration { reason: String },

    /// Transport-level HTTP failure.
    #[error("request for {path} failed: {source}")]
    #[diagnostic(code(tether_store::http))]
    Http {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    /// The content API answered with a status we cannot act on.
    #[error("unexpected status {status} for {path}")]
    #[diagnostic(code(tether_store::unexpected_status))]
    UnexpectedStatus {
        path: String,
        status: u16,
        body: String,
    },
}

// Map onto the core's sink seam: configuration failures keep their
// fail-fast meaning, everything else degrades to a per-file upload error.
impl From<StoreError> for SinkError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Configuration { reason } => SinkError::Configuration { reason },
            StoreError::Http { path, source } => SinkError::Upload {
                path,
                reason: source.to_string(),
            },
            StoreError::UnexpectedStatus { path, status, body } => SinkError::Upload {
                path,
                reason: format!("status {status}: {body}"),
            },
        }
    }
}
