//! Remote credential-sink seam and upload reporting.

pub mod memory;

use std::fmt::Debug;

use async_trait::async_trait;
use miette::Diagnostic;
use thiserror::Error;

use crate::id::AccountId;

/// Errors crossing the credential-sink seam.
#[derive(Debug, Error, Diagnostic)]
pub enum SinkError {
    /// The sink's own configuration is unusable. Fails the whole upload
    /// sequence before any file is attempted.
    #[error("credential store misconfigured: {reason}")]
    #[diagnostic(
        code(tether_core::sink_configuration),
        help("Check the store token and target-repository settings in the environment")
    )]
    Configuration { reason: String },

    /// One blob failed to upload. Sibling files are unaffected.
    #[error("upload of {path} failed: {reason}")]
    #[diagnostic(code(tether_core::sink_upload))]
    Upload { path: String, reason: String },
}

/// Remote path for one staged credential file. Stable and re-derivable
/// from the account alone.
pub fn blob_path(account: &AccountId, filename: &str) -> String {
    format!("sessions/{}/{}", account, filename)
}

/// Idempotent put-style store of named byte blobs under a path prefix.
#[async_trait]
pub trait CredentialSink: Send + Sync + Debug {
    /// Look up an existing blob, returning its revision token. Absent is a
    /// normal outcome, not an error.
    async fn probe(&self, path: &str) -> Result<Option<String>, SinkError>;

    /// Create or update a blob. `revision` must be the probed token when
    /// the blob already exists, so a concurrent writer cannot be clobbered.
    async fn put(&self, path: &str, bytes: &[u8], revision: Option<&str>)
        -> Result<(), SinkError>;

    /// Stable location describing where an account's persisted credential
    /// material lives.
    fn artifact_location(&self, account: &AccountId) -> Result<String, SinkError>;
}

/// Aggregate outcome of one upload sequence, surfaced to observability.
#[derive(Debug, Clone, Default)]
pub struct UploadReport {
    pub uploaded: Vec<String>,
    pub failed: Vec<String>,
}

impl UploadReport {
    pub fn attempted(&self) -> usize {
        self.uploaded.len() + self.failed.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}
