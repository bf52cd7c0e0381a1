//! Session records and point-in-time snapshots.

pub mod registry;

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::{AccountId, SessionId};

/// Lifecycle state of one linking attempt.
///
/// Transitions are monotonic except for the controlled retry path: a
/// `Disconnected` session with a recoverable cause can be superseded by a
/// fresh pairing attempt that resumes its staged credentials. `Failed` is
/// reserved for the client-observable pairing timeout and is never set by
/// the orchestrator itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Waiting,
    Connected,
    Disconnected,
    Failed,
}

/// Authoritative state for one account-linking attempt.
///
/// Owned by the registry; the per-session orchestrator task is the only
/// writer. Readers get a [`SessionSnapshot`], never the live record.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub id: SessionId,
    pub account: AccountId,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    /// Set exactly once, on the first successful handshake.
    pub connected_at: Option<DateTime<Utc>>,
    /// Where persisted credential material lives once upload completes.
    pub remote_artifact_location: Option<String>,
    /// Local credential staging directory; cleared on terminal teardown.
    pub staging_path: Option<PathBuf>,
}

impl SessionRecord {
    pub fn new(id: SessionId, account: AccountId, staging_path: PathBuf) -> Self {
        SessionRecord {
            id,
            account,
            status: SessionStatus::Waiting,
            created_at: Utc::now(),
            connected_at: None,
            remote_artifact_location: None,
            staging_path: Some(staging_path),
        }
    }

    /// Apply a successful handshake. `connected_at` sticks to the first
    /// open; a repeated open event is a no-op on the timestamp.
    pub fn mark_connected(&mut self, at: DateTime<Utc>) {
        self.status = SessionStatus::Connected;
        if self.connected_at.is_none() {
            self.connected_at = Some(at);
        }
    }

    pub fn mark_disconnected(&mut self) {
        self.status = SessionStatus::Disconnected;
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id.clone(),
            account: self.account.clone(),
            status: self.status,
            connected_at: self.connected_at,
            remote_artifact_location: self.remote_artifact_location.clone(),
        }
    }
}

/// Read-only projection served to status and listing queries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub id: SessionId,
    pub account: AccountId,
    pub status: SessionStatus,
    pub connected_at: Option<DateTime<Utc>>,
    pub remote_artifact_location: Option<String>,
}
