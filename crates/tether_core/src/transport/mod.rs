//! Connection-handle abstraction over the protocol transport.
//!
//! The actual device-pairing handshake lives in an external protocol
//! layer. The orchestrator consumes it through these seams: a
//! [`PairingTransport`] factory that binds a connection to a staging
//! directory, and the per-connection [`ConnectionHandle`] paired with an
//! ordered stream of [`ConnectionEvent`]s.

pub mod memory;

use std::fmt::Debug;
use std::path::Path;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::Result;
use crate::id::AccountId;

/// Why a connection closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseCause {
    /// The account was logged out on the remote end. Terminal: staged
    /// credentials are void and get torn down.
    LoggedOut,
    /// Any other drop (network blip, restart signal). Staged credentials
    /// stay valid for a later pairing attempt.
    Recoverable(String),
}

impl CloseCause {
    pub fn is_terminal(&self) -> bool {
        matches!(self, CloseCause::LoggedOut)
    }
}

/// Connection-lifecycle and credential events, delivered in order for one
/// session.
#[derive(Debug, Clone)]
pub enum ConnectionEvent {
    /// Handshake completed; the link is live.
    Open,
    /// The connection dropped; the cause decides teardown versus resume.
    Close(CloseCause),
    /// Credential material in the staging directory changed.
    CredentialsUpdated,
}

/// Live per-account protocol connection.
#[async_trait]
pub trait ConnectionHandle: Send + Sync + Debug {
    /// Whether the bound staging directory already holds registered
    /// credentials. A resumed session needs no pairing code.
    fn has_credentials(&self) -> bool;

    /// Request a pairing code for a first-time link. Returns the raw,
    /// unformatted code.
    async fn request_pairing_code(&self) -> Result<String>;

    /// Ask the transport to close the connection. With `logout` the close
    /// is terminal and the remote registration is revoked. The resulting
    /// [`ConnectionEvent::Close`] flows through the normal event stream,
    /// so a forced disconnect and a natural one take the same path.
    async fn close(&self, logout: bool) -> Result<()>;
}

/// Factory creating connection handles bound to a staging directory.
#[async_trait]
pub trait PairingTransport: Send + Sync + Debug {
    /// Open a connection for `account` whose credential state lives in
    /// `staging_dir`.
    ///
    /// The returned receiver is already subscribed at the moment of
    /// connection: no event can be missed between creation and the caller
    /// receiving the session id.
    async fn connect(
        &self,
        account: &AccountId,
        staging_dir: &Path,
    ) -> Result<(Box<dyn ConnectionHandle>, mpsc::Receiver<ConnectionEvent>)>;
}
