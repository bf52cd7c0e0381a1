//! In-memory transport for tests and local development.
//!
//! Implements the transport seam without a protocol stack: pairing codes
//! are derived deterministically from the account digits, and tests (or a
//! dev harness) drive the lifecycle by emitting events for an account.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::fs;
use tokio::sync::mpsc;
use tracing::debug;

use super::{CloseCause, ConnectionEvent, ConnectionHandle, PairingTransport};
use crate::error::{CoreError, Result};
use crate::id::AccountId;

const EVENT_BUFFER: usize = 32;

/// File the transport treats as the registration marker. Present in the
/// staging directory means the account resumes without a pairing code.
pub const CREDENTIAL_FILE: &str = "creds.json";

/// Loopback [`PairingTransport`].
#[derive(Debug, Default)]
pub struct MemoryTransport {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Debug, Default)]
struct Inner {
    links: HashMap<String, Link>,
    fail_next_connect: bool,
    refuse_pairing_codes: bool,
}

#[derive(Debug)]
struct Link {
    sender: mpsc::Sender<ConnectionEvent>,
    staging_dir: PathBuf,
}

impl MemoryTransport {
    pub fn new() -> Self {
        MemoryTransport::default()
    }

    /// Make the next `connect` call fail (creation error path).
    pub fn fail_next_connect(&self) {
        self.inner.lock().fail_next_connect = true;
    }

    /// Make every pairing-code request fail until further notice.
    pub fn refuse_pairing_codes(&self, refuse: bool) {
        self.inner.lock().refuse_pairing_codes = refuse;
    }

    /// Deliver an event on an account's stream. Returns `false` when the
    /// account has no live link (stream gone or never connected).
    pub async fn emit(&self, account: &AccountId, event: ConnectionEvent) -> bool {
        let sender = {
            let inner = self.inner.lock();
            inner
                .links
                .get(account.as_str())
                .map(|link| link.sender.clone())
        };
        match sender {
            Some(sender) => sender.send(event).await.is_ok(),
            None => false,
        }
    }

    /// Write a credential file into the account's staging directory, as the
    /// protocol layer would after a handshake or key rotation.
    pub async fn write_credential(
        &self,
        account: &AccountId,
        name: &str,
        bytes: &[u8],
    ) -> std::io::Result<()> {
        let dir = self
            .staging_dir(account)
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, "no live link"))?;
        fs::write(dir.join(name), bytes).await
    }

    pub fn staging_dir(&self, account: &AccountId) -> Option<PathBuf> {
        self.inner
            .lock()
            .links
            .get(account.as_str())
            .map(|link| link.staging_dir.clone())
    }
}

#[async_trait]
impl PairingTransport for MemoryTransport {
    async fn connect(
        &self,
        account: &AccountId,
        staging_dir: &Path,
    ) -> Result<(Box<dyn ConnectionHandle>, mpsc::Receiver<ConnectionEvent>)> {
        let registered = fs::try_exists(staging_dir.join(CREDENTIAL_FILE))
            .await
            .unwrap_or(false);

        let (sender, receiver) = mpsc::channel(EVENT_BUFFER);
        let refuse_pairing = {
            let mut inner = self.inner.lock();
            if inner.fail_next_connect {
                inner.fail_next_connect = false;
                return Err(CoreError::pairing(
                    account.as_str(),
                    "transport unavailable",
                ));
            }
            inner.links.insert(
                account.as_str().to_string(),
                Link {
                    sender: sender.clone(),
                    staging_dir: staging_dir.to_path_buf(),
                },
            );
            inner.refuse_pairing_codes
        };

        debug!(account = %account, registered, "memory transport link opened");

        let handle = MemoryHandle {
            account: account.clone(),
            registered,
            code: derive_code(account.as_str()),
            refuse_pairing,
            sender,
        };
        Ok((Box::new(handle), receiver))
    }
}

#[derive(Debug)]
struct MemoryHandle {
    account: AccountId,
    registered: bool,
    code: String,
    refuse_pairing: bool,
    sender: mpsc::Sender<ConnectionEvent>,
}

#[async_trait]
impl ConnectionHandle for MemoryHandle {
    fn has_credentials(&self) -> bool {
        self.registered
    }

    async fn request_pairing_code(&self) -> Result<String> {
        if self.refuse_pairing {
            return Err(CoreError::pairing(
                self.account.as_str(),
                "transport refused to issue a pairing code",
            ));
        }
        Ok(self.code.clone())
    }

    async fn close(&self, logout: bool) -> Result<()> {
        let cause = if logout {
            CloseCause::LoggedOut
        } else {
            CloseCause::Recoverable("closed locally".to_string())
        };
        if self.sender.send(ConnectionEvent::Close(cause)).await.is_err() {
            debug!(account = %self.account, "close on an already-ended stream");
        }
        Ok(())
    }
}

/// Deterministic 8-character code from the account digits (FNV-1a fold).
fn derive_code(account: &str) -> String {
    let mut acc: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in account.bytes() {
        acc ^= u64::from(byte);
        acc = acc.wrapping_mul(0x0000_0100_0000_01b3);
    }
    format!("{:08X}", (acc >> 32) as u32)
}
