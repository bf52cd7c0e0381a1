//! In-memory credential sink for tests and local development.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use super::{CredentialSink, SinkError};
use crate::id::AccountId;

/// [`CredentialSink`] that keeps blobs in process memory.
///
/// Revision tokens are a per-blob counter; an update with a stale token is
/// rejected the way a real content API rejects a conflicting write.
#[derive(Debug, Default)]
pub struct MemorySink {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Debug, Default)]
struct Inner {
    blobs: HashMap<String, Blob>,
    failing_paths: HashSet<String>,
    misconfigured: bool,
    puts: usize,
}

#[derive(Debug, Clone)]
struct Blob {
    bytes: Vec<u8>,
    revision: u64,
}

impl MemorySink {
    pub fn new() -> Self {
        MemorySink::default()
    }

    /// Make every put to `path` fail (partial-failure scenarios).
    pub fn fail_path(&self, path: impl Into<String>) {
        self.inner.lock().failing_paths.insert(path.into());
    }

    /// Simulate an unusable store configuration.
    pub fn set_misconfigured(&self, misconfigured: bool) {
        self.inner.lock().misconfigured = misconfigured;
    }

    pub fn bytes(&self, path: &str) -> Option<Vec<u8>> {
        self.inner.lock().blobs.get(path).map(|b| b.bytes.clone())
    }

    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<_> = self.inner.lock().blobs.keys().cloned().collect();
        paths.sort();
        paths
    }

    /// Total number of put attempts, including failed ones.
    pub fn put_attempts(&self) -> usize {
        self.inner.lock().puts
    }
}

#[async_trait]
impl CredentialSink for MemorySink {
    async fn probe(&self, path: &str) -> Result<Option<String>, SinkError> {
        let inner = self.inner.lock();
        if inner.misconfigured {
            return Err(SinkError::Configuration {
                reason: "memory sink marked misconfigured".to_string(),
            });
        }
        Ok(inner.blobs.get(path).map(|b| b.revision.to_string()))
    }

    async fn put(
        &self,
        path: &str,
        bytes: &[u8],
        revision: Option<&str>,
    ) -> Result<(), SinkError> {
        let mut inner = self.inner.lock();
        inner.puts += 1;
        if inner.misconfigured {
            return Err(SinkError::Configuration {
                reason: "memory sink marked misconfigured".to_string(),
            });
        }
        if inner.failing_paths.contains(path) {
            return Err(SinkError::Upload {
                path: path.to_string(),
                reason: "injected failure".to_string(),
            });
        }
        match inner.blobs.get_mut(path) {
            Some(existing) => {
                let expected = existing.revision.to_string();
                if revision != Some(expected.as_str()) {
                    return Err(SinkError::Upload {
                        path: path.to_string(),
                        reason: format!(
                            "revision conflict: expected {expected}, got {revision:?}"
                        ),
                    });
                }
                existing.bytes = bytes.to_vec();
                existing.revision += 1;
            }
            None => {
                inner.blobs.insert(
                    path.to_string(),
                    Blob {
                        bytes: bytes.to_vec(),
                        revision: 1,
                    },
                );
            }
        }
        debug!(path, "memory sink stored blob");
        Ok(())
    }

    fn artifact_location(&self, account: &AccountId) -> Result<String, SinkError> {
        if self.inner.lock().misconfigured {
            return Err(SinkError::Configuration {
                reason: "memory sink marked misconfigured".to_string(),
            });
        }
        Ok(format!("memory/store/sessions/{account}"))
    }
}
