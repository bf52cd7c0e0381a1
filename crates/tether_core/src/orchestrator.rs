//! Pairing orchestration: session creation, the connection-state machine,
//! and the credential upload sequence.
//!
//! The orchestrator is reactive. Each live session gets one lightweight
//! task that consumes that session's connection events strictly in order;
//! sessions never share a lock, so unrelated accounts pair and tear down
//! independently.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::error::{CoreError, Result};
use crate::id::{AccountId, SessionId};
use crate::pairing::format_pairing_code;
use crate::session::registry::SessionRegistry;
use crate::session::{SessionRecord, SessionSnapshot, SessionStatus};
use crate::sink::{blob_path, CredentialSink, UploadReport};
use crate::staging::{self, StagingArea};
use crate::transport::{CloseCause, ConnectionEvent, ConnectionHandle, PairingTransport};

/// Bounds on the orchestrator's two suspension points.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Cap on the pairing-code round trip to the protocol transport.
    pub pairing_timeout: Duration,
    /// Cap on each individual credential-store call.
    pub upload_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        OrchestratorConfig {
            pairing_timeout: Duration::from_secs(30),
            upload_timeout: Duration::from_secs(30),
        }
    }
}

/// What a pairing request hands back: the session id plus the formatted
/// code. Resumed sessions (credentials already registered) get no code.
#[derive(Debug, Clone)]
pub struct PairingTicket {
    pub id: SessionId,
    pub pairing_code: Option<String>,
}

/// Creates sessions, drives connection handles, and owns the per-session
/// state machine.
#[derive(Debug)]
pub struct PairingOrchestrator {
    registry: Arc<SessionRegistry>,
    transport: Arc<dyn PairingTransport>,
    sink: Arc<dyn CredentialSink>,
    staging: StagingArea,
    handles: Arc<DashMap<SessionId, Arc<dyn ConnectionHandle>>>,
    config: OrchestratorConfig,
}

impl PairingOrchestrator {
    pub fn new(
        transport: Arc<dyn PairingTransport>,
        sink: Arc<dyn CredentialSink>,
        staging_root: impl Into<PathBuf>,
        config: OrchestratorConfig,
    ) -> Self {
        PairingOrchestrator {
            registry: Arc::new(SessionRegistry::new()),
            transport,
            sink,
            staging: StagingArea::new(staging_root),
            handles: Arc::new(DashMap::new()),
            config,
        }
    }

    /// The registry backing status and listing queries.
    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Create a pairing session for `account`.
    ///
    /// The record is registered before the pairing-code round trip, so a
    /// status query can never race a missing entry. Any failure afterwards
    /// unwinds the record and, when this call created it, the staging
    /// directory; a pre-existing resume directory is left alone.
    pub async fn create_session(&self, account: AccountId) -> Result<PairingTicket> {
        let id = SessionId::generate(&account);
        let (staging_dir, created_staging) = self.staging.ensure(&account).await?;

        let (handle, events) = match self.transport.connect(&account, &staging_dir).await {
            Ok(link) => link,
            Err(err) => {
                self.unwind_staging(&staging_dir, created_staging).await;
                return Err(err);
            }
        };
        let handle: Arc<dyn ConnectionHandle> = Arc::from(handle);

        self.registry.insert(SessionRecord::new(
            id.clone(),
            account.clone(),
            staging_dir.clone(),
        ));

        let pairing_code = if handle.has_credentials() {
            debug!(
                session = %id,
                account = %account,
                "credentials already registered; resuming without a pairing code"
            );
            None
        } else {
            match timeout(self.config.pairing_timeout, handle.request_pairing_code()).await {
                Ok(Ok(raw)) => Some(format_pairing_code(&raw)),
                Ok(Err(err)) => {
                    self.unwind_creation(&id, &staging_dir, created_staging).await;
                    return Err(err);
                }
                Err(_) => {
                    self.unwind_creation(&id, &staging_dir, created_staging).await;
                    return Err(CoreError::pairing(
                        account.as_str(),
                        format!(
                            "pairing code request timed out after {}s",
                            self.config.pairing_timeout.as_secs()
                        ),
                    ));
                }
            }
        };

        self.handles.insert(id.clone(), Arc::clone(&handle));
        self.spawn_session_task(id.clone(), account.clone(), events);

        info!(
            session = %id,
            account = %account,
            resumed = pairing_code.is_none(),
            "pairing session created"
        );
        Ok(PairingTicket { id, pairing_code })
    }

    /// Point-in-time status of one session.
    pub fn status(&self, id: &SessionId) -> Result<SessionSnapshot> {
        self.registry
            .snapshot(id)
            .ok_or_else(|| CoreError::SessionNotFound { id: id.to_string() })
    }

    /// Snapshots of every currently connected session.
    pub fn list_connected(&self) -> Vec<SessionSnapshot> {
        self.registry.connected()
    }

    /// Force a disconnect through the logout branch of the state machine.
    ///
    /// Idempotent: a session that already tore down has no live handle and
    /// the call reduces to a status read.
    pub async fn disconnect(&self, id: &SessionId) -> Result<SessionSnapshot> {
        let snapshot = self.status(id)?;
        // Clone out of the map before awaiting; holding a shard ref across
        // an await point would stall unrelated sessions.
        let handle = self.handles.get(id).map(|entry| Arc::clone(entry.value()));
        if let Some(handle) = handle {
            handle.close(true).await?;
            debug!(session = %id, "logout close requested");
        }
        Ok(snapshot)
    }

    fn spawn_session_task(
        &self,
        id: SessionId,
        account: AccountId,
        events: mpsc::Receiver<ConnectionEvent>,
    ) {
        let ctx = SessionContext {
            id,
            account,
            registry: Arc::clone(&self.registry),
            sink: Arc::clone(&self.sink),
            handles: Arc::clone(&self.handles),
            upload_timeout: self.config.upload_timeout,
        };
        tokio::spawn(run_session(ctx, events));
    }

    async fn unwind_creation(&self, id: &SessionId, staging_dir: &Path, created: bool) {
        self.registry.remove(id);
        self.unwind_staging(staging_dir, created).await;
    }

    async fn unwind_staging(&self, staging_dir: &Path, created: bool) {
        if !created {
            return;
        }
        if let Err(err) = staging::remove_dir(staging_dir).await {
            warn!(error = %err, "failed to remove staging directory after aborted pairing");
        }
    }
}

/// Everything a per-session task needs; cheap to clone into upload tasks.
#[derive(Debug, Clone)]
struct SessionContext {
    id: SessionId,
    account: AccountId,
    registry: Arc<SessionRegistry>,
    sink: Arc<dyn CredentialSink>,
    handles: Arc<DashMap<SessionId, Arc<dyn ConnectionHandle>>>,
    upload_timeout: Duration,
}

/// Per-session event loop. Events for this session are consumed strictly
/// in order; other sessions run on their own tasks.
async fn run_session(ctx: SessionContext, mut events: mpsc::Receiver<ConnectionEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            ConnectionEvent::Open => {
                let now = Utc::now();
                ctx.registry
                    .update(&ctx.id, |record| record.mark_connected(now));
                info!(session = %ctx.id, "link established");
                // Upload is its own unit of work: a failure there never
                // reverts the connection state, and event processing
                // continues while it runs.
                tokio::spawn(run_upload(ctx.clone()));
            }
            ConnectionEvent::CredentialsUpdated => {
                let connected = ctx
                    .registry
                    .snapshot(&ctx.id)
                    .map(|snapshot| snapshot.status == SessionStatus::Connected)
                    .unwrap_or(false);
                if connected {
                    debug!(session = %ctx.id, "credential material rotated; refreshing remote copy");
                    tokio::spawn(run_upload(ctx.clone()));
                }
            }
            ConnectionEvent::Close(cause) => {
                finish_session(&ctx, cause).await;
                return;
            }
        }
    }
    // Stream ended without a close event. Treat it as a recoverable drop
    // so staged credentials survive for the next attempt.
    finish_session(
        &ctx,
        CloseCause::Recoverable("event stream ended".to_string()),
    )
    .await;
}

/// Apply a close to the record and tear down live resources. A terminal
/// cause also removes the staging directory; the record itself stays in
/// the registry for historical queries.
async fn finish_session(ctx: &SessionContext, cause: CloseCause) {
    let staging_dir = ctx
        .registry
        .update(&ctx.id, |record| {
            record.mark_disconnected();
            if cause.is_terminal() {
                record.staging_path.take()
            } else {
                None
            }
        })
        .flatten();

    if let Some(dir) = staging_dir {
        if let Err(err) = staging::remove_dir(&dir).await {
            warn!(session = %ctx.id, error = %err, "failed to remove staging directory");
        }
    }

    ctx.handles.remove(&ctx.id);

    match cause {
        CloseCause::LoggedOut => {
            info!(session = %ctx.id, "logged out; session torn down");
        }
        CloseCause::Recoverable(reason) => {
            info!(
                session = %ctx.id,
                reason = %reason,
                "connection dropped; staged credentials retained"
            );
        }
    }
}

/// Best-effort upload of every staged credential file.
///
/// Runs once per successful connection and again on credential rotation.
/// A per-file failure is recorded in the report and logged; siblings still
/// go out. Only a sink configuration failure aborts the sequence before
/// any file is attempted.
async fn run_upload(ctx: SessionContext) {
    let location = match ctx.sink.artifact_location(&ctx.account) {
        Ok(location) => location,
        Err(err) => {
            error!(session = %ctx.id, error = %err, "credential upload aborted");
            return;
        }
    };

    let Some(staging_dir) = ctx
        .registry
        .update(&ctx.id, |record| record.staging_path.clone())
        .flatten()
    else {
        debug!(session = %ctx.id, "no staging directory; nothing to upload");
        return;
    };

    let files = match staging::staged_files(&staging_dir).await {
        Ok(files) => files,
        Err(err) => {
            warn!(session = %ctx.id, error = %err, "could not list staged credential files");
            return;
        }
    };

    let mut report = UploadReport::default();
    for file in files {
        let Some(name) = file.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };
        match upload_file(&ctx, &file, &name).await {
            Ok(()) => report.uploaded.push(name),
            Err(reason) => {
                warn!(
                    session = %ctx.id,
                    file = %name,
                    reason = %reason,
                    "credential file upload failed"
                );
                report.failed.push(name);
            }
        }
    }

    ctx.registry.update(&ctx.id, |record| {
        record.remote_artifact_location = Some(location.clone());
    });

    if report.is_clean() {
        info!(
            session = %ctx.id,
            uploaded = report.uploaded.len(),
            location = %location,
            "credential material persisted"
        );
    } else {
        warn!(
            session = %ctx.id,
            uploaded = report.uploaded.len(),
            failed = ?report.failed,
            location = %location,
            "credential material partially persisted"
        );
    }
}

/// Upload one staged file: read, probe for the current revision, then
/// create-or-update. Each remote call is bounded by the upload timeout.
async fn upload_file(ctx: &SessionContext, file: &Path, name: &str) -> Result<(), String> {
    let bytes = tokio::fs::read(file)
        .await
        .map_err(|err| format!("read failed: {err}"))?;
    let path = blob_path(&ctx.account, name);

    let revision = timeout(ctx.upload_timeout, ctx.sink.probe(&path))
        .await
        .map_err(|_| "probe timed out".to_string())?
        .map_err(|err| err.to_string())?;

    timeout(
        ctx.upload_timeout,
        ctx.sink.put(&path, &bytes, revision.as_deref()),
    )
    .await
    .map_err(|_| "put timed out".to_string())?
    .map_err(|err| err.to_string())?;

    Ok(())
}
