//! Tether Core - Session Pairing Orchestration
//!
//! This crate provides the session registry, the connection-handle and
//! credential-sink seams, and the pairing orchestrator that links a
//! messaging account to the bot runtime and persists the resulting
//! credentials.

pub mod error;
pub mod id;
pub mod orchestrator;
pub mod pairing;
pub mod session;
pub mod sink;
pub mod staging;
pub mod transport;

pub use error::{CoreError, Result};
pub use id::{AccountId, SessionId};
pub use orchestrator::{OrchestratorConfig, PairingOrchestrator, PairingTicket};
pub use pairing::format_pairing_code;
pub use session::registry::SessionRegistry;
pub use session::{SessionRecord, SessionSnapshot, SessionStatus};
pub use sink::{blob_path, CredentialSink, SinkError, UploadReport};
pub use staging::StagingArea;
pub use transport::{CloseCause, ConnectionEvent, ConnectionHandle, PairingTransport};
