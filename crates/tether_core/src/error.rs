//! Error types for tether_core.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Result type for core operations.
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

/// Errors that can occur while orchestrating a pairing session.
#[derive(Debug, Error, Diagnostic)]
pub enum CoreError {
    /// The supplied account identifier is not usable.
    #[error("invalid account identifier '{value}': {reason}")]
    #[diagnostic(
        code(tether_core::invalid_account),
        help("Account identifiers are 10-15 digits and must not start with a zero")
    )]
    InvalidAccount { value: String, reason: String },

    /// No session is registered under the given id.
    #[error("session not found: {id}")]
    #[diagnostic(code(tether_core::session_not_found))]
    SessionNotFound { id: String },

    /// The protocol transport failed during session creation.
    #[error("pairing failed for account {account}: {cause}")]
    #[diagnostic(
        code(tether_core::pairing_failed),
        help("The protocol transport rejected the connection attempt; no session state was kept")
    )]
    Pairing { account: String, cause: String },

    /// Local staging directory could not be created, listed, or removed.
    #[error("staging failure at {path}")]
    #[diagnostic(code(tether_core::staging))]
    Staging {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CoreError {
    /// Shorthand for transport failures wrapping an arbitrary cause.
    pub fn pairing(account: impl Into<String>, cause: impl Into<String>) -> Self {
        CoreError::Pairing {
            account: account.into(),
            cause: cause.into(),
        }
    }
}
