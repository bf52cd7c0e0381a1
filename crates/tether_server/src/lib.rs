//! Tether Server - HTTP Pairing Surface
//!
//! Exposes the pairing orchestrator over a small axum API: create a
//! session, poll its status, list connected sessions, force a disconnect.

pub mod error;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::router;
pub use state::AppState;
