//! Tether Store - Remote Credential Persistence
//!
//! Implements the core's credential-sink seam against the GitHub contents
//! API, treating the repository as an opaque durable blob store keyed by
//! `sessions/<account>/<filename>`.

pub mod config;
pub mod error;
pub mod github;

pub use config::{RepoTarget, StoreConfig, REPO_ENV, TOKEN_ENV};
pub use error::{StoreError, StoreResult};
pub use github::GithubStore;
