//! Application state

use std::sync::Arc;

use tether_core::PairingOrchestrator;

#[derive(Debug, Clone)]
pub struct AppState {
    pub orchestrator: Arc<PairingOrchestrator>,
}

impl AppState {
    pub fn new(orchestrator: Arc<PairingOrchestrator>) -> Self {
        AppState { orchestrator }
    }
}
