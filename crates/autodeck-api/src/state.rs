//! Shared handler state.

use std::sync::Arc;
use std::time::Instant;

use autodeck_core::Orchestrator;

/// State shared by every route.
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    started: Instant,
}

impl AppState {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            orchestrator,
            started: Instant::now(),
        }
    }

    /// Seconds since this state was created, for health reporting.
    pub fn uptime_seconds(&self) -> u64 {
        self.started.elapsed().as_secs()
    }
}
