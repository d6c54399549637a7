//! Orchestrator tuning knobs.

use serde::{Deserialize, Serialize};

/// Capacities and intervals for the orchestration core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Retained job records; the oldest terminal record is evicted beyond
    /// this.
    #[serde(default = "default_job_history")]
    pub job_history_capacity: usize,

    /// Retained events; the oldest is dropped beyond this.
    #[serde(default = "default_event_history")]
    pub event_history_capacity: usize,

    /// Seconds between subscriber heartbeats.
    #[serde(default = "default_heartbeat_secs")]
    pub heartbeat_secs: u64,
}

fn default_job_history() -> usize {
    crate::queue::DEFAULT_JOB_HISTORY
}

fn default_event_history() -> usize {
    crate::events::DEFAULT_EVENT_HISTORY
}

fn default_heartbeat_secs() -> u64 {
    15
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            job_history_capacity: default_job_history(),
            event_history_capacity: default_event_history(),
            heartbeat_secs: default_heartbeat_secs(),
        }
    }
}
