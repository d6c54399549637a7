//! Error types for the orchestration core.

use thiserror::Error;

use crate::job::JobStatus;

/// Errors surfaced by the orchestration core.
///
/// Every variant maps to a stable machine-readable reason string via
/// [`CoreError::reason`], which the API layer echoes in error bodies.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Malformed job input, workflow definition, or field value.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Unknown job id or workflow name.
    #[error("{0} not found")]
    NotFound(String),

    /// Cancellation requested for a job that already left the wait list.
    #[error("job {id} is {status} and cannot be cancelled")]
    NotCancellable { id: u64, status: JobStatus },

    /// The device bridge reported a failure; message preserved verbatim.
    #[error("bridge action failed: {0}")]
    Provider(String),

    /// A bounded collection or payload limit was exceeded.
    #[error("capacity exceeded: {0}")]
    Capacity(String),

    /// Workflow document persistence failed.
    #[error("storage error: {0}")]
    Storage(String),
}

impl CoreError {
    /// Stable reason tag used in API error bodies and logs.
    pub fn reason(&self) -> &'static str {
        match self {
            CoreError::Validation(_) => "validation",
            CoreError::NotFound(_) => "not-found",
            CoreError::NotCancellable { .. } => "not-cancellable",
            CoreError::Provider(_) => "provider",
            CoreError::Capacity(_) => "capacity",
            CoreError::Storage(_) => "storage",
        }
    }
}
