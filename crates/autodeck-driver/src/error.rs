//! Bridge process errors.

use thiserror::Error;

/// Failures while driving the bridge binary.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The binary could not be spawned at all.
    #[error("failed to spawn bridge '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The bridge did not finish within the deadline.
    #[error("bridge timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// The bridge exited non-zero; stderr tail kept for diagnosis.
    #[error("bridge exited with code {code}: {stderr}")]
    Exit { code: i32, stderr: String },

    /// Stdout was not the expected JSON document.
    #[error("unparseable bridge output: {0}")]
    Parse(String),
}

impl From<BridgeError> for autodeck_core::ProviderError {
    fn from(err: BridgeError) -> Self {
        autodeck_core::ProviderError::new(err.to_string())
    }
}
