//! [`DeviceActionProvider`] backed by the bridge CLI.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use autodeck_core::provider::{
    CaptureOptions, Device, DeviceActionProvider, OpenUrlOutcome, OpenUrlRequest, ProviderError,
    SnapshotKind,
};

use crate::cli::BridgeCli;

/// Default bridge binary name, resolved through PATH.
pub const DEFAULT_BRIDGE_PROGRAM: &str = "devbridge";
/// Default per-call budget.
pub const DEFAULT_BRIDGE_TIMEOUT_MS: u64 = 30_000;

/// Provider that shells out to the bridge binary for every action.
pub struct BridgeProvider {
    cli: BridgeCli,
}

#[derive(Debug, Deserialize)]
struct DeviceListDocument {
    #[serde(default)]
    devices: Vec<Device>,
}

#[derive(Debug, Deserialize)]
struct OpenUrlDocument {
    #[serde(alias = "device")]
    device_id: String,
    #[serde(default = "default_strategy")]
    strategy: String,
}

fn default_strategy() -> String {
    "default".to_string()
}

impl BridgeProvider {
    pub fn new(program: impl Into<String>, timeout_ms: u64) -> Self {
        Self {
            cli: BridgeCli::new(program, timeout_ms),
        }
    }

    /// Extra arguments placed before the subcommand on every call.
    pub fn with_extra_args(mut self, args: Vec<String>) -> Self {
        self.cli = self.cli.with_base_args(args);
        self
    }
}

impl Default for BridgeProvider {
    fn default() -> Self {
        Self::new(DEFAULT_BRIDGE_PROGRAM, DEFAULT_BRIDGE_TIMEOUT_MS)
    }
}

#[async_trait]
impl DeviceActionProvider for BridgeProvider {
    async fn list_devices(&self) -> Result<Vec<Device>, ProviderError> {
        let value = self.cli.run(&["devices"]).await?;
        // The bridge emits either a bare array or {"devices": [...]}.
        let devices = if value.is_array() {
            serde_json::from_value::<Vec<Device>>(value)
        } else {
            serde_json::from_value::<DeviceListDocument>(value).map(|doc| doc.devices)
        }
        .map_err(|e| ProviderError::new(format!("unexpected devices document: {e}")))?;
        debug!(count = devices.len(), "bridge listed devices");
        Ok(devices)
    }

    async fn open_url(&self, request: &OpenUrlRequest) -> Result<OpenUrlOutcome, ProviderError> {
        let wait = request.wait_ms.to_string();
        let mut args = vec!["open", request.url.as_str(), "--wait-ms", wait.as_str()];
        if let Some(device_id) = &request.device_id {
            args.push("--device");
            args.push(device_id.as_str());
        }
        let value = self.cli.run(&args).await?;
        let outcome: OpenUrlDocument = serde_json::from_value(value)
            .map_err(|e| ProviderError::new(format!("unexpected open document: {e}")))?;
        Ok(OpenUrlOutcome {
            device_id: outcome.device_id,
            strategy: outcome.strategy,
        })
    }

    async fn capture_snapshot(
        &self,
        kind: SnapshotKind,
        device_id: Option<&str>,
        _options: &CaptureOptions,
    ) -> Result<serde_json::Value, ProviderError> {
        let mut args = vec!["snapshot", kind.as_str()];
        if let Some(device_id) = device_id {
            args.push("--device");
            args.push(device_id);
        }
        let value = self.cli.run(&args).await?;
        Ok(value)
    }
}

#[cfg(test)]
#[path = "provider_tests.rs"]
mod tests;
