//! Scripted provider used by tests across the workspace.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::{Mutex, RwLock};

use crate::provider::{
    CaptureOptions, Device, DeviceActionProvider, OpenUrlOutcome, OpenUrlRequest, ProviderError,
    SnapshotKind,
};

/// Provider returning pre-configured responses.
///
/// Defaults to one simulated device and a small payload per snapshot kind.
/// Individual actions can be scripted to fail, snapshots can be replaced per
/// kind, and a fixed latency can be injected to widen race windows in tests.
pub struct MockProvider {
    devices: RwLock<Vec<Device>>,
    snapshots: RwLock<HashMap<SnapshotKind, serde_json::Value>>,
    failures: RwLock<HashMap<String, String>>,
    latency: RwLock<Duration>,
    calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockProvider {
    pub fn new() -> Self {
        let mut snapshots = HashMap::new();
        for kind in SnapshotKind::ALL {
            snapshots.insert(kind, json!({"kind": kind.as_str(), "status": "idle"}));
        }
        Self {
            devices: RwLock::new(vec![Device {
                id: "sim-1".to_string(),
                name: "Simulated Device".to_string(),
                model: Some("sim".to_string()),
                state: Some("online".to_string()),
            }]),
            snapshots: RwLock::new(snapshots),
            failures: RwLock::new(HashMap::new()),
            latency: RwLock::new(Duration::ZERO),
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub async fn set_devices(&self, devices: Vec<Device>) {
        *self.devices.write().await = devices;
    }

    pub async fn set_snapshot(&self, kind: SnapshotKind, payload: serde_json::Value) {
        self.snapshots.write().await.insert(kind, payload);
    }

    /// Script an action to fail. Keys match metric action names:
    /// `open-url`, `list-devices`, `snapshot.<kind>`.
    pub async fn fail_action(&self, action: &str, message: &str) {
        self.failures
            .write()
            .await
            .insert(action.to_string(), message.to_string());
    }

    pub async fn clear_failure(&self, action: &str) {
        self.failures.write().await.remove(action);
    }

    /// Inject fixed latency into every call.
    pub async fn set_latency(&self, latency: Duration) {
        *self.latency.write().await = latency;
    }

    /// Action names in invocation order.
    pub async fn calls(&self) -> Vec<String> {
        self.calls.lock().await.clone()
    }

    /// Highest number of provider calls ever in flight at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn enter(&self, action: &str) -> Result<(), ProviderError> {
        self.calls.lock().await.push(action.to_string());
        let active = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(active, Ordering::SeqCst);

        let latency = *self.latency.read().await;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        if let Some(message) = self.failures.read().await.get(action) {
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            return Err(ProviderError::new(message.clone()));
        }
        Ok(())
    }

    fn exit(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeviceActionProvider for MockProvider {
    async fn list_devices(&self) -> Result<Vec<Device>, ProviderError> {
        self.enter("list-devices").await?;
        let devices = self.devices.read().await.clone();
        self.exit();
        Ok(devices)
    }

    async fn open_url(&self, request: &OpenUrlRequest) -> Result<OpenUrlOutcome, ProviderError> {
        self.enter("open-url").await?;
        let device_id = match &request.device_id {
            Some(id) => id.clone(),
            None => self
                .devices
                .read()
                .await
                .first()
                .map(|device| device.id.clone())
                .unwrap_or_else(|| "sim-1".to_string()),
        };
        let strategy = if request.url.starts_with("http") {
            "browser"
        } else {
            "deep-link"
        };
        self.exit();
        Ok(OpenUrlOutcome {
            device_id,
            strategy: strategy.to_string(),
        })
    }

    async fn capture_snapshot(
        &self,
        kind: SnapshotKind,
        _device_id: Option<&str>,
        _options: &CaptureOptions,
    ) -> Result<serde_json::Value, ProviderError> {
        self.enter(&format!("snapshot.{kind}")).await?;
        let payload = self
            .snapshots
            .read()
            .await
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| json!({}));
        self.exit();
        Ok(payload)
    }
}
