//! Instrumented device actions.
//!
//! Thin layer over the provider that owns the timing, metric recording, and
//! error mapping for the two plain actions. Snapshot captures live in
//! [`crate::snapshot::SnapshotCache`] because they also touch cache state.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};

use crate::error::CoreError;
use crate::metrics::MetricsRecorder;
use crate::provider::{Device, DeviceActionProvider, OpenUrlOutcome, OpenUrlRequest};

/// Metric key for open-url actions.
pub const ACTION_OPEN_URL: &str = "open-url";
/// Metric key for device listing.
pub const ACTION_LIST_DEVICES: &str = "list-devices";

pub struct DeviceActions {
    provider: Arc<dyn DeviceActionProvider>,
    metrics: Arc<MetricsRecorder>,
}

impl DeviceActions {
    pub fn new(provider: Arc<dyn DeviceActionProvider>, metrics: Arc<MetricsRecorder>) -> Self {
        Self { provider, metrics }
    }

    /// Open a URL through the bridge, recording one `open-url` metric.
    pub async fn open_url(&self, request: &OpenUrlRequest) -> Result<OpenUrlOutcome, CoreError> {
        let started = Instant::now();
        let result = self.provider.open_url(request).await;
        let elapsed = started.elapsed().as_millis() as u64;
        match result {
            Ok(outcome) => {
                self.metrics.record(ACTION_OPEN_URL, elapsed, true, None).await;
                debug!(url = %request.url, device_id = %outcome.device_id, "url opened");
                Ok(outcome)
            }
            Err(err) => {
                let message = err.to_string();
                self.metrics
                    .record(ACTION_OPEN_URL, elapsed, false, Some(&message))
                    .await;
                warn!(url = %request.url, error = %message, "open-url failed");
                Err(CoreError::Provider(message))
            }
        }
    }

    /// List devices, recording one `list-devices` metric.
    pub async fn list_devices(&self) -> Result<Vec<Device>, CoreError> {
        let started = Instant::now();
        let result = self.provider.list_devices().await;
        let elapsed = started.elapsed().as_millis() as u64;
        match result {
            Ok(devices) => {
                self.metrics
                    .record(ACTION_LIST_DEVICES, elapsed, true, None)
                    .await;
                debug!(count = devices.len(), "devices listed");
                Ok(devices)
            }
            Err(err) => {
                let message = err.to_string();
                self.metrics
                    .record(ACTION_LIST_DEVICES, elapsed, false, Some(&message))
                    .await;
                warn!(error = %message, "list-devices failed");
                Err(CoreError::Provider(message))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_provider::MockProvider;

    #[tokio::test]
    async fn test_open_url_success_records_metric() {
        let provider = Arc::new(MockProvider::new());
        let metrics = Arc::new(MetricsRecorder::new());
        let actions = DeviceActions::new(provider, metrics.clone());

        let request = OpenUrlRequest {
            url: "https://example.com".to_string(),
            ..Default::default()
        };
        let outcome = actions.open_url(&request).await.unwrap();
        assert!(!outcome.device_id.is_empty());

        let snapshot = metrics.snapshot().await;
        assert_eq!(snapshot[0].action, ACTION_OPEN_URL);
        assert_eq!(snapshot[0].success, 1);
    }

    #[tokio::test]
    async fn test_provider_error_message_preserved() {
        let provider = Arc::new(MockProvider::new());
        provider.fail_action("open-url", "bridge exited with status 3").await;
        let metrics = Arc::new(MetricsRecorder::new());
        let actions = DeviceActions::new(provider, metrics.clone());

        let request = OpenUrlRequest {
            url: "https://example.com".to_string(),
            ..Default::default()
        };
        let err = actions.open_url(&request).await.unwrap_err();
        assert_eq!(err.reason(), "provider");
        assert!(err.to_string().contains("bridge exited with status 3"));

        let snapshot = metrics.snapshot().await;
        assert_eq!(snapshot[0].errors, 1);
        assert_eq!(
            snapshot[0].last_error.as_deref(),
            Some("bridge exited with status 3")
        );
    }

    #[tokio::test]
    async fn test_list_devices_records_metric() {
        let provider = Arc::new(MockProvider::new());
        let metrics = Arc::new(MetricsRecorder::new());
        let actions = DeviceActions::new(provider, metrics.clone());

        let devices = actions.list_devices().await.unwrap();
        assert!(!devices.is_empty());

        let snapshot = metrics.snapshot().await;
        assert_eq!(snapshot[0].action, ACTION_LIST_DEVICES);
        assert_eq!(snapshot[0].count, 1);
    }
}
