//! Device action provider seam.
//!
//! Everything the orchestrator knows about the outside world goes through
//! [`DeviceActionProvider`]. Implementations wrap a concrete transport (the
//! bundled one shells out to a bridge binary); the core never sees transport
//! details, only outcomes and opaque error messages.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure reported by a provider. The message is preserved verbatim all the
/// way to job records and API responses; the core never parses it.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct ProviderError(pub String);

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Snapshot kinds the bridge can capture. Ordered by declaration; the cache
/// and suite captures both follow this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SnapshotKind {
    Ui,
    Media,
    System,
    Network,
}

impl SnapshotKind {
    /// All kinds, in suite capture order.
    pub const ALL: [SnapshotKind; 4] = [
        SnapshotKind::Ui,
        SnapshotKind::Media,
        SnapshotKind::System,
        SnapshotKind::Network,
    ];

    /// Kebab-case name as used on the wire and in metric keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            SnapshotKind::Ui => "ui",
            SnapshotKind::Media => "media",
            SnapshotKind::System => "system",
            SnapshotKind::Network => "network",
        }
    }

    /// Parse a kebab-case kind name.
    pub fn parse(value: &str) -> Option<SnapshotKind> {
        match value {
            "ui" => Some(SnapshotKind::Ui),
            "media" => Some(SnapshotKind::Media),
            "system" => Some(SnapshotKind::System),
            "network" => Some(SnapshotKind::Network),
            _ => None,
        }
    }
}

impl std::fmt::Display for SnapshotKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A connected device as reported by the bridge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

/// Parameters for an open-url action.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpenUrlRequest {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    /// How long the bridge should wait for the target to settle.
    #[serde(default)]
    pub wait_ms: u64,
}

/// Outcome of an open-url action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenUrlOutcome {
    pub device_id: String,
    /// Launch strategy the bridge chose, e.g. `deep-link` or `browser`.
    pub strategy: String,
}

/// Options applied to a snapshot capture.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CaptureOptions {
    /// Include the raw payload in the capture result instead of only the
    /// structural summary.
    #[serde(default)]
    pub include_raw: bool,
}

/// A single device operation surface.
///
/// Calls may take arbitrarily long; the orchestrator's sequential runner is
/// what keeps them from overlapping. Any [`ProviderError`] is an action
/// failure, never a crash.
#[async_trait]
pub trait DeviceActionProvider: Send + Sync {
    /// Enumerate devices currently visible to the bridge.
    async fn list_devices(&self) -> Result<Vec<Device>, ProviderError>;

    /// Open a URL or deep link, optionally on a specific device.
    async fn open_url(&self, request: &OpenUrlRequest) -> Result<OpenUrlOutcome, ProviderError>;

    /// Capture one snapshot of the given kind and return its JSON payload.
    async fn capture_snapshot(
        &self,
        kind: SnapshotKind,
        device_id: Option<&str>,
        options: &CaptureOptions,
    ) -> Result<serde_json::Value, ProviderError>;
}
