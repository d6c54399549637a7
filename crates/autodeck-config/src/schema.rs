//! Configuration schema definitions.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub bridge: BridgeConfig,

    #[serde(default)]
    pub queue: QueueConfig,

    #[serde(default)]
    pub events: EventsConfig,

    #[serde(default)]
    pub workflows: WorkflowsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8320
}

/// Device bridge configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Bridge executable name or path.
    #[serde(default = "default_bridge_binary")]
    pub binary: String,

    /// Timeout passed to the bridge for each invocation.
    #[serde(default = "default_bridge_timeout_ms")]
    pub timeout_ms: u64,

    /// Extra arguments prepended to every bridge invocation.
    #[serde(default)]
    pub extra_args: Vec<String>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            binary: default_bridge_binary(),
            timeout_ms: default_bridge_timeout_ms(),
            extra_args: Vec::new(),
        }
    }
}

fn default_bridge_binary() -> String {
    "devbridge".to_string()
}

fn default_bridge_timeout_ms() -> u64 {
    30_000
}

/// Job queue configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Number of jobs retained in history, terminal jobs evicted first.
    #[serde(default = "default_job_history")]
    pub history_capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            history_capacity: default_job_history(),
        }
    }
}

fn default_job_history() -> usize {
    200
}

/// Event bus configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsConfig {
    /// Number of events retained in the replay buffer.
    #[serde(default = "default_event_history")]
    pub history_capacity: usize,

    /// Heartbeat cadence in seconds.
    #[serde(default = "default_heartbeat_secs")]
    pub heartbeat_secs: u64,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            history_capacity: default_event_history(),
            heartbeat_secs: default_heartbeat_secs(),
        }
    }
}

fn default_event_history() -> usize {
    500
}

fn default_heartbeat_secs() -> u64 {
    15
}

/// Workflow store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowsConfig {
    /// JSON document holding the whole name-to-definition mapping.
    #[serde(default = "default_workflows_store_path")]
    pub store_path: String,
}

impl Default for WorkflowsConfig {
    fn default() -> Self {
        Self {
            store_path: default_workflows_store_path(),
        }
    }
}

fn default_workflows_store_path() -> String {
    "~/.autodeck/workflows.json".to_string()
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default log level when RUST_LOG is not set.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for daily rolling log files. Console-only when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            dir: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
