//! Autodeck control plane binary.
//!
//! Wires the orchestration core to the bridge provider and the HTTP API,
//! driven by a TOML configuration file and a small CLI.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use autodeck_api::{ApiConfig, ApiServer};
use autodeck_config::{Config, ConfigLoader, ConfigValidator, LoggingConfig};
use autodeck_core::{DeviceActionProvider, FileWorkflowStore, Orchestrator, OrchestratorConfig};
use autodeck_driver::BridgeProvider;

/// Autodeck CLI.
#[derive(Parser)]
#[command(name = "autodeck")]
#[command(about = "Control plane for a command-line device-automation bridge")]
#[command(version)]
struct Cli {
    /// Configuration file path. Falls back to ~/.autodeck/config.toml, then
    /// to built-in defaults.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the API server in the foreground (default)
    Run {
        /// Bind host, overriding the configured value
        #[arg(long)]
        host: Option<String>,

        /// Bind port, overriding the configured value
        #[arg(long)]
        port: Option<u16>,
    },

    /// List devices visible to the bridge and exit
    Devices,
}

fn autodeck_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".autodeck"))
        .unwrap_or_else(|| PathBuf::from(".autodeck"))
}

/// Load the explicit config file, or the default one when it exists, or
/// built-in defaults.
fn load_config(path: Option<&Path>) -> Result<Config, Box<dyn std::error::Error>> {
    if let Some(path) = path {
        return Ok(ConfigLoader::load(path)?);
    }
    let default_path = autodeck_dir().join("config.toml");
    if default_path.exists() {
        return Ok(ConfigLoader::load(&default_path)?);
    }
    Ok(Config::default())
}

/// Initialize tracing with a console layer and, when a log directory is
/// configured, a daily-rotated file layer.
fn init_tracing(logging: &LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.level.clone()));

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_ansi(true));

    match &logging.dir {
        Some(dir) => {
            let log_dir = ConfigLoader::expand_path(dir);
            std::fs::create_dir_all(&log_dir)?;
            let file_appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix("autodeck")
                .filename_suffix("log")
                .max_log_files(30)
                .build(&log_dir)?;
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            // Keep the writer guard alive for the life of the process so
            // buffered lines are flushed on exit.
            static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
                std::sync::OnceLock::new();
            let _ = GUARD.set(guard);

            registry
                .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
                .init();
        }
        None => registry.init(),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref())?;
    init_tracing(&config.logging)?;

    let report = ConfigValidator::validate(&mut config)?;
    for warning in &report.warnings {
        warn!(path = %warning.path, "config: {}", warning.message);
    }
    if !report.is_valid() {
        for error in &report.errors {
            error!(path = %error.path, "config: {}", error.message);
        }
        return Err("configuration is invalid".into());
    }

    match cli.command {
        None => run_server(config, None, None).await,
        Some(Commands::Run { host, port }) => run_server(config, host, port).await,
        Some(Commands::Devices) => list_devices(config).await,
    }
}

fn bridge_provider(config: &Config) -> BridgeProvider {
    BridgeProvider::new(config.bridge.binary.clone(), config.bridge.timeout_ms)
        .with_extra_args(config.bridge.extra_args.clone())
}

/// Run the orchestrator and its API server in the foreground.
async fn run_server(
    config: Config,
    host: Option<String>,
    port: Option<u16>,
) -> Result<(), Box<dyn std::error::Error>> {
    info!("starting autodeck v{}", env!("CARGO_PKG_VERSION"));

    let store_path = ConfigLoader::expand_path(&config.workflows.store_path);
    let store = Arc::new(FileWorkflowStore::open(&store_path).await?);
    info!(path = %store_path, "workflow store ready");

    let provider = Arc::new(bridge_provider(&config));
    info!(
        binary = %config.bridge.binary,
        timeout_ms = config.bridge.timeout_ms,
        "bridge provider ready"
    );

    let orchestrator = Orchestrator::new(
        provider,
        store,
        OrchestratorConfig {
            job_history_capacity: config.queue.history_capacity,
            event_history_capacity: config.events.history_capacity,
            heartbeat_secs: config.events.heartbeat_secs,
        },
    );
    let _heartbeat = orchestrator.spawn_heartbeat();

    let host = host.unwrap_or(config.server.host);
    let port = port.unwrap_or(config.server.port);
    let server = ApiServer::new(ApiConfig::new(host, port), orchestrator);
    server.run().await
}

/// One-shot device listing against the configured bridge.
async fn list_devices(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let provider = bridge_provider(&config);
    let devices = provider.list_devices().await?;
    println!("{}", serde_json::to_string_pretty(&devices)?);
    Ok(())
}
