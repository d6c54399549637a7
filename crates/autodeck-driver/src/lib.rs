//! # Autodeck Driver
//!
//! Bridge-backed [`autodeck_core::DeviceActionProvider`] implementation.
//! Every device action spawns the bridge binary (`devbridge` by default)
//! with a subcommand and reads one JSON document from stdout.

pub mod cli;
pub mod error;
pub mod provider;

pub use cli::BridgeCli;
pub use error::BridgeError;
pub use provider::{BridgeProvider, DEFAULT_BRIDGE_PROGRAM, DEFAULT_BRIDGE_TIMEOUT_MS};
