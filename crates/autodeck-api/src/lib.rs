//! # Autodeck API
//!
//! HTTP and SSE surface for the autodeck orchestrator.
//!
//! Every route talks to the shared [`autodeck_core::Orchestrator`] through
//! [`AppState`]; this crate owns no domain state of its own. Domain
//! rejections carry a stable `{"error", "message"}` body, mapped from
//! [`ApiError`].

pub mod error;
pub mod events;
pub mod jobs;
pub mod routes;
pub mod server;
pub mod snapshots;
pub mod state;
pub mod system;
pub mod workflows;

pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use server::{ApiConfig, ApiServer};
pub use state::AppState;
