//! HTTP route definitions.
//!
//! ## Route Structure
//!
//! ```text
//! /jobs
//!   POST   /jobs              - Submit job (202)
//!   GET    /jobs              - List recent jobs (?limit=)
//!   GET    /jobs/{id}         - Get job
//!   POST   /jobs/{id}/cancel  - Cancel queued job
//!
//! /workflows
//!   GET    /workflows             - List workflows
//!   POST   /workflows             - Save workflow (201)
//!   GET    /workflows/export      - Export mapping document
//!   POST   /workflows/import      - Import batch (?replace=)
//!   GET    /workflows/{name}      - Get workflow
//!   DELETE /workflows/{name}      - Delete workflow (204)
//!   POST   /workflows/{name}/run  - Queue workflow run (202)
//!
//! /events
//!   GET    /events          - SSE stream of live bus events
//!   GET    /events/history  - Recent retained events (?limit=)
//!
//! /snapshots
//!   GET    /snapshots        - Cached summaries
//!   POST   /snapshots/{kind} - Capture snapshot
//!   GET    /snapshots/{kind} - Latest cached payload
//!
//! /health  - Status, version, uptime, queue gauges
//! /devices - Devices visible to the bridge
//! /metrics - Per-action metrics snapshot
//! ```

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::Method;
use axum::routing::{delete, get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::events;
use crate::jobs;
use crate::snapshots;
use crate::state::AppState;
use crate::system;
use crate::workflows;

/// Request bodies beyond this are rejected with 413 before any handler runs.
const MAX_BODY_BYTES: usize = 256 * 1024;

pub fn create_router(state: Arc<AppState>) -> Router {
    let job_routes = Router::new()
        .route("/", post(jobs::submit_job))
        .route("/", get(jobs::list_jobs))
        .route("/{id}", get(jobs::get_job))
        .route("/{id}/cancel", post(jobs::cancel_job))
        .with_state(state.clone());

    let workflow_routes = Router::new()
        .route("/", get(workflows::list_workflows))
        .route("/", post(workflows::save_workflow))
        .route("/export", get(workflows::export_workflows))
        .route("/import", post(workflows::import_workflows))
        .route("/{name}", get(workflows::get_workflow))
        .route("/{name}", delete(workflows::delete_workflow))
        .route("/{name}/run", post(workflows::run_workflow))
        .with_state(state.clone());

    let event_routes = Router::new()
        .route("/", get(events::stream_events))
        .route("/history", get(events::event_history))
        .with_state(state.clone());

    let snapshot_routes = Router::new()
        .route("/", get(snapshots::list_snapshots))
        .route("/{kind}", post(snapshots::capture_snapshot))
        .route("/{kind}", get(snapshots::get_snapshot))
        .with_state(state.clone());

    let system_routes = Router::new()
        .route("/health", get(system::health))
        .route("/devices", get(system::list_devices))
        .route("/metrics", get(system::metrics))
        .with_state(state);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .nest("/jobs", job_routes)
        .nest("/workflows", workflow_routes)
        .nest("/events", event_routes)
        .nest("/snapshots", snapshot_routes)
        .merge(system_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
}

#[cfg(test)]
#[path = "routes_tests.rs"]
mod tests;
