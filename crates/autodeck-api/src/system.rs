//! Health, device, and metrics handlers.
//!
//! - GET /health  - Status, version, uptime, queue gauges
//! - GET /devices - Devices visible to the bridge
//! - GET /metrics - Per-action metrics snapshot

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use autodeck_core::{Device, MetricsEntry};

use crate::error::ApiResult;
use crate::state::AppState;

/// Health summary.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
    pub queue_depth: usize,
    pub runner_active: bool,
    pub subscribers: usize,
}

/// Response for device listing.
#[derive(Debug, Serialize)]
pub struct DeviceListResponse {
    pub count: usize,
    pub devices: Vec<Device>,
}

/// Response for the metrics snapshot.
#[derive(Debug, Serialize)]
pub struct MetricsResponse {
    pub count: usize,
    pub metrics: Vec<MetricsEntry>,
}

/// Service health and queue gauges.
///
/// GET /health
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.uptime_seconds(),
        queue_depth: state.orchestrator.queue_depth().await,
        runner_active: state.orchestrator.runner_active(),
        subscribers: state.orchestrator.subscriber_count().await,
    })
}

/// Devices currently visible to the bridge. Read-only and safe to call
/// while a job is running.
///
/// GET /devices
pub async fn list_devices(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<DeviceListResponse>> {
    let devices = state.orchestrator.list_devices().await?;
    let count = devices.len();
    Ok(Json(DeviceListResponse { count, devices }))
}

/// Per-action metrics, ordered by descending count.
///
/// GET /metrics
pub async fn metrics(State(state): State<Arc<AppState>>) -> Json<MetricsResponse> {
    let metrics = state.orchestrator.metrics_snapshot().await;
    let count = metrics.len();
    Json(MetricsResponse { count, metrics })
}

#[cfg(test)]
#[path = "system_tests.rs"]
mod tests;
