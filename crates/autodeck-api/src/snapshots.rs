//! Snapshot capture and cache handlers.
//!
//! - POST /snapshots/{kind} - Capture snapshot, diffed against the cache
//! - GET  /snapshots        - Cached summaries
//! - GET  /snapshots/{kind} - Latest cached payload

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use serde::{Deserialize, Serialize};

use autodeck_core::{CaptureOptions, CaptureResult, CoreError, SnapshotKind, SnapshotSummary};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Optional body for a snapshot capture.
#[derive(Debug, Default, Deserialize)]
pub struct CaptureRequest {
    pub device_id: Option<String>,
    #[serde(default)]
    pub include_raw: bool,
}

/// Response for cached snapshot summaries.
#[derive(Debug, Serialize)]
pub struct SnapshotListResponse {
    pub count: usize,
    pub snapshots: Vec<SnapshotSummary>,
}

fn parse_kind(kind: &str) -> Result<SnapshotKind, ApiError> {
    SnapshotKind::parse(kind)
        .ok_or_else(|| ApiError::BadRequest(format!("unknown snapshot kind '{kind}'")))
}

/// Capture a snapshot immediately, outside the job queue. The result is
/// diffed against and replaces the cached payload for that kind.
///
/// POST /snapshots/{kind}
pub async fn capture_snapshot(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
    body: Option<Json<CaptureRequest>>,
) -> ApiResult<Json<CaptureResult>> {
    let kind = parse_kind(&kind)?;
    let request = body.map(|Json(request)| request).unwrap_or_default();
    let options = CaptureOptions {
        include_raw: request.include_raw,
    };
    let result = state
        .orchestrator
        .capture_snapshot(kind, request.device_id.as_deref(), &options)
        .await?;
    Ok(Json(result))
}

/// Summaries of all cached snapshots, in kind order.
///
/// GET /snapshots
pub async fn list_snapshots(State(state): State<Arc<AppState>>) -> Json<SnapshotListResponse> {
    let snapshots = state.orchestrator.snapshot_summaries().await;
    let count = snapshots.len();
    Json(SnapshotListResponse { count, snapshots })
}

/// Latest cached payload for one kind; 404 until something captures it.
///
/// GET /snapshots/{kind}
pub async fn get_snapshot(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let kind = parse_kind(&kind)?;
    let payload = state
        .orchestrator
        .cached_snapshot(kind)
        .await
        .ok_or_else(|| CoreError::NotFound(format!("snapshot '{kind}'")))?;
    Ok(Json(payload))
}

#[cfg(test)]
#[path = "snapshots_tests.rs"]
mod tests;
