//! Job submission and lifecycle handlers.
//!
//! - POST /jobs              - Submit job (202)
//! - GET  /jobs              - List recent jobs
//! - GET  /jobs/{id}         - Get job
//! - POST /jobs/{id}/cancel  - Cancel queued job

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};
use tracing::info;

use autodeck_core::{Job, JobKind};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Jobs returned by GET /jobs when no limit is given.
const DEFAULT_LIST_LIMIT: usize = 50;

/// Body for job submission.
#[derive(Debug, Deserialize)]
pub struct SubmitJobRequest {
    pub kind: String,
    #[serde(default = "default_input")]
    pub input: serde_json::Value,
}

fn default_input() -> serde_json::Value {
    serde_json::json!({})
}

/// Query parameters for job listing.
#[derive(Debug, Deserialize)]
pub struct ListJobsQuery {
    pub limit: Option<usize>,
}

/// Response for a single job.
#[derive(Debug, Serialize)]
pub struct JobResponse {
    pub job: Job,
}

/// Response for listing jobs.
#[derive(Debug, Serialize)]
pub struct JobListResponse {
    pub count: usize,
    pub jobs: Vec<Job>,
}

/// Submit a job. The job is validated here and runs in submission order.
///
/// POST /jobs
pub async fn submit_job(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SubmitJobRequest>,
) -> ApiResult<impl IntoResponse> {
    let kind = JobKind::parse(&request.kind)
        .ok_or_else(|| ApiError::BadRequest(format!("unknown job kind '{}'", request.kind)))?;
    let job = state.orchestrator.submit_job(kind, request.input).await?;
    info!(id = job.id, kind = %job.kind, "job accepted");
    Ok((StatusCode::ACCEPTED, Json(JobResponse { job })))
}

/// List recent jobs, newest first.
///
/// GET /jobs?limit=
pub async fn list_jobs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListJobsQuery>,
) -> Json<JobListResponse> {
    let jobs = state
        .orchestrator
        .list_jobs(query.limit.unwrap_or(DEFAULT_LIST_LIMIT))
        .await;
    let count = jobs.len();
    Json(JobListResponse { count, jobs })
}

/// Fetch one job.
///
/// GET /jobs/{id}
pub async fn get_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> ApiResult<Json<JobResponse>> {
    let job = state.orchestrator.get_job(id).await?;
    Ok(Json(JobResponse { job }))
}

/// Cancel a queued job. Running and finished jobs are not cancellable.
///
/// POST /jobs/{id}/cancel
pub async fn cancel_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> ApiResult<Json<JobResponse>> {
    let job = state.orchestrator.cancel_job(id).await?;
    info!(id = job.id, "job cancelled");
    Ok(Json(JobResponse { job }))
}

#[cfg(test)]
#[path = "jobs_tests.rs"]
mod tests;
