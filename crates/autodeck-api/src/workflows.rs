//! Workflow CRUD, import/export, and run handlers.
//!
//! - GET    /workflows             - List workflows
//! - POST   /workflows             - Save workflow (201)
//! - GET    /workflows/export      - Export mapping document
//! - POST   /workflows/import      - Import batch (?replace=)
//! - GET    /workflows/{name}      - Get workflow
//! - DELETE /workflows/{name}      - Delete workflow (204)
//! - POST   /workflows/{name}/run  - Queue workflow run (202)

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};
use tracing::info;

use autodeck_core::{ImportReport, WorkflowDefinition};

use crate::error::ApiResult;
use crate::jobs::JobResponse;
use crate::state::AppState;

/// Response for a single workflow.
#[derive(Debug, Serialize)]
pub struct WorkflowResponse {
    pub workflow: WorkflowDefinition,
}

/// Response for listing workflows.
#[derive(Debug, Serialize)]
pub struct WorkflowListResponse {
    pub count: usize,
    pub workflows: Vec<WorkflowDefinition>,
}

/// Body for workflow import.
#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    pub workflows: Vec<serde_json::Value>,
}

/// Query parameters for import.
#[derive(Debug, Deserialize)]
pub struct ImportQuery {
    #[serde(default)]
    pub replace: bool,
}

/// Optional body for running a stored workflow.
#[derive(Debug, Default, Deserialize)]
pub struct RunWorkflowRequest {
    pub device_id: Option<String>,
}

/// Save a workflow definition, overwriting any previous version.
///
/// POST /workflows
pub async fn save_workflow(
    State(state): State<Arc<AppState>>,
    Json(document): Json<serde_json::Value>,
) -> ApiResult<impl IntoResponse> {
    let workflow = state.orchestrator.save_workflow(document).await?;
    info!(name = %workflow.name, steps = workflow.steps.len(), "workflow saved");
    Ok((StatusCode::CREATED, Json(WorkflowResponse { workflow })))
}

/// List stored workflows ordered by name.
///
/// GET /workflows
pub async fn list_workflows(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<WorkflowListResponse>> {
    let workflows = state.orchestrator.list_workflows().await?;
    let count = workflows.len();
    Ok(Json(WorkflowListResponse { count, workflows }))
}

/// Fetch one workflow by name.
///
/// GET /workflows/{name}
pub async fn get_workflow(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<Json<WorkflowResponse>> {
    let workflow = state.orchestrator.get_workflow(&name).await?;
    Ok(Json(WorkflowResponse { workflow }))
}

/// Delete a workflow.
///
/// DELETE /workflows/{name}
pub async fn delete_workflow(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<StatusCode> {
    state.orchestrator.delete_workflow(&name).await?;
    info!(name = %name, "workflow deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Queue a run of a stored workflow.
///
/// POST /workflows/{name}/run
pub async fn run_workflow(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    body: Option<Json<RunWorkflowRequest>>,
) -> ApiResult<impl IntoResponse> {
    let request = body.map(|Json(request)| request).unwrap_or_default();
    let job = state
        .orchestrator
        .run_workflow(&name, request.device_id)
        .await?;
    info!(name = %name, id = job.id, "workflow run queued");
    Ok((StatusCode::ACCEPTED, Json(JobResponse { job })))
}

/// Import a batch of workflow documents. Malformed entries are skipped and
/// reported, never fatal to the batch.
///
/// POST /workflows/import?replace=
pub async fn import_workflows(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ImportQuery>,
    Json(request): Json<ImportRequest>,
) -> ApiResult<Json<ImportReport>> {
    let report = state
        .orchestrator
        .import_workflows(request.workflows, query.replace)
        .await?;
    info!(
        imported = report.imported.len(),
        skipped = report.skipped.len(),
        replace = query.replace,
        "workflows imported"
    );
    Ok(Json(report))
}

/// Export the full name-to-definition mapping.
///
/// GET /workflows/export
pub async fn export_workflows(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<BTreeMap<String, WorkflowDefinition>>> {
    Ok(Json(state.orchestrator.export_workflows().await?))
}

#[cfg(test)]
#[path = "workflows_tests.rs"]
mod tests;
