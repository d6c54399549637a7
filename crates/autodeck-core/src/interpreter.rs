//! Workflow step interpreter.
//!
//! Runs a stored workflow's steps strictly in definition order, aborting on
//! the first failure. Each finished step is announced as a `workflow-step`
//! event; the whole run is recorded once under the `workflow.run` metric,
//! success or not.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::actions::DeviceActions;
use crate::error::CoreError;
use crate::events::{EventBus, EventKind};
use crate::metrics::MetricsRecorder;
use crate::provider::{CaptureOptions, OpenUrlRequest};
use crate::snapshot::SnapshotCache;
use crate::store::WorkflowStore;
use crate::workflow::{WorkflowDefinition, WorkflowStep};

/// Metric key covering one whole workflow run.
pub const ACTION_WORKFLOW_RUN: &str = "workflow.run";

/// Output of one executed step.
#[derive(Debug, Clone, Serialize)]
pub struct StepOutput {
    /// Zero-based position in the workflow.
    pub index: usize,
    pub step: String,
    pub duration_ms: u64,
    pub output: Value,
}

/// Output of a complete workflow run.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowRunOutput {
    pub workflow: String,
    pub steps: Vec<StepOutput>,
    pub duration_ms: u64,
}

pub struct WorkflowInterpreter {
    store: Arc<dyn WorkflowStore>,
    actions: Arc<DeviceActions>,
    snapshots: Arc<SnapshotCache>,
    events: Arc<EventBus>,
    metrics: Arc<MetricsRecorder>,
}

impl WorkflowInterpreter {
    pub fn new(
        store: Arc<dyn WorkflowStore>,
        actions: Arc<DeviceActions>,
        snapshots: Arc<SnapshotCache>,
        events: Arc<EventBus>,
        metrics: Arc<MetricsRecorder>,
    ) -> Self {
        Self {
            store,
            actions,
            snapshots,
            events,
            metrics,
        }
    }

    /// Look up and run a stored workflow.
    pub async fn run(
        &self,
        name: &str,
        device_id: Option<&str>,
    ) -> Result<WorkflowRunOutput, CoreError> {
        let definition = self
            .store
            .get(name)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("workflow '{name}'")))?;

        info!(workflow = name, steps = definition.steps.len(), "workflow run started");
        let started = Instant::now();
        let result = self.run_steps(&definition, device_id).await;
        let elapsed = started.elapsed().as_millis() as u64;

        match result {
            Ok(steps) => {
                self.metrics.record(ACTION_WORKFLOW_RUN, elapsed, true, None).await;
                info!(workflow = name, duration_ms = elapsed, "workflow run finished");
                Ok(WorkflowRunOutput {
                    workflow: definition.name,
                    steps,
                    duration_ms: elapsed,
                })
            }
            Err(err) => {
                let message = err.to_string();
                self.metrics
                    .record(ACTION_WORKFLOW_RUN, elapsed, false, Some(&message))
                    .await;
                Err(err)
            }
        }
    }

    async fn run_steps(
        &self,
        definition: &WorkflowDefinition,
        device_id: Option<&str>,
    ) -> Result<Vec<StepOutput>, CoreError> {
        let mut outputs = Vec::with_capacity(definition.steps.len());
        for (index, step) in definition.steps.iter().enumerate() {
            let started = Instant::now();
            let output = self.run_step(step, device_id).await?;
            let duration_ms = started.elapsed().as_millis() as u64;
            debug!(workflow = %definition.name, index, step = step.tag(), duration_ms, "step finished");
            self.events
                .publish(
                    EventKind::WorkflowStep,
                    format!(
                        "workflow '{}' step {}/{} ({}) finished",
                        definition.name,
                        index + 1,
                        definition.steps.len(),
                        step.tag()
                    ),
                    Some(json!({
                        "workflow": definition.name,
                        "index": index,
                        "step": step.tag(),
                        "duration_ms": duration_ms,
                    })),
                )
                .await;
            outputs.push(StepOutput {
                index,
                step: step.tag().to_string(),
                duration_ms,
                output,
            });
        }
        Ok(outputs)
    }

    async fn run_step(
        &self,
        step: &WorkflowStep,
        device_id: Option<&str>,
    ) -> Result<Value, CoreError> {
        match step {
            WorkflowStep::OpenUrl { url, wait_ms } => {
                let outcome = self
                    .actions
                    .open_url(&OpenUrlRequest {
                        url: url.clone(),
                        device_id: device_id.map(str::to_string),
                        wait_ms: *wait_ms,
                    })
                    .await?;
                Ok(serde_json::to_value(outcome).unwrap_or_default())
            }
            WorkflowStep::CaptureSnapshot { kind, include_raw } => {
                let result = self
                    .snapshots
                    .capture(
                        *kind,
                        device_id,
                        &CaptureOptions {
                            include_raw: *include_raw,
                        },
                    )
                    .await?;
                Ok(serde_json::to_value(result).unwrap_or_default())
            }
            WorkflowStep::CaptureSnapshotSuite => {
                let results = self
                    .snapshots
                    .capture_suite(device_id, &CaptureOptions::default())
                    .await?;
                Ok(json!({
                    "captures": results.len(),
                    "kinds": results
                        .iter()
                        .map(|r| r.summary.kind.as_str())
                        .collect::<Vec<_>>(),
                }))
            }
            WorkflowStep::Sleep { duration_ms } => {
                tokio::time::sleep(std::time::Duration::from_millis(*duration_ms)).await;
                Ok(json!({ "slept_ms": duration_ms }))
            }
        }
    }
}

#[cfg(test)]
#[path = "interpreter_tests.rs"]
mod tests;
