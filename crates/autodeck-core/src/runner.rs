//! Single-runner drain loop.
//!
//! Exactly one drain task exists at any time. Submitting work calls
//! [`JobRunner::trigger`], which spawns the loop only when the active flag
//! was clear. The loop pops jobs strictly in submission order and runs each
//! to completion before touching the next, so device actions never overlap.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::actions::DeviceActions;
use crate::error::CoreError;
use crate::events::{EventBus, EventKind};
use crate::interpreter::WorkflowInterpreter;
use crate::job::{DirectAction, Job, JobInput, StressInput, SuiteInput};
use crate::metrics::MetricsRecorder;
use crate::provider::{CaptureOptions, OpenUrlRequest};
use crate::queue::JobQueue;
use crate::snapshot::SnapshotCache;

/// Metric key covering one whole stress scenario.
pub const ACTION_STRESS_RUN: &str = "stress.run";

pub struct JobRunner {
    queue: Arc<JobQueue>,
    actions: Arc<DeviceActions>,
    snapshots: Arc<SnapshotCache>,
    interpreter: Arc<WorkflowInterpreter>,
    events: Arc<EventBus>,
    metrics: Arc<MetricsRecorder>,
    active: AtomicBool,
}

impl JobRunner {
    pub fn new(
        queue: Arc<JobQueue>,
        actions: Arc<DeviceActions>,
        snapshots: Arc<SnapshotCache>,
        interpreter: Arc<WorkflowInterpreter>,
        events: Arc<EventBus>,
        metrics: Arc<MetricsRecorder>,
    ) -> Self {
        Self {
            queue,
            actions,
            snapshots,
            interpreter,
            events,
            metrics,
            active: AtomicBool::new(false),
        }
    }

    /// Start the drain loop unless one is already running.
    pub fn trigger(self: &Arc<Self>) {
        if self.active.swap(true, Ordering::SeqCst) {
            return;
        }
        let runner = Arc::clone(self);
        tokio::spawn(async move {
            runner.drain().await;
        });
    }

    /// Whether a drain loop currently holds the active flag.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    async fn drain(self: Arc<Self>) {
        debug!("runner drain started");
        loop {
            let Some(job) = self.queue.dequeue().await else {
                self.active.store(false, Ordering::SeqCst);
                // A submit may have landed between the empty dequeue and the
                // flag clearing; reclaim the flag and keep draining so that
                // job is not stranded.
                if self.queue.waiting_len().await == 0
                    || self.active.swap(true, Ordering::SeqCst)
                {
                    debug!("runner drain stopped");
                    return;
                }
                continue;
            };
            self.execute(job).await;
        }
    }

    async fn execute(&self, job: Job) {
        info!(job_id = job.id, kind = %job.kind, "job started");
        self.events
            .publish(
                EventKind::JobRunning,
                format!("job {} ({}) running", job.id, job.kind),
                Some(json!({"id": job.id, "kind": job.kind})),
            )
            .await;

        match self.run_job(&job).await {
            Ok(result) => {
                if let Some(updated) = self.queue.complete(job.id, result).await {
                    info!(
                        job_id = updated.id,
                        duration_ms = updated.duration_ms.unwrap_or(0),
                        "job completed"
                    );
                    self.events
                        .publish(
                            EventKind::JobCompleted,
                            format!("job {} ({}) completed", updated.id, updated.kind),
                            Some(json!({
                                "id": updated.id,
                                "kind": updated.kind,
                                "duration_ms": updated.duration_ms,
                            })),
                        )
                        .await;
                }
            }
            Err(err) => {
                let message = err.to_string();
                if let Some(updated) = self.queue.fail(job.id, message.clone()).await {
                    warn!(job_id = updated.id, error = %message, "job failed");
                    self.events
                        .publish(
                            EventKind::JobFailed,
                            format!("job {} ({}) failed: {message}", updated.id, updated.kind),
                            Some(json!({
                                "id": updated.id,
                                "kind": updated.kind,
                                "error": message,
                            })),
                        )
                        .await;
                }
            }
        }
    }

    async fn run_job(&self, job: &Job) -> Result<Value, CoreError> {
        match &job.input {
            JobInput::DirectAction(action) => self.run_direct(action).await,
            JobInput::SnapshotSuite(input) => self.run_suite(input).await,
            JobInput::StressScenario(input) => self.run_stress(input).await,
            JobInput::WorkflowRun(input) => {
                let output = self
                    .interpreter
                    .run(&input.name, input.device_id.as_deref())
                    .await?;
                Ok(serde_json::to_value(output).unwrap_or_default())
            }
        }
    }

    async fn run_direct(&self, action: &DirectAction) -> Result<Value, CoreError> {
        match action {
            DirectAction::OpenUrl {
                url,
                device_id,
                wait_ms,
            } => {
                let outcome = self
                    .actions
                    .open_url(&OpenUrlRequest {
                        url: url.clone(),
                        device_id: device_id.clone(),
                        wait_ms: *wait_ms,
                    })
                    .await?;
                Ok(serde_json::to_value(outcome).unwrap_or_default())
            }
            DirectAction::ListDevices => {
                let devices = self.actions.list_devices().await?;
                Ok(json!({"count": devices.len(), "devices": devices}))
            }
            DirectAction::CaptureSnapshot {
                kind,
                device_id,
                include_raw,
            } => {
                let result = self
                    .snapshots
                    .capture(
                        *kind,
                        device_id.as_deref(),
                        &CaptureOptions {
                            include_raw: *include_raw,
                        },
                    )
                    .await?;
                Ok(serde_json::to_value(result).unwrap_or_default())
            }
        }
    }

    async fn run_suite(&self, input: &SuiteInput) -> Result<Value, CoreError> {
        let results = self
            .snapshots
            .capture_suite(
                input.device_id.as_deref(),
                &CaptureOptions {
                    include_raw: input.include_raw,
                },
            )
            .await?;
        Ok(json!({
            "captures": results.len(),
            "results": serde_json::to_value(&results).unwrap_or_default(),
        }))
    }

    /// Repeated open-url rounds with optional per-round snapshot. The whole
    /// scenario is one `stress.run` metric; the first failing round aborts
    /// the rest and fails the job.
    async fn run_stress(&self, input: &StressInput) -> Result<Value, CoreError> {
        let started = Instant::now();
        let result = self.run_stress_rounds(input).await;
        let elapsed = started.elapsed().as_millis() as u64;
        match result {
            Ok(rounds) => {
                self.metrics.record(ACTION_STRESS_RUN, elapsed, true, None).await;
                Ok(json!({
                    "iterations": rounds.len(),
                    "rounds": rounds,
                    "duration_ms": elapsed,
                }))
            }
            Err(err) => {
                let message = err.to_string();
                self.metrics
                    .record(ACTION_STRESS_RUN, elapsed, false, Some(&message))
                    .await;
                Err(err)
            }
        }
    }

    async fn run_stress_rounds(&self, input: &StressInput) -> Result<Vec<Value>, CoreError> {
        let request = OpenUrlRequest {
            url: input.url.clone(),
            device_id: input.device_id.clone(),
            wait_ms: input.wait_ms,
        };
        let mut rounds = Vec::with_capacity(input.iterations as usize);
        for round in 0..input.iterations {
            let round_started = Instant::now();
            let outcome = self.actions.open_url(&request).await?;
            let mut entry = json!({
                "round": round + 1,
                "device_id": outcome.device_id,
                "strategy": outcome.strategy,
                "duration_ms": round_started.elapsed().as_millis() as u64,
            });
            if let Some(kind) = input.snapshot_kind {
                let capture = self
                    .snapshots
                    .capture(kind, input.device_id.as_deref(), &CaptureOptions::default())
                    .await?;
                entry["snapshot"] = json!({
                    "kind": kind,
                    "changed": capture.diff.changed_count,
                    "no_previous": capture.diff.no_previous,
                });
            }
            rounds.push(entry);
            if input.pause_ms > 0 && round + 1 < input.iterations {
                tokio::time::sleep(Duration::from_millis(input.pause_ms)).await;
            }
        }
        Ok(rounds)
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
