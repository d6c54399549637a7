//! Process-wide orchestration context.
//!
//! Wires the queue, runner, workflow store, interpreter, event bus, metrics
//! recorder, and snapshot cache into one shared context. Every external
//! surface (HTTP, CLI) talks to this facade; nothing reaches around it to
//! the components directly.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::actions::DeviceActions;
use crate::config::OrchestratorConfig;
use crate::error::CoreError;
use crate::events::{Event, EventBus, EventKind, Subscription};
use crate::interpreter::WorkflowInterpreter;
use crate::job::{Job, JobInput, JobKind};
use crate::metrics::{MetricsEntry, MetricsRecorder};
use crate::provider::{CaptureOptions, Device, DeviceActionProvider, SnapshotKind};
use crate::queue::JobQueue;
use crate::runner::JobRunner;
use crate::snapshot::{CaptureResult, SnapshotCache, SnapshotSummary};
use crate::store::{ImportReport, WorkflowStore};
use crate::workflow::WorkflowDefinition;

pub struct Orchestrator {
    config: OrchestratorConfig,
    queue: Arc<JobQueue>,
    runner: Arc<JobRunner>,
    store: Arc<dyn WorkflowStore>,
    events: Arc<EventBus>,
    metrics: Arc<MetricsRecorder>,
    snapshots: Arc<SnapshotCache>,
    actions: Arc<DeviceActions>,
}

impl Orchestrator {
    pub fn new(
        provider: Arc<dyn DeviceActionProvider>,
        store: Arc<dyn WorkflowStore>,
        config: OrchestratorConfig,
    ) -> Arc<Self> {
        let events = Arc::new(EventBus::new(config.event_history_capacity));
        let metrics = Arc::new(MetricsRecorder::new());
        let snapshots = Arc::new(SnapshotCache::new(
            provider.clone(),
            events.clone(),
            metrics.clone(),
        ));
        let actions = Arc::new(DeviceActions::new(provider, metrics.clone()));
        let interpreter = Arc::new(WorkflowInterpreter::new(
            store.clone(),
            actions.clone(),
            snapshots.clone(),
            events.clone(),
            metrics.clone(),
        ));
        let queue = Arc::new(JobQueue::new(config.job_history_capacity));
        let runner = Arc::new(JobRunner::new(
            queue.clone(),
            actions.clone(),
            snapshots.clone(),
            interpreter,
            events.clone(),
            metrics.clone(),
        ));
        info!(
            job_history = config.job_history_capacity,
            event_history = config.event_history_capacity,
            "orchestrator ready"
        );
        Arc::new(Self {
            config,
            queue,
            runner,
            store,
            events,
            metrics,
            snapshots,
            actions,
        })
    }

    // ---- jobs ----

    /// Validate input, enqueue a job, announce it, and kick the runner.
    ///
    /// Validation failures and unknown workflow names are rejected here,
    /// before anything is queued.
    pub async fn submit_job(
        &self,
        kind: JobKind,
        payload: serde_json::Value,
    ) -> Result<Job, CoreError> {
        let input = JobInput::parse(kind, payload)?;
        if let JobInput::WorkflowRun(ref run) = input {
            if self.store.get(&run.name).await?.is_none() {
                return Err(CoreError::NotFound(format!("workflow '{}'", run.name)));
            }
        }
        let job = self.queue.submit(input).await;
        self.events
            .publish(
                EventKind::JobQueued,
                format!("job {} ({}) queued", job.id, job.kind),
                Some(json!({"id": job.id, "kind": job.kind})),
            )
            .await;
        self.runner.trigger();
        Ok(job)
    }

    /// Cancel a queued job and announce the cancellation.
    pub async fn cancel_job(&self, id: u64) -> Result<Job, CoreError> {
        let job = self.queue.cancel(id).await?;
        self.events
            .publish(
                EventKind::JobCancelled,
                format!("job {} ({}) cancelled", job.id, job.kind),
                Some(json!({"id": job.id, "kind": job.kind})),
            )
            .await;
        Ok(job)
    }

    pub async fn get_job(&self, id: u64) -> Result<Job, CoreError> {
        self.queue
            .get(id)
            .await
            .ok_or_else(|| CoreError::NotFound(format!("job {id}")))
    }

    /// Most recent jobs first.
    pub async fn list_jobs(&self, limit: usize) -> Vec<Job> {
        self.queue.list(limit).await
    }

    pub async fn queue_depth(&self) -> usize {
        self.queue.waiting_len().await
    }

    pub fn runner_active(&self) -> bool {
        self.runner.is_active()
    }

    // ---- workflows ----

    pub async fn save_workflow(
        &self,
        document: serde_json::Value,
    ) -> Result<WorkflowDefinition, CoreError> {
        let definition = self.store.save(WorkflowDefinition::parse(document)?).await?;
        self.events
            .publish(
                EventKind::WorkflowSaved,
                format!("workflow '{}' saved", definition.name),
                Some(json!({"name": definition.name, "steps": definition.steps.len()})),
            )
            .await;
        Ok(definition)
    }

    pub async fn get_workflow(&self, name: &str) -> Result<WorkflowDefinition, CoreError> {
        self.store
            .get(name)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("workflow '{name}'")))
    }

    pub async fn list_workflows(&self) -> Result<Vec<WorkflowDefinition>, CoreError> {
        self.store.list().await
    }

    pub async fn delete_workflow(&self, name: &str) -> Result<(), CoreError> {
        self.store.delete(name).await?;
        self.events
            .publish(
                EventKind::WorkflowDeleted,
                format!("workflow '{name}' deleted"),
                Some(json!({"name": name})),
            )
            .await;
        Ok(())
    }

    /// Import a batch of workflow documents and announce the outcome.
    pub async fn import_workflows(
        &self,
        entries: Vec<serde_json::Value>,
        replace: bool,
    ) -> Result<ImportReport, CoreError> {
        let report = self.store.import_batch(entries, replace).await?;
        self.events
            .publish(
                EventKind::WorkflowImported,
                format!(
                    "imported {} workflows ({} skipped)",
                    report.imported.len(),
                    report.skipped.len()
                ),
                Some(json!({
                    "imported": report.imported.len(),
                    "skipped": report.skipped.len(),
                    "replace": replace,
                })),
            )
            .await;
        Ok(report)
    }

    pub async fn export_workflows(
        &self,
    ) -> Result<BTreeMap<String, WorkflowDefinition>, CoreError> {
        self.store.export().await
    }

    /// Queue a run of a stored workflow.
    pub async fn run_workflow(
        &self,
        name: &str,
        device_id: Option<String>,
    ) -> Result<Job, CoreError> {
        let mut payload = json!({"name": name});
        if let Some(device_id) = device_id {
            payload["device_id"] = json!(device_id);
        }
        self.submit_job(JobKind::WorkflowRun, payload).await
    }

    // ---- devices and snapshots ----

    /// List devices directly, outside the job queue. Read-only and safe to
    /// interleave with a running job.
    pub async fn list_devices(&self) -> Result<Vec<Device>, CoreError> {
        self.actions.list_devices().await
    }

    /// Capture a snapshot directly, outside the job queue.
    pub async fn capture_snapshot(
        &self,
        kind: SnapshotKind,
        device_id: Option<&str>,
        options: &CaptureOptions,
    ) -> Result<CaptureResult, CoreError> {
        self.snapshots.capture(kind, device_id, options).await
    }

    pub async fn snapshot_summaries(&self) -> Vec<SnapshotSummary> {
        self.snapshots.summaries().await
    }

    pub async fn cached_snapshot(&self, kind: SnapshotKind) -> Option<serde_json::Value> {
        self.snapshots.cached_payload(kind).await
    }

    // ---- observability ----

    pub async fn metrics_snapshot(&self) -> Vec<MetricsEntry> {
        self.metrics.snapshot().await
    }

    pub async fn subscribe(&self) -> Subscription {
        self.events.subscribe().await
    }

    pub async fn unsubscribe(&self, id: u64) {
        self.events.unsubscribe(id).await
    }

    pub async fn event_history(&self, limit: usize) -> Vec<Event> {
        self.events.history(limit).await
    }

    pub async fn subscriber_count(&self) -> usize {
        self.events.subscriber_count().await
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Spawn the fixed-interval heartbeat publisher. The task runs for the
    /// life of the process; the handle is returned so tests can abort it.
    pub fn spawn_heartbeat(self: &Arc<Self>) -> JoinHandle<()> {
        let events = self.events.clone();
        let period = Duration::from_secs(self.config.heartbeat_secs.max(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // The first tick fires immediately; skip it so subscribers see
            // heartbeats only at the configured cadence.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                events.publish_heartbeat().await;
                debug!("heartbeat published");
            }
        })
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
