//! Job records and validated job inputs.
//!
//! A job is the unit of queued work. Inputs are validated and normalized
//! once at submission through [`JobInput::parse`]; after that point the
//! runner can trust every field. Status transitions are one-directional:
//! `queued -> running -> {completed, failed}` and `queued -> cancelled`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::provider::SnapshotKind;

/// Upper bound applied to open-url settle waits.
pub const MAX_WAIT_MS: u64 = 60_000;
/// Iteration bounds for stress scenarios.
pub const MAX_STRESS_ITERATIONS: u32 = 50;
/// Upper bound applied to the pause between stress rounds.
pub const MAX_STRESS_PAUSE_MS: u64 = 10_000;

/// Job kinds accepted by the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobKind {
    DirectAction,
    SnapshotSuite,
    StressScenario,
    WorkflowRun,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::DirectAction => "direct-action",
            JobKind::SnapshotSuite => "snapshot-suite",
            JobKind::StressScenario => "stress-scenario",
            JobKind::WorkflowRun => "workflow-run",
        }
    }

    /// Parse a kebab-case kind name.
    pub fn parse(value: &str) -> Option<JobKind> {
        match value {
            "direct-action" => Some(JobKind::DirectAction),
            "snapshot-suite" => Some(JobKind::SnapshotSuite),
            "stress-scenario" => Some(JobKind::StressScenario),
            "workflow-run" => Some(JobKind::WorkflowRun),
            _ => None,
        }
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Job lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    /// Terminal statuses have no outgoing transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single direct device action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum DirectAction {
    OpenUrl {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        device_id: Option<String>,
        #[serde(default)]
        wait_ms: u64,
    },
    ListDevices,
    CaptureSnapshot {
        kind: SnapshotKind,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        device_id: Option<String>,
        #[serde(default)]
        include_raw: bool,
    },
}

impl DirectAction {
    fn normalized(self) -> Result<DirectAction, CoreError> {
        match self {
            DirectAction::OpenUrl {
                url,
                device_id,
                wait_ms,
            } => Ok(DirectAction::OpenUrl {
                url: validate_url(&url)?,
                device_id,
                wait_ms: wait_ms.min(MAX_WAIT_MS),
            }),
            other => Ok(other),
        }
    }
}

/// Input for a full snapshot suite capture.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SuiteInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(default)]
    pub include_raw: bool,
}

/// Input for a repeated open-url stress scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressInput {
    pub url: String,
    #[serde(default = "default_iterations")]
    pub iterations: u32,
    #[serde(default)]
    pub pause_ms: u64,
    #[serde(default)]
    pub wait_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    /// Capture this snapshot kind after every round when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_kind: Option<SnapshotKind>,
}

fn default_iterations() -> u32 {
    1
}

impl StressInput {
    fn normalized(self) -> Result<StressInput, CoreError> {
        Ok(StressInput {
            url: validate_url(&self.url)?,
            iterations: self.iterations.clamp(1, MAX_STRESS_ITERATIONS),
            pause_ms: self.pause_ms.min(MAX_STRESS_PAUSE_MS),
            wait_ms: self.wait_ms.min(MAX_WAIT_MS),
            device_id: self.device_id,
            snapshot_kind: self.snapshot_kind,
        })
    }
}

/// Input naming a stored workflow to run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowRunInput {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
}

/// Validated job input, one variant per [`JobKind`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum JobInput {
    DirectAction(DirectAction),
    SnapshotSuite(SuiteInput),
    StressScenario(StressInput),
    WorkflowRun(WorkflowRunInput),
}

impl JobInput {
    /// Validate and normalize a raw payload for the given kind.
    ///
    /// Numeric fields are clamped to their safe bounds rather than rejected;
    /// structurally invalid payloads fail with [`CoreError::Validation`].
    pub fn parse(kind: JobKind, payload: serde_json::Value) -> Result<JobInput, CoreError> {
        match kind {
            JobKind::DirectAction => {
                let action: DirectAction = serde_json::from_value(payload)
                    .map_err(|e| CoreError::Validation(format!("direct-action input: {e}")))?;
                Ok(JobInput::DirectAction(action.normalized()?))
            }
            JobKind::SnapshotSuite => {
                let input: SuiteInput = serde_json::from_value(payload)
                    .map_err(|e| CoreError::Validation(format!("snapshot-suite input: {e}")))?;
                Ok(JobInput::SnapshotSuite(input))
            }
            JobKind::StressScenario => {
                let input: StressInput = serde_json::from_value(payload)
                    .map_err(|e| CoreError::Validation(format!("stress-scenario input: {e}")))?;
                Ok(JobInput::StressScenario(input.normalized()?))
            }
            JobKind::WorkflowRun => {
                let input: WorkflowRunInput = serde_json::from_value(payload)
                    .map_err(|e| CoreError::Validation(format!("workflow-run input: {e}")))?;
                if input.name.trim().is_empty() {
                    return Err(CoreError::Validation(
                        "workflow-run input: name must not be empty".to_string(),
                    ));
                }
                Ok(JobInput::WorkflowRun(input))
            }
        }
    }

    pub fn kind(&self) -> JobKind {
        match self {
            JobInput::DirectAction(_) => JobKind::DirectAction,
            JobInput::SnapshotSuite(_) => JobKind::SnapshotSuite,
            JobInput::StressScenario(_) => JobKind::StressScenario,
            JobInput::WorkflowRun(_) => JobKind::WorkflowRun,
        }
    }
}

/// Check that a URL is non-empty and parses; the original text is kept so
/// deep links reach the bridge exactly as submitted.
pub(crate) fn validate_url(raw: &str) -> Result<String, CoreError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation("url must not be empty".to_string()));
    }
    url::Url::parse(trimmed)
        .map_err(|e| CoreError::Validation(format!("invalid url '{trimmed}': {e}")))?;
    Ok(trimmed.to_string())
}

/// A queued unit of orchestrated work.
#[derive(Debug, Clone, Serialize)]
pub struct Job {
    pub id: u64,
    pub kind: JobKind,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    /// Wall time from start to finish; absent until the job finishes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    pub input: JobInput,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Job {
    pub(crate) fn new(id: u64, input: JobInput) -> Self {
        Self {
            id,
            kind: input.kind(),
            status: JobStatus::Queued,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
            duration_ms: None,
            input,
            result: None,
            error: None,
        }
    }

    pub(crate) fn mark_running(&mut self) {
        self.status = JobStatus::Running;
        self.started_at = Some(Utc::now());
    }

    pub(crate) fn mark_completed(&mut self, result: serde_json::Value) {
        self.status = JobStatus::Completed;
        self.result = Some(result);
        self.stamp_finished();
    }

    pub(crate) fn mark_failed(&mut self, error: String) {
        self.status = JobStatus::Failed;
        self.error = Some(error);
        self.stamp_finished();
    }

    pub(crate) fn mark_cancelled(&mut self) {
        self.status = JobStatus::Cancelled;
        self.finished_at = Some(Utc::now());
    }

    fn stamp_finished(&mut self) {
        let now = Utc::now();
        if let Some(started) = self.started_at {
            let elapsed = now.signed_duration_since(started).num_milliseconds();
            self.duration_ms = Some(elapsed.max(0) as u64);
        }
        self.finished_at = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_open_url_clamps_wait() {
        let input = JobInput::parse(
            JobKind::DirectAction,
            json!({"action": "open-url", "url": "https://example.com", "wait_ms": 120_000}),
        )
        .unwrap();
        match input {
            JobInput::DirectAction(DirectAction::OpenUrl { wait_ms, .. }) => {
                assert_eq!(wait_ms, MAX_WAIT_MS);
            }
            other => panic!("unexpected input: {other:?}"),
        }
    }

    #[test]
    fn test_parse_rejects_bad_url() {
        let err = JobInput::parse(
            JobKind::DirectAction,
            json!({"action": "open-url", "url": "not a url"}),
        )
        .unwrap_err();
        assert_eq!(err.reason(), "validation");
    }

    #[test]
    fn test_parse_rejects_unknown_action() {
        let err = JobInput::parse(
            JobKind::DirectAction,
            json!({"action": "reboot-device"}),
        )
        .unwrap_err();
        assert_eq!(err.reason(), "validation");
    }

    #[test]
    fn test_parse_accepts_deep_link() {
        let input = JobInput::parse(
            JobKind::DirectAction,
            json!({"action": "open-url", "url": "myapp://play?id=42"}),
        )
        .unwrap();
        match input {
            JobInput::DirectAction(DirectAction::OpenUrl { url, .. }) => {
                assert_eq!(url, "myapp://play?id=42");
            }
            other => panic!("unexpected input: {other:?}"),
        }
    }

    #[test]
    fn test_parse_stress_clamps_bounds() {
        let input = JobInput::parse(
            JobKind::StressScenario,
            json!({"url": "https://example.com", "iterations": 500, "pause_ms": 99_999}),
        )
        .unwrap();
        match input {
            JobInput::StressScenario(stress) => {
                assert_eq!(stress.iterations, MAX_STRESS_ITERATIONS);
                assert_eq!(stress.pause_ms, MAX_STRESS_PAUSE_MS);
            }
            other => panic!("unexpected input: {other:?}"),
        }
    }

    #[test]
    fn test_parse_stress_zero_iterations_raised_to_one() {
        let input = JobInput::parse(
            JobKind::StressScenario,
            json!({"url": "https://example.com", "iterations": 0}),
        )
        .unwrap();
        match input {
            JobInput::StressScenario(stress) => assert_eq!(stress.iterations, 1),
            other => panic!("unexpected input: {other:?}"),
        }
    }

    #[test]
    fn test_parse_workflow_run_requires_name() {
        let err = JobInput::parse(JobKind::WorkflowRun, json!({"name": "  "})).unwrap_err();
        assert_eq!(err.reason(), "validation");
    }

    #[test]
    fn test_kind_parse_round_trips() {
        for kind in [
            JobKind::DirectAction,
            JobKind::SnapshotSuite,
            JobKind::StressScenario,
            JobKind::WorkflowRun,
        ] {
            assert_eq!(JobKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(JobKind::parse("reboot"), None);
    }

    #[test]
    fn test_status_terminality() {
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_job_transitions_stamp_times() {
        let input = JobInput::parse(JobKind::SnapshotSuite, json!({})).unwrap();
        let mut job = Job::new(1, input);
        assert_eq!(job.status, JobStatus::Queued);
        assert!(job.started_at.is_none());

        job.mark_running();
        assert_eq!(job.status, JobStatus::Running);
        assert!(job.started_at.is_some());

        job.mark_completed(json!({"ok": true}));
        assert_eq!(job.status, JobStatus::Completed);
        assert!(job.finished_at.is_some());
        assert!(job.duration_ms.is_some());
    }

    #[test]
    fn test_cancelled_job_has_no_duration() {
        let input = JobInput::parse(JobKind::SnapshotSuite, json!({})).unwrap();
        let mut job = Job::new(2, input);
        job.mark_cancelled();
        assert_eq!(job.status, JobStatus::Cancelled);
        assert!(job.duration_ms.is_none());
        assert!(job.finished_at.is_some());
    }
}
