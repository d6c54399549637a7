//! Workflow definitions and step validation.
//!
//! A workflow is a named, ordered list of steps. Definitions are validated
//! and normalized once on the way into the store; the interpreter can trust
//! every stored step. Step payloads are tagged with a `type` field on the
//! wire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::job::{MAX_WAIT_MS, validate_url};
use crate::provider::SnapshotKind;

/// Maximum number of steps in one workflow.
pub const MAX_WORKFLOW_STEPS: usize = 50;
/// Sleep step bounds.
pub const MAX_SLEEP_MS: u64 = 30_000;
/// Workflow name length bounds.
pub const MAX_NAME_LEN: usize = 64;

/// One workflow step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum WorkflowStep {
    OpenUrl {
        url: String,
        #[serde(default)]
        wait_ms: u64,
    },
    CaptureSnapshot {
        kind: SnapshotKind,
        #[serde(default)]
        include_raw: bool,
    },
    CaptureSnapshotSuite,
    Sleep { duration_ms: u64 },
}

impl WorkflowStep {
    /// Wire tag, also used in step outputs and events.
    pub fn tag(&self) -> &'static str {
        match self {
            WorkflowStep::OpenUrl { .. } => "open-url",
            WorkflowStep::CaptureSnapshot { .. } => "capture-snapshot",
            WorkflowStep::CaptureSnapshotSuite => "capture-snapshot-suite",
            WorkflowStep::Sleep { .. } => "sleep",
        }
    }

    /// Validate fields and clamp numeric values to their safe bounds.
    fn normalized(self) -> Result<WorkflowStep, CoreError> {
        match self {
            WorkflowStep::OpenUrl { url, wait_ms } => Ok(WorkflowStep::OpenUrl {
                url: validate_url(&url)?,
                wait_ms: wait_ms.min(MAX_WAIT_MS),
            }),
            WorkflowStep::Sleep { duration_ms } => Ok(WorkflowStep::Sleep {
                duration_ms: duration_ms.clamp(1, MAX_SLEEP_MS),
            }),
            other => Ok(other),
        }
    }
}

/// A stored workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
    pub steps: Vec<WorkflowStep>,
}

impl WorkflowDefinition {
    /// Build a validated definition. Used by tests and import paths that
    /// already hold typed steps.
    pub fn new(name: impl Into<String>, steps: Vec<WorkflowStep>) -> Result<Self, CoreError> {
        WorkflowDefinition {
            name: name.into(),
            description: None,
            updated_at: Utc::now(),
            steps,
        }
        .validated()
    }

    /// Parse and validate a raw JSON document.
    pub fn parse(value: serde_json::Value) -> Result<Self, CoreError> {
        let definition: WorkflowDefinition = serde_json::from_value(value)
            .map_err(|e| CoreError::Validation(format!("workflow document: {e}")))?;
        definition.validated()
    }

    /// Validate the name and every step, clamping numeric fields.
    pub fn validated(mut self) -> Result<Self, CoreError> {
        validate_name(&self.name)?;
        if self.steps.is_empty() {
            return Err(CoreError::Validation(
                "workflow must contain at least one step".to_string(),
            ));
        }
        if self.steps.len() > MAX_WORKFLOW_STEPS {
            return Err(CoreError::Capacity(format!(
                "workflow has {} steps, maximum is {MAX_WORKFLOW_STEPS}",
                self.steps.len()
            )));
        }
        self.steps = self
            .steps
            .into_iter()
            .map(WorkflowStep::normalized)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self)
    }
}

/// Names are 1..=64 chars from `[A-Za-z0-9._-]`, so they stay safe as both
/// store keys and URL path segments.
pub(crate) fn validate_name(name: &str) -> Result<(), CoreError> {
    if name.is_empty() || name.len() > MAX_NAME_LEN {
        return Err(CoreError::Validation(format!(
            "workflow name must be 1..={MAX_NAME_LEN} characters"
        )));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
    {
        return Err(CoreError::Validation(format!(
            "workflow name '{name}' contains characters outside [A-Za-z0-9._-]"
        )));
    }
    Ok(())
}
