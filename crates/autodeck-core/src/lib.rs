//! # Autodeck Core
//!
//! Orchestration core for the autodeck control plane.
//!
//! ## Components
//!
//! - Job queue with a strictly sequential runner (FIFO, one job at a time)
//! - Workflow store and step interpreter
//! - Event bus with bounded history and live subscribers
//! - Per-action metrics recorder
//! - Snapshot cache with structural diffing
//!
//! Device access goes through the [`provider::DeviceActionProvider`] seam;
//! the bundled bridge implementation lives in the `autodeck-driver` crate.

pub mod actions;
pub mod config;
pub mod error;
pub mod events;
pub mod interpreter;
pub mod job;
pub mod metrics;
pub mod mock_provider;
pub mod orchestrator;
pub mod provider;
pub mod queue;
pub mod runner;
pub mod snapshot;
pub mod store;
pub mod workflow;

pub use actions::DeviceActions;
pub use config::OrchestratorConfig;
pub use error::CoreError;
pub use events::{Event, EventBus, EventKind, Subscription};
pub use interpreter::{StepOutput, WorkflowInterpreter, WorkflowRunOutput};
pub use job::{
    DirectAction, Job, JobInput, JobKind, JobStatus, StressInput, SuiteInput, WorkflowRunInput,
};
pub use metrics::{MetricsEntry, MetricsRecorder};
pub use orchestrator::Orchestrator;
pub use provider::{
    CaptureOptions, Device, DeviceActionProvider, OpenUrlOutcome, OpenUrlRequest, ProviderError,
    SnapshotKind,
};
pub use queue::JobQueue;
pub use runner::JobRunner;
pub use snapshot::{CaptureResult, FieldChange, SnapshotCache, SnapshotDiff, SnapshotSummary};
pub use store::{FileWorkflowStore, ImportReport, MemoryWorkflowStore, SkippedImport, WorkflowStore};
pub use workflow::{WorkflowDefinition, WorkflowStep};
