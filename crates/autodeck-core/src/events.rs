//! Event bus: bounded history plus live subscriber fan-out.
//!
//! Every state change of interest is published here exactly once, after the
//! change is applied. Subscribers receive events in publish order over a
//! bounded channel; a subscriber that cannot accept delivery (full buffer or
//! dropped receiver) is removed on the spot. Heartbeats flow to live
//! subscribers but are never retained in history.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::sync::mpsc;
use tracing::debug;

use crate::job::JobStatus;

/// Default number of retained events.
pub const DEFAULT_EVENT_HISTORY: usize = 500;
/// Per-subscriber delivery buffer.
pub const SUBSCRIBER_BUFFER: usize = 256;

/// Event type tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    JobQueued,
    JobRunning,
    JobCompleted,
    JobFailed,
    JobCancelled,
    WorkflowSaved,
    WorkflowDeleted,
    WorkflowImported,
    WorkflowStep,
    SnapshotCaptured,
    Heartbeat,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::JobQueued => "job-queued",
            EventKind::JobRunning => "job-running",
            EventKind::JobCompleted => "job-completed",
            EventKind::JobFailed => "job-failed",
            EventKind::JobCancelled => "job-cancelled",
            EventKind::WorkflowSaved => "workflow-saved",
            EventKind::WorkflowDeleted => "workflow-deleted",
            EventKind::WorkflowImported => "workflow-imported",
            EventKind::WorkflowStep => "workflow-step",
            EventKind::SnapshotCaptured => "snapshot-captured",
            EventKind::Heartbeat => "heartbeat",
        }
    }

    /// Event kind announcing a job status change.
    pub fn for_job_status(status: JobStatus) -> EventKind {
        match status {
            JobStatus::Queued => EventKind::JobQueued,
            JobStatus::Running => EventKind::JobRunning,
            JobStatus::Completed => EventKind::JobCompleted,
            JobStatus::Failed => EventKind::JobFailed,
            JobStatus::Cancelled => EventKind::JobCancelled,
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single bus event.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    /// Monotonically increasing id; later events always carry larger ids.
    pub id: u64,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// Live subscription handle. Dropping the receiver unsubscribes implicitly
/// on the next publish.
pub struct Subscription {
    pub id: u64,
    pub receiver: mpsc::Receiver<Event>,
}

struct Subscriber {
    id: u64,
    sender: mpsc::Sender<Event>,
}

/// In-process event bus.
pub struct EventBus {
    history_capacity: usize,
    next_event_id: AtomicU64,
    next_subscriber_id: AtomicU64,
    history: Mutex<VecDeque<Event>>,
    subscribers: Mutex<Vec<Subscriber>>,
}

impl EventBus {
    pub fn new(history_capacity: usize) -> Self {
        Self {
            history_capacity: history_capacity.max(1),
            next_event_id: AtomicU64::new(1),
            next_subscriber_id: AtomicU64::new(1),
            history: Mutex::new(VecDeque::new()),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Append an event to history and deliver it to live subscribers.
    /// Delivery happens before this call returns, in subscriber order.
    pub async fn publish(
        &self,
        kind: EventKind,
        message: impl Into<String>,
        data: Option<serde_json::Value>,
    ) -> Event {
        let event = self.build(kind, message.into(), data);
        {
            let mut history = self.history.lock().await;
            history.push_back(event.clone());
            while history.len() > self.history_capacity {
                history.pop_front();
            }
        }
        self.fan_out(&event).await;
        event
    }

    /// Deliver a heartbeat to live subscribers without retaining it.
    pub async fn publish_heartbeat(&self) -> Event {
        let event = self.build(EventKind::Heartbeat, "heartbeat".to_string(), None);
        self.fan_out(&event).await;
        event
    }

    fn build(&self, kind: EventKind, message: String, data: Option<serde_json::Value>) -> Event {
        Event {
            id: self.next_event_id.fetch_add(1, Ordering::SeqCst),
            timestamp: Utc::now(),
            kind,
            message,
            data,
        }
    }

    async fn fan_out(&self, event: &Event) {
        let mut subscribers = self.subscribers.lock().await;
        subscribers.retain(|subscriber| {
            match subscriber.sender.try_send(event.clone()) {
                Ok(()) => true,
                Err(_) => {
                    // Full buffer or dropped receiver: drop the subscriber
                    // rather than block or queue unboundedly.
                    debug!(subscriber_id = subscriber.id, "removing unreachable subscriber");
                    false
                }
            }
        });
    }

    /// Register a live subscriber. History is not replayed; callers wanting
    /// catch-up read [`EventBus::history`] first.
    pub async fn subscribe(&self) -> Subscription {
        let (sender, receiver) = mpsc::channel(SUBSCRIBER_BUFFER);
        let id = self.next_subscriber_id.fetch_add(1, Ordering::SeqCst);
        let mut subscribers = self.subscribers.lock().await;
        subscribers.push(Subscriber { id, sender });
        debug!(subscriber_id = id, total = subscribers.len(), "subscriber added");
        Subscription { id, receiver }
    }

    /// Remove a subscriber eagerly. Dropping the receiver has the same
    /// effect on the next publish.
    pub async fn unsubscribe(&self, id: u64) {
        let mut subscribers = self.subscribers.lock().await;
        subscribers.retain(|subscriber| subscriber.id != id);
    }

    /// The most recent `limit` retained events, oldest first.
    pub async fn history(&self, limit: usize) -> Vec<Event> {
        let history = self.history.lock().await;
        let skip = history.len().saturating_sub(limit);
        history.iter().skip(skip).cloned().collect()
    }

    pub async fn history_len(&self) -> usize {
        self.history.lock().await.len()
    }

    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.lock().await.len()
    }
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;
