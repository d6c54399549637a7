//! FIFO job queue with a bounded job history.
//!
//! The queue owns every job record for the life of the process. Waiting jobs
//! are tracked by id in submission order; the full records live in a history
//! ring that evicts the oldest *terminal* record once the capacity is
//! exceeded. Queued and running jobs are never evicted.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::CoreError;
use crate::job::{Job, JobInput, JobStatus};

/// Default number of retained job records.
pub const DEFAULT_JOB_HISTORY: usize = 200;

struct QueueState {
    waiting: VecDeque<u64>,
    /// All known jobs in id order; doubles as the bounded history.
    jobs: VecDeque<Job>,
}

impl QueueState {
    fn job_mut(&mut self, id: u64) -> Option<&mut Job> {
        self.jobs.iter_mut().find(|job| job.id == id)
    }

    fn evict_terminal(&mut self, capacity: usize) {
        while self.jobs.len() > capacity {
            let Some(pos) = self.jobs.iter().position(|job| job.status.is_terminal()) else {
                break;
            };
            self.jobs.remove(pos);
        }
    }
}

/// Job queue shared between the API surface and the runner.
pub struct JobQueue {
    history_capacity: usize,
    next_id: AtomicU64,
    state: RwLock<QueueState>,
}

impl JobQueue {
    pub fn new(history_capacity: usize) -> Self {
        Self {
            history_capacity: history_capacity.max(1),
            next_id: AtomicU64::new(1),
            state: RwLock::new(QueueState {
                waiting: VecDeque::new(),
                jobs: VecDeque::new(),
            }),
        }
    }

    /// Create a job record from validated input and append it to the wait
    /// list. Ids are assigned in submission order.
    pub async fn submit(&self, input: JobInput) -> Job {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let job = Job::new(id, input);
        let mut state = self.state.write().await;
        state.jobs.push_back(job.clone());
        state.waiting.push_back(id);
        state.evict_terminal(self.history_capacity);
        debug!(job_id = id, kind = %job.kind, "job queued");
        job
    }

    /// Pop the next waiting job and mark it running in one step.
    ///
    /// Entries whose job was cancelled while waiting are skipped silently.
    /// Returns `None` when the wait list is empty.
    pub async fn dequeue(&self) -> Option<Job> {
        let mut state = self.state.write().await;
        while let Some(id) = state.waiting.pop_front() {
            if let Some(job) = state.job_mut(id) {
                if job.status == JobStatus::Queued {
                    job.mark_running();
                    return Some(job.clone());
                }
            }
        }
        None
    }

    /// Record a successful finish. Returns the updated record, or `None` if
    /// the job was not in running state.
    pub async fn complete(&self, id: u64, result: serde_json::Value) -> Option<Job> {
        let mut state = self.state.write().await;
        let job = state.job_mut(id)?;
        if job.status != JobStatus::Running {
            warn!(job_id = id, status = %job.status, "completion for non-running job ignored");
            return None;
        }
        job.mark_completed(result);
        Some(job.clone())
    }

    /// Record a failed finish. Returns the updated record, or `None` if the
    /// job was not in running state.
    pub async fn fail(&self, id: u64, error: String) -> Option<Job> {
        let mut state = self.state.write().await;
        let job = state.job_mut(id)?;
        if job.status != JobStatus::Running {
            warn!(job_id = id, status = %job.status, "failure for non-running job ignored");
            return None;
        }
        job.mark_failed(error);
        Some(job.clone())
    }

    /// Cancel a job that is still waiting. Only `queued -> cancelled` is a
    /// legal transition; anything else is reported as not cancellable.
    pub async fn cancel(&self, id: u64) -> Result<Job, CoreError> {
        let mut state = self.state.write().await;
        let Some(job) = state.job_mut(id) else {
            return Err(CoreError::NotFound(format!("job {id}")));
        };
        if job.status != JobStatus::Queued {
            return Err(CoreError::NotCancellable {
                id,
                status: job.status,
            });
        }
        job.mark_cancelled();
        let cancelled = job.clone();
        state.waiting.retain(|&waiting| waiting != id);
        debug!(job_id = id, "job cancelled while queued");
        Ok(cancelled)
    }

    pub async fn get(&self, id: u64) -> Option<Job> {
        let state = self.state.read().await;
        state.jobs.iter().find(|job| job.id == id).cloned()
    }

    /// Most recent jobs first, at most `limit` records.
    pub async fn list(&self, limit: usize) -> Vec<Job> {
        let state = self.state.read().await;
        state.jobs.iter().rev().take(limit).cloned().collect()
    }

    /// Number of jobs still waiting to run.
    pub async fn waiting_len(&self) -> usize {
        let state = self.state.read().await;
        state.waiting.len()
    }

    /// Total number of retained job records.
    pub async fn history_len(&self) -> usize {
        let state = self.state.read().await;
        state.jobs.len()
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
