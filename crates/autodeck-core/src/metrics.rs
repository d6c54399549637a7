//! Per-action metrics recorder.
//!
//! Stores only raw counters and duration sums; averages and success rates
//! are derived at read time so no drift can accumulate between writes.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct ActionMetric {
    count: u64,
    success: u64,
    errors: u64,
    total_duration_ms: u64,
    last_duration_ms: u64,
    last_error: Option<String>,
    last_at: DateTime<Utc>,
}

/// One row of the derived metrics snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsEntry {
    pub action: String,
    pub count: u64,
    pub success: u64,
    pub errors: u64,
    pub total_duration_ms: u64,
    /// `total_duration_ms / count`, 0 when nothing was recorded.
    pub avg_duration_ms: f64,
    /// `success / count` as a percentage, rounded to two decimals.
    pub success_rate: f64,
    pub last_duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    pub last_at: DateTime<Utc>,
}

/// Recorder keyed by action name (`open-url`, `snapshot.ui`, ...).
pub struct MetricsRecorder {
    actions: RwLock<HashMap<String, ActionMetric>>,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            actions: RwLock::new(HashMap::new()),
        }
    }

    /// Record one action invocation.
    pub async fn record(&self, action: &str, duration_ms: u64, ok: bool, error: Option<&str>) {
        let mut actions = self.actions.write().await;
        let metric = actions.entry(action.to_string()).or_insert(ActionMetric {
            count: 0,
            success: 0,
            errors: 0,
            total_duration_ms: 0,
            last_duration_ms: 0,
            last_error: None,
            last_at: Utc::now(),
        });
        metric.count += 1;
        if ok {
            metric.success += 1;
        } else {
            metric.errors += 1;
            metric.last_error = error.map(str::to_string);
        }
        metric.total_duration_ms += duration_ms;
        metric.last_duration_ms = duration_ms;
        metric.last_at = Utc::now();
    }

    /// Derived snapshot of all actions, busiest first.
    pub async fn snapshot(&self) -> Vec<MetricsEntry> {
        let actions = self.actions.read().await;
        let mut entries: Vec<MetricsEntry> = actions
            .iter()
            .map(|(action, metric)| {
                let avg = if metric.count == 0 {
                    0.0
                } else {
                    metric.total_duration_ms as f64 / metric.count as f64
                };
                let rate = if metric.count == 0 {
                    0.0
                } else {
                    round2(100.0 * metric.success as f64 / metric.count as f64)
                };
                MetricsEntry {
                    action: action.clone(),
                    count: metric.count,
                    success: metric.success,
                    errors: metric.errors,
                    total_duration_ms: metric.total_duration_ms,
                    avg_duration_ms: round2(avg),
                    success_rate: rate,
                    last_duration_ms: metric.last_duration_ms,
                    last_error: metric.last_error.clone(),
                    last_at: metric.last_at,
                }
            })
            .collect();
        entries.sort_by(|a, b| b.count.cmp(&a.count).then(a.action.cmp(&b.action)));
        entries
    }

    pub async fn action_count(&self) -> usize {
        self.actions.read().await.len()
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
