//! Snapshot cache and structural differ.
//!
//! The cache keeps exactly one snapshot per kind, replaced on every capture.
//! A capture diffs the fresh payload against the cached one first, so the
//! result always describes "what changed since last time". Fields are
//! compared at the top level: string values report a length delta, all other
//! values report on deep inequality.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Value, json};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::CoreError;
use crate::events::{EventBus, EventKind};
use crate::metrics::MetricsRecorder;
use crate::provider::{CaptureOptions, DeviceActionProvider, SnapshotKind};

/// Structural summary of a captured payload.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotSummary {
    pub kind: SnapshotKind,
    pub captured_at: DateTime<Utc>,
    /// Number of top-level fields in the payload.
    pub fields: usize,
    /// Serialized payload size in bytes.
    pub bytes: usize,
}

/// How a single field differs between captures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChangeKind {
    Added,
    Removed,
    Modified,
}

/// One changed top-level field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldChange {
    pub field: String,
    pub change: ChangeKind,
    /// Previous string length; only set for string-valued fields.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_len: Option<usize>,
    /// New string length; only set for string-valued fields.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_len: Option<usize>,
}

/// Diff between the previously cached payload and a fresh one.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotDiff {
    /// True when no snapshot of this kind was cached before.
    pub no_previous: bool,
    pub changed_count: usize,
    pub changes: Vec<FieldChange>,
}

/// Result of a capture: summary, diff, and optionally the raw payload.
#[derive(Debug, Clone, Serialize)]
pub struct CaptureResult {
    pub summary: SnapshotSummary,
    pub diff: SnapshotDiff,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<Value>,
}

struct CachedSnapshot {
    captured_at: DateTime<Utc>,
    payload: Value,
}

/// Cache of the latest snapshot per kind, doubling as the capture executor.
pub struct SnapshotCache {
    provider: Arc<dyn DeviceActionProvider>,
    events: Arc<EventBus>,
    metrics: Arc<MetricsRecorder>,
    cached: RwLock<BTreeMap<SnapshotKind, CachedSnapshot>>,
}

impl SnapshotCache {
    pub fn new(
        provider: Arc<dyn DeviceActionProvider>,
        events: Arc<EventBus>,
        metrics: Arc<MetricsRecorder>,
    ) -> Self {
        Self {
            provider,
            events,
            metrics,
            cached: RwLock::new(BTreeMap::new()),
        }
    }

    /// Capture one snapshot: call the bridge, diff against the cached
    /// payload, replace the cache entry, emit `snapshot-captured`, and
    /// record a `snapshot.<kind>` metric.
    pub async fn capture(
        &self,
        kind: SnapshotKind,
        device_id: Option<&str>,
        options: &CaptureOptions,
    ) -> Result<CaptureResult, CoreError> {
        let started = Instant::now();
        let result = self.provider.capture_snapshot(kind, device_id, options).await;
        let elapsed = started.elapsed().as_millis() as u64;
        let action = format!("snapshot.{kind}");

        let payload = match result {
            Ok(payload) => {
                self.metrics.record(&action, elapsed, true, None).await;
                payload
            }
            Err(err) => {
                let message = err.to_string();
                self.metrics.record(&action, elapsed, false, Some(&message)).await;
                return Err(CoreError::Provider(message));
            }
        };

        let captured_at = Utc::now();
        let diff;
        {
            let mut cached = self.cached.write().await;
            diff = diff_payloads(cached.get(&kind).map(|entry| &entry.payload), &payload);
            cached.insert(
                kind,
                CachedSnapshot {
                    captured_at,
                    payload: payload.clone(),
                },
            );
        }

        let summary = SnapshotSummary {
            kind,
            captured_at,
            fields: top_level_fields(&payload),
            bytes: serde_json::to_string(&payload).map(|s| s.len()).unwrap_or(0),
        };
        debug!(kind = %kind, fields = summary.fields, changed = diff.changed_count, "snapshot captured");
        self.events
            .publish(
                EventKind::SnapshotCaptured,
                format!("snapshot {kind} captured"),
                Some(json!({
                    "kind": kind,
                    "fields": summary.fields,
                    "bytes": summary.bytes,
                    "changed": diff.changed_count,
                    "no_previous": diff.no_previous,
                })),
            )
            .await;

        Ok(CaptureResult {
            summary,
            diff,
            raw: options.include_raw.then_some(payload),
        })
    }

    /// Capture every kind sequentially in [`SnapshotKind::ALL`] order.
    /// The first failure aborts the suite; earlier captures stay cached.
    pub async fn capture_suite(
        &self,
        device_id: Option<&str>,
        options: &CaptureOptions,
    ) -> Result<Vec<CaptureResult>, CoreError> {
        let mut results = Vec::with_capacity(SnapshotKind::ALL.len());
        for kind in SnapshotKind::ALL {
            results.push(self.capture(kind, device_id, options).await?);
        }
        Ok(results)
    }

    /// Diff a payload against the cached snapshot without storing anything.
    pub async fn diff(&self, kind: SnapshotKind, payload: &Value) -> SnapshotDiff {
        let cached = self.cached.read().await;
        diff_payloads(cached.get(&kind).map(|entry| &entry.payload), payload)
    }

    /// Summaries of all cached snapshots in kind order.
    pub async fn summaries(&self) -> Vec<SnapshotSummary> {
        let cached = self.cached.read().await;
        cached
            .iter()
            .map(|(kind, entry)| SnapshotSummary {
                kind: *kind,
                captured_at: entry.captured_at,
                fields: top_level_fields(&entry.payload),
                bytes: serde_json::to_string(&entry.payload).map(|s| s.len()).unwrap_or(0),
            })
            .collect()
    }

    /// The cached raw payload for a kind, if any.
    pub async fn cached_payload(&self, kind: SnapshotKind) -> Option<Value> {
        let cached = self.cached.read().await;
        cached.get(&kind).map(|entry| entry.payload.clone())
    }
}

fn top_level_fields(payload: &Value) -> usize {
    match payload {
        Value::Object(map) => map.len(),
        _ => 1,
    }
}

/// Non-object payloads are treated as a single `value` field so a scalar
/// snapshot still diffs meaningfully.
fn as_fields(payload: &Value) -> BTreeMap<String, &Value> {
    match payload {
        Value::Object(map) => map.iter().map(|(k, v)| (k.clone(), v)).collect(),
        other => {
            let mut map = BTreeMap::new();
            map.insert("value".to_string(), other);
            map
        }
    }
}

/// Compare two payloads field by field at the top level.
pub fn diff_payloads(previous: Option<&Value>, next: &Value) -> SnapshotDiff {
    let Some(previous) = previous else {
        return SnapshotDiff {
            no_previous: true,
            changed_count: 0,
            changes: Vec::new(),
        };
    };

    let old_fields = as_fields(previous);
    let new_fields = as_fields(next);
    let mut changes = Vec::new();

    for (field, old_value) in &old_fields {
        match new_fields.get(field) {
            None => changes.push(FieldChange {
                field: field.clone(),
                change: ChangeKind::Removed,
                old_len: old_value.as_str().map(str::len),
                new_len: None,
            }),
            Some(new_value) if *new_value != *old_value => changes.push(FieldChange {
                field: field.clone(),
                change: ChangeKind::Modified,
                old_len: old_value.as_str().map(str::len),
                new_len: new_value.as_str().map(str::len),
            }),
            Some(_) => {}
        }
    }
    for (field, new_value) in &new_fields {
        if !old_fields.contains_key(field) {
            changes.push(FieldChange {
                field: field.clone(),
                change: ChangeKind::Added,
                old_len: None,
                new_len: new_value.as_str().map(str::len),
            });
        }
    }

    changes.sort_by(|a, b| a.field.cmp(&b.field));
    SnapshotDiff {
        no_previous: false,
        changed_count: changes.len(),
        changes,
    }
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
