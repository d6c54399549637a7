use serde_json::json;

use super::*;
use crate::mock_provider::MockProvider;

fn cache_with_provider() -> (Arc<MockProvider>, SnapshotCache) {
    let provider = Arc::new(MockProvider::new());
    let events = Arc::new(EventBus::new(crate::events::DEFAULT_EVENT_HISTORY));
    let metrics = Arc::new(MetricsRecorder::new());
    let cache = SnapshotCache::new(provider.clone(), events, metrics);
    (provider, cache)
}

#[test]
fn test_diff_without_previous_sets_flag() {
    let diff = diff_payloads(None, &json!({"a": 1}));
    assert!(diff.no_previous);
    assert_eq!(diff.changed_count, 0);
    assert!(diff.changes.is_empty());
}

#[test]
fn test_diff_reports_added_removed_modified() {
    let old = json!({"kept": 1, "dropped": true, "changed": [1, 2]});
    let new = json!({"kept": 1, "changed": [1, 2, 3], "fresh": "hi"});
    let diff = diff_payloads(Some(&old), &new);

    assert!(!diff.no_previous);
    assert_eq!(diff.changed_count, 3);
    let by_field: Vec<(&str, ChangeKind)> = diff
        .changes
        .iter()
        .map(|change| (change.field.as_str(), change.change))
        .collect();
    assert_eq!(
        by_field,
        vec![
            ("changed", ChangeKind::Modified),
            ("dropped", ChangeKind::Removed),
            ("fresh", ChangeKind::Added),
        ]
    );
}

#[test]
fn test_string_fields_report_length_delta() {
    let old = json!({"title": "short"});
    let new = json!({"title": "a much longer title"});
    let diff = diff_payloads(Some(&old), &new);

    assert_eq!(diff.changed_count, 1);
    let change = &diff.changes[0];
    assert_eq!(change.change, ChangeKind::Modified);
    assert_eq!(change.old_len, Some(5));
    assert_eq!(change.new_len, Some(19));
}

#[test]
fn test_non_string_changes_carry_no_lengths() {
    let old = json!({"count": 1});
    let new = json!({"count": 2});
    let diff = diff_payloads(Some(&old), &new);
    assert_eq!(diff.changes[0].old_len, None);
    assert_eq!(diff.changes[0].new_len, None);
}

#[test]
fn test_equal_payloads_have_no_changes() {
    let payload = json!({"a": {"deep": [1, 2]}, "b": "same"});
    let diff = diff_payloads(Some(&payload), &payload.clone());
    assert_eq!(diff.changed_count, 0);
}

#[test]
fn test_scalar_payload_diffs_as_value_field() {
    let diff = diff_payloads(Some(&json!(41)), &json!(42));
    assert_eq!(diff.changed_count, 1);
    assert_eq!(diff.changes[0].field, "value");
}

#[tokio::test]
async fn test_first_capture_flags_no_previous() {
    let (_provider, cache) = cache_with_provider();
    let result = cache
        .capture(SnapshotKind::Ui, None, &CaptureOptions::default())
        .await
        .unwrap();
    assert!(result.diff.no_previous);
    assert_eq!(result.summary.kind, SnapshotKind::Ui);
}

#[tokio::test]
async fn test_capture_replaces_cache_entry() {
    let (provider, cache) = cache_with_provider();
    provider.set_snapshot(SnapshotKind::Ui, json!({"screen": "home"})).await;
    cache
        .capture(SnapshotKind::Ui, None, &CaptureOptions::default())
        .await
        .unwrap();

    provider.set_snapshot(SnapshotKind::Ui, json!({"screen": "player"})).await;
    let second = cache
        .capture(SnapshotKind::Ui, None, &CaptureOptions::default())
        .await
        .unwrap();

    assert!(!second.diff.no_previous);
    assert_eq!(second.diff.changed_count, 1);
    assert_eq!(second.diff.changes[0].field, "screen");
    assert_eq!(
        cache.cached_payload(SnapshotKind::Ui).await,
        Some(json!({"screen": "player"}))
    );
}

#[tokio::test]
async fn test_kinds_are_cached_independently() {
    let (provider, cache) = cache_with_provider();
    provider.set_snapshot(SnapshotKind::Ui, json!({"a": 1})).await;
    provider.set_snapshot(SnapshotKind::System, json!({"b": 2})).await;

    cache.capture(SnapshotKind::Ui, None, &CaptureOptions::default()).await.unwrap();
    // Capturing system must not disturb the ui entry.
    let system = cache
        .capture(SnapshotKind::System, None, &CaptureOptions::default())
        .await
        .unwrap();
    assert!(system.diff.no_previous);

    let ui_again = cache
        .capture(SnapshotKind::Ui, None, &CaptureOptions::default())
        .await
        .unwrap();
    assert!(!ui_again.diff.no_previous);
    assert_eq!(ui_again.diff.changed_count, 0);
}

#[tokio::test]
async fn test_raw_payload_only_when_requested() {
    let (_provider, cache) = cache_with_provider();
    let without = cache
        .capture(SnapshotKind::Media, None, &CaptureOptions::default())
        .await
        .unwrap();
    assert!(without.raw.is_none());

    let with = cache
        .capture(SnapshotKind::Media, None, &CaptureOptions { include_raw: true })
        .await
        .unwrap();
    assert!(with.raw.is_some());
}

#[tokio::test]
async fn test_failed_capture_leaves_cache_untouched() {
    let (provider, cache) = cache_with_provider();
    cache.capture(SnapshotKind::Ui, None, &CaptureOptions::default()).await.unwrap();

    provider.fail_action("snapshot.ui", "capture timed out").await;
    let err = cache
        .capture(SnapshotKind::Ui, None, &CaptureOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.reason(), "provider");
    assert!(cache.cached_payload(SnapshotKind::Ui).await.is_some());
}

#[tokio::test]
async fn test_capture_suite_covers_all_kinds_in_order() {
    let (provider, cache) = cache_with_provider();
    let results = cache
        .capture_suite(None, &CaptureOptions::default())
        .await
        .unwrap();
    assert_eq!(results.len(), 4);
    let kinds: Vec<SnapshotKind> = results.iter().map(|r| r.summary.kind).collect();
    assert_eq!(kinds.as_slice(), SnapshotKind::ALL.as_slice());

    let calls = provider.calls().await;
    assert_eq!(
        calls,
        vec!["snapshot.ui", "snapshot.media", "snapshot.system", "snapshot.network"]
    );
}

#[tokio::test]
async fn test_suite_aborts_on_first_failure_keeping_prior_captures() {
    let (provider, cache) = cache_with_provider();
    provider.fail_action("snapshot.system", "bridge busy").await;

    let err = cache
        .capture_suite(None, &CaptureOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err.reason(), "provider");

    // ui and media were captured before the failure and stay cached.
    assert!(cache.cached_payload(SnapshotKind::Ui).await.is_some());
    assert!(cache.cached_payload(SnapshotKind::Media).await.is_some());
    assert!(cache.cached_payload(SnapshotKind::System).await.is_none());
    assert!(cache.cached_payload(SnapshotKind::Network).await.is_none());
}

#[tokio::test]
async fn test_summaries_reflect_cached_entries() {
    let (provider, cache) = cache_with_provider();
    provider
        .set_snapshot(SnapshotKind::Network, json!({"up": true, "rtt_ms": 20}))
        .await;
    cache
        .capture(SnapshotKind::Network, None, &CaptureOptions::default())
        .await
        .unwrap();

    let summaries = cache.summaries().await;
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].kind, SnapshotKind::Network);
    assert_eq!(summaries[0].fields, 2);
    assert!(summaries[0].bytes > 0);
}
