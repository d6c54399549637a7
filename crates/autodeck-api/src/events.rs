//! Event stream and history handlers.
//!
//! - GET /events          - SSE stream of live bus events
//! - GET /events/history  - Recent retained events

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::Json;
use axum::extract::{Query, State};
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{Stream, StreamExt};
use tracing::{info, warn};
use uuid::Uuid;

use autodeck_core::Event;

use crate::state::AppState;

/// Events returned by GET /events/history when no limit is given.
const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Comment ping cadence on idle SSE connections.
const KEEP_ALIVE_SECS: u64 = 15;

/// Query parameters for event history.
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

/// Response for event history.
#[derive(Debug, Serialize)]
pub struct EventListResponse {
    pub count: usize,
    pub events: Vec<Event>,
}

/// Live event stream.
///
/// GET /events
///
/// Emits one named SSE event per bus event: the bus id becomes the SSE id,
/// the kind becomes the SSE event name, and the full record is the JSON
/// data. History is not replayed; catch-up goes through /events/history.
/// A dropped connection is removed by the bus on its next publish.
pub async fn stream_events(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    let connection = Uuid::new_v4();
    let subscription = state.orchestrator.subscribe().await;
    info!(%connection, subscriber = subscription.id, "event stream opened");

    let stream = ReceiverStream::new(subscription.receiver).map(move |event| {
        Ok(match serde_json::to_string(&event) {
            Ok(data) => SseEvent::default()
                .id(event.id.to_string())
                .event(event.kind.as_str())
                .data(data),
            Err(err) => {
                warn!(%connection, "event serialization failed: {err}");
                SseEvent::default().comment("event serialization failed")
            }
        })
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(KEEP_ALIVE_SECS))
            .text("ping"),
    )
}

/// Recent retained events, oldest first.
///
/// GET /events/history?limit=
pub async fn event_history(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HistoryQuery>,
) -> Json<EventListResponse> {
    let events = state
        .orchestrator
        .event_history(query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT))
        .await;
    let count = events.len();
    Json(EventListResponse { count, events })
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;
