//! Server-Sent Events stream of task progress.

use axum::extract::{Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures_core::Stream;
use serde::Deserialize;
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

use crate::state::{AppEvent, SharedState};

#[derive(Debug, Default, Deserialize)]
pub struct EventFilter {
    /// Only forward events for this task.
    pub task: Option<String>,
}

impl AppEvent {
    pub fn task_id(&self) -> &str {
        match self {
            AppEvent::TaskQueued { task_id, .. }
            | AppEvent::TaskProgress { task_id, .. }
            | AppEvent::TaskComplete { task_id, .. }
            | AppEvent::TaskFailed { task_id, .. } => task_id,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AppEvent::TaskQueued { .. } => "task_queued",
            AppEvent::TaskProgress { .. } => "task_progress",
            AppEvent::TaskComplete { .. } => "task_complete",
            AppEvent::TaskFailed { .. } => "task_failed",
        }
    }
}

/// Encode one event; `None` when filtered out.
pub fn to_sse_event(event: &AppEvent, filter: &EventFilter) -> Option<Event> {
    if let Some(task) = filter.task.as_deref() {
        if event.task_id() != task {
            return None;
        }
    }
    serde_json::to_string(event)
        .ok()
        .map(|data| Event::default().event(event.name()).data(data))
}

/// SSE endpoint. Lagged receivers skip the events they missed.
pub async fn sse_handler(
    State(state): State<SharedState>,
    Query(filter): Query<EventFilter>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(move |result| {
        result.ok().and_then(|event| to_sse_event(&event, &filter)).map(Ok)
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}
