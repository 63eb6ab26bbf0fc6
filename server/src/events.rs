//! Live telemetry over server-sent events.
//!
//! Each connection gets its own interval-driven stream of named JSON events;
//! the stream (and its timers) is torn down when the client disconnects.

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use rand::Rng;
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::IntervalStream;
use tokio_stream::{Stream, StreamExt};
use tracing::debug;

use crate::AppState;

const AGENT_STATUS_INTERVAL_SECS: u64 = 5;
const TASK_PROGRESS_INTERVAL_SECS: u64 = 3;
const HEARTBEAT_INTERVAL_SECS: u64 = 10;

const SYNTHETIC_STATUSES: [&str; 4] = ["idle", "busy", "thinking", "executing"];

fn named_event(event_type: &str, payload: serde_json::Value) -> Event {
    let body = serde_json::json!({
        "type": event_type,
        "timestamp": chrono::Utc::now().timestamp_millis(),
        "payload": payload,
    });
    Event::default().event(event_type).data(body.to_string())
}

async fn agent_status_event(state: &AppState) -> Event {
    let agents = state.agents.read().await.list();

    let payload = {
        let mut rng = rand::thread_rng();
        let (agent_id, agent_type) = if agents.is_empty() {
            (
                format!("agent-sim-{}", rng.gen_range(1..=4)),
                "simulated".to_string(),
            )
        } else {
            let pick = &agents[rng.gen_range(0..agents.len())];
            (pick.id.clone(), pick.agent_type.clone())
        };
        let status = SYNTHETIC_STATUSES[rng.gen_range(0..SYNTHETIC_STATUSES.len())];
        serde_json::json!({
            "agent_id": agent_id,
            "agent_type": agent_type,
            "status": status,
        })
    };

    named_event("agent.status.changed", payload)
}

async fn task_progress_event(state: &AppState) -> Event {
    let recent = state
        .tasks
        .list_tasks(&vibex_store::TaskFilter {
            limit: 20,
            ..Default::default()
        })
        .map(|(tasks, _)| tasks)
        .unwrap_or_default();

    let payload = {
        let mut rng = rand::thread_rng();
        let task_id = if recent.is_empty() {
            format!("task-sim-{}", rng.gen_range(1..=8))
        } else {
            recent[rng.gen_range(0..recent.len())].id.clone()
        };
        serde_json::json!({
            "task_id": task_id,
            "progress": rng.gen_range(0..=100),
        })
    };

    named_event("task.progress.updated", payload)
}

fn heartbeat_event(state: &AppState, connected_at: i64) -> Event {
    named_event(
        "heartbeat",
        serde_json::json!({
            "uptime_seconds": state.started_at.elapsed().as_secs(),
            "connection_age_seconds": chrono::Utc::now().timestamp() - connected_at,
        }),
    )
}

/// `GET /api/events` — one SSE stream per client
pub async fn sse_handler(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    debug!("SSE client connected");
    let connected_at = chrono::Utc::now().timestamp();

    let agent_stream = {
        let state = state.clone();
        IntervalStream::new(tokio::time::interval(Duration::from_secs(
            AGENT_STATUS_INTERVAL_SECS,
        )))
        .then(move |_| {
            let state = state.clone();
            async move { agent_status_event(&state).await }
        })
    };

    let task_stream = {
        let state = state.clone();
        IntervalStream::new(tokio::time::interval(Duration::from_secs(
            TASK_PROGRESS_INTERVAL_SECS,
        )))
        .then(move |_| {
            let state = state.clone();
            async move { task_progress_event(&state).await }
        })
    };

    let heartbeat_stream = {
        let state = state.clone();
        IntervalStream::new(tokio::time::interval(Duration::from_secs(
            HEARTBEAT_INTERVAL_SECS,
        )))
        .map(move |_| heartbeat_event(&state, connected_at))
    };

    let merged = agent_stream
        .merge(task_stream)
        .merge(heartbeat_stream)
        .map(Ok);

    Sse::new(merged).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_event_payload_shape() {
        let event = named_event("heartbeat", serde_json::json!({"n": 1}));
        // Event's Debug output includes the serialized data
        let rendered = format!("{event:?}");
        assert!(rendered.contains("heartbeat"));
    }

    #[test]
    fn test_event_body_is_valid_json() {
        let body = serde_json::json!({
            "type": "agent.status.changed",
            "timestamp": 123,
            "payload": {"agent_id": "a", "status": "busy"},
        });
        let parsed: serde_json::Value = serde_json::from_str(&body.to_string()).unwrap();
        assert_eq!(parsed["type"], "agent.status.changed");
        assert_eq!(parsed["payload"]["status"], "busy");
    }
}
