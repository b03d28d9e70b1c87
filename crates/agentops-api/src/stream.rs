// crates/agentops-api/src/stream.rs
// ============================================================================
// Module: SSE Relay (SR)
// Description: Streams RCA progress to a connected client.
// Purpose: Implement `GET /rca-runs/{rca_run_id}/stream` from spec §4.8/§6.
// Dependencies: agentops-broker, agentops-core, axum, tokio, tokio-stream
// ============================================================================

//! ## Overview
//! Flushes the current snapshot first (so a client connecting mid-run does
//! not wait for the next publish), then relays the broadcast channel until a
//! terminal [`RcaStatus`] is forwarded or the subscriber lags and the
//! channel closes. A dedicated task drives the relay into an mpsc channel
//! that backs the SSE body, so a slow or disconnected client can never stall
//! the broadcast receiver for other subscribers.

use std::convert::Infallible;

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, KeepAliveStream, Sse};
use tokio::sync::broadcast;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use agentops_core::identifiers::RcaRunId;
use agentops_core::model::ProgressEvent;

use crate::AppState;

const RELAY_BUFFER: usize = 32;

/// `GET /rca-runs/{rca_run_id}/stream` — Server-Sent Events progress relay.
pub async fn rca_stream_handler(
    State(state): State<AppState>,
    Path(rca_run_id): Path<String>,
) -> Sse<KeepAliveStream<ReceiverStream<Result<Event, Infallible>>>> {
    let rca_run_id = RcaRunId::new(rca_run_id);
    let receiver = state.publisher.subscribe(&rca_run_id);
    let snapshot = state.publisher.get_latest_status(&rca_run_id);

    let rx = spawn_relay(receiver, snapshot);
    Sse::new(ReceiverStream::new(rx)).keep_alive(KeepAlive::default())
}

/// Drains `snapshot` (if any) followed by `receiver` into a fresh mpsc
/// channel, stopping at the first terminal status or send failure. Split
/// out from [`rca_stream_handler`] so the relay's stop condition can be
/// exercised directly without an `axum::response::Sse` wrapper in the way.
fn spawn_relay(
    mut receiver: broadcast::Receiver<ProgressEvent>,
    snapshot: Option<ProgressEvent>,
) -> mpsc::Receiver<Result<Event, Infallible>> {
    let (tx, rx) = mpsc::channel(RELAY_BUFFER);

    tokio::spawn(async move {
        if let Some(event) = snapshot {
            let terminal = event.status.is_terminal();
            if tx.send(to_sse_event(event)).await.is_err() || terminal {
                return;
            }
        }

        while let Ok(event) = receiver.recv().await {
            let terminal = event.status.is_terminal();
            if tx.send(to_sse_event(event)).await.is_err() || terminal {
                break;
            }
        }
    });

    rx
}

fn to_sse_event(event: ProgressEvent) -> Result<Event, Infallible> {
    Ok(Event::default().data(serde_json::to_string(&event).unwrap_or_default()))
}

#[cfg(test)]
mod tests {
    use agentops_broker::Publisher;
    use agentops_core::model::RcaStatus;

    use super::*;

    /// Scenario J: subscribe before enqueue, observe events, and the stream
    /// closes after exactly one event whose status is terminal.
    #[tokio::test]
    async fn stream_closes_after_one_terminal_event() {
        let publisher = Publisher::new();
        let rca_run_id = RcaRunId::generate();
        let receiver = publisher.subscribe(&rca_run_id);

        publisher.publish(&rca_run_id, RcaStatus::Done, "completed", 100, "RCA complete");

        let mut rx = spawn_relay(receiver, None);
        assert!(rx.recv().await.expect("one event").is_ok());
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn non_terminal_events_keep_the_stream_open() {
        let publisher = Publisher::new();
        let rca_run_id = RcaRunId::generate();
        let receiver = publisher.subscribe(&rca_run_id);

        publisher.publish(&rca_run_id, RcaStatus::Running, "collecting_evidence", 30, "Collecting evidence");
        publisher.publish(&rca_run_id, RcaStatus::Done, "completed", 100, "RCA complete");

        let mut rx = spawn_relay(receiver, None);
        assert!(rx.recv().await.is_some());
        assert!(rx.recv().await.is_some());
        assert!(rx.recv().await.is_none());
    }
}
