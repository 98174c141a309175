//! Server-Sent Events (SSE) utilities
//!
//! Turns the shared [`EventBus`](crate::events::EventBus) into a per-team SSE
//! stream.

use crate::events::{ChatMessage, HuntEvent};
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};

/// Create the SSE stream for one team channel
///
/// The stream opens with a `ConnectionStatus` event, then replays `backlog` as
/// a single `chatHistory` event (skipped when empty), then forwards every bus
/// event addressed to `team_id`, named by [`TeamEvent::event_type`].
///
/// `rx` should be subscribed *before* `backlog` is read so no message falls
/// between the two; a message present in both is delivered twice, which the
/// at-least-once contract allows.
///
/// [`TeamEvent::event_type`]: crate::events::TeamEvent::event_type
pub fn team_event_stream(
    mut rx: broadcast::Receiver<HuntEvent>,
    team_id: String,
    backlog: Vec<ChatMessage>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!(team_id = %team_id, "New SSE client connected");

    let stream = async_stream::stream! {
        yield Ok(Event::default()
            .event("ConnectionStatus")
            .data("connected"));

        if !backlog.is_empty() {
            match serde_json::to_string(&backlog) {
                Ok(json) => yield Ok(Event::default().event("chatHistory").data(json)),
                Err(e) => warn!("Failed to serialize chat history: {}", e),
            }
        }

        loop {
            match rx.recv().await {
                Ok(hunt_event) => {
                    if hunt_event.team_id != team_id {
                        continue;
                    }
                    let event_type = hunt_event.event.event_type();
                    match serde_json::to_string(&hunt_event.event) {
                        Ok(json) => {
                            debug!(team_id = %team_id, "Broadcasting SSE event: {}", event_type);
                            yield Ok(Event::default().event(event_type).data(json));
                        }
                        Err(e) => warn!("Failed to serialize event: {}", e),
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(team_id = %team_id, "SSE subscriber lagged, {} events dropped", skipped);
                }
                Err(RecvError::Closed) => {
                    debug!(team_id = %team_id, "Event bus closed, ending SSE stream");
                    break;
                }
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
