//! Per-team Server-Sent Events stream

use axum::{
    extract::{Path, State},
    response::sse::{Event, Sse},
};
use cluehunt_common::sse::team_event_stream;
use futures::stream::Stream;
use std::convert::Infallible;

use crate::AppState;

/// GET /api/teams/:team_id/events
///
/// Opens with the team's chat history, then streams `state`, `progress` and
/// `chatMessage` events for that team.
pub async fn team_events(
    State(state): State<AppState>,
    Path(team_id): Path<String>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let team_id = team_id.trim().to_string();
    // Subscribe before reading the backlog so nothing falls in between
    let rx = state.event_bus.subscribe();
    let backlog = state.engine.chat_history(&team_id).await;
    team_event_stream(rx, team_id, backlog)
}
