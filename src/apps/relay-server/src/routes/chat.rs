use crate::state::AppState;
use atelier_core::ConversationTurn;
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures_util::{Stream, StreamExt};

/// Relay one turn as a push stream of `status` / `text` / `done` | `error` events.
pub async fn stream_chat(
    State(state): State<AppState>,
    Json(turn): Json<ConversationTurn>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    tracing::info!(
        "Chat turn received: history={}, editing={}",
        turn.history.len(),
        turn.edit.is_some()
    );

    let stream = state.relay.stream(turn).map(|event| {
        Event::default()
            .event(event.event_type())
            .json_data(event.to_sse_data())
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
