//! Server-Sent Events stream of the event bus

use crate::core::auth::AuthPolicy;
use crate::core::events::EventEnvelope;
use crate::server::auth::guarded;
use crate::server::host::AppState;
use axum::Router;
use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::get;
use futures::Stream;
use std::convert::Infallible;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

pub fn routes(state: AppState) -> Router {
    guarded(
        Router::new().route("/events", get(stream_events)).with_state(state),
        AuthPolicy::Authenticated,
    )
}

/// One SSE frame per envelope, named after the event kind
pub fn sse_event(envelope: &EventEnvelope) -> Option<Event> {
    Event::default()
        .id(envelope.id.to_string())
        .event(envelope.event.event_kind())
        .json_data(envelope)
        .inspect_err(|e| tracing::warn!(error = %e, "could not encode event"))
        .ok()
}

async fn stream_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    tracing::debug!(subscribers = state.events.receiver_count() + 1, "event stream opened");
    let stream = BroadcastStream::new(state.events.subscribe()).filter_map(|received| match received {
        Ok(envelope) => sse_event(&envelope).map(Ok),
        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
            tracing::warn!(skipped, "event stream lagged");
            None
        }
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}
