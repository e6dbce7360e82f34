//! Server-Sent Events (SSE) handler.
//!
//! Subscribes to the [`fc_core::events::EventBus`], replays recent events for
//! late joiners, and sends keepalive heartbeats.

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use std::convert::Infallible;
use std::time::Duration;

use crate::context::AppContext;

/// Number of buffered events replayed to a new subscriber.
const REPLAY_EVENTS: usize = 50;

/// GET /events -- SSE stream of upload and delete events.
#[utoipa::path(
    get,
    path = "/events",
    responses(
        (status = 200, description = "Event stream", body = String, content_type = "text/event-stream")
    )
)]
pub async fn events_handler(
    State(ctx): State<AppContext>,
) -> Sse<impl futures_core::Stream<Item = Result<Event, Infallible>>> {
    let recent = ctx.event_bus.recent_events(REPLAY_EVENTS);
    let mut rx = ctx.event_bus.subscribe();

    let stream = async_stream::stream! {
        for event in recent.into_iter().rev() {
            if let Ok(data) = serde_json::to_string(&event) {
                yield Ok(Event::default().data(data));
            }
        }

        loop {
            match rx.recv().await {
                Ok(event) => {
                    if let Ok(data) = serde_json::to_string(&event) {
                        yield Ok(Event::default().data(data));
                    }
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    tracing::debug!("SSE client lagged by {n} events");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}
