//! Server-Sent Events (SSE) for live dashboard updates
//!
//! Every connection owns one hub subscriber. When the client goes away the
//! stream is dropped, which drops the subscriber and unregisters it.

use axum::{
    extract::State,
    response::sse::{Event, Sse},
};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::broadcaster::{Signal, Subscriber};
use crate::AppState;

/// GET /api/events - SSE stream of refresh notifications
///
/// Streams:
/// - `ConnectionStatus` once, on connect
/// - `update` with the JSON event for every committed write or reset
/// - a `keep-alive` comment after each idle interval
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let subscriber = state.hub.open_live_stream();
    Sse::new(live_stream(subscriber, state.hub.settings().keep_alive))
}

/// Turn a subscriber into an SSE event stream
///
/// The stream ends when the broadcaster closes the subscriber's queue.
pub fn live_stream(
    mut subscriber: Subscriber,
    keep_alive: Duration,
) -> impl Stream<Item = Result<Event, Infallible>> {
    async_stream::stream! {
        info!(subscriber = subscriber.id(), "SSE: live stream started");

        yield Ok(Event::default()
            .event("ConnectionStatus")
            .data("connected"));

        while let Some(signal) = subscriber.next_signal(keep_alive).await {
            match signal {
                Signal::Event(event) => {
                    match Event::default().event("update").json_data(&event) {
                        Ok(sse_event) => {
                            yield Ok(sse_event);
                        }
                        Err(e) => warn!("SSE: failed to encode event: {}", e),
                    }
                }
                Signal::KeepAlive => {
                    debug!("SSE: sending keep-alive");
                    yield Ok(Event::default().comment("keep-alive"));
                }
            }
        }

        info!(subscriber = subscriber.id(), "SSE: live stream closed");
    }
}
