//! Event Emitter: puts orchestrator events on the wire.
//!
//! [`terminated`] guarantees the client sees exactly one terminal event and
//! nothing after it. [`sse_stream`] frames each event as `event: response`
//! with the JSON payload from [`StreamEvent::payload`].

use crate::types::StreamEvent;
use async_stream::stream;
use axum::response::sse::Event;
use futures::{Stream, StreamExt};
use std::convert::Infallible;
use tracing::warn;

/// Detail sent when the producer stops without reporting an outcome
pub const UNEXPECTED_END: &str = "Outline stream ended unexpectedly";

/// Stop after the first terminal event. If the producer ends without one,
/// close with an `Error` so the client never waits on silence.
pub fn terminated<S>(events: S) -> impl Stream<Item = StreamEvent> + Send
where
    S: Stream<Item = StreamEvent> + Send + 'static,
{
    stream! {
        let mut events = Box::pin(events);
        let mut finished = false;

        while let Some(event) = events.next().await {
            finished = event.is_terminal();
            yield event;
            if finished {
                break;
            }
        }

        if !finished {
            warn!("Outline stream ended without a terminal event");
            yield StreamEvent::error(UNEXPECTED_END);
        }
    }
}

pub fn to_sse(event: &StreamEvent) -> Event {
    Event::default()
        .event("response")
        .data(event.payload().to_string())
}

/// Wire-ready SSE stream for axum's `Sse` response
pub fn sse_stream<S>(events: S) -> impl Stream<Item = Result<Event, Infallible>> + Send
where
    S: Stream<Item = StreamEvent> + Send + 'static,
{
    terminated(events).map(|event| Ok(to_sse(&event)))
}
