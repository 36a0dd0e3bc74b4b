use crate::{outline::events::sse_stream, types::Result, AppState};
use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::Stream;
use std::{convert::Infallible, time::Duration};
use uuid::Uuid;

/// Stream outline generation for a presentation via SSE.
///
/// An unknown id is a plain 404; nothing is streamed. Dropping the
/// connection drops the stream, which cancels research and generation.
pub async fn stream_outlines(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    let events = state.outline_streamer().open(id).await?;

    Ok(Sse::new(sse_stream(events)).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keepalive"),
    ))
}
