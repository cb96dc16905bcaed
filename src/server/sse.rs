//! SSE encoding of increment streams
//!
//! Every increment becomes one `data: {chat.completion.chunk}` event and a
//! successful stream ends with `data: [DONE]`. A failure mid-stream is sent
//! as one `data: {error envelope}` event, after which the stream closes
//! without `[DONE]`.

use std::convert::Infallible;

use axum::response::sse::{Event, Sse};
use futures::{Stream, StreamExt};

use crate::normalizer::IncrementStream;

/// Terminal data line of a successful stream
pub const DONE: &str = "[DONE]";

/// Encode increments as SSE events
pub fn sse_events(
    mut increments: IncrementStream,
) -> impl Stream<Item = Result<Event, Infallible>> + Send {
    async_stream::stream! {
        while let Some(item) = increments.next().await {
            match item {
                Ok(chunk) => {
                    let data = serde_json::to_string(&chunk)
                        .unwrap_or_else(|_| "{}".to_string());
                    yield Ok(Event::default().data(data));
                }
                Err(error) => {
                    tracing::warn!(code = error.code(), "stream failed: {}", error);
                    let data = serde_json::to_string(&error.to_envelope())
                        .unwrap_or_else(|_| r#"{"error":{"message":"internal error","type":"internal_error","code":"internal_error"}}"#.to_string());
                    yield Ok(Event::default().data(data));
                    return;
                }
            }
        }
        yield Ok(Event::default().data(DONE));
    }
}

/// Wrap increments into an axum SSE response
pub fn to_sse_response(
    increments: IncrementStream,
) -> Sse<impl Stream<Item = Result<Event, Infallible>> + Send> {
    Sse::new(sse_events(increments))
}
