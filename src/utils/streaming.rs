//! Common Streaming Utilities
//!
//! Turns upstream response bodies into [`ChunkStream`]s. Three body shapes
//! are supported:
//!
//! - server-sent events, parsed with `eventsource-stream` and mapped by an
//!   [`SseEventConverter`];
//! - newline-delimited records, mapped line by line by a [`LineConverter`];
//! - raw UTF-8 text, where every decoded piece is an answer delta.
//!
//! All three are UTF-8 safe across network chunk boundaries.

use eventsource_stream::{Event, Eventsource};
use futures::{Stream, StreamExt};
use tokio_util::codec::{FramedRead, LinesCodec, LinesCodecError};
use tokio_util::io::StreamReader;

use crate::error::ProviderError;
use crate::stream::ChunkStream;
use crate::types::CompletionChunk;

/// Converts provider-specific SSE events into chunks.
///
/// One event may produce several chunks (e.g. a reasoning delta and a finish
/// reason in the same payload).
pub trait SseEventConverter: Send + Sync + 'static {
    /// Convert one event into zero or more chunks
    fn convert_event(&self, event: Event) -> Vec<Result<CompletionChunk, ProviderError>>;

    /// Chunk emitted when the event stream ends, on the `[DONE]` sentinel or
    /// at end of body
    fn handle_stream_end(&self) -> Option<Result<CompletionChunk, ProviderError>> {
        None
    }
}

/// Converts one line of a newline-delimited body into chunks
pub trait LineConverter: Send + Sync + 'static {
    fn convert_line(&self, line: &str) -> Vec<Result<CompletionChunk, ProviderError>>;
}

/// Builds chunk streams from upstream responses
pub struct StreamFactory;

impl StreamFactory {
    /// Stream of SSE events.
    ///
    /// Empty events are skipped and `data: [DONE]` ends the stream. The
    /// converter's end chunk is emitted once, on `[DONE]` or at end of body.
    pub fn create_eventsource_stream<C>(
        provider: &str,
        response: reqwest::Response,
        converter: C,
    ) -> ChunkStream
    where
        C: SseEventConverter,
    {
        let provider = provider.to_string();
        let mut events = Box::pin(response.bytes_stream().eventsource());
        let stream = async_stream::stream! {
            while let Some(event) = events.next().await {
                let event = match event {
                    Ok(event) => event,
                    Err(e) => {
                        yield Err(ProviderError::network(
                            provider.as_str(),
                            format!("SSE stream error: {e}"),
                        ));
                        return;
                    }
                };
                let data = event.data.trim();
                if data == "[DONE]" {
                    if let Some(end) = converter.handle_stream_end() {
                        yield end;
                    }
                    return;
                }
                if data.is_empty() {
                    continue;
                }
                for chunk in converter.convert_event(event) {
                    let failed = chunk.is_err();
                    yield chunk;
                    if failed {
                        return;
                    }
                }
            }
            if let Some(end) = converter.handle_stream_end() {
                yield end;
            }
        };
        Box::pin(stream)
    }

    /// Stream of newline-delimited records; blank lines are skipped
    pub fn create_line_stream<C>(
        provider: &str,
        response: reqwest::Response,
        converter: C,
    ) -> ChunkStream
    where
        C: LineConverter,
    {
        let lines = lines(
            provider,
            response.bytes_stream(),
            crate::defaults::http::MAX_LINE_LENGTH,
        );
        let stream = async_stream::stream! {
            futures::pin_mut!(lines);
            while let Some(line) = lines.next().await {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }
                for chunk in converter.convert_line(&line) {
                    let failed = chunk.is_err();
                    yield chunk;
                    if failed {
                        return;
                    }
                }
            }
        };
        Box::pin(stream)
    }

    /// Stream where the whole body is answer text
    pub fn create_text_stream(provider: &str, response: reqwest::Response) -> ChunkStream {
        Box::pin(text_deltas(provider, response.bytes_stream()))
    }
}

/// Split a byte stream into UTF-8 lines without their terminators.
///
/// A final line without a trailing newline is still emitted. A line longer
/// than `max_length` bytes is a malformed payload and ends the stream.
pub fn lines<S, B>(
    provider: &str,
    bytes: S,
    max_length: usize,
) -> impl Stream<Item = Result<String, ProviderError>> + Send + 'static
where
    S: Stream<Item = Result<B, reqwest::Error>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
{
    let provider = provider.to_string();
    let reader = StreamReader::new(
        bytes.map(|chunk| chunk.map(std::io::Cursor::new).map_err(std::io::Error::other)),
    );
    let framed = FramedRead::new(reader, LinesCodec::new_with_max_length(max_length));
    async_stream::stream! {
        futures::pin_mut!(framed);
        while let Some(line) = framed.next().await {
            match line {
                Ok(line) => {
                    yield Ok(line);
                }
                Err(e) => {
                    yield Err(line_error(&provider, e));
                    return;
                }
            }
        }
    }
}

fn line_error(provider: &str, err: LinesCodecError) -> ProviderError {
    match err {
        LinesCodecError::MaxLineLengthExceeded => {
            ProviderError::malformed(provider, "upstream line exceeds the maximum length")
        }
        LinesCodecError::Io(e) => {
            if let Some(inner) = e.get_ref().and_then(|r| r.downcast_ref::<reqwest::Error>()) {
                return ProviderError::from_reqwest(provider, inner);
            }
            match e.kind() {
                std::io::ErrorKind::InvalidData => {
                    ProviderError::malformed(provider, format!("invalid UTF-8 in line: {e}"))
                }
                _ => ProviderError::network(provider, format!("upstream body error: {e}")),
            }
        }
    }
}

/// Decode a byte stream as UTF-8 text deltas.
///
/// Multi-byte characters split across network chunks are held back until
/// complete. The stream ends with `StreamEnd(stop)`.
pub fn text_deltas<S, B>(
    provider: &str,
    bytes: S,
) -> impl Stream<Item = Result<CompletionChunk, ProviderError>> + Send + 'static
where
    S: Stream<Item = Result<B, reqwest::Error>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
{
    let provider = provider.to_string();
    async_stream::stream! {
        futures::pin_mut!(bytes);
        let mut pending: Vec<u8> = Vec::new();
        while let Some(chunk) = bytes.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    yield Err(ProviderError::from_reqwest(provider.as_str(), &e));
                    return;
                }
            };
            pending.extend_from_slice(chunk.as_ref());
            match take_valid_utf8(&mut pending) {
                Ok(text) if text.is_empty() => {}
                Ok(text) => {
                    yield Ok(CompletionChunk::content(text));
                }
                Err(e) => {
                    yield Err(ProviderError::malformed(provider.as_str(), e));
                    return;
                }
            }
        }
        if !pending.is_empty() {
            yield Err(ProviderError::malformed(
                provider.as_str(),
                "upstream body ended inside a UTF-8 sequence",
            ));
            return;
        }
        yield Ok(CompletionChunk::end(crate::types::FinishReason::Stop));
    }
}

/// Remove and return the longest valid UTF-8 prefix of `pending`.
///
/// An incomplete trailing sequence stays in `pending`; an invalid one is an
/// error.
fn take_valid_utf8(pending: &mut Vec<u8>) -> Result<String, String> {
    match std::str::from_utf8(pending) {
        Ok(text) => {
            let text = text.to_string();
            pending.clear();
            Ok(text)
        }
        Err(e) if e.error_len().is_none() => {
            let valid = e.valid_up_to();
            let rest = pending.split_off(valid);
            let text = String::from_utf8(std::mem::replace(pending, rest))
                .map_err(|e| format!("invalid UTF-8 in body: {e}"))?;
            Ok(text)
        }
        Err(e) => Err(format!("invalid UTF-8 in body: {e}")),
    }
}
