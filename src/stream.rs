//! Streaming Types
//!
//! Adapter output in either delivery mode, plus the conversions between them.

use futures::{Stream, StreamExt};
use std::pin::Pin;
use std::time::Duration;

use crate::error::ProviderError;
use crate::types::{CompletionChunk, CompletionResult, FinishReason};

/// Stream of adapter chunks
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<CompletionChunk, ProviderError>> + Send>>;

/// What an adapter hands back for one request
pub enum CompletionOutput {
    /// The whole answer at once
    Complete(CompletionResult),
    /// The answer as it is produced
    Stream(ChunkStream),
}

impl CompletionOutput {
    pub fn is_stream(&self) -> bool {
        matches!(self, Self::Stream(_))
    }
}

impl std::fmt::Debug for CompletionOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Complete(result) => f.debug_tuple("Complete").field(result).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

impl From<CompletionResult> for CompletionOutput {
    fn from(result: CompletionResult) -> Self {
        Self::Complete(result)
    }
}

/// Drain a chunk stream into a single result.
///
/// Chunks after `StreamEnd` are ignored. The first error aborts collection.
pub async fn collect_chunks(mut stream: ChunkStream) -> Result<CompletionResult, ProviderError> {
    let mut result = CompletionResult::new();
    while let Some(chunk) = stream.next().await {
        match chunk? {
            CompletionChunk::ContentDelta { delta } => result.push_text(delta),
            CompletionChunk::ReasoningDelta { delta } => result.push_reasoning(delta),
            CompletionChunk::UsageUpdate { usage } => result.usage = Some(usage),
            CompletionChunk::StreamEnd { finish_reason } => {
                result.finish_reason = finish_reason;
                break;
            }
        }
    }
    Ok(result)
}

/// Replay a finished result as a chunk stream.
///
/// Every segment is cut into pieces of `words_per_chunk` words; whitespace
/// is kept attached to the preceding word so the concatenated deltas equal
/// the original text byte for byte. `delay` is awaited between pieces.
pub fn simulate_stream(
    result: CompletionResult,
    words_per_chunk: usize,
    delay: Duration,
) -> ChunkStream {
    let words_per_chunk = words_per_chunk.max(1);
    let mut chunks = Vec::new();
    for segment in &result.segments {
        for piece in split_words(&segment.text, words_per_chunk) {
            chunks.push(match segment.kind {
                crate::types::SegmentKind::Reasoning => CompletionChunk::reasoning(piece),
                crate::types::SegmentKind::Final => CompletionChunk::content(piece),
            });
        }
    }
    if let Some(usage) = result.usage {
        chunks.push(CompletionChunk::UsageUpdate { usage });
    }
    chunks.push(CompletionChunk::end(result.finish_reason));

    let stream = async_stream::stream! {
        let mut first = true;
        for chunk in chunks {
            let is_text = matches!(
                chunk,
                CompletionChunk::ContentDelta { .. } | CompletionChunk::ReasoningDelta { .. }
            );
            if is_text && !first && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if is_text {
                first = false;
            }
            yield Ok(chunk);
        }
    };
    Box::pin(stream)
}

/// Split `text` into pieces of `n` words, trailing whitespace included.
fn split_words(text: &str, n: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut words = 0;
    let mut in_word = false;

    for ch in text.chars() {
        if ch.is_whitespace() {
            in_word = false;
        } else if !in_word {
            if words == n {
                pieces.push(std::mem::take(&mut current));
                words = 0;
            }
            in_word = true;
            words += 1;
        }
        current.push(ch);
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}

/// A stream holding exactly one error
pub fn error_stream(error: ProviderError) -> ChunkStream {
    Box::pin(futures::stream::once(async move { Err(error) }))
}

/// A stream replaying the given chunks, terminated with `StreamEnd(stop)` if
/// the list does not already end with one
pub fn chunks_stream(mut chunks: Vec<CompletionChunk>) -> ChunkStream {
    if !chunks.last().is_some_and(CompletionChunk::is_terminal) {
        chunks.push(CompletionChunk::end(FinishReason::Stop));
    }
    Box::pin(futures::stream::iter(chunks.into_iter().map(Ok)))
}
