//! Response Normalizer
//!
//! Turns adapter output into OpenAI chat-completion bodies. Reasoning runs are
//! rendered inline, wrapped in a thinking marker:
//!
//! ```text
//! <thinking>
//! {reasoning}
//! </thinking>
//!
//! {answer}
//! ```
//!
//! Streaming and non-streaming rendering agree: concatenating the `content`
//! of every increment produced by [`ResponseNormalizer::stream`] yields the
//! same text [`ResponseNormalizer::completion`] returns for the collected
//! chunks.

use futures::{Stream, StreamExt};
use std::pin::Pin;

use crate::error::GatewayError;
use crate::stream::ChunkStream;
use crate::types::{
    CHAT_COMPLETION_CHUNK_OBJECT, CHAT_COMPLETION_OBJECT, ChatCompletionChunk,
    ChatCompletionResponse, ChatMessage, Choice, ChunkChoice, ChunkDelta, CompletionChunk,
    CompletionResult, FinishReason, ResponseMessage, Role, Segment, SegmentKind, Usage,
};

/// Opens a reasoning run
pub const THINKING_OPEN: &str = "<thinking>\n";
/// Closes a reasoning run and separates it from what follows
pub const THINKING_CLOSE: &str = "\n</thinking>\n\n";

/// Stream of OpenAI increments
pub type IncrementStream =
    Pin<Box<dyn Stream<Item = Result<ChatCompletionChunk, GatewayError>> + Send>>;

/// Per-request renderer
#[derive(Debug, Clone)]
pub struct ResponseNormalizer {
    model: String,
    id: String,
    created: i64,
}

impl ResponseNormalizer {
    pub fn new(model: impl Into<String>, id: impl Into<String>, created: i64) -> Self {
        Self {
            model: model.into(),
            id: id.into(),
            created,
        }
    }

    /// Normalizer with a fresh `chatcmpl-` id and the current time
    pub fn for_model(model: impl Into<String>) -> Self {
        Self::new(
            model,
            format!("chatcmpl-{}", uuid::Uuid::new_v4().simple()),
            chrono::Utc::now().timestamp(),
        )
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Render segments as one string, reasoning runs wrapped in markers
    pub fn render_segments(segments: &[Segment]) -> String {
        let mut out = String::new();
        for segment in segments {
            match segment.kind {
                SegmentKind::Reasoning => {
                    out.push_str(THINKING_OPEN);
                    out.push_str(&segment.text);
                    out.push_str(THINKING_CLOSE);
                }
                SegmentKind::Final => out.push_str(&segment.text),
            }
        }
        out
    }

    /// Build the non-streaming body.
    ///
    /// Usage reported by the upstream wins; otherwise it is estimated from
    /// `messages` and the visible answer.
    pub fn completion(
        &self,
        result: CompletionResult,
        messages: &[ChatMessage],
    ) -> ChatCompletionResponse {
        let usage = result
            .usage
            .unwrap_or_else(|| Usage::estimate(messages, &result.text()));
        ChatCompletionResponse {
            id: self.id.clone(),
            object: CHAT_COMPLETION_OBJECT.to_string(),
            created: self.created,
            model: self.model.clone(),
            choices: vec![Choice {
                index: 0,
                message: ResponseMessage {
                    role: Role::Assistant,
                    content: Self::render_segments(&result.segments),
                },
                finish_reason: result.finish_reason,
            }],
            usage,
        }
    }

    /// Convert adapter chunks into OpenAI increments.
    ///
    /// The first increment announces the assistant role with empty content.
    /// The last one has an empty delta and a finish reason; it is synthesized
    /// with `stop` when the adapter stream ends without `StreamEnd`. An
    /// adapter error is yielded once and ends the stream.
    pub fn stream(self, mut chunks: ChunkStream) -> IncrementStream {
        let stream = async_stream::stream! {
            yield Ok(self.increment(
                ChunkDelta { role: Some(Role::Assistant), content: Some(String::new()) },
                None,
            ));

            let mut in_reasoning = false;
            let mut finish_reason = FinishReason::Stop;
            while let Some(item) = chunks.next().await {
                let chunk = match item {
                    Ok(chunk) => chunk,
                    Err(error) => {
                        yield Err(GatewayError::from(error));
                        return;
                    }
                };
                match chunk {
                    CompletionChunk::ReasoningDelta { delta } => {
                        if delta.is_empty() {
                            continue;
                        }
                        let text = if in_reasoning { delta } else { format!("{THINKING_OPEN}{delta}") };
                        in_reasoning = true;
                        yield Ok(self.content(text));
                    }
                    CompletionChunk::ContentDelta { delta } => {
                        if delta.is_empty() {
                            continue;
                        }
                        let text = if in_reasoning { format!("{THINKING_CLOSE}{delta}") } else { delta };
                        in_reasoning = false;
                        yield Ok(self.content(text));
                    }
                    CompletionChunk::UsageUpdate { .. } => {}
                    CompletionChunk::StreamEnd { finish_reason: reason } => {
                        finish_reason = reason;
                        break;
                    }
                }
            }

            if in_reasoning {
                yield Ok(self.content(THINKING_CLOSE.to_string()));
            }
            yield Ok(self.increment(ChunkDelta::default(), Some(finish_reason)));
        };
        Box::pin(stream)
    }

    fn content(&self, text: String) -> ChatCompletionChunk {
        self.increment(
            ChunkDelta {
                role: None,
                content: Some(text),
            },
            None,
        )
    }

    fn increment(
        &self,
        delta: ChunkDelta,
        finish_reason: Option<FinishReason>,
    ) -> ChatCompletionChunk {
        ChatCompletionChunk {
            id: self.id.clone(),
            object: CHAT_COMPLETION_CHUNK_OBJECT.to_string(),
            created: self.created,
            model: self.model.clone(),
            choices: vec![ChunkChoice {
                index: 0,
                delta,
                finish_reason,
            }],
        }
    }
}
