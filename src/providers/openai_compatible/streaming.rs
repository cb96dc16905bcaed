//! OpenAI-compatible SSE conversion
//!
//! Maps `chat.completion.chunk` events to [`CompletionChunk`]s. Reasoning
//! deltas (`reasoning_content`, `reasoning` or `thinking`) stay on their own
//! channel. The finish reason is held until the stream ends so a trailing
//! usage-only event is still seen.

use eventsource_stream::Event;
use std::sync::Mutex;

use super::types::{OpenAiStreamEvent, finish_reason};
use crate::error::ProviderError;
use crate::types::{CompletionChunk, FinishReason};
use crate::utils::streaming::SseEventConverter;

/// Event converter for OpenAI-compatible streams
pub struct OpenAiCompatibleEventConverter {
    provider: String,
    finish_reason: Mutex<Option<FinishReason>>,
}

impl OpenAiCompatibleEventConverter {
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            finish_reason: Mutex::new(None),
        }
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Chunks carried by one parsed event
    pub fn convert_stream_event(&self, event: OpenAiStreamEvent) -> Vec<CompletionChunk> {
        let mut chunks = Vec::with_capacity(2);
        if let Some(choice) = event.choices.into_iter().next() {
            if let Some(delta) = &choice.delta {
                if let Some(reasoning) = delta.reasoning_text() {
                    chunks.push(CompletionChunk::reasoning(reasoning));
                }
                if let Some(content) = delta.content.as_deref().filter(|c| !c.is_empty()) {
                    chunks.push(CompletionChunk::content(content));
                }
            }
            if choice.finish_reason.is_some() {
                let reason = finish_reason(choice.finish_reason.as_deref());
                *self
                    .finish_reason
                    .lock()
                    .unwrap_or_else(|e| e.into_inner()) = Some(reason);
            }
        }
        if let Some(usage) = event.usage.and_then(|u| u.to_usage()) {
            chunks.push(CompletionChunk::UsageUpdate { usage });
        }
        chunks
    }
}

impl SseEventConverter for OpenAiCompatibleEventConverter {
    fn convert_event(&self, event: Event) -> Vec<Result<CompletionChunk, ProviderError>> {
        match serde_json::from_str::<OpenAiStreamEvent>(&event.data) {
            Ok(parsed) => self.convert_stream_event(parsed).into_iter().map(Ok).collect(),
            Err(e) => vec![Err(ProviderError::malformed(
                self.provider.as_str(),
                format!("failed to parse stream event: {e}"),
            ))],
        }
    }

    fn handle_stream_end(&self) -> Option<Result<CompletionChunk, ProviderError>> {
        let reason = self
            .finish_reason
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
            .unwrap_or_default();
        Some(Ok(CompletionChunk::end(reason)))
    }
}
