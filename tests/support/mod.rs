//! In-memory provider adapters for router and server tests
#![allow(dead_code)]

use async_trait::async_trait;
use futures::StreamExt;
use omegatron::prelude::*;
use omegatron::stream::chunks_stream;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

/// What a [`MockAdapter`] does when called
#[derive(Debug, Clone)]
pub enum Behavior {
    /// Answer at once
    Complete(CompletionResult),
    /// Stream these chunks
    Stream(Vec<CompletionChunk>),
    /// Stream these chunks, then hang
    Stall(Vec<CompletionChunk>),
    /// Sleep, then answer
    Delay(Duration, CompletionResult),
    /// Fail before answering
    Fail(ProviderError),
    /// Stream content forever, counting pulls and flagging when dropped
    Endless {
        pulled: Arc<AtomicUsize>,
        dropped: Arc<AtomicBool>,
    },
}

/// Sets its flag when the stream owning it is dropped
struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

pub struct MockAdapter {
    id: String,
    models: Vec<ModelMapping>,
    behavior: Behavior,
    calls: Arc<AtomicUsize>,
    require_user: bool,
}

impl MockAdapter {
    pub fn new(id: &str, models: &[&str], behavior: Behavior) -> Self {
        Self {
            id: id.to_string(),
            models: models.iter().map(|m| ModelMapping::same(*m)).collect(),
            behavior,
            calls: Arc::new(AtomicUsize::new(0)),
            require_user: false,
        }
    }

    /// Reject conversations without a user message
    pub fn requiring_user_message(mut self) -> Self {
        self.require_user = true;
        self
    }

    /// Shared counter of `complete` invocations
    pub fn calls(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

#[async_trait]
impl ProviderAdapter for MockAdapter {
    fn provider_id(&self) -> &str {
        &self.id
    }

    fn list_models(&self) -> Vec<ModelMapping> {
        self.models.clone()
    }

    fn check_request(&self, request: &CompletionRequest) -> Result<(), String> {
        if self.require_user && request.last_user_message().is_none() {
            return Err("a user message is required".to_string());
        }
        Ok(())
    }

    async fn complete(
        &self,
        _request: CompletionRequest,
        _binding: &ProviderBinding,
    ) -> Result<CompletionOutput, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            Behavior::Complete(result) => Ok(CompletionOutput::Complete(result.clone())),
            Behavior::Stream(chunks) => Ok(CompletionOutput::Stream(chunks_stream(chunks.clone()))),
            Behavior::Stall(chunks) => {
                let items: Vec<Result<CompletionChunk, ProviderError>> =
                    chunks.iter().cloned().map(Ok).collect();
                let stream = futures::stream::iter(items).chain(futures::stream::pending());
                Ok(CompletionOutput::Stream(Box::pin(stream)))
            }
            Behavior::Delay(delay, result) => {
                tokio::time::sleep(*delay).await;
                Ok(CompletionOutput::Complete(result.clone()))
            }
            Behavior::Fail(error) => Err(error.clone()),
            Behavior::Endless { pulled, dropped } => {
                let state = (DropFlag(dropped.clone()), pulled.clone());
                let stream = futures::stream::unfold(state, |state| async move {
                    state.1.fetch_add(1, Ordering::SeqCst);
                    Some((Ok(CompletionChunk::content("tick ")), state))
                });
                Ok(CompletionOutput::Stream(Box::pin(stream)))
            }
        }
    }
}

/// A result with one reasoning run followed by the answer
pub fn reasoning_result(reasoning: &str, answer: &str) -> CompletionResult {
    let mut result = CompletionResult::new();
    result.push_reasoning(reasoning);
    result.push_text(answer);
    result
}

/// Router options with no pause between simulated increments
pub fn fast_options() -> RouterOptions {
    RouterOptions {
        simulated_chunk_delay: Duration::ZERO,
        ..RouterOptions::default()
    }
}

pub fn router(adapters: Vec<MockAdapter>, options: RouterOptions) -> RequestRouter {
    let adapters: Vec<Arc<dyn ProviderAdapter>> = adapters
        .into_iter()
        .map(|a| Arc::new(a) as Arc<dyn ProviderAdapter>)
        .collect();
    RequestRouter::new(adapters, options).expect("router builds")
}

pub fn user_request(model: &str, text: &str) -> CompletionRequest {
    CompletionRequest::new(model, vec![ChatMessage::user(text)])
}

/// Concatenated content of every increment, the increments themselves and
/// the stream's error if any
pub async fn drain(
    mut increments: IncrementStream,
) -> (String, Vec<ChatCompletionChunk>, Option<GatewayError>) {
    let mut content = String::new();
    let mut chunks = Vec::new();
    while let Some(item) = increments.next().await {
        match item {
            Ok(chunk) => {
                if let Some(text) = chunk.content() {
                    content.push_str(text);
                }
                chunks.push(chunk);
            }
            Err(e) => return (content, chunks, Some(e)),
        }
    }
    (content, chunks, None)
}
