//! Request Router
//!
//! Takes a validated chat-completion request through
//! `Received -> Resolved -> Dispatched -> {Succeeded, Failed}`:
//!
//! - the body is validated and the model resolved before any upstream call;
//! - dispatch is bounded by [`RouterOptions::request_timeout`];
//! - adapter output is converted to whatever delivery mode the client asked
//!   for, then rendered by the [`ResponseNormalizer`].
//!
//! The router never retries; adapters own their retry policy.

use futures::StreamExt;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use validator::Validate;

use crate::defaults;
use crate::error::{GatewayError, ProviderError, StartupError};
use crate::normalizer::{IncrementStream, ResponseNormalizer};
use crate::registry::ModelRegistry;
use crate::stream::{ChunkStream, CompletionOutput, collect_chunks, simulate_stream};
use crate::traits::ProviderAdapter;
use crate::types::{
    ChatCompletionResponse, CompletionRequest, CompletionResult, HealthResponse, ModelCard,
    ModelsResponse, ProviderBinding,
};

/// Timeouts and simulated-streaming settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterOptions {
    /// Bound on one dispatch; covers stream collection for non-streaming requests
    pub request_timeout: Duration,
    /// Bound on the wait for each chunk of a streamed answer
    pub stream_idle_timeout: Duration,
    /// Words per increment when a one-shot answer is streamed
    pub simulated_chunk_words: usize,
    /// Pause between simulated increments
    pub simulated_chunk_delay: Duration,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            request_timeout: defaults::timeouts::REQUEST,
            stream_idle_timeout: defaults::timeouts::STREAM_IDLE,
            simulated_chunk_words: defaults::streaming::SIMULATED_CHUNK_WORDS,
            simulated_chunk_delay: defaults::streaming::SIMULATED_CHUNK_DELAY,
        }
    }
}

/// Lifecycle of one routed request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RouteState {
    Received,
    Resolved,
    Dispatched,
    Succeeded,
    Failed,
}

impl RouteState {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Resolved => "resolved",
            Self::Dispatched => "dispatched",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }
}

/// What the router hands to the HTTP layer
pub enum RouterResponse {
    Completion(ChatCompletionResponse),
    Stream(IncrementStream),
}

impl RouterResponse {
    pub fn is_stream(&self) -> bool {
        matches!(self, Self::Stream(_))
    }
}

impl std::fmt::Debug for RouterResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Completion(body) => f.debug_tuple("Completion").field(body).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// Routes requests to provider adapters by model name
pub struct RequestRouter {
    registry: ModelRegistry,
    adapters: HashMap<String, Arc<dyn ProviderAdapter>>,
    options: RouterOptions,
}

impl RequestRouter {
    /// Build the router and its model registry.
    ///
    /// Fails when two adapters share a provider id or claim the same public
    /// model name.
    pub fn new(
        adapters: Vec<Arc<dyn ProviderAdapter>>,
        options: RouterOptions,
    ) -> Result<Self, StartupError> {
        let mut builder = ModelRegistry::builder();
        let mut by_id = HashMap::with_capacity(adapters.len());
        for adapter in adapters {
            let id = adapter.provider_id().to_string();
            builder = builder.register(&id, adapter.list_models())?;
            by_id.insert(id, adapter);
        }
        let registry = builder.build();

        tracing::info!(
            providers = ?registry.providers(),
            total_models = registry.len(),
            "model registry built"
        );

        Ok(Self {
            registry,
            adapters: by_id,
            options,
        })
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn options(&self) -> &RouterOptions {
        &self.options
    }

    /// Provider ids in registration order
    pub fn providers(&self) -> Vec<String> {
        self.registry.providers().to_vec()
    }

    /// Body of `GET /v1/models`, sorted by id
    pub fn models(&self) -> ModelsResponse {
        let created = self.registry.created();
        ModelsResponse {
            object: "list".to_string(),
            data: self
                .registry
                .models()
                .map(|(name, binding)| ModelCard {
                    id: name.to_string(),
                    object: "model".to_string(),
                    created,
                    owned_by: binding.provider_id.clone(),
                })
                .collect(),
        }
    }

    /// Body of `GET /health`
    pub fn health(&self) -> HealthResponse {
        HealthResponse {
            status: "ok".to_string(),
            providers: self.providers(),
            total_models: self.registry.len(),
        }
    }

    /// Route one request.
    ///
    /// Validation, model lookup and the adapter's own request check all run
    /// before the adapter is called.
    pub async fn route(&self, request: CompletionRequest) -> Result<RouterResponse, GatewayError> {
        let started = Instant::now();
        let model = request.model.clone();
        let stream = request.stream;
        tracing::debug!(
            state = RouteState::Received.as_str(),
            model = %model,
            stream,
            messages = request.messages.len(),
            "chat completion request"
        );

        let result = self.dispatch(request).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            Ok(_) => tracing::info!(
                state = RouteState::Succeeded.as_str(),
                model = %model,
                stream,
                elapsed_ms,
                "request routed"
            ),
            Err(e) if e.is_upstream() => tracing::warn!(
                state = RouteState::Failed.as_str(),
                model = %model,
                stream,
                elapsed_ms,
                "request failed: {}",
                e
            ),
            Err(e) => tracing::info!(
                state = RouteState::Failed.as_str(),
                model = %model,
                stream,
                elapsed_ms,
                "request rejected: {}",
                e
            ),
        }
        result
    }

    async fn dispatch(&self, request: CompletionRequest) -> Result<RouterResponse, GatewayError> {
        request.validate()?;

        let binding = self
            .registry
            .resolve(&request.model)
            .cloned()
            .ok_or_else(|| GatewayError::UnknownModel(request.model.clone()))?;
        let adapter = self.adapters.get(&binding.provider_id).ok_or_else(|| {
            GatewayError::InternalError(format!(
                "no adapter registered for provider `{}`",
                binding.provider_id
            ))
        })?;
        adapter
            .check_request(&request)
            .map_err(GatewayError::InvalidRequest)?;

        tracing::debug!(
            state = RouteState::Resolved.as_str(),
            model = %request.model,
            provider = %binding.provider_id,
            upstream_model = %binding.upstream_model,
            "model resolved"
        );

        let normalizer = ResponseNormalizer::for_model(request.model.clone());
        tracing::debug!(
            state = RouteState::Dispatched.as_str(),
            provider = %binding.provider_id,
            request_id = normalizer.id(),
            "dispatching to provider"
        );

        if request.stream {
            let chunks = self.open_stream(adapter.as_ref(), request, &binding).await?;
            Ok(RouterResponse::Stream(normalizer.stream(chunks)))
        } else {
            let messages = request.messages.clone();
            let result = self.complete(adapter.as_ref(), request, &binding).await?;
            Ok(RouterResponse::Completion(
                normalizer.completion(result, &messages),
            ))
        }
    }

    /// Non-streaming dispatch; the timeout also covers collecting a stream
    async fn complete(
        &self,
        adapter: &dyn ProviderAdapter,
        request: CompletionRequest,
        binding: &ProviderBinding,
    ) -> Result<CompletionResult, ProviderError> {
        let call = async {
            match adapter.complete(request, binding).await? {
                CompletionOutput::Complete(result) => Ok(result),
                CompletionOutput::Stream(chunks) => collect_chunks(chunks).await,
            }
        };
        tokio::time::timeout(self.options.request_timeout, call)
            .await
            .map_err(|_| request_timeout_error(&binding.provider_id, self.options.request_timeout))?
    }

    /// Streaming dispatch; one-shot answers are replayed in word chunks
    async fn open_stream(
        &self,
        adapter: &dyn ProviderAdapter,
        request: CompletionRequest,
        binding: &ProviderBinding,
    ) -> Result<ChunkStream, ProviderError> {
        let output = tokio::time::timeout(
            self.options.request_timeout,
            adapter.complete(request, binding),
        )
        .await
        .map_err(|_| request_timeout_error(&binding.provider_id, self.options.request_timeout))??;

        Ok(match output {
            CompletionOutput::Complete(result) => simulate_stream(
                result,
                self.options.simulated_chunk_words,
                self.options.simulated_chunk_delay,
            ),
            CompletionOutput::Stream(chunks) => with_idle_timeout(
                chunks,
                self.options.stream_idle_timeout,
                binding.provider_id.clone(),
            ),
        })
    }
}

fn request_timeout_error(provider: &str, timeout: Duration) -> ProviderError {
    ProviderError::timeout(
        provider,
        format!("no answer within {} ms", timeout.as_millis()),
    )
}

/// End the stream with a timeout error when no chunk arrives within `idle`
fn with_idle_timeout(mut chunks: ChunkStream, idle: Duration, provider: String) -> ChunkStream {
    let stream = async_stream::stream! {
        loop {
            match tokio::time::timeout(idle, chunks.next()).await {
                Ok(Some(Ok(chunk))) => {
                    yield Ok(chunk);
                }
                Ok(Some(Err(error))) => {
                    yield Err(error);
                    break;
                }
                Ok(None) => break,
                Err(_) => {
                    tracing::warn!(provider = %provider, idle_ms = idle.as_millis() as u64, "stream idle timeout");
                    yield Err(ProviderError::timeout(
                        provider.clone(),
                        format!("stream idle for more than {} ms", idle.as_millis()),
                    ));
                    break;
                }
            }
        }
    };
    Box::pin(stream)
}

static_assertions::assert_impl_all!(RequestRouter: Send, Sync);
