//! MiniMax provider
//!
//! OpenAI-compatible `chatcompletion_v2` endpoint that streams reasoning on a
//! separate `reasoning_content` channel. The upstream is always called in
//! streaming mode; non-streaming requests collect the stream.

use async_trait::async_trait;
use eventsource_stream::Event;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::openai_compatible::{
    OpenAiChatRequest, OpenAiCompatibleEventConverter, OpenAiStreamEvent,
};
use crate::config::ProviderConfig;
use crate::error::{ProviderError, ProviderErrorKind};
use crate::retry::{RetryExecutor, RetryPolicy};
use crate::stream::{CompletionOutput, collect_chunks};
use crate::traits::ProviderAdapter;
use crate::types::{CompletionChunk, CompletionRequest, ModelMapping, ProviderBinding};
use crate::utils::streaming::{SseEventConverter, StreamFactory};
use crate::utils::{join_url, send_checked};

pub const PROVIDER_ID: &str = "minimax";
pub const DEFAULT_BASE_URL: &str = "https://api.minimaxi.chat/v1";
const CHAT_PATH: &str = "text/chatcompletion_v2";

const DEFAULT_MAX_TOKENS: u32 = 40_000;
const DEFAULT_TEMPERATURE: f32 = 1.0;
const DEFAULT_TOP_P: f32 = 0.95;

/// MiniMax reports some failures inside a 200 answer
#[derive(Debug, Deserialize)]
struct BaseResp {
    status_code: i64,
    #[serde(default)]
    status_msg: String,
}

#[derive(Debug, Deserialize)]
struct MinimaxStreamEvent {
    #[serde(flatten)]
    event: OpenAiStreamEvent,
    base_resp: Option<BaseResp>,
}

fn base_resp_error(base_resp: &BaseResp) -> Option<ProviderError> {
    (base_resp.status_code != 0).then(|| {
        ProviderError::new(
            PROVIDER_ID,
            ProviderErrorKind::UpstreamStatus,
            None,
            format!(
                "upstream error {}: {}",
                base_resp.status_code, base_resp.status_msg
            ),
        )
    })
}

/// SSE converter that also checks `base_resp`
struct MinimaxEventConverter {
    inner: OpenAiCompatibleEventConverter,
}

impl SseEventConverter for MinimaxEventConverter {
    fn convert_event(&self, event: Event) -> Vec<Result<CompletionChunk, ProviderError>> {
        match serde_json::from_str::<MinimaxStreamEvent>(&event.data) {
            Ok(parsed) => {
                if let Some(err) = parsed.base_resp.as_ref().and_then(base_resp_error) {
                    return vec![Err(err)];
                }
                self.inner
                    .convert_stream_event(parsed.event)
                    .into_iter()
                    .map(Ok)
                    .collect()
            }
            Err(e) => vec![Err(ProviderError::malformed(
                PROVIDER_ID,
                format!("failed to parse stream event: {e}"),
            ))],
        }
    }

    fn handle_stream_end(&self) -> Option<Result<CompletionChunk, ProviderError>> {
        self.inner.handle_stream_end()
    }
}

/// MiniMax adapter
pub struct MinimaxAdapter {
    client: reqwest::Client,
    base_url: String,
    api_key: SecretString,
    retry: RetryExecutor,
}

impl MinimaxAdapter {
    pub fn new(client: reqwest::Client, api_key: SecretString) -> Self {
        Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key,
            retry: RetryExecutor::new(RetryPolicy::default()),
        }
    }

    /// Build from configuration; `None` when no API key is configured
    pub fn from_config(client: reqwest::Client, config: &ProviderConfig) -> Option<Self> {
        let api_key = config.api_key.clone()?;
        let mut adapter = Self::new(client, api_key);
        if let Some(base_url) = &config.base_url {
            adapter = adapter.with_base_url(base_url.clone());
        }
        if let Some(max_attempts) = config.max_attempts {
            adapter = adapter.with_retry(RetryPolicy::default().with_max_attempts(max_attempts));
        }
        Some(adapter)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = RetryExecutor::new(policy);
        self
    }

    async fn open_stream(
        &self,
        request: &CompletionRequest,
        upstream_model: &str,
    ) -> Result<reqwest::Response, ProviderError> {
        let body = OpenAiChatRequest {
            model: upstream_model,
            messages: &request.messages,
            stream: true,
            max_tokens: Some(request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS)),
            temperature: Some(request.temperature.unwrap_or(DEFAULT_TEMPERATURE)),
            top_p: Some(request.top_p.unwrap_or(DEFAULT_TOP_P)),
        };
        let url = join_url(&self.base_url, CHAT_PATH);

        let response = self
            .retry
            .execute(|_| {
                let builder = self
                    .client
                    .post(&url)
                    .bearer_auth(self.api_key.expose_secret())
                    .json(&body);
                send_checked(PROVIDER_ID, builder)
            })
            .await?;

        // Errors such as an invalid key come back as a plain JSON 200
        let is_json = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("application/json"));
        if is_json {
            let body: serde_json::Value = crate::utils::read_json(PROVIDER_ID, response).await?;
            let err = body
                .get("base_resp")
                .and_then(|v| serde_json::from_value::<BaseResp>(v.clone()).ok())
                .and_then(|b| base_resp_error(&b))
                .unwrap_or_else(|| {
                    ProviderError::malformed(PROVIDER_ID, "expected an event stream, got JSON")
                });
            return Err(err);
        }
        Ok(response)
    }
}

#[async_trait]
impl ProviderAdapter for MinimaxAdapter {
    fn provider_id(&self) -> &str {
        PROVIDER_ID
    }

    fn list_models(&self) -> Vec<ModelMapping> {
        vec![ModelMapping::same("minimax-reasoning-01")]
    }

    async fn complete(
        &self,
        request: CompletionRequest,
        binding: &ProviderBinding,
    ) -> Result<CompletionOutput, ProviderError> {
        let response = self.open_stream(&request, &binding.upstream_model).await?;
        let converter = MinimaxEventConverter {
            inner: OpenAiCompatibleEventConverter::new(PROVIDER_ID),
        };
        let stream = StreamFactory::create_eventsource_stream(PROVIDER_ID, response, converter);

        if request.stream {
            Ok(CompletionOutput::Stream(stream))
        } else {
            Ok(CompletionOutput::Complete(collect_chunks(stream).await?))
        }
    }
}
