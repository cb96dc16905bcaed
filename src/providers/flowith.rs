//! Flowith provider
//!
//! Only the system prompt and the latest user message are forwarded; the
//! answer is streamed back as plain UTF-8 text.

use async_trait::async_trait;
use serde::Serialize;

use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::retry::{RetryExecutor, RetryPolicy};
use crate::stream::{CompletionOutput, collect_chunks};
use crate::traits::ProviderAdapter;
use crate::types::{ChatMessage, CompletionRequest, ModelMapping, ProviderBinding};
use crate::utils::streaming::StreamFactory;
use crate::utils::{join_url, send_checked};

pub const PROVIDER_ID: &str = "flowith";
pub const DEFAULT_BASE_URL: &str = "https://edge.flowith.net";
const CHAT_PATH: &str = "ai/chat?mode=general";

const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

const MODELS: &[&str] = &[
    "gpt-5-nano",
    "gpt-5-mini",
    "glm-4.5",
    "gpt-oss-120b",
    "gpt-oss-20b",
    "kimi-k2",
    "gpt-4.1",
    "gpt-4.1-mini",
    "deepseek-chat",
    "deepseek-reasoner",
    "gemini-2.5-flash",
    "grok-3-mini",
];

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatBody<'a> {
    model: &'a str,
    messages: [ChatMessage; 2],
    stream: bool,
    node_id: String,
}

/// Flowith adapter
pub struct FlowithAdapter {
    client: reqwest::Client,
    base_url: String,
    retry: RetryExecutor,
}

impl FlowithAdapter {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            retry: RetryExecutor::new(RetryPolicy::default()),
        }
    }

    pub fn from_config(client: reqwest::Client, config: &ProviderConfig) -> Self {
        let mut adapter = Self::new(client);
        if let Some(base_url) = &config.base_url {
            adapter = adapter.with_base_url(base_url.clone());
        }
        if let Some(max_attempts) = config.max_attempts {
            adapter = adapter.with_retry(RetryPolicy::default().with_max_attempts(max_attempts));
        }
        adapter
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = RetryExecutor::new(policy);
        self
    }
}

#[async_trait]
impl ProviderAdapter for FlowithAdapter {
    fn provider_id(&self) -> &str {
        PROVIDER_ID
    }

    fn list_models(&self) -> Vec<ModelMapping> {
        MODELS.iter().map(|m| ModelMapping::same(*m)).collect()
    }

    fn check_request(&self, request: &CompletionRequest) -> Result<(), String> {
        match request.last_user_message() {
            Some(_) => Ok(()),
            None => Err(format!(
                "models served by `{PROVIDER_ID}` need at least one user message"
            )),
        }
    }

    async fn complete(
        &self,
        request: CompletionRequest,
        binding: &ProviderBinding,
    ) -> Result<CompletionOutput, ProviderError> {
        // check_request guarantees a user message when called through the router
        let user = request.last_user_message().unwrap_or_default();
        let system = request.system_prompt().unwrap_or(DEFAULT_SYSTEM_PROMPT);
        let body = ChatBody {
            model: &binding.upstream_model,
            messages: [ChatMessage::system(system), ChatMessage::user(user)],
            stream: true,
            node_id: uuid::Uuid::new_v4().to_string(),
        };
        let url = join_url(&self.base_url, CHAT_PATH);

        let response = self
            .retry
            .execute(|_| {
                let builder = self
                    .client
                    .post(&url)
                    .header(reqwest::header::ACCEPT, "text/plain, */*")
                    .json(&body);
                send_checked(PROVIDER_ID, builder)
            })
            .await?;

        let stream = StreamFactory::create_text_stream(PROVIDER_ID, response);
        if request.stream {
            Ok(CompletionOutput::Stream(stream))
        } else {
            Ok(CompletionOutput::Complete(collect_chunks(stream).await?))
        }
    }
}
