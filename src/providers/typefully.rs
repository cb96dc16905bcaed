//! Typefully provider
//!
//! A single-prompt completion tool: the conversation is reduced to a prompt
//! and a system prompt, and the answer comes back in the AI data-stream line
//! format.

use async_trait::async_trait;
use serde::Serialize;

use super::data_stream::DataStreamConverter;
use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::retry::{RetryExecutor, RetryPolicy};
use crate::stream::{CompletionOutput, collect_chunks};
use crate::traits::ProviderAdapter;
use crate::types::{CompletionRequest, ModelMapping, ProviderBinding, Role};
use crate::utils::send_checked;
use crate::utils::streaming::StreamFactory;

pub const PROVIDER_ID: &str = "typefully";
pub const DEFAULT_BASE_URL: &str = "https://typefully.com/tools/ai/api/completion";
const ORIGIN: &str = "https://typefully.com";

const DEFAULT_SYSTEM_PROMPT: &str = "You're a helpful assistant.";
const DEFAULT_OUTPUT_LENGTH: u32 = 600;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CompletionBody<'a> {
    prompt: String,
    system_prompt: &'a str,
    model_identifier: &'a str,
    output_length: u32,
}

/// Reduce a conversation to `(prompt, system_prompt)`.
///
/// When the conversation ends with a user turn, that turn alone is the
/// prompt. Otherwise the whole exchange is flattened into `User:` and
/// `Assistant:` lines.
pub fn flatten_conversation(request: &CompletionRequest) -> (String, &str) {
    let system_prompt = request.system_prompt().unwrap_or(DEFAULT_SYSTEM_PROMPT);

    if let Some(last) = request.messages.last() {
        if last.role == Role::User {
            return (last.content.clone(), system_prompt);
        }
    }

    let prompt = request
        .messages
        .iter()
        .filter_map(|m| match m.role {
            Role::User => Some(format!("User: {}", m.content)),
            Role::Assistant => Some(format!("Assistant: {}", m.content)),
            Role::System => None,
        })
        .collect::<Vec<_>>()
        .join("\n");
    (prompt, system_prompt)
}

/// Typefully adapter
pub struct TypefullyAdapter {
    client: reqwest::Client,
    base_url: String,
    retry: RetryExecutor,
}

impl TypefullyAdapter {
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

    /// Full completion URL
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
impl ProviderAdapter for TypefullyAdapter {
    fn provider_id(&self) -> &str {
        PROVIDER_ID
    }

    fn list_models(&self) -> Vec<ModelMapping> {
        vec![ModelMapping::new(
            "claude-3.5-haiku",
            "anthropic:claude-3-5-haiku-20241022",
        )]
    }

    async fn complete(
        &self,
        request: CompletionRequest,
        binding: &ProviderBinding,
    ) -> Result<CompletionOutput, ProviderError> {
        let (prompt, system_prompt) = flatten_conversation(&request);
        let body = CompletionBody {
            prompt,
            system_prompt,
            model_identifier: &binding.upstream_model,
            output_length: request.max_tokens.unwrap_or(DEFAULT_OUTPUT_LENGTH),
        };

        let response = self
            .retry
            .execute(|_| {
                let builder = self
                    .client
                    .post(&self.base_url)
                    .header(reqwest::header::ORIGIN, ORIGIN)
                    .header(
                        reqwest::header::REFERER,
                        format!("{ORIGIN}/tools/ai/chat-gpt-alternative"),
                    )
                    .json(&body);
                send_checked(PROVIDER_ID, builder)
            })
            .await?;

        let stream = StreamFactory::create_line_stream(
            PROVIDER_ID,
            response,
            DataStreamConverter::new(PROVIDER_ID),
        );
        if request.stream {
            Ok(CompletionOutput::Stream(stream))
        } else {
            Ok(CompletionOutput::Complete(collect_chunks(stream).await?))
        }
    }
}
