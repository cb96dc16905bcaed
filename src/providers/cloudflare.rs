//! Cloudflare Workers AI playground provider
//!
//! The playground answers in the AI data-stream line format. Public model
//! names are short aliases of the `@cf/...` and `@hf/...` catalog ids.

use async_trait::async_trait;
use serde::Serialize;

use super::data_stream::DataStreamConverter;
use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::retry::{RetryExecutor, RetryPolicy};
use crate::stream::{CompletionOutput, collect_chunks};
use crate::traits::ProviderAdapter;
use crate::types::{ChatMessage, CompletionRequest, ModelMapping, ProviderBinding};
use crate::utils::send_checked;
use crate::utils::streaming::StreamFactory;

pub const PROVIDER_ID: &str = "cloudflare";
pub const DEFAULT_BASE_URL: &str = "https://playground.ai.cloudflare.com/api/inference";
const PLAYGROUND_ORIGIN: &str = "https://playground.ai.cloudflare.com";

const DEFAULT_MAX_TOKENS: u32 = 600;

/// Public name -> catalog id
pub const MODELS: &[(&str, &str)] = &[
    ("deepseek-coder-6.7b-base-awq", "@hf/thebloke/deepseek-coder-6.7b-base-awq"),
    ("deepseek-coder-6.7b-instruct-awq", "@hf/thebloke/deepseek-coder-6.7b-instruct-awq"),
    ("deepseek-math-7b-instruct", "@cf/deepseek-ai/deepseek-math-7b-instruct"),
    ("deepseek-r1-distill-qwen-32b", "@cf/deepseek-ai/deepseek-r1-distill-qwen-32b"),
    ("discolm-german-7b-v1-awq", "@cf/thebloke/discolm-german-7b-v1-awq"),
    ("falcon-7b-instruct", "@cf/tiiuae/falcon-7b-instruct"),
    ("gemma-3-12b-it", "@cf/google/gemma-3-12b-it"),
    ("gemma-7b-it", "@hf/google/gemma-7b-it"),
    ("hermes-2-pro-mistral-7b", "@hf/nousresearch/hermes-2-pro-mistral-7b"),
    ("llama-2-13b-chat-awq", "@hf/thebloke/llama-2-13b-chat-awq"),
    ("llama-2-7b-chat-fp16", "@cf/meta/llama-2-7b-chat-fp16"),
    ("llama-2-7b-chat-int8", "@cf/meta/llama-2-7b-chat-int8"),
    ("llama-3-8b-instruct", "@cf/meta/llama-3-8b-instruct"),
    ("llama-3-8b-instruct-awq", "@cf/meta/llama-3-8b-instruct-awq"),
    ("llama-3.1-8b-instruct-awq", "@cf/meta/llama-3.1-8b-instruct-awq"),
    ("llama-3.1-8b-instruct-fp8", "@cf/meta/llama-3.1-8b-instruct-fp8"),
    ("llama-3.2-11b-vision-instruct", "@cf/meta/llama-3.2-11b-vision-instruct"),
    ("llama-3.2-1b-instruct", "@cf/meta/llama-3.2-1b-instruct"),
    ("llama-3.2-3b-instruct", "@cf/meta/llama-3.2-3b-instruct"),
    ("llama-3.3-70b-instruct-fp8-fast", "@cf/meta/llama-3.3-70b-instruct-fp8-fast"),
    ("llama-4-scout-17b-16e-instruct", "@cf/meta/llama-4-scout-17b-16e-instruct"),
    ("llama-guard-3-8b", "@cf/meta/llama-guard-3-8b"),
    ("llamaguard-7b-awq", "@hf/thebloke/llamaguard-7b-awq"),
    ("meta-llama-3-8b-instruct", "@hf/meta-llama/meta-llama-3-8b-instruct"),
    ("mistral-7b-instruct-v0.1", "@cf/mistral/mistral-7b-instruct-v0.1"),
    ("mistral-7b-instruct-v0.2", "@hf/mistral/mistral-7b-instruct-v0.2"),
    ("mistral-small-3.1-24b-instruct", "@cf/mistralai/mistral-small-3.1-24b-instruct"),
    ("neural-chat-7b-v3-1-awq", "@hf/thebloke/neural-chat-7b-v3-1-awq"),
    ("openchat-3.5-0106", "@cf/openchat/openchat-3.5-0106"),
    ("openhermes-2.5-mistral-7b-awq", "@hf/thebloke/openhermes-2.5-mistral-7b-awq"),
    ("phi-2", "@cf/microsoft/phi-2"),
    ("qwen1.5-0.5b-chat", "@cf/qwen/qwen1.5-0.5b-chat"),
    ("qwen1.5-1.8b-chat", "@cf/qwen/qwen1.5-1.8b-chat"),
    ("qwen1.5-14b-chat-awq", "@cf/qwen/qwen1.5-14b-chat-awq"),
    ("qwen1.5-7b-chat-awq", "@cf/qwen/qwen1.5-7b-chat-awq"),
    ("qwen2.5-coder-32b-instruct", "@cf/qwen/qwen2.5-coder-32b-instruct"),
    ("qwq-32b", "@cf/qwen/qwq-32b"),
    ("sqlcoder-7b-2", "@cf/defog/sqlcoder-7b-2"),
    ("starling-lm-7b-beta", "@hf/nexusflow/starling-lm-7b-beta"),
    ("tinyllama-1.1b-chat-v1.0", "@cf/tinyllama/tinyllama-1.1b-chat-v1.0"),
    ("una-cybertron-7b-v2-bf16", "@cf/fblgit/una-cybertron-7b-v2-bf16"),
    ("zephyr-7b-beta-awq", "@hf/thebloke/zephyr-7b-beta-awq"),
];

#[derive(Debug, Serialize)]
struct InferenceRequest<'a> {
    messages: &'a [ChatMessage],
    lora: Option<&'a str>,
    model: &'a str,
    max_tokens: u32,
    stream: bool,
}

/// Cloudflare playground adapter
pub struct CloudflareAdapter {
    client: reqwest::Client,
    base_url: String,
    retry: RetryExecutor,
}

impl CloudflareAdapter {
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

    /// Full inference URL; the path is part of the base
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
impl ProviderAdapter for CloudflareAdapter {
    fn provider_id(&self) -> &str {
        PROVIDER_ID
    }

    fn list_models(&self) -> Vec<ModelMapping> {
        MODELS
            .iter()
            .map(|(public, upstream)| ModelMapping::new(*public, *upstream))
            .collect()
    }

    async fn complete(
        &self,
        request: CompletionRequest,
        binding: &ProviderBinding,
    ) -> Result<CompletionOutput, ProviderError> {
        let body = InferenceRequest {
            messages: &request.messages,
            lora: None,
            model: &binding.upstream_model,
            max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            stream: true,
        };

        let response = self
            .retry
            .execute(|_| {
                let builder = self
                    .client
                    .post(&self.base_url)
                    .header(reqwest::header::ACCEPT, "text/event-stream")
                    .header(reqwest::header::ORIGIN, PLAYGROUND_ORIGIN)
                    .header(reqwest::header::REFERER, format!("{PLAYGROUND_ORIGIN}/"))
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
