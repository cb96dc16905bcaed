//! OI-VSCode provider
//!
//! OpenAI-compatible, non-streaming. The same service runs behind several
//! endpoints; each call tries them in random order and stops at the first
//! usable answer. A 4xx answer ends the call without trying the rest.

use async_trait::async_trait;
use rand::Rng;
use rand::distributions::Alphanumeric;
use rand::seq::SliceRandom;
use std::time::Duration;

use super::openai_compatible::{OpenAiChatRequest, OpenAiChatResponse, completion_from_response};
use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::stream::CompletionOutput;
use crate::traits::ProviderAdapter;
use crate::types::{CompletionRequest, CompletionResult, ModelMapping, ProviderBinding};
use crate::utils::{read_json, send_checked};

pub const PROVIDER_ID: &str = "oivscode";

pub const DEFAULT_ENDPOINTS: &[&str] = &[
    "https://oi-vscode-server.onrender.com/v1/chat/completions",
    "https://oi-vscode-server-2.onrender.com/v1/chat/completions",
    "https://oi-vscode-server-5.onrender.com/v1/chat/completions",
    "https://oi-vscode-server-0501.onrender.com/v1/chat/completions",
];

const MODELS: &[&str] = &[
    "gpt-4",
    "gpt-4-turbo",
    "gpt-4o",
    "gpt-4o-mini",
    "gpt-3.5-turbo",
    "gpt-3.5-turbo-16k",
    "o1",
    "o1-mini",
    "o1-preview",
    "o3-mini",
];

/// Bound on a single endpoint attempt, so failover still has time to run
const ENDPOINT_TIMEOUT: Duration = Duration::from_secs(30);
const USER_ID_LEN: usize = 21;

/// Random alphanumeric id sent in the `userid` header
pub fn random_user_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(USER_ID_LEN)
        .map(char::from)
        .collect()
}

/// OI-VSCode adapter
pub struct OivscodeAdapter {
    client: reqwest::Client,
    endpoints: Vec<String>,
    endpoint_timeout: Duration,
}

impl OivscodeAdapter {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            endpoints: DEFAULT_ENDPOINTS.iter().map(|e| e.to_string()).collect(),
            endpoint_timeout: ENDPOINT_TIMEOUT,
        }
    }

    pub fn from_config(client: reqwest::Client, config: &ProviderConfig) -> Self {
        let adapter = Self::new(client);
        if config.endpoints.is_empty() {
            adapter
        } else {
            adapter.with_endpoints(config.endpoints.clone())
        }
    }

    /// Replace the endpoint list
    pub fn with_endpoints(mut self, endpoints: Vec<String>) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn with_endpoint_timeout(mut self, timeout: Duration) -> Self {
        self.endpoint_timeout = timeout;
        self
    }

    async fn call_endpoint(
        &self,
        endpoint: &str,
        user_id: &str,
        body: &OpenAiChatRequest<'_>,
    ) -> Result<CompletionResult, ProviderError> {
        let builder = self
            .client
            .post(endpoint)
            .timeout(self.endpoint_timeout)
            .header("userid", user_id)
            .json(body);
        let response = send_checked(PROVIDER_ID, builder).await?;
        let parsed: OpenAiChatResponse = read_json(PROVIDER_ID, response).await?;
        completion_from_response(PROVIDER_ID, parsed)
    }
}

#[async_trait]
impl ProviderAdapter for OivscodeAdapter {
    fn provider_id(&self) -> &str {
        PROVIDER_ID
    }

    fn list_models(&self) -> Vec<ModelMapping> {
        MODELS.iter().map(|m| ModelMapping::same(*m)).collect()
    }

    async fn complete(
        &self,
        request: CompletionRequest,
        binding: &ProviderBinding,
    ) -> Result<CompletionOutput, ProviderError> {
        let body = OpenAiChatRequest {
            model: &binding.upstream_model,
            messages: &request.messages,
            stream: false,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            top_p: request.top_p,
        };
        let user_id = random_user_id();

        let mut endpoints: Vec<&str> = self.endpoints.iter().map(String::as_str).collect();
        endpoints.shuffle(&mut rand::thread_rng());

        let mut last_error = None;
        for endpoint in endpoints {
            match self.call_endpoint(endpoint, &user_id, &body).await {
                Ok(result) => return Ok(CompletionOutput::Complete(result)),
                Err(e) if !e.is_retryable() => {
                    tracing::warn!(provider = PROVIDER_ID, endpoint, "endpoint rejected the request: {}", e);
                    return Err(e);
                }
                Err(e) => {
                    tracing::warn!(provider = PROVIDER_ID, endpoint, "endpoint failed: {}", e);
                    last_error = Some(e);
                }
            }
        }
        Err(last_error
            .unwrap_or_else(|| ProviderError::network(PROVIDER_ID, "no endpoints configured")))
    }
}
