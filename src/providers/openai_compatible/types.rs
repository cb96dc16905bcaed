//! Wire types of the OpenAI chat-completion protocol, as spoken by upstreams

use serde::{Deserialize, Serialize};

use crate::types::{ChatMessage, FinishReason, Usage};

/// Outgoing chat request
#[derive(Debug, Clone, Serialize)]
pub struct OpenAiChatRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [ChatMessage],
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
}

/// Non-streaming chat response
#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiChatResponse {
    pub model: Option<String>,
    #[serde(default)]
    pub choices: Vec<OpenAiChoice>,
    pub usage: Option<OpenAiUsage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiChoice {
    pub message: Option<OpenAiMessage>,
    pub finish_reason: Option<String>,
}

/// Message or delta body; reasoning may arrive under several names
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OpenAiMessage {
    pub content: Option<String>,
    pub reasoning_content: Option<String>,
    pub reasoning: Option<String>,
    pub thinking: Option<String>,
}

impl OpenAiMessage {
    /// Reasoning text, whichever field carries it
    pub fn reasoning_text(&self) -> Option<&str> {
        [&self.reasoning_content, &self.reasoning, &self.thinking]
            .into_iter()
            .find_map(|field| field.as_deref().filter(|s| !s.is_empty()))
    }
}

/// Streamed chat event
#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiStreamEvent {
    #[serde(default)]
    pub choices: Vec<OpenAiStreamChoice>,
    pub usage: Option<OpenAiUsage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiStreamChoice {
    pub delta: Option<OpenAiMessage>,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct OpenAiUsage {
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
}

impl OpenAiUsage {
    /// Usage, when both counts are present
    pub fn to_usage(self) -> Option<Usage> {
        Some(Usage::new(self.prompt_tokens?, self.completion_tokens?))
    }
}

/// Parse an optional upstream finish reason
pub fn finish_reason(value: Option<&str>) -> FinishReason {
    value.map(FinishReason::from_upstream).unwrap_or_default()
}
