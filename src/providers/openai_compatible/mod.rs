//! OpenAI-compatible protocol support
//!
//! Request and response shapes plus the SSE converter shared by upstreams
//! that speak the OpenAI chat-completion protocol.

pub mod streaming;
pub mod types;

pub use streaming::OpenAiCompatibleEventConverter;
pub use types::{OpenAiChatRequest, OpenAiChatResponse, OpenAiStreamEvent};

use crate::error::ProviderError;
use crate::types::CompletionResult;

/// Convert a non-streaming response into a [`CompletionResult`].
///
/// A response without any choice is a malformed payload.
pub fn completion_from_response(
    provider: &str,
    response: OpenAiChatResponse,
) -> Result<CompletionResult, ProviderError> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::malformed(provider, "response contains no choices"))?;

    let mut result = CompletionResult::new();
    if let Some(message) = &choice.message {
        if let Some(reasoning) = message.reasoning_text() {
            result.push_reasoning(reasoning);
        }
        if let Some(content) = &message.content {
            result.push_text(content.as_str());
        }
    }
    result.finish_reason = types::finish_reason(choice.finish_reason.as_deref());
    result.usage = response.usage.and_then(|u| u.to_usage());
    result.upstream_model = response.model;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FinishReason, Segment, Usage};

    #[test]
    fn response_with_reasoning_is_split_into_segments() {
        let response: OpenAiChatResponse = serde_json::from_str(
            r#"{
                "id": "x",
                "model": "o3-mini",
                "choices": [{
                    "index": 0,
                    "message": {"role": "assistant", "content": "42", "reasoning_content": "6*7"},
                    "finish_reason": "stop"
                }],
                "usage": {"prompt_tokens": 5, "completion_tokens": 1, "total_tokens": 6}
            }"#,
        )
        .unwrap();
        let result = completion_from_response("oivscode", response).unwrap();
        assert_eq!(
            result.segments,
            vec![Segment::reasoning("6*7"), Segment::text("42")]
        );
        assert_eq!(result.usage, Some(Usage::new(5, 1)));
        assert_eq!(result.finish_reason, FinishReason::Stop);
        assert_eq!(result.upstream_model.as_deref(), Some("o3-mini"));
    }

    #[test]
    fn empty_choices_are_malformed() {
        let response: OpenAiChatResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(completion_from_response("oivscode", response).is_err());
    }
}
