//! AI data-stream line protocol
//!
//! Each line is `<type>:<json>`. The types understood here:
//!
//! | type | payload | meaning |
//! |------|---------|---------|
//! | `0`  | JSON string | answer text delta |
//! | `g`  | JSON string | reasoning delta |
//! | `3`  | JSON string | upstream error |
//! | `d`  | JSON object | finish message (`finishReason`, `usage`) |
//!
//! Other types carry metadata the gateway has no use for and are skipped.

use serde::Deserialize;

use crate::error::{ProviderError, ProviderErrorKind};
use crate::types::{CompletionChunk, FinishReason, Usage};
use crate::utils::streaming::LineConverter;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FinishMessage {
    finish_reason: Option<String>,
    usage: Option<FinishUsage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FinishUsage {
    prompt_tokens: Option<u32>,
    completion_tokens: Option<u32>,
}

/// Line converter for data-stream bodies
pub struct DataStreamConverter {
    provider: &'static str,
}

impl DataStreamConverter {
    pub fn new(provider: &'static str) -> Self {
        Self { provider }
    }

    fn text(&self, kind: &str, payload: &str) -> Result<String, ProviderError> {
        serde_json::from_str::<String>(payload).map_err(|e| {
            ProviderError::malformed(
                self.provider,
                format!("invalid `{kind}` payload in data stream: {e}"),
            )
        })
    }

    fn finish(&self, payload: &str) -> Vec<Result<CompletionChunk, ProviderError>> {
        let message = match serde_json::from_str::<FinishMessage>(payload) {
            Ok(message) => message,
            Err(e) => {
                return vec![Err(ProviderError::malformed(
                    self.provider,
                    format!("invalid finish message in data stream: {e}"),
                ))];
            }
        };
        let mut chunks = Vec::with_capacity(2);
        let usage = message
            .usage
            .and_then(|u| Some(Usage::new(u.prompt_tokens?, u.completion_tokens?)));
        if let Some(usage) = usage {
            chunks.push(Ok(CompletionChunk::UsageUpdate { usage }));
        }
        let reason = message
            .finish_reason
            .as_deref()
            .map(FinishReason::from_upstream)
            .unwrap_or_default();
        chunks.push(Ok(CompletionChunk::end(reason)));
        chunks
    }
}

impl LineConverter for DataStreamConverter {
    fn convert_line(&self, line: &str) -> Vec<Result<CompletionChunk, ProviderError>> {
        let Some((kind, payload)) = line.split_once(':') else {
            tracing::debug!(provider = self.provider, "skipping unrecognized line");
            return Vec::new();
        };
        match kind {
            "0" => match self.text(kind, payload) {
                Ok(text) if text.is_empty() => Vec::new(),
                Ok(text) => vec![Ok(CompletionChunk::content(text))],
                Err(e) => vec![Err(e)],
            },
            "g" => match self.text(kind, payload) {
                Ok(text) if text.is_empty() => Vec::new(),
                Ok(text) => vec![Ok(CompletionChunk::reasoning(text))],
                Err(e) => vec![Err(e)],
            },
            "3" => {
                let message = self
                    .text(kind, payload)
                    .unwrap_or_else(|_| payload.to_string());
                vec![Err(ProviderError::new(
                    self.provider,
                    ProviderErrorKind::UpstreamStatus,
                    None,
                    format!("upstream reported an error: {message}"),
                ))]
            }
            "d" => self.finish(payload),
            _ => Vec::new(),
        }
    }
}
