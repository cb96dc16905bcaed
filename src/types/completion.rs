//! Normalized completion output
//!
//! What adapters hand back to the core: either a full [`CompletionResult`]
//! or a sequence of [`CompletionChunk`]s. Reasoning text is kept apart from
//! the final answer here; the inline thinking marker only exists at the HTTP
//! boundary.

use serde::{Deserialize, Serialize};

use super::chat::ChatMessage;

/// Which channel a piece of generated text belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentKind {
    /// Intermediate "thinking" trace
    Reasoning,
    /// Visible answer
    Final,
}

/// A run of text of a single kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub kind: SegmentKind,
    pub text: String,
}

impl Segment {
    pub fn reasoning(text: impl Into<String>) -> Self {
        Self {
            kind: SegmentKind::Reasoning,
            text: text.into(),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: SegmentKind::Final,
            text: text.into(),
        }
    }
}

/// Why generation stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    #[default]
    Stop,
    Length,
    ContentFilter,
}

impl FinishReason {
    /// Parse an upstream finish reason; unknown values count as `Stop`.
    pub fn from_upstream(value: &str) -> Self {
        match value {
            "length" | "max_tokens" => Self::Length,
            "content_filter" => Self::ContentFilter,
            _ => Self::Stop,
        }
    }
}

/// Token usage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl Usage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        }
    }

    /// Word-count estimate for upstreams that do not report usage.
    ///
    /// Prompt tokens cover every message; completion tokens only the visible
    /// answer.
    pub fn estimate(messages: &[ChatMessage], answer: &str) -> Self {
        let prompt = messages
            .iter()
            .map(|m| m.content.split_whitespace().count())
            .sum::<usize>();
        let completion = answer.split_whitespace().count();
        Self::new(prompt as u32, completion as u32)
    }
}

/// Full answer produced by an adapter
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CompletionResult {
    /// Generated text in production order; adjacent runs of the same kind
    /// are merged and empty runs are dropped.
    pub segments: Vec<Segment>,
    pub usage: Option<Usage>,
    pub finish_reason: FinishReason,
    /// Model name reported by the upstream, if any
    pub upstream_model: Option<String>,
}

impl CompletionResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a result holding only a final answer
    pub fn from_text(text: impl Into<String>) -> Self {
        let mut result = Self::new();
        result.push_text(text);
        result
    }

    /// Append reasoning text
    pub fn push_reasoning(&mut self, text: impl Into<String>) {
        self.push(SegmentKind::Reasoning, text.into());
    }

    /// Append answer text
    pub fn push_text(&mut self, text: impl Into<String>) {
        self.push(SegmentKind::Final, text.into());
    }

    fn push(&mut self, kind: SegmentKind, text: String) {
        if text.is_empty() {
            return;
        }
        match self.segments.last_mut() {
            Some(last) if last.kind == kind => last.text.push_str(&text),
            _ => self.segments.push(Segment { kind, text }),
        }
    }

    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = Some(usage);
        self
    }

    pub fn with_finish_reason(mut self, finish_reason: FinishReason) -> Self {
        self.finish_reason = finish_reason;
        self
    }

    /// Concatenated reasoning text
    pub fn reasoning(&self) -> String {
        self.collect_kind(SegmentKind::Reasoning)
    }

    /// Concatenated answer text
    pub fn text(&self) -> String {
        self.collect_kind(SegmentKind::Final)
    }

    pub fn has_reasoning(&self) -> bool {
        self.segments
            .iter()
            .any(|s| s.kind == SegmentKind::Reasoning)
    }

    fn collect_kind(&self, kind: SegmentKind) -> String {
        self.segments
            .iter()
            .filter(|s| s.kind == kind)
            .map(|s| s.text.as_str())
            .collect()
    }
}

/// One unit of a streamed answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CompletionChunk {
    /// Answer text delta
    ContentDelta { delta: String },
    /// Reasoning text delta
    ReasoningDelta { delta: String },
    /// Usage reported by the upstream
    UsageUpdate { usage: Usage },
    /// Terminal chunk
    StreamEnd { finish_reason: FinishReason },
}

impl CompletionChunk {
    pub fn content(delta: impl Into<String>) -> Self {
        Self::ContentDelta {
            delta: delta.into(),
        }
    }

    pub fn reasoning(delta: impl Into<String>) -> Self {
        Self::ReasoningDelta {
            delta: delta.into(),
        }
    }

    pub fn end(finish_reason: FinishReason) -> Self {
        Self::StreamEnd { finish_reason }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::StreamEnd { .. })
    }
}
