//! Core Types
//!
//! Request, completion and wire types shared by the router, the adapters and
//! the HTTP surface.

pub mod chat;
pub mod completion;
pub mod openai;

pub use chat::{ChatMessage, CompletionRequest, Role};
pub use completion::{
    CompletionChunk, CompletionResult, FinishReason, Segment, SegmentKind, Usage,
};
pub use openai::{
    CHAT_COMPLETION_CHUNK_OBJECT, CHAT_COMPLETION_OBJECT, ChatCompletionChunk,
    ChatCompletionResponse, Choice, ChunkChoice, ChunkDelta, ErrorBody, ErrorEnvelope,
    HealthResponse, ModelCard, ModelsResponse, ResponseMessage,
};

/// Public model name -> upstream model name, as declared by an adapter
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelMapping {
    pub public_name: String,
    pub upstream_name: String,
}

impl ModelMapping {
    pub fn new(public_name: impl Into<String>, upstream_name: impl Into<String>) -> Self {
        Self {
            public_name: public_name.into(),
            upstream_name: upstream_name.into(),
        }
    }

    /// Mapping whose upstream name equals the public one
    pub fn same(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            upstream_name: name.clone(),
            public_name: name,
        }
    }
}

/// Where a public model name is served
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProviderBinding {
    pub provider_id: String,
    pub upstream_model: String,
}

impl ProviderBinding {
    pub fn new(provider_id: impl Into<String>, upstream_model: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
            upstream_model: upstream_model.into(),
        }
    }
}
