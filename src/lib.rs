//! # Omegatron - An OpenAI-compatible Chat Completion Gateway
//!
//! Omegatron exposes a single OpenAI-compatible endpoint and forwards each
//! chat-completion request to the upstream provider that serves the requested
//! model. Answers are normalized into OpenAI `chat.completion` bodies or
//! `chat.completion.chunk` streams, with upstream reasoning rendered inline
//! inside a `<thinking>` block.
#![deny(unsafe_code)]

//! ## Architecture
//!
//! - [`registry`]: public model name -> provider binding, built once at startup
//! - [`traits::ProviderAdapter`]: one implementation per upstream, in [`providers`]
//! - [`normalizer`]: adapter output -> OpenAI bodies and increments
//! - [`router`]: validation, lookup, dispatch, timeouts, delivery-mode conversion
//! - [`server`]: the axum HTTP surface
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use omegatron::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = GatewayConfig::load(None)?;
//!     let client = omegatron::utils::build_client(&config.http)?;
//!     let adapters = omegatron::providers::build_adapters(&config, client);
//!     let router = Arc::new(RequestRouter::new(adapters, config.router_options())?);
//!
//!     let listener = tokio::net::TcpListener::bind(&config.server.listen).await?;
//!     omegatron::server::serve(listener, router, async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod defaults;
pub mod error;
pub mod normalizer;
pub mod providers;
pub mod registry;
pub mod retry;
pub mod router;
pub mod server;
pub mod stream;
pub mod telemetry;
pub mod traits;
pub mod types;
pub mod utils;

pub use config::GatewayConfig;
pub use error::{GatewayError, ProviderError, ProviderErrorKind, StartupError};
pub use router::{RequestRouter, RouterOptions, RouterResponse};

/// Commonly used items
pub mod prelude {
    pub use crate::config::GatewayConfig;
    pub use crate::error::{GatewayError, ProviderError, ProviderErrorKind, StartupError};
    pub use crate::normalizer::{IncrementStream, ResponseNormalizer};
    pub use crate::registry::ModelRegistry;
    pub use crate::router::{RequestRouter, RouterOptions, RouterResponse};
    pub use crate::stream::{ChunkStream, CompletionOutput};
    pub use crate::traits::ProviderAdapter;
    pub use crate::types::{
        ChatCompletionChunk, ChatCompletionResponse, ChatMessage, CompletionChunk,
        CompletionRequest, CompletionResult, FinishReason, ModelMapping, ProviderBinding, Role,
        Segment, Usage,
    };
}

static_assertions::assert_impl_all!(GatewayError: Send, Sync);
static_assertions::assert_impl_all!(ProviderError: Send, Sync);
static_assertions::assert_impl_all!(stream::CompletionOutput: Send);
