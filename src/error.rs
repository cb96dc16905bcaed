//! Error Handling Module
//!
//! Three error families live here:
//!
//! - [`ProviderError`]: everything an upstream can do wrong (network, status,
//!   payload, timeout). Adapters return nothing else.
//! - [`GatewayError`]: the request-scoped taxonomy the HTTP surface renders as
//!   an OpenAI error envelope.
//! - [`StartupError`]: fatal configuration problems detected before the
//!   listener binds.
//!
//! # Example
//!
//! ```rust
//! use omegatron::error::{GatewayError, ProviderError};
//!
//! let err = GatewayError::from(ProviderError::timeout("minimax", "no answer after 120s"));
//! assert_eq!(err.status_code(), 504);
//! assert_eq!(err.code(), "upstream_timeout");
//! ```

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::types::{ErrorBody, ErrorEnvelope};

/// Kind of upstream failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorKind {
    /// The upstream did not answer within the allotted time
    Timeout,
    /// The upstream answered with a non-2xx status
    UpstreamStatus,
    /// The upstream answered 2xx but the body could not be understood
    MalformedUpstreamPayload,
    /// The request never completed at the transport level
    NetworkFailure,
}

impl ProviderErrorKind {
    /// Stable snake_case name, used in error codes and logs
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::UpstreamStatus => "upstream_status",
            Self::MalformedUpstreamPayload => "malformed_upstream_payload",
            Self::NetworkFailure => "network_failure",
        }
    }
}

impl fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Upstream failure reported by a provider adapter
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("provider {provider} failed ({kind}{}): {message}", status_suffix(.upstream_status))]
pub struct ProviderError {
    /// Id of the adapter that failed
    pub provider: String,
    /// Failure category
    pub kind: ProviderErrorKind,
    /// HTTP status returned by the upstream, when there was one
    pub upstream_status: Option<u16>,
    /// Human-readable detail
    pub message: String,
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" {s}")).unwrap_or_default()
}

impl ProviderError {
    /// Create a provider error of the given kind
    pub fn new(
        provider: impl Into<String>,
        kind: ProviderErrorKind,
        upstream_status: Option<u16>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            provider: provider.into(),
            kind,
            upstream_status,
            message: message.into(),
        }
    }

    /// Upstream did not answer in time
    pub fn timeout(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(provider, ProviderErrorKind::Timeout, None, message)
    }

    /// Upstream answered with a non-success status
    pub fn upstream_status(
        provider: impl Into<String>,
        status: u16,
        message: impl Into<String>,
    ) -> Self {
        Self::new(provider, ProviderErrorKind::UpstreamStatus, Some(status), message)
    }

    /// Upstream body could not be parsed or was missing required fields
    pub fn malformed(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(
            provider,
            ProviderErrorKind::MalformedUpstreamPayload,
            None,
            message,
        )
    }

    /// Transport-level failure
    pub fn network(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(provider, ProviderErrorKind::NetworkFailure, None, message)
    }

    /// Map a `reqwest` transport error into the taxonomy.
    pub fn from_reqwest(provider: impl Into<String>, err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::timeout(provider, format!("upstream request timed out: {err}"))
        } else if err.is_decode() {
            Self::malformed(provider, format!("failed to decode upstream body: {err}"))
        } else if let Some(status) = err.status() {
            Self::upstream_status(provider, status.as_u16(), err.to_string())
        } else {
            Self::network(provider, format!("upstream request failed: {err}"))
        }
    }

    /// Whether an adapter may retry the call that produced this error.
    ///
    /// Client-shaped upstream answers (4xx, including 429) are never retried.
    pub fn is_retryable(&self) -> bool {
        match self.kind {
            ProviderErrorKind::NetworkFailure | ProviderErrorKind::Timeout => true,
            ProviderErrorKind::UpstreamStatus => {
                matches!(self.upstream_status, Some(status) if (500..=599).contains(&status))
            }
            ProviderErrorKind::MalformedUpstreamPayload => false,
        }
    }
}

/// Classify a non-success upstream HTTP answer.
///
/// Keeps only a short sample of the body so error messages stay readable.
pub fn classify_http_status(provider: &str, status: u16, body_text: &str) -> ProviderError {
    let body_sample = body_text
        .chars()
        .take(crate::defaults::http::ERROR_BODY_SAMPLE)
        .collect::<String>();
    let message = if body_sample.trim().is_empty() {
        format!("upstream returned HTTP {status}")
    } else {
        format!("upstream returned HTTP {status}: {}", body_sample.trim())
    };
    ProviderError::upstream_status(provider, status, message)
}

/// Request-scoped error returned by the router
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// The requested model is not registered
    #[error("The model `{0}` does not exist")]
    UnknownModel(String),

    /// The request body or its parameters are invalid
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The upstream provider failed
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Anything unanticipated
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl GatewayError {
    /// HTTP status used when rendering this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::UnknownModel(_) | Self::InvalidRequest(_) => 400,
            Self::Provider(e) if e.kind == ProviderErrorKind::Timeout => 504,
            Self::Provider(_) => 502,
            Self::InternalError(_) => 500,
        }
    }

    /// OpenAI-style `error.type`
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::UnknownModel(_) | Self::InvalidRequest(_) => "invalid_request_error",
            Self::Provider(_) => "upstream_error",
            Self::InternalError(_) => "internal_error",
        }
    }

    /// Machine-readable `error.code`
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownModel(_) => "model_not_found",
            Self::InvalidRequest(_) => "invalid_request",
            Self::Provider(e) => match e.kind {
                ProviderErrorKind::Timeout => "upstream_timeout",
                ProviderErrorKind::UpstreamStatus => "upstream_status",
                ProviderErrorKind::MalformedUpstreamPayload => "upstream_malformed_payload",
                ProviderErrorKind::NetworkFailure => "upstream_network_failure",
            },
            Self::InternalError(_) => "internal_error",
        }
    }

    /// Render as the OpenAI error envelope
    pub fn to_envelope(&self) -> ErrorEnvelope {
        ErrorEnvelope {
            error: ErrorBody {
                message: self.to_string(),
                r#type: self.error_type().to_string(),
                code: self.code().to_string(),
            },
        }
    }

    /// Whether the error was caused by the upstream rather than the client
    pub fn is_upstream(&self) -> bool {
        matches!(self, Self::Provider(_))
    }
}

impl From<validator::ValidationErrors> for GatewayError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::InvalidRequest(errors.to_string())
    }
}

/// Fatal error detected while building the gateway
#[derive(Debug, Error)]
pub enum StartupError {
    /// Two registrations claim the same public model name
    #[error("model `{model}` is registered by both `{first}` and `{second}`")]
    DuplicateModel {
        model: String,
        first: String,
        second: String,
    },

    /// A provider id was registered twice
    #[error("provider `{0}` is registered more than once")]
    DuplicateProvider(String),

    /// Configuration is unreadable or inconsistent
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O failure while reading configuration
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
