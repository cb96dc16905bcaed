//! Provider adapter trait

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::stream::CompletionOutput;
use crate::types::{CompletionRequest, ModelMapping, ProviderBinding};

/// One upstream provider.
///
/// Implementations translate a [`CompletionRequest`] into the upstream's
/// request shape and the upstream's reply back into a [`CompletionOutput`].
/// Every failure is reported as a [`ProviderError`]; adapters never panic on
/// upstream input.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Stable identifier, also reported as `owned_by` in the model list
    fn provider_id(&self) -> &str;

    /// Models served by this provider
    fn list_models(&self) -> Vec<ModelMapping>;

    /// Public model names served by this provider
    fn model_names(&self) -> Vec<String> {
        self.list_models()
            .into_iter()
            .map(|m| m.public_name)
            .collect()
    }

    /// Reject requests this provider cannot serve before anything is sent.
    ///
    /// The returned message is reported to the client as an invalid request.
    fn check_request(&self, _request: &CompletionRequest) -> Result<(), String> {
        Ok(())
    }

    /// Run one completion.
    ///
    /// Returns [`CompletionOutput::Stream`] when `request.stream` is set and
    /// the upstream streams; otherwise [`CompletionOutput::Complete`].
    /// Unsupported generation parameters are ignored.
    async fn complete(
        &self,
        request: CompletionRequest,
        binding: &ProviderBinding,
    ) -> Result<CompletionOutput, ProviderError>;
}
