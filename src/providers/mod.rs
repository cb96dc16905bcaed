//! Providers Module
//!
//! One adapter per upstream. [`build_adapters`] turns the configuration into
//! the adapter set the router is built from.

pub mod cloudflare;
pub mod data_stream;
pub mod flowith;
pub mod minimax;
pub mod oivscode;
pub mod openai_compatible;
pub mod typefully;

use std::sync::Arc;

use crate::config::GatewayConfig;
use crate::traits::ProviderAdapter;

pub use cloudflare::CloudflareAdapter;
pub use flowith::FlowithAdapter;
pub use minimax::MinimaxAdapter;
pub use oivscode::OivscodeAdapter;
pub use typefully::TypefullyAdapter;

/// Ids of every built-in provider, in registration order
pub const BUILTIN_PROVIDERS: &[&str] = &[
    minimax::PROVIDER_ID,
    oivscode::PROVIDER_ID,
    cloudflare::PROVIDER_ID,
    typefully::PROVIDER_ID,
    flowith::PROVIDER_ID,
];

/// Build the enabled adapters.
///
/// Disabled providers are left out. MiniMax is left out with a warning when
/// no API key is configured.
pub fn build_adapters(
    config: &GatewayConfig,
    client: reqwest::Client,
) -> Vec<Arc<dyn ProviderAdapter>> {
    let mut adapters: Vec<Arc<dyn ProviderAdapter>> = Vec::with_capacity(BUILTIN_PROVIDERS.len());

    for id in BUILTIN_PROVIDERS {
        let provider = config.provider(id);
        if !provider.enabled {
            tracing::info!(provider = *id, "provider disabled by configuration");
            continue;
        }

        let adapter: Arc<dyn ProviderAdapter> = match *id {
            minimax::PROVIDER_ID => match MinimaxAdapter::from_config(client.clone(), &provider) {
                Some(adapter) => Arc::new(adapter),
                None => {
                    tracing::warn!(
                        provider = *id,
                        "no API key configured; set {}MINIMAX_API_KEY to enable it",
                        crate::config::ENV_PREFIX
                    );
                    continue;
                }
            },
            oivscode::PROVIDER_ID => Arc::new(OivscodeAdapter::from_config(client.clone(), &provider)),
            cloudflare::PROVIDER_ID => {
                Arc::new(CloudflareAdapter::from_config(client.clone(), &provider))
            }
            typefully::PROVIDER_ID => {
                Arc::new(TypefullyAdapter::from_config(client.clone(), &provider))
            }
            flowith::PROVIDER_ID => Arc::new(FlowithAdapter::from_config(client.clone(), &provider)),
            other => {
                tracing::warn!(provider = other, "no adapter for provider");
                continue;
            }
        };
        adapters.push(adapter);
    }

    adapters
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;
    use tracing_test::traced_test;

    fn ids(adapters: &[Arc<dyn ProviderAdapter>]) -> Vec<String> {
        adapters.iter().map(|a| a.provider_id().to_string()).collect()
    }

    #[test]
    #[traced_test]
    fn minimax_needs_an_api_key() {
        let config = GatewayConfig::default();
        let adapters = build_adapters(&config, reqwest::Client::new());
        assert_eq!(
            ids(&adapters),
            vec!["oivscode", "cloudflare", "typefully", "flowith"]
        );
        assert!(logs_contain("no API key configured"));
    }

    #[test]
    fn disabled_providers_are_skipped() {
        let mut config = GatewayConfig::default();
        config.providers.entry("minimax".into()).or_default().api_key =
            Some(SecretString::from("key".to_string()));
        config.providers.entry("cloudflare".into()).or_default().enabled = false;

        let adapters = build_adapters(&config, reqwest::Client::new());
        assert_eq!(
            ids(&adapters),
            vec!["minimax", "oivscode", "typefully", "flowith"]
        );
    }
}
