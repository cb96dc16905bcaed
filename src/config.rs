//! Gateway configuration loaded from TOML.
//!
//! Every section is optional; missing values fall back to [`crate::defaults`].
//! A few settings can be overridden from the environment:
//!
//! - `OMEGATRON_LISTEN`: listen address
//! - `OMEGATRON_LOG_LEVEL`: log level
//! - `OMEGATRON_<PROVIDER>_API_KEY`: API key of one provider (e.g.
//!   `OMEGATRON_MINIMAX_API_KEY`)

use secrecy::SecretString;
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::defaults;
use crate::error::StartupError;
use crate::router::RouterOptions;

/// Prefix of every environment override
pub const ENV_PREFIX: &str = "OMEGATRON_";

/// Top-level gateway configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GatewayConfig {
    pub server: ServerConfig,
    pub routing: RoutingConfig,
    pub http: HttpConfig,
    pub logging: LoggingConfig,
    /// Per-provider settings keyed by provider id
    pub providers: BTreeMap<String, ProviderConfig>,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: defaults::server::LISTEN.to_string(),
        }
    }
}

/// Router timeouts and simulated streaming.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    pub request_timeout_secs: u64,
    pub stream_idle_timeout_secs: u64,
    pub simulated_chunk_words: usize,
    pub simulated_chunk_delay_ms: u64,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: defaults::timeouts::REQUEST.as_secs(),
            stream_idle_timeout_secs: defaults::timeouts::STREAM_IDLE.as_secs(),
            simulated_chunk_words: defaults::streaming::SIMULATED_CHUNK_WORDS,
            simulated_chunk_delay_ms: defaults::streaming::SIMULATED_CHUNK_DELAY.as_millis()
                as u64,
        }
    }
}

/// Upstream HTTP client settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub connect_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: defaults::http::CONNECT_TIMEOUT.as_secs(),
            user_agent: defaults::http::USER_AGENT.to_string(),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    /// Human-readable text
    #[default]
    Text,
    /// One JSON object per event
    Json,
    /// Compact JSON
    JsonCompact,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// trace, debug, info, warn or error
    pub level: String,
    pub format: LogFormat,
    /// Also write logs to this file
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
            file: None,
        }
    }
}

/// Settings of a single provider.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Register this provider at startup
    pub enabled: bool,
    /// Override the upstream base URL
    pub base_url: Option<String>,
    /// Upstream API key
    #[serde(deserialize_with = "deserialize_secret")]
    pub api_key: Option<SecretString>,
    /// Attempts per upstream call, the first one included (1 disables retries)
    pub max_attempts: Option<u32>,
    /// Replace the built-in endpoint list (failover providers only)
    pub endpoints: Vec<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: None,
            api_key: None,
            max_attempts: None,
            endpoints: Vec::new(),
        }
    }
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|v| !v.is_empty()).map(SecretString::from))
}

impl GatewayConfig {
    /// Parse configuration from a TOML string, without env overrides.
    pub fn from_toml(toml_str: &str) -> Result<Self, StartupError> {
        toml::from_str(toml_str).map_err(|e| StartupError::Config(e.to_string()))
    }

    /// Load configuration from `path` (defaults when `None`), apply
    /// environment overrides and validate.
    pub fn load(path: Option<&Path>) -> Result<Self, StartupError> {
        let mut config = match path {
            Some(path) => {
                let contents = std::fs::read_to_string(path)?;
                Self::from_toml(&contents).map_err(|e| match e {
                    StartupError::Config(msg) => {
                        StartupError::Config(format!("{}: {msg}", path.display()))
                    }
                    other => other,
                })?
            }
            None => Self::default(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides looked up through `lookup` (normally `std::env::var`).
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(listen) = lookup(&format!("{ENV_PREFIX}LISTEN")) {
            self.server.listen = listen;
        }
        if let Some(level) = lookup(&format!("{ENV_PREFIX}LOG_LEVEL")) {
            self.logging.level = level;
        }
        for id in crate::providers::BUILTIN_PROVIDERS {
            let key = format!("{ENV_PREFIX}{}_API_KEY", id.to_ascii_uppercase());
            if let Some(api_key) = lookup(&key).filter(|k| !k.is_empty()) {
                self.providers.entry(id.to_string()).or_default().api_key =
                    Some(SecretString::from(api_key));
            }
        }
    }

    /// Reject settings the gateway cannot run with.
    pub fn validate(&self) -> Result<(), StartupError> {
        if self.server.listen.trim().is_empty() {
            return Err(StartupError::Config("server.listen must not be empty".into()));
        }
        if self.routing.request_timeout_secs == 0 {
            return Err(StartupError::Config(
                "routing.request_timeout_secs must be greater than zero".into(),
            ));
        }
        if self.routing.stream_idle_timeout_secs == 0 {
            return Err(StartupError::Config(
                "routing.stream_idle_timeout_secs must be greater than zero".into(),
            ));
        }
        if self.routing.simulated_chunk_words == 0 {
            return Err(StartupError::Config(
                "routing.simulated_chunk_words must be greater than zero".into(),
            ));
        }
        if self.http.connect_timeout_secs == 0 {
            return Err(StartupError::Config(
                "http.connect_timeout_secs must be greater than zero".into(),
            ));
        }
        if !matches!(
            self.logging.level.to_ascii_lowercase().as_str(),
            "trace" | "debug" | "info" | "warn" | "error"
        ) {
            return Err(StartupError::Config(format!(
                "invalid log level `{}`; valid options: trace, debug, info, warn, error",
                self.logging.level
            )));
        }
        for id in self.providers.keys() {
            if !crate::providers::BUILTIN_PROVIDERS.contains(&id.as_str()) {
                return Err(StartupError::Config(format!(
                    "unknown provider `{id}`; known providers: {}",
                    crate::providers::BUILTIN_PROVIDERS.join(", ")
                )));
            }
        }
        Ok(())
    }

    /// Settings of provider `id`, defaults when not configured
    pub fn provider(&self, id: &str) -> ProviderConfig {
        self.providers.get(id).cloned().unwrap_or_default()
    }

    /// Router options derived from the `[routing]` section
    pub fn router_options(&self) -> RouterOptions {
        RouterOptions {
            request_timeout: Duration::from_secs(self.routing.request_timeout_secs),
            stream_idle_timeout: Duration::from_secs(self.routing.stream_idle_timeout_secs),
            simulated_chunk_words: self.routing.simulated_chunk_words,
            simulated_chunk_delay: Duration::from_millis(self.routing.simulated_chunk_delay_ms),
        }
    }
}
