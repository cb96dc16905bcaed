//! Upstream HTTP helpers

use std::time::Duration;

use crate::config::HttpConfig;
use crate::defaults;
use crate::error::{ProviderError, StartupError, classify_http_status};

/// Build the HTTP client shared by every adapter.
///
/// There is no overall request timeout here: the router bounds dispatch and
/// stream idleness, and adapters add their own per-call limits.
pub fn build_client(config: &HttpConfig) -> Result<reqwest::Client, StartupError> {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .pool_max_idle_per_host(defaults::http::MAX_IDLE_PER_HOST)
        .pool_idle_timeout(defaults::http::KEEP_ALIVE_TIMEOUT)
        .user_agent(config.user_agent.clone())
        .build()
        .map_err(|e| StartupError::Config(format!("failed to build HTTP client: {e}")))
}

/// Send `request` and fail on any non-2xx answer.
///
/// The body of a failed answer is read and sampled into the error message.
pub async fn send_checked(
    provider: &str,
    request: reqwest::RequestBuilder,
) -> Result<reqwest::Response, ProviderError> {
    let response = request
        .send()
        .await
        .map_err(|e| ProviderError::from_reqwest(provider, &e))?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    tracing::warn!(
        provider,
        status = status.as_u16(),
        "upstream returned an error status"
    );
    Err(classify_http_status(provider, status.as_u16(), &body))
}

/// Read and parse a JSON body
pub async fn read_json<T>(provider: &str, response: reqwest::Response) -> Result<T, ProviderError>
where
    T: serde::de::DeserializeOwned,
{
    let body = response
        .bytes()
        .await
        .map_err(|e| ProviderError::from_reqwest(provider, &e))?;
    serde_json::from_slice(&body)
        .map_err(|e| ProviderError::malformed(provider, format!("invalid JSON body: {e}")))
}

/// Join a base URL and a path with exactly one slash between them
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_url_normalizes_slashes() {
        assert_eq!(
            join_url("https://api.example.com/v1/", "/chat"),
            "https://api.example.com/v1/chat"
        );
        assert_eq!(join_url("http://h", "a/b"), "http://h/a/b");
    }

    #[test]
    fn client_builds_from_default_config() {
        assert!(build_client(&HttpConfig::default()).is_ok());
    }
}
