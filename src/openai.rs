//! OpenAI client configuration with sensible defaults.

use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Default timeout for OpenAI API requests (5 minutes).
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Create an OpenAI client against the default endpoint.
pub fn create_client() -> Client<OpenAIConfig> {
    create_client_for(None)
}

/// Create an OpenAI client, optionally pointed at an OpenAI-compatible base URL.
///
/// Uses a 5-minute timeout to prevent hung API calls.
pub fn create_client_for(api_base: Option<&str>) -> Client<OpenAIConfig> {
    create_client_with_timeout(api_base, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
}

/// Create an OpenAI client with a custom timeout.
pub fn create_client_with_timeout(api_base: Option<&str>, timeout: Duration) -> Client<OpenAIConfig> {
    let http_client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new());

    let config = match api_base {
        Some(base) if !base.is_empty() => OpenAIConfig::default().with_api_base(base),
        _ => OpenAIConfig::default(),
    };

    Client::with_config(config).with_http_client(http_client)
}
