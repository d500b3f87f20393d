//! OpenAI-compatible client configuration with sensible defaults.

use crate::config::ModelSettings;
use crate::error::{Result, SyllabusError};
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Create a chat client for the configured OpenAI-compatible provider.
///
/// The base URL and key come from settings so OpenRouter and plain OpenAI
/// both work without code changes.
pub fn create_client(settings: &ModelSettings) -> Result<Client<OpenAIConfig>> {
    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(settings.timeout_secs))
        .build()
        .map_err(|e| SyllabusError::Config(format!("Failed to create HTTP client: {}", e)))?;

    let mut config = OpenAIConfig::new().with_api_base(&settings.api_base);
    if let Some(key) = settings.api_key.as_deref() {
        config = config.with_api_key(key);
    }

    Ok(Client::with_config(config).with_http_client(http_client))
}
