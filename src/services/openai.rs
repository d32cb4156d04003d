//! OpenAI client configuration and the OpenAI text backend.

use super::text::TextBackend;
use super::ServiceError;
use async_openai::config::OpenAIConfig;
use async_openai::types::{ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs};
use async_openai::Client;
use async_trait::async_trait;
use std::time::Duration;

/// Default timeout for OpenAI API requests (5 minutes).
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Create an OpenAI client for `api_key` whose requests give up after `timeout`.
fn create_client(api_key: &str, timeout: Duration) -> Result<Client<OpenAIConfig>, ServiceError> {
    let http_client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ServiceError::Fatal(format!("Failed to create HTTP client: {}", e)))?;

    Ok(Client::with_config(OpenAIConfig::new().with_api_key(api_key)).with_http_client(http_client))
}

/// Chat-completion text backend.
///
/// A client is built per call because the key can change between attempts.
#[derive(Debug, Clone)]
pub struct OpenAITextBackend {
    model: String,
    timeout: Duration,
}

impl OpenAITextBackend {
    pub fn new(model: &str) -> Self {
        Self {
            model: model.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl TextBackend for OpenAITextBackend {
    async fn generate(&self, api_key: &str, prompt: &str) -> Result<String, ServiceError> {
        let client = create_client(api_key, self.timeout)?;

        let message = ChatCompletionRequestUserMessageArgs::default()
            .content(prompt)
            .build()
            .map_err(|e| ServiceError::Fatal(e.to_string()))?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(vec![message.into()])
            .temperature(0.7)
            .build()
            .map_err(|e| ServiceError::Fatal(e.to_string()))?;

        let response = client
            .chat()
            .create(request)
            .await
            .map_err(|e| ServiceError::classify(None, format!("{} API error: {}", self.model, e)))?;

        Ok(response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_timeout_defaults_and_overrides() {
        let backend = OpenAITextBackend::new("gpt-4o-mini");
        assert_eq!(backend.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));

        let backend = backend.with_timeout(Duration::from_secs(5));
        assert_eq!(backend.model, "gpt-4o-mini");
        assert_eq!(backend.timeout, Duration::from_secs(5));
        assert!(create_client("sk-test", backend.timeout).is_ok());
    }
}
