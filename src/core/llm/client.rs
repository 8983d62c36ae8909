//! HTTP client for a chat-completions text-generation API.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::messages::{ChatCompletionRequest, ChatCompletionResponse, ChatMessage};
use super::{LlmError, LlmResult, ResponseGenerator};

/// Default chat-completions API base URL.
pub const OPENAI_API_URL: &str = "https://api.openai.com";

/// Default deadline for one generation call.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for [`ChatCompletionClient`].
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Bearer token for the API. Requests are sent unauthenticated when
    /// absent (useful against local mock backends).
    pub api_key: Option<String>,
    /// Base URL of the API, without the `/v1/chat/completions` path.
    pub base_url: String,
    /// Deadline for the whole call; on expiry the run fails as a
    /// generation failure.
    pub timeout: Duration,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: OPENAI_API_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Chat-completions client implementing [`ResponseGenerator`].
pub struct ChatCompletionClient {
    http: reqwest::Client,
    config: LlmConfig,
}

impl ChatCompletionClient {
    pub fn new(http: reqwest::Client, config: LlmConfig) -> LlmResult<Self> {
        if config.base_url.is_empty() {
            return Err(LlmError::InvalidConfiguration(
                "generation base URL must not be empty".to_string(),
            ));
        }
        if config.timeout.is_zero() {
            return Err(LlmError::InvalidConfiguration(
                "generation timeout must be non-zero".to_string(),
            ));
        }
        Ok(Self { http, config })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl ResponseGenerator for ChatCompletionClient {
    async fn generate(
        &self,
        system_prompt: &str,
        model: &str,
        transcript: &str,
    ) -> LlmResult<String> {
        let request = ChatCompletionRequest {
            model: model.to_string(),
            messages: vec![
                ChatMessage::system(system_prompt),
                ChatMessage::user(transcript),
            ],
        };

        let mut builder = self
            .http
            .post(self.endpoint())
            .timeout(self.config.timeout)
            .json(&request);
        if let Some(ref key) = self.config.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| LlmError::MalformedResponse(e.to_string()))?;

        let text = completion
            .into_text()
            .ok_or_else(|| LlmError::MalformedResponse("response carried no text".to_string()))?;

        debug!(model, text_len = text.len(), "Generation call complete");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LlmConfig::default();
        assert_eq!(config.base_url, OPENAI_API_URL);
        assert_eq!(config.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_rejects_empty_base_url() {
        let config = LlmConfig {
            base_url: String::new(),
            ..Default::default()
        };
        let result = ChatCompletionClient::new(reqwest::Client::new(), config);
        assert!(matches!(result, Err(LlmError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let config = LlmConfig {
            timeout: Duration::ZERO,
            ..Default::default()
        };
        let result = ChatCompletionClient::new(reqwest::Client::new(), config);
        assert!(matches!(result, Err(LlmError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_endpoint_tolerates_trailing_slash() {
        let config = LlmConfig {
            base_url: "http://localhost:9000/".to_string(),
            ..Default::default()
        };
        let client = ChatCompletionClient::new(reqwest::Client::new(), config).unwrap();
        assert_eq!(client.endpoint(), "http://localhost:9000/v1/chat/completions");
    }
}
