//! Deepgram speak-endpoint synthesizer.
//!
//! Issues one streaming `POST /v1/speak` per synthesis and forwards the
//! response body chunk by chunk, exactly as the transport delivers it.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::json;
use tracing::debug;

use super::{SpeakError, SpeakResult, SpeechStream, SpeechSynthesizer};

/// Deepgram speak API base URL.
pub const DEEPGRAM_SPEAK_URL: &str = "https://api.deepgram.com";

/// Default deadline covering the request and the full body read.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Default voice model.
const DEFAULT_MODEL: &str = "aura-asteria-en";

/// Configuration for [`DeepgramSynthesizer`].
#[derive(Debug, Clone)]
pub struct SynthesizerConfig {
    /// API key, sent as `Authorization: Token <key>`. Requests go out
    /// unauthenticated when absent (useful against local mock backends).
    pub api_key: Option<String>,
    /// Base URL of the API, without the `/v1/speak` path.
    pub base_url: String,
    /// Voice model passed as the `model` query parameter.
    pub model: String,
    /// Deadline for the call including the streamed body; on expiry the
    /// stream yields a transport error.
    pub timeout: Duration,
}

impl Default for SynthesizerConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEEPGRAM_SPEAK_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Streaming synthesizer against a Deepgram-style speak endpoint.
pub struct DeepgramSynthesizer {
    http: reqwest::Client,
    config: SynthesizerConfig,
}

impl DeepgramSynthesizer {
    pub fn new(http: reqwest::Client, config: SynthesizerConfig) -> SpeakResult<Self> {
        if config.base_url.is_empty() {
            return Err(SpeakError::InvalidConfiguration(
                "synthesis base URL must not be empty".to_string(),
            ));
        }
        if config.model.is_empty() {
            return Err(SpeakError::InvalidConfiguration(
                "synthesis model must not be empty".to_string(),
            ));
        }
        if config.timeout.is_zero() {
            return Err(SpeakError::InvalidConfiguration(
                "synthesis timeout must be non-zero".to_string(),
            ));
        }
        Ok(Self { http, config })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/speak", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl SpeechSynthesizer for DeepgramSynthesizer {
    async fn synthesize(&self, text: &str) -> SpeakResult<SpeechStream> {
        let mut builder = self
            .http
            .post(self.endpoint())
            .query(&[("model", self.config.model.as_str())])
            .timeout(self.config.timeout)
            .json(&json!({ "text": text }));
        if let Some(ref key) = self.config.api_key {
            builder = builder.header("Authorization", format!("Token {key}"));
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SpeakError::Http {
                status: status.as_u16(),
            });
        }

        debug!(model = %self.config.model, text_len = text.len(), "Synthesis stream opened");

        // Dropping the returned stream closes the underlying connection,
        // which is how the orchestrator cancels a superseded run.
        let stream = response
            .bytes_stream()
            .map(|item| item.map_err(SpeakError::from));
        Ok(Box::pin(stream))
    }
}
