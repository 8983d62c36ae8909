//! Text-generation collaborator.
//!
//! The orchestrator consumes text generation through the [`ResponseGenerator`]
//! trait; [`ChatCompletionClient`] is the HTTP implementation against a
//! chat-completions API.

mod client;
mod messages;

pub use client::{ChatCompletionClient, LlmConfig, OPENAI_API_URL};
pub use messages::{
    ChatChoice, ChatChoiceMessage, ChatCompletionRequest, ChatCompletionResponse, ChatMessage,
};

use async_trait::async_trait;
use thiserror::Error;

/// Errors from the text-generation call.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Client-side configuration problem (bad base URL, etc.).
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The API returned a non-success status.
    #[error("HTTP error: {status}")]
    Http { status: u16, body: String },

    /// The request failed at the transport level (includes timeouts).
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The response body did not have the expected shape.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

/// Result type for text-generation operations.
pub type LlmResult<T> = Result<T, LlmError>;

/// One chat-completion call: a fixed system instruction plus the user
/// transcript, returning a single generated text blob.
#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    async fn generate(
        &self,
        system_prompt: &str,
        model: &str,
        transcript: &str,
    ) -> LlmResult<String>;
}
