//! Speech-synthesis collaborator.
//!
//! The orchestrator consumes synthesis through the [`SpeechSynthesizer`]
//! trait, which yields a lazy, finite, non-restartable stream of binary
//! audio chunks in upstream delivery order. [`DeepgramSynthesizer`] is the
//! HTTP implementation against a Deepgram-style speak endpoint.

mod deepgram;

pub use deepgram::{DEEPGRAM_SPEAK_URL, DeepgramSynthesizer, SynthesizerConfig};

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use thiserror::Error;

/// Errors from the synthesis call or its chunk stream.
#[derive(Debug, Error)]
pub enum SpeakError {
    /// Client-side configuration problem.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The speak endpoint returned a non-success status line; no audio
    /// was produced.
    #[error("HTTP error: {status}")]
    Http { status: u16 },

    /// The request or stream failed at the transport level (includes
    /// timeouts).
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Result type for synthesis operations.
pub type SpeakResult<T> = Result<T, SpeakError>;

/// Lazy sequence of binary audio chunks, in the exact byte-grouping the
/// transport delivered them. Chunks are not aligned to frame boundaries.
/// Dropping the stream cancels the upstream request.
pub type SpeechStream = Pin<Box<dyn Stream<Item = SpeakResult<Bytes>> + Send>>;

/// One streaming synthesis request per call. The stream is finite and not
/// restartable; a failed status line surfaces as `Err` before any chunk.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> SpeakResult<SpeechStream>;
}
