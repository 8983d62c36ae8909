//! Pipeline error kinds and the fixed user-visible messages for each stage.
//!
//! Upstream failures are caught at the orchestrator boundary and converted
//! into one of these kinds; raw transport errors never reach the session.

use thiserror::Error;

use crate::core::llm::LlmError;
use crate::core::tts::SpeakError;

/// Fixed message sent on the response channel when text generation fails.
pub const GENERATION_ERROR_MESSAGE: &str = "Error: unable to generate a response.";

/// Fixed message sent on the response channel when speech synthesis fails
/// before any audio was produced.
pub const SYNTHESIS_ERROR_MESSAGE: &str = "Error: unable to synthesize speech.";

/// End-to-end failure kinds for one pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Text generation failed or returned malformed data. The run terminates
    /// and synthesis is never attempted.
    #[error("text generation failed: {0}")]
    Generation(#[from] LlmError),

    /// Synthesis returned a non-success status or errored before yielding
    /// any audio.
    #[error("speech synthesis failed: {0}")]
    Synthesis(SpeakError),

    /// Synthesis errored mid-stream after partial chunks were delivered.
    /// Chunks already sent remain valid; no further error message is owed.
    #[error("synthesis stream interrupted after {chunks} chunk(s): {source}")]
    StreamInterrupted { chunks: u64, source: SpeakError },
}

impl PipelineError {
    /// The fixed message to surface on the response channel, if any.
    ///
    /// A mid-stream interruption surfaces nothing: partial playback is
    /// accepted degradation and the stream simply stops.
    pub fn user_message(&self) -> Option<&'static str> {
        match self {
            Self::Generation(_) => Some(GENERATION_ERROR_MESSAGE),
            Self::Synthesis(_) => Some(SYNTHESIS_ERROR_MESSAGE),
            Self::StreamInterrupted { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_failure_has_user_message() {
        let err = PipelineError::Generation(LlmError::MalformedResponse("no choices".into()));
        assert_eq!(err.user_message(), Some(GENERATION_ERROR_MESSAGE));
    }

    #[test]
    fn test_synthesis_failure_has_user_message() {
        let err = PipelineError::Synthesis(SpeakError::Http { status: 500 });
        assert_eq!(err.user_message(), Some(SYNTHESIS_ERROR_MESSAGE));
    }

    #[test]
    fn test_stream_interruption_is_silent() {
        let err = PipelineError::StreamInterrupted {
            chunks: 3,
            source: SpeakError::Http { status: 502 },
        };
        assert_eq!(err.user_message(), None);
    }
}
