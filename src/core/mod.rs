pub mod llm;
pub mod orchestrator;
pub mod run;
pub mod session;
pub mod tts;

// Re-export commonly used types for convenience
pub use llm::{ChatCompletionClient, LlmConfig, LlmError, LlmResult, ResponseGenerator};
pub use orchestrator::{Orchestrator, ResponseOutcome, SessionEvent};
pub use run::{PipelineRun, RunStatus};
pub use session::Session;
pub use tts::{
    DeepgramSynthesizer, SpeakError, SpeakResult, SpeechStream, SpeechSynthesizer,
    SynthesizerConfig,
};
