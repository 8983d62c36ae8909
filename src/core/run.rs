//! Pipeline run state: one run per accepted transcript.

use uuid::Uuid;

/// Lifecycle of a pipeline run.
///
/// Runs move strictly forward: `PendingGeneration` → `GeneratingSpeech` →
/// `StreamingAudio` → one of the terminal states. `Superseded` can be entered
/// from any non-terminal state when a newer transcript is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Waiting on the text-generation call.
    PendingGeneration,
    /// Generated text in hand, synthesis request being issued.
    GeneratingSpeech,
    /// Audio chunks are flowing.
    StreamingAudio,
    /// The synthesis stream closed cleanly.
    Complete,
    /// A stage failed; any audio already emitted stays valid.
    Failed,
    /// A newer generation took over; all pending emissions were dropped.
    Superseded,
}

impl RunStatus {
    /// Terminal runs produce no further side effects and are pruned from
    /// the session's registry on the next accepted transcript.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Failed | Self::Superseded)
    }
}

/// The end-to-end processing of one transcript, bound to the generation it
/// was accepted under.
///
/// The generation captured here is compared against the session's live
/// counter before every emission; a mismatch means the run is stale.
#[derive(Debug)]
pub struct PipelineRun {
    /// Session this run belongs to.
    pub session_id: Uuid,
    /// Generation captured when the transcript was accepted.
    pub generation: u64,
    /// Input transcript.
    pub transcript: String,
    /// Output of text generation, once resolved.
    pub generated_text: Option<String>,
    /// Next ordinal to assign to an emitted audio chunk.
    next_sequence: u64,
}

impl PipelineRun {
    pub fn new(session_id: Uuid, generation: u64, transcript: String) -> Self {
        Self {
            session_id,
            generation,
            transcript,
            generated_text: None,
            next_sequence: 0,
        }
    }

    /// Assign the next chunk sequence number, in arrival order.
    pub fn next_sequence(&mut self) -> u64 {
        let seq = self.next_sequence;
        self.next_sequence += 1;
        seq
    }

    /// Number of chunks emitted so far.
    pub fn chunks_emitted(&self) -> u64 {
        self.next_sequence
    }
}
