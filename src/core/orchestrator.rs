//! Response orchestration: one inbound transcript in, an ordered stream of
//! session events out.
//!
//! `handle_transcript` is fire-and-forget: it bumps the session generation,
//! supersedes the prior run, and spawns the pipeline task. The task calls
//! text generation, emits the generated text as a discrete response event,
//! then streams synthesis chunks with sequence numbers assigned in upstream
//! arrival order. Before every emission it re-checks that its generation is
//! still current; a stale run drops all pending emissions and closes the
//! upstream stream.

use std::sync::Arc;

use bytes::Bytes;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::remote::{PromptConfig, PromptStore};
use crate::errors::PipelineError;

use super::llm::ResponseGenerator;
use super::run::{PipelineRun, RunStatus};
use super::session::Session;
use super::tts::SpeechSynthesizer;

/// Tagged result carried on the response channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ResponseOutcome {
    /// The generated text.
    Success { text: String },
    /// A fixed error message for a failed stage.
    Error { reason: String },
}

/// Events a pipeline run emits toward the session's connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Generated text (or a stage error), decoupled from the audio stream.
    Response {
        generation: u64,
        result: ResponseOutcome,
    },
    /// One audio chunk, order-significant within its generation.
    AudioChunk {
        generation: u64,
        sequence: u64,
        bytes: Bytes,
    },
}

/// Orchestrates pipeline runs over the generation and synthesis
/// collaborators. Cheap to clone; all fields are shared.
#[derive(Clone)]
pub struct Orchestrator {
    generator: Arc<dyn ResponseGenerator>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    prompts: Arc<PromptStore>,
}

impl Orchestrator {
    pub fn new(
        generator: Arc<dyn ResponseGenerator>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        prompts: Arc<PromptStore>,
    ) -> Self {
        Self {
            generator,
            synthesizer,
            prompts,
        }
    }

    /// Accept a transcript for this session and start its pipeline run.
    ///
    /// Returns the generation assigned to the run. The call returns
    /// immediately; events arrive asynchronously on `events`. The prompt
    /// configuration is snapshotted here, so a concurrent reload never
    /// changes a run mid-flight.
    pub fn handle_transcript(
        &self,
        session: &Arc<Session>,
        transcript: String,
        events: mpsc::Sender<SessionEvent>,
    ) -> u64 {
        let run = session.begin_run(transcript);
        let generation = run.generation;
        let prompt = self.prompts.get();

        info!(
            session_id = %session.id(),
            generation,
            "Transcript accepted, starting pipeline run"
        );

        let orchestrator = self.clone();
        let session = Arc::clone(session);
        tokio::spawn(async move {
            orchestrator.run_pipeline(session, run, prompt, events).await;
        });

        generation
    }

    async fn run_pipeline(
        &self,
        session: Arc<Session>,
        mut run: PipelineRun,
        prompt: Arc<PromptConfig>,
        events: mpsc::Sender<SessionEvent>,
    ) {
        let generation = run.generation;

        let text = match self
            .generator
            .generate(&prompt.prompt, &prompt.model, &run.transcript)
            .await
        {
            Ok(text) => text,
            Err(e) => {
                let err = PipelineError::from(e);
                warn!(session_id = %session.id(), generation, error = %err, "Generation stage failed");
                session.set_run_status(generation, RunStatus::Failed);
                self.emit_error(&session, generation, &err, &events).await;
                return;
            }
        };

        if !session.is_current(generation) {
            session.set_run_status(generation, RunStatus::Superseded);
            return;
        }

        run.generated_text = Some(text.clone());
        session.set_run_status(generation, RunStatus::GeneratingSpeech);

        // Text response goes out before synthesis even starts; the audio
        // stream is a separate channel.
        if events
            .send(SessionEvent::Response {
                generation,
                result: ResponseOutcome::Success { text: text.clone() },
            })
            .await
            .is_err()
        {
            return;
        }

        let mut stream = match self.synthesizer.synthesize(&text).await {
            Ok(stream) => stream,
            Err(e) => {
                let err = PipelineError::Synthesis(e);
                warn!(session_id = %session.id(), generation, error = %err, "Synthesis stage failed");
                session.set_run_status(generation, RunStatus::Failed);
                self.emit_error(&session, generation, &err, &events).await;
                return;
            }
        };

        session.set_run_status(generation, RunStatus::StreamingAudio);

        loop {
            match stream.next().await {
                Some(Ok(bytes)) => {
                    if !session.is_current(generation) {
                        // Stale: stop consuming; dropping the stream closes
                        // the upstream connection.
                        debug!(
                            session_id = %session.id(),
                            generation,
                            "Run superseded mid-stream, dropping remaining chunks"
                        );
                        session.set_run_status(generation, RunStatus::Superseded);
                        return;
                    }
                    let sequence = run.next_sequence();
                    if events
                        .send(SessionEvent::AudioChunk {
                            generation,
                            sequence,
                            bytes,
                        })
                        .await
                        .is_err()
                    {
                        return;
                    }
                }
                Some(Err(e)) => {
                    let chunks = run.chunks_emitted();
                    let err = if chunks == 0 {
                        PipelineError::Synthesis(e)
                    } else {
                        // Partial audio already out stays valid; the stream
                        // just stops.
                        PipelineError::StreamInterrupted { chunks, source: e }
                    };
                    warn!(session_id = %session.id(), generation, error = %err, "Synthesis stream failed");
                    session.set_run_status(generation, RunStatus::Failed);
                    self.emit_error(&session, generation, &err, &events).await;
                    return;
                }
                None => {
                    debug!(
                        session_id = %session.id(),
                        generation,
                        chunks = run.chunks_emitted(),
                        "Synthesis stream complete"
                    );
                    session.set_run_status(generation, RunStatus::Complete);
                    return;
                }
            }
        }
    }

    /// Surface a stage failure on the response channel, unless the run is
    /// already stale or the failure kind owes no message.
    async fn emit_error(
        &self,
        session: &Session,
        generation: u64,
        err: &PipelineError,
        events: &mpsc::Sender<SessionEvent>,
    ) {
        if !session.is_current(generation) {
            return;
        }
        if let Some(reason) = err.user_message() {
            let _ = events
                .send(SessionEvent::Response {
                    generation,
                    result: ResponseOutcome::Error {
                        reason: reason.to_string(),
                    },
                })
                .await;
        }
    }
}
