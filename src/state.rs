//! Shared application state.

use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use crate::config::ServerConfig;
use crate::config::remote::PromptStore;
use crate::core::llm::{ChatCompletionClient, LlmConfig};
use crate::core::orchestrator::Orchestrator;
use crate::core::tts::{DeepgramSynthesizer, SynthesizerConfig};

/// How long to wait for a TCP connection to either collaborator.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Application state shared across all connections.
///
/// Sessions themselves are per-connection and never shared; this holds only
/// the collaborator clients and the hot-swappable prompt store.
pub struct AppState {
    pub config: ServerConfig,
    pub orchestrator: Orchestrator,
    pub prompts: Arc<PromptStore>,
}

impl AppState {
    /// Build the shared state: one HTTP client, the prompt store seeded
    /// from the static config, and the two collaborator clients behind
    /// their trait seams.
    pub fn new(config: ServerConfig) -> anyhow::Result<Arc<Self>> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;

        if config.openai_api_key.is_none() {
            warn!("OPENAI_API_KEY not set; generation requests go out unauthenticated");
        }
        if config.deepgram_api_key.is_none() {
            warn!("DEEPGRAM_API_KEY not set; synthesis requests go out unauthenticated");
        }

        let prompts = Arc::new(PromptStore::new(
            config.initial_prompt_config(),
            config.remote_config_url.clone(),
            http.clone(),
        ));

        let generator = ChatCompletionClient::new(
            http.clone(),
            LlmConfig {
                api_key: config.openai_api_key.clone(),
                base_url: config.generation_base_url.clone(),
                timeout: config.generation_timeout(),
            },
        )?;

        let synthesizer = DeepgramSynthesizer::new(
            http,
            SynthesizerConfig {
                api_key: config.deepgram_api_key.clone(),
                base_url: config.synthesis_base_url.clone(),
                model: config.synthesis_model.clone(),
                timeout: config.synthesis_timeout(),
            },
        )?;

        let orchestrator = Orchestrator::new(
            Arc::new(generator),
            Arc::new(synthesizer),
            Arc::clone(&prompts),
        );

        Ok(Arc::new(Self {
            config,
            orchestrator,
            prompts,
        }))
    }
}
