//! Hot-swappable prompt/model configuration.
//!
//! The system prompt and generation model can be replaced at runtime from a
//! remote JSON endpoint. Consistency rule: in-flight runs use the snapshot
//! captured when their transcript was accepted, never a value that changed
//! mid-run. `get()` hands out that snapshot; `reload()` swaps in a new one.

use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

/// The reloadable part of the pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PromptConfig {
    /// System instruction sent ahead of every transcript.
    pub prompt: String,
    /// Model identifier for the generation call.
    pub model: String,
}

/// Errors from a remote configuration refresh.
#[derive(Debug, Error)]
pub enum RemoteConfigError {
    #[error("no remote configuration URL is configured")]
    NotConfigured,

    #[error("HTTP error: {status}")]
    Http { status: u16 },

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Malformed configuration payload: {0}")]
    Malformed(String),
}

/// Process-wide prompt/model store with snapshot semantics.
pub struct PromptStore {
    current: ArcSwap<PromptConfig>,
    source_url: Option<String>,
    http: reqwest::Client,
}

impl PromptStore {
    pub fn new(initial: PromptConfig, source_url: Option<String>, http: reqwest::Client) -> Self {
        Self {
            current: ArcSwap::from_pointee(initial),
            source_url,
            http,
        }
    }

    /// Snapshot of the current configuration. Runs capture this once, at
    /// accept time.
    pub fn get(&self) -> Arc<PromptConfig> {
        self.current.load_full()
    }

    /// Replace the configuration in place.
    pub fn set(&self, config: PromptConfig) {
        self.current.store(Arc::new(config));
    }

    /// Fetch the remote configuration and swap it in. Not on the pipeline
    /// hot path; triggered on demand via the reload route.
    pub async fn reload(&self) -> Result<Arc<PromptConfig>, RemoteConfigError> {
        let url = self
            .source_url
            .as_deref()
            .ok_or(RemoteConfigError::NotConfigured)?;

        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RemoteConfigError::Http {
                status: status.as_u16(),
            });
        }

        let config: PromptConfig = response
            .json()
            .await
            .map_err(|e| RemoteConfigError::Malformed(e.to_string()))?;

        info!(model = %config.model, "Prompt configuration reloaded");
        self.set(config);
        Ok(self.get())
    }
}

impl std::fmt::Debug for PromptStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptStore")
            .field("current", &self.current.load())
            .field("source_url", &self.source_url)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> PromptStore {
        PromptStore::new(
            PromptConfig {
                prompt: "Respond very briefly.".to_string(),
                model: "gpt-4".to_string(),
            },
            None,
            reqwest::Client::new(),
        )
    }

    #[test]
    fn test_get_returns_initial_snapshot() {
        let store = store();
        let snapshot = store.get();
        assert_eq!(snapshot.prompt, "Respond very briefly.");
        assert_eq!(snapshot.model, "gpt-4");
    }

    #[test]
    fn test_set_swaps_but_old_snapshots_survive() {
        let store = store();
        let before = store.get();

        store.set(PromptConfig {
            prompt: "New prompt.".to_string(),
            model: "gpt-4o".to_string(),
        });

        // The old snapshot is untouched; new readers see the new value.
        assert_eq!(before.model, "gpt-4");
        assert_eq!(store.get().model, "gpt-4o");
    }

    #[tokio::test]
    async fn test_reload_without_url_fails() {
        let store = store();
        let result = store.reload().await;
        assert!(matches!(result, Err(RemoteConfigError::NotConfigured)));
    }
}
