//! REST handlers: health check and prompt-configuration reload.

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode};
use serde_json::{Value, json};
use tracing::warn;

use crate::config::remote::RemoteConfigError;
use crate::state::AppState;

/// Health check endpoint.
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "OK",
        "service": "talkback-gateway",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Fetch the remote prompt/model configuration and swap it in.
///
/// In-flight runs keep the snapshot they captured at accept time; only
/// runs accepted after the swap see the new values.
pub async fn reload_prompt_config(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<Value>) {
    match state.prompts.reload().await {
        Ok(config) => (
            StatusCode::OK,
            Json(json!({
                "status": "reloaded",
                "prompt": config.prompt,
                "model": config.model,
            })),
        ),
        Err(RemoteConfigError::NotConfigured) => (
            StatusCode::CONFLICT,
            Json(json!({ "error": "no remote configuration URL is configured" })),
        ),
        Err(e) => {
            warn!("Prompt configuration reload failed: {}", e);
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "error": e.to_string() })),
            )
        }
    }
}
