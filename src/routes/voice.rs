//! Voice WebSocket route configuration.

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::voice::voice_ws_handler;
use crate::state::AppState;
use std::sync::Arc;

/// Create the voice WebSocket router
///
/// # Endpoint
///
/// `GET /voice` - WebSocket upgrade for the streaming voice-response pipeline
///
/// # Protocol
///
/// After WebSocket upgrade, clients send:
/// 1. `{"type": "message", "text": "<transcript>"}` per accepted utterance
///
/// Server responds with:
/// - `{"type": "response", "generation": n, "result": {...}}` carrying the
///   generated text, or a fixed error message for a failed stage
/// - Binary audio frames: a 16-byte header (generation and sequence, both
///   little-endian u64) followed by one audio chunk, in sequence order
///
/// A new `message` supersedes the in-flight run; its remaining audio is
/// dropped server-side, and the generation header lets the client drop
/// anything already in transit.
pub fn create_voice_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/voice", get(voice_ws_handler))
        .layer(TraceLayer::new_for_http())
}
