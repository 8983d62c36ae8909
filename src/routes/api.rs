use axum::{Router, routing::post};
use tower_http::trace::TraceLayer;

use crate::handlers::api;
use crate::state::AppState;
use std::sync::Arc;

/// Create the API router
///
/// # Endpoints
///
/// `POST /config/reload` - fetch the remote prompt/model configuration and
/// swap it in for runs accepted from now on
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/config/reload", post(api::reload_prompt_config))
        .layer(TraceLayer::new_for_http())
}
