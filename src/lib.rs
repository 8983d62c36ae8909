pub mod client;
pub mod config;
pub mod core;
pub mod errors;
pub mod handlers;
pub mod routes;
pub mod state;

// Re-export commonly used items for convenience
pub use config::ServerConfig;
pub use core::*;
pub use errors::{GENERATION_ERROR_MESSAGE, PipelineError, SYNTHESIS_ERROR_MESSAGE};
pub use state::AppState;
