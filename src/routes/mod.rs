//! Router construction for REST and WebSocket endpoints.

pub mod api;
pub mod voice;
