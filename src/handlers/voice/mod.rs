//! Voice WebSocket: handler and wire message types.

pub mod handler;
pub mod messages;

pub use handler::voice_ws_handler;
pub use messages::{
    AUDIO_FRAME_HEADER_LEN, IncomingMessage, MessageRoute, OutgoingMessage, decode_audio_frame,
    encode_audio_frame,
};
