//! Voice WebSocket message types and the binary audio frame layout.
//!
//! Text frames carry tagged JSON in both directions. Audio travels as
//! binary frames with a fixed 16-byte header (generation then sequence,
//! both little-endian u64) so chunks stay attributable to their run even
//! when responses interleave across an interruption.

use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};

use crate::core::orchestrator::ResponseOutcome;

/// Maximum allowed size for a transcript message (50 KB)
pub const MAX_TRANSCRIPT_SIZE: usize = 50 * 1024;

/// Length of the binary audio frame header.
pub const AUDIO_FRAME_HEADER_LEN: usize = 16;

// =============================================================================
// Incoming Messages (Client -> Server)
// =============================================================================

/// Incoming WebSocket messages from client
#[derive(Debug, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum IncomingMessage {
    /// An accepted transcript; starts a pipeline run.
    #[serde(rename = "message")]
    Message {
        /// Final transcript text
        text: String,
    },
}

impl IncomingMessage {
    /// Validates message field sizes to prevent resource exhaustion.
    pub fn validate_size(&self) -> Result<(), String> {
        match self {
            Self::Message { text } => {
                if text.len() > MAX_TRANSCRIPT_SIZE {
                    return Err(format!(
                        "Transcript too large: {} bytes (max: {} bytes)",
                        text.len(),
                        MAX_TRANSCRIPT_SIZE
                    ));
                }
            }
        }
        Ok(())
    }
}

// =============================================================================
// Outgoing Messages (Server -> Client)
// =============================================================================

/// Outgoing WebSocket messages to client
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OutgoingMessage {
    /// Generated text or a stage error, tagged by generation.
    #[serde(rename = "response")]
    Response {
        generation: u64,
        result: ResponseOutcome,
    },

    /// Protocol-level error (malformed or oversized frame).
    #[serde(rename = "error")]
    Error { message: String },
}

// =============================================================================
// Message Routing
// =============================================================================

/// Message routing for the per-connection sender task.
pub enum MessageRoute {
    /// JSON text message
    Outgoing(OutgoingMessage),
    /// Binary audio frame
    Audio(Bytes),
    /// Close connection
    Close,
}

// =============================================================================
// Audio framing
// =============================================================================

/// Encode one audio chunk as a binary frame: `[generation u64 LE][sequence
/// u64 LE][payload]`.
pub fn encode_audio_frame(generation: u64, sequence: u64, payload: &Bytes) -> Bytes {
    let mut frame = BytesMut::with_capacity(AUDIO_FRAME_HEADER_LEN + payload.len());
    frame.put_u64_le(generation);
    frame.put_u64_le(sequence);
    frame.extend_from_slice(payload);
    frame.freeze()
}

/// Decode a binary audio frame. Returns `None` for frames shorter than the
/// header.
pub fn decode_audio_frame(frame: &[u8]) -> Option<(u64, u64, Bytes)> {
    if frame.len() < AUDIO_FRAME_HEADER_LEN {
        return None;
    }
    let generation = u64::from_le_bytes(frame[0..8].try_into().ok()?);
    let sequence = u64::from_le_bytes(frame[8..16].try_into().ok()?);
    Some((
        generation,
        sequence,
        Bytes::copy_from_slice(&frame[AUDIO_FRAME_HEADER_LEN..]),
    ))
}
