//! Client-side consumer of the audio stream.
//!
//! These types run on the playback side of the connection: an ordered
//! buffer that drains chunks into a continuous audio output, and the
//! barge-in controller that discards a superseded response the instant the
//! user starts speaking again.

pub mod interrupt;
pub mod playback;

pub use interrupt::InterruptionController;
pub use playback::{AudioOutput, DecodeError, EnqueueOutcome, PlaybackBuffer, PlaybackState};
