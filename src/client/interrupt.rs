//! Barge-in: interrupting an in-progress response by speaking again.
//!
//! Driven by a local UI event (recognition start), not a server message, so
//! it fires even if the network is still delivering the old response. The
//! server independently drops stale work via its own generation check; both
//! layers together make interruption correct even when one signal is late.

use bytes::Bytes;

use super::playback::{EnqueueOutcome, PlaybackBuffer};

/// Watches for a new utterance and retires the current response the moment
/// one starts.
pub struct InterruptionController {
    playback: PlaybackBuffer,
}

impl InterruptionController {
    pub fn new(playback: PlaybackBuffer) -> Self {
        Self { playback }
    }

    /// The user started speaking, or a new transcript is about to be sent,
    /// whichever comes first. Stops playback hard and raises the watermark
    /// to the generation the server will assign next, so anything still in
    /// flight from the old generation is dropped on arrival.
    ///
    /// Returns the new watermark.
    pub fn on_new_utterance_start(&mut self) -> u64 {
        let next = self.playback.watermark() + 1;
        self.playback.on_generation_superseded(next);
        next
    }

    /// Forward a received audio chunk to the playback buffer.
    pub fn on_chunk_received(
        &mut self,
        generation: u64,
        sequence: u64,
        bytes: Bytes,
    ) -> EnqueueOutcome {
        self.playback.on_chunk_received(generation, sequence, bytes)
    }

    pub fn playback(&self) -> &PlaybackBuffer {
        &self.playback
    }

    pub fn playback_mut(&mut self) -> &mut PlaybackBuffer {
        &mut self.playback
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use crate::client::playback::{AudioOutput, DecodeError, PlaybackState};

    use super::*;

    #[derive(Clone, Default)]
    struct MockOutput {
        appends: Arc<Mutex<usize>>,
        stops: Arc<Mutex<usize>>,
    }

    impl AudioOutput for MockOutput {
        fn begin_append(&mut self, _bytes: &[u8]) -> Result<(), DecodeError> {
            *self.appends.lock() += 1;
            Ok(())
        }

        fn stop(&mut self) {
            *self.stops.lock() += 1;
        }
    }

    fn controller() -> (InterruptionController, MockOutput) {
        let output = MockOutput::default();
        let buffer = PlaybackBuffer::new(Box::new(output.clone()));
        (InterruptionController::new(buffer), output)
    }

    #[test]
    fn test_interruption_raises_watermark_past_current() {
        let (mut ctrl, _out) = controller();
        ctrl.on_chunk_received(1, 0, Bytes::from_static(b"aa"));

        let watermark = ctrl.on_new_utterance_start();
        assert_eq!(watermark, 2);
        assert_eq!(ctrl.playback().watermark(), 2);
    }

    #[test]
    fn test_interruption_stops_playback_and_drops_late_chunks() {
        let (mut ctrl, out) = controller();
        ctrl.on_chunk_received(1, 0, Bytes::from_static(b"aa"));
        ctrl.on_chunk_received(1, 1, Bytes::from_static(b"bb"));
        ctrl.playback_mut().on_append_complete();
        assert_eq!(ctrl.playback().state(), PlaybackState::Playing);

        ctrl.on_new_utterance_start();
        assert_eq!(*out.stops.lock(), 1);
        assert_eq!(ctrl.playback().state(), PlaybackState::Idle);
        assert_eq!(ctrl.playback().queued_chunks(), 0);

        // Old-generation audio still in network transit arrives late.
        assert_eq!(
            ctrl.on_chunk_received(1, 2, Bytes::from_static(b"cc")),
            EnqueueOutcome::Stale
        );

        // The next generation plays normally.
        assert_eq!(
            ctrl.on_chunk_received(2, 0, Bytes::from_static(b"dd")),
            EnqueueOutcome::Queued
        );
    }

    #[test]
    fn test_interruption_before_any_audio_accepts_first_generation() {
        let (mut ctrl, _out) = controller();
        let watermark = ctrl.on_new_utterance_start();
        assert_eq!(watermark, 1);
        assert_eq!(
            ctrl.on_chunk_received(1, 0, Bytes::from_static(b"aa")),
            EnqueueOutcome::Queued
        );
    }
}
