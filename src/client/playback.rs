//! Ordered playback buffering with a single-consumer decode loop.
//!
//! Chunks are queued in receipt order. The transport is contracted to be
//! ordered and reliable, so receipt order equals sequence order and the
//! buffer never reorders. A generation watermark guards against stale data:
//! chunks from an older generation are dropped on arrival, idempotently.
//!
//! The decode/append loop is single-consumer: the downstream audio output
//! accepts strictly sequential appends, so at most one decode is in flight.
//! The buffer issues `begin_append` and waits for `on_append_complete`
//! before dequeuing the next chunk. A chunk that fails to decode is dropped
//! and the loop moves on; one corrupt chunk never halts the stream.

use std::collections::VecDeque;

use bytes::Bytes;
use thiserror::Error;
use tracing::{debug, warn};

/// Default bound on the chunk queue. Chunks past this are rejected so an
/// embedding client can apply application-level backpressure upstream.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// A chunk the output could not decode or append.
#[derive(Debug, Error)]
#[error("undecodable chunk: {0}")]
pub struct DecodeError(pub String);

/// The continuous audio output fed by the buffer.
///
/// `begin_append` starts decoding one chunk and scheduling it after the
/// audio already appended, without gaps or re-initialization. The buffer
/// never issues a second `begin_append` before being told the first
/// completed. A synchronous `Err` marks the chunk undecodable.
pub trait AudioOutput: Send {
    fn begin_append(&mut self, bytes: &[u8]) -> Result<(), DecodeError>;

    /// Hard stop: silence immediately and discard anything scheduled.
    fn stop(&mut self);
}

/// Playback loop states, per generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    /// Nothing queued, output silent.
    Idle,
    /// First chunk of the generation is decoding; playback not started.
    Decoding,
    /// Output is sounding and more chunks are queued or in decode.
    Playing,
    /// Every received chunk was handed to the output; waiting for it to
    /// finish sounding. Returns to `Idle`.
    Draining,
}

/// Outcome of offering a chunk to the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// Accepted at the tail of the queue.
    Queued,
    /// Dropped: the chunk's generation is below the watermark.
    Stale,
    /// Dropped: the queue is full. Sustained decode lag; the server side
    /// should be throttled.
    Rejected,
}

#[derive(Debug)]
struct QueuedChunk {
    sequence: u64,
    bytes: Bytes,
}

/// Ordered chunk queue plus the single-consumer decode/append loop.
pub struct PlaybackBuffer {
    output: Box<dyn AudioOutput>,
    queue: VecDeque<QueuedChunk>,
    capacity: usize,
    /// Lowest generation still considered valid for enqueue.
    watermark: u64,
    /// At most one decode/append outstanding.
    decoder_busy: bool,
    state: PlaybackState,
    /// Chunks handed to the output in the current generation.
    appended: u64,
    decode_failures: u64,
}

impl PlaybackBuffer {
    pub fn new(output: Box<dyn AudioOutput>) -> Self {
        Self::with_capacity(output, DEFAULT_QUEUE_CAPACITY)
    }

    pub fn with_capacity(output: Box<dyn AudioOutput>, capacity: usize) -> Self {
        Self {
            output,
            queue: VecDeque::new(),
            capacity,
            watermark: 0,
            decoder_busy: false,
            state: PlaybackState::Idle,
            appended: 0,
            decode_failures: 0,
        }
    }

    /// Offer a received chunk.
    ///
    /// A chunk below the watermark is a no-op: late-arriving data from an
    /// already-superseded generation. A chunk *above* the watermark implies
    /// the old generation was superseded server-side even if the local
    /// interruption signal never fired, so the buffer advances and clears
    /// before enqueuing.
    pub fn on_chunk_received(
        &mut self,
        generation: u64,
        sequence: u64,
        bytes: Bytes,
    ) -> EnqueueOutcome {
        if generation < self.watermark {
            debug!(generation, sequence, watermark = self.watermark, "Dropping stale chunk");
            return EnqueueOutcome::Stale;
        }
        if generation > self.watermark {
            self.advance_to(generation);
        }
        if self.queue.len() >= self.capacity {
            warn!(
                generation,
                sequence,
                capacity = self.capacity,
                "Playback queue full, rejecting chunk"
            );
            return EnqueueOutcome::Rejected;
        }

        self.queue.push_back(QueuedChunk { sequence, bytes });
        if !self.decoder_busy {
            self.start_next_decode();
        }
        EnqueueOutcome::Queued
    }

    /// The output finished decoding and scheduling the in-flight chunk.
    pub fn on_append_complete(&mut self) {
        if !self.decoder_busy {
            // Completion for a chunk discarded by a supersede; ignore.
            return;
        }
        self.decoder_busy = false;
        self.appended += 1;
        self.state = PlaybackState::Playing;
        self.start_next_decode();
    }

    /// The output ran out of scheduled audio.
    pub fn on_output_drained(&mut self) {
        if self.state == PlaybackState::Draining && !self.decoder_busy && self.queue.is_empty() {
            self.state = PlaybackState::Idle;
            self.appended = 0;
        }
    }

    /// Raise the watermark: stop playback hard, discard everything queued
    /// or in decode, and go idle. Chunks below the new watermark are
    /// dropped on arrival from now on.
    pub fn on_generation_superseded(&mut self, new_generation: u64) {
        if new_generation <= self.watermark {
            return;
        }
        self.advance_to(new_generation);
    }

    fn advance_to(&mut self, generation: u64) {
        debug!(from = self.watermark, to = generation, "Raising generation watermark");
        self.watermark = generation;
        self.queue.clear();
        self.decoder_busy = false;
        self.appended = 0;
        self.output.stop();
        self.state = PlaybackState::Idle;
    }

    fn start_next_decode(&mut self) {
        loop {
            let Some(chunk) = self.queue.pop_front() else {
                self.state = if self.appended > 0 {
                    PlaybackState::Draining
                } else {
                    PlaybackState::Idle
                };
                return;
            };
            match self.output.begin_append(&chunk.bytes) {
                Ok(()) => {
                    self.decoder_busy = true;
                    if self.appended == 0 {
                        self.state = PlaybackState::Decoding;
                    }
                    return;
                }
                Err(e) => {
                    // Drop this chunk, keep the stream going.
                    self.decode_failures += 1;
                    warn!(sequence = chunk.sequence, error = %e, "Dropping undecodable chunk");
                }
            }
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn watermark(&self) -> u64 {
        self.watermark
    }

    pub fn queued_chunks(&self) -> usize {
        self.queue.len()
    }

    pub fn queued_bytes(&self) -> usize {
        self.queue.iter().map(|c| c.bytes.len()).sum()
    }

    pub fn is_decoder_busy(&self) -> bool {
        self.decoder_busy
    }

    pub fn decode_failures(&self) -> u64 {
        self.decode_failures
    }
}

impl std::fmt::Debug for PlaybackBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackBuffer")
            .field("state", &self.state)
            .field("watermark", &self.watermark)
            .field("queued", &self.queue.len())
            .field("decoder_busy", &self.decoder_busy)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;

    /// Records appends and stops; fails to decode any chunk whose first
    /// byte is 0xFF.
    #[derive(Clone, Default)]
    struct MockOutput {
        appends: Arc<Mutex<Vec<Vec<u8>>>>,
        stops: Arc<Mutex<usize>>,
    }

    impl AudioOutput for MockOutput {
        fn begin_append(&mut self, bytes: &[u8]) -> Result<(), DecodeError> {
            if bytes.first() == Some(&0xFF) {
                return Err(DecodeError("bad frame".to_string()));
            }
            self.appends.lock().push(bytes.to_vec());
            Ok(())
        }

        fn stop(&mut self) {
            *self.stops.lock() += 1;
        }
    }

    fn buffer() -> (PlaybackBuffer, MockOutput) {
        let output = MockOutput::default();
        (PlaybackBuffer::new(Box::new(output.clone())), output)
    }

    #[test]
    fn test_chunks_append_in_receipt_order() {
        let (mut buf, out) = buffer();

        assert_eq!(
            buf.on_chunk_received(1, 0, Bytes::from_static(b"aa")),
            EnqueueOutcome::Queued
        );
        assert_eq!(buf.state(), PlaybackState::Decoding);

        buf.on_chunk_received(1, 1, Bytes::from_static(b"bb"));
        buf.on_chunk_received(1, 2, Bytes::from_static(b"cc"));

        buf.on_append_complete();
        assert_eq!(buf.state(), PlaybackState::Playing);
        buf.on_append_complete();
        buf.on_append_complete();

        let appends = out.appends.lock();
        assert_eq!(appends.as_slice(), [b"aa".to_vec(), b"bb".to_vec(), b"cc".to_vec()]);
    }

    #[test]
    fn test_state_walk_through_draining_to_idle() {
        let (mut buf, _out) = buffer();
        assert_eq!(buf.state(), PlaybackState::Idle);

        buf.on_chunk_received(1, 0, Bytes::from_static(b"aa"));
        assert_eq!(buf.state(), PlaybackState::Decoding);
        assert!(buf.is_decoder_busy());

        buf.on_append_complete();
        // Everything received is with the output now.
        assert_eq!(buf.state(), PlaybackState::Draining);

        buf.on_output_drained();
        assert_eq!(buf.state(), PlaybackState::Idle);
    }

    #[test]
    fn test_stale_chunk_is_an_idempotent_no_op() {
        let (mut buf, out) = buffer();
        buf.on_generation_superseded(2);

        let state_before = buf.state();
        let queued_before = buf.queued_chunks();
        for _ in 0..3 {
            assert_eq!(
                buf.on_chunk_received(1, 0, Bytes::from_static(b"old")),
                EnqueueOutcome::Stale
            );
            assert_eq!(buf.queued_chunks(), queued_before);
            assert_eq!(buf.state(), state_before);
        }
        assert!(out.appends.lock().is_empty());
    }

    #[test]
    fn test_single_undecodable_chunk_is_skipped() {
        let (mut buf, out) = buffer();

        buf.on_chunk_received(1, 0, Bytes::from_static(b"ok-0"));
        buf.on_chunk_received(1, 1, Bytes::from_static(b"\xFFbad"));
        buf.on_chunk_received(1, 2, Bytes::from_static(b"ok-2"));

        buf.on_append_complete(); // ok-0 done; bad dropped; ok-2 decoding
        buf.on_append_complete();

        assert_eq!(buf.decode_failures(), 1);
        let appends = out.appends.lock();
        assert_eq!(appends.as_slice(), [b"ok-0".to_vec(), b"ok-2".to_vec()]);
    }

    #[test]
    fn test_leading_undecodable_chunk_does_not_halt_stream() {
        let (mut buf, out) = buffer();

        // The bad chunk arrives first and is dropped synchronously; the
        // buffer must go on to decode the next one.
        buf.on_chunk_received(1, 0, Bytes::from_static(b"\xFFbad"));
        assert_eq!(buf.state(), PlaybackState::Idle);
        buf.on_chunk_received(1, 1, Bytes::from_static(b"good"));
        buf.on_append_complete();

        assert_eq!(buf.decode_failures(), 1);
        assert_eq!(out.appends.lock().as_slice(), [b"good".to_vec()]);
    }

    #[test]
    fn test_supersede_stops_output_and_clears_queue() {
        let (mut buf, out) = buffer();

        buf.on_chunk_received(1, 0, Bytes::from_static(b"aa"));
        buf.on_chunk_received(1, 1, Bytes::from_static(b"bb"));
        buf.on_append_complete();
        assert_eq!(buf.state(), PlaybackState::Playing);

        buf.on_generation_superseded(2);
        assert_eq!(buf.state(), PlaybackState::Idle);
        assert_eq!(buf.queued_chunks(), 0);
        assert!(!buf.is_decoder_busy());
        assert_eq!(*out.stops.lock(), 1);

        // A completion for the discarded in-flight chunk is ignored.
        buf.on_append_complete();
        assert_eq!(buf.state(), PlaybackState::Idle);
    }

    #[test]
    fn test_higher_generation_chunk_advances_watermark() {
        let (mut buf, out) = buffer();

        buf.on_chunk_received(1, 0, Bytes::from_static(b"old"));
        buf.on_chunk_received(1, 1, Bytes::from_static(b"old"));

        // Generation 2 audio arrives before any local interruption signal:
        // the old generation is gone server-side, so it is gone here too.
        assert_eq!(
            buf.on_chunk_received(2, 0, Bytes::from_static(b"new")),
            EnqueueOutcome::Queued
        );
        assert_eq!(buf.watermark(), 2);
        assert_eq!(*out.stops.lock(), 1);
        assert_eq!(buf.queued_chunks(), 0); // "new" went straight into decode
        buf.on_append_complete();
        assert_eq!(out.appends.lock().last().unwrap(), b"new");
    }

    #[test]
    fn test_full_queue_rejects_chunk() {
        let output = MockOutput::default();
        let mut buf = PlaybackBuffer::with_capacity(Box::new(output), 2);

        buf.on_chunk_received(1, 0, Bytes::from_static(b"a")); // into decode
        buf.on_chunk_received(1, 1, Bytes::from_static(b"b"));
        buf.on_chunk_received(1, 2, Bytes::from_static(b"c"));
        assert_eq!(buf.queued_chunks(), 2);

        assert_eq!(
            buf.on_chunk_received(1, 3, Bytes::from_static(b"d")),
            EnqueueOutcome::Rejected
        );
    }

    #[test]
    fn test_queued_bytes_tracks_pending_payload() {
        let (mut buf, _out) = buffer();
        buf.on_chunk_received(1, 0, Bytes::from(vec![0u8; 512])); // into decode
        buf.on_chunk_received(1, 1, Bytes::from(vec![0u8; 512]));
        buf.on_chunk_received(1, 2, Bytes::from(vec![0u8; 200]));
        assert_eq!(buf.queued_bytes(), 712);
    }
}
