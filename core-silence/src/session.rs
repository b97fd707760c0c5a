//! # Decode Session
//!
//! Wraps a [`CodecDecoder`] for one run. The session
//!
//! - configures the decoder with the parameters the container reported,
//! - keeps at most `max_queue_depth` chunks outstanding (callers suspend in
//!   [`DecodeSession::wait_for_capacity`] instead of submitting more),
//! - feeds every decoded buffer to the [`WindowAccumulator`] in arrival order,
//! - closes the decoder exactly once, on every exit path.

use crate::config::EngineConfig;
use crate::error::{ProcessingError, Result};
use crate::timeline::{TimelineOutput, WindowAccumulator};
use crate::traits::{
    CodecDecoder, CodedChunk, DecoderOutput, DecoderOutputReceiver, TrackInfo,
};
use core_async::sync::{mpsc, CancellationToken};
use core_async::time::{sleep, timeout, Duration, Instant};
use tracing::{debug, instrument, warn};

/// Counters recorded over the life of a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Chunks handed to the decoder.
    pub submitted: u64,
    /// Decoded buffers received.
    pub decoded: u64,
    /// Number of times a caller had to wait for queue capacity.
    pub backpressure_waits: u64,
    /// Highest decoder queue depth observed before a submit.
    pub peak_pending: usize,
}

pub struct DecodeSession {
    decoder: Box<dyn CodecDecoder>,
    output: Option<DecoderOutputReceiver>,
    accumulator: WindowAccumulator,
    max_queue_depth: usize,
    backpressure_poll: Duration,
    decode_timeout: Duration,
    stats: SessionStats,
    closed: bool,
}

impl DecodeSession {
    pub fn new(decoder: Box<dyn CodecDecoder>, config: &EngineConfig) -> Self {
        Self {
            decoder,
            output: None,
            accumulator: WindowAccumulator::new(config),
            max_queue_depth: config.max_queue_depth,
            backpressure_poll: config.backpressure_poll,
            decode_timeout: config.decode_timeout,
            stats: SessionStats::default(),
            closed: false,
        }
    }

    /// Configure the decoder for `track`. Must precede any submit.
    ///
    /// # Errors
    ///
    /// Any rejection is reported as [`ProcessingError::UnsupportedCodec`].
    pub fn configure(&mut self, track: &TrackInfo) -> Result<()> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.decoder.configure(track, tx).map_err(|e| match e {
            ProcessingError::UnsupportedCodec(_) => e,
            other => ProcessingError::UnsupportedCodec(other.to_string()),
        })?;
        self.output = Some(rx);

        debug!(
            codec = ?track.codec,
            sample_rate = track.sample_rate,
            channels = track.channels,
            "Decoder configured"
        );
        Ok(())
    }

    pub fn is_configured(&self) -> bool {
        self.output.is_some()
    }

    /// Submit one coded chunk.
    pub fn submit(&mut self, chunk: CodedChunk) -> Result<()> {
        if self.closed {
            return Err(ProcessingError::Internal("submit on closed decode session".to_string()));
        }
        if !self.is_configured() {
            return Err(ProcessingError::Internal(
                "submit before decoder configuration".to_string(),
            ));
        }

        self.drain()?;
        let pending = self.decoder.pending_count();
        self.stats.peak_pending = self.stats.peak_pending.max(pending);

        self.decoder.submit(chunk).map_err(|e| match e {
            ProcessingError::DecodeFailure(_) => e,
            other => ProcessingError::DecodeFailure(other.to_string()),
        })?;
        self.stats.submitted += 1;
        Ok(())
    }

    pub fn pending_count(&self) -> usize {
        self.decoder.pending_count()
    }

    pub fn is_at_capacity(&self) -> bool {
        self.pending_count() >= self.max_queue_depth
    }

    /// Suspend until the decoder queue is below `max_queue_depth`.
    ///
    /// Returns `true` if the caller actually had to wait. Fails with
    /// [`ProcessingError::Cancelled`] when `cancel` fires and with
    /// [`ProcessingError::DecodeFailure`] when the queue makes no progress
    /// within `decode_timeout`.
    pub async fn wait_for_capacity(&mut self, cancel: &CancellationToken) -> Result<bool> {
        self.drain()?;
        if !self.is_at_capacity() {
            return Ok(false);
        }

        self.stats.backpressure_waits += 1;
        self.stats.peak_pending = self.stats.peak_pending.max(self.pending_count());
        debug!(pending = self.pending_count(), "Decoder queue full, waiting");

        let mut last_progress = Instant::now();
        let mut last_pending = self.pending_count();
        while self.is_at_capacity() {
            tokio::select! {
                _ = cancel.cancelled() => return Err(ProcessingError::Cancelled),
                _ = sleep(self.backpressure_poll) => {}
            }
            self.drain()?;

            let pending = self.pending_count();
            if pending < last_pending {
                last_pending = pending;
                last_progress = Instant::now();
            } else if last_progress.elapsed() >= self.decode_timeout {
                return Err(ProcessingError::DecodeFailure(format!(
                    "decoder made no progress for {:?} with {} chunks queued",
                    self.decode_timeout, pending
                )));
            }
        }
        Ok(true)
    }

    /// Move every output delivered so far into the accumulator.
    ///
    /// A decoder error ends the run with [`ProcessingError::DecodeFailure`].
    pub fn drain(&mut self) -> Result<()> {
        let Some(output) = self.output.as_mut() else {
            return Ok(());
        };

        while let Ok(message) = output.try_recv() {
            match message {
                DecoderOutput::Buffer(buffer) => {
                    self.stats.decoded += 1;
                    self.accumulator.push(
                        buffer.timestamp.as_secs_f64(),
                        buffer.sample_rate,
                        buffer.first_channel(),
                    );
                }
                DecoderOutput::Error(message) => {
                    warn!(error = %message, "Decoder reported an error");
                    return Err(ProcessingError::DecodeFailure(message));
                }
            }
        }
        Ok(())
    }

    /// Drain buffered output and close the decoder.
    ///
    /// Safe to call more than once; only the first call does anything. The
    /// decoder is closed even when flushing fails.
    #[instrument(skip(self))]
    pub async fn flush_and_close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }

        let flushed = if self.is_configured() {
            match timeout(self.decode_timeout, self.decoder.flush()).await {
                Ok(result) => result,
                Err(_) => Err(ProcessingError::DecodeFailure(format!(
                    "decoder flush timed out after {:?}",
                    self.decode_timeout
                ))),
            }
        } else {
            Ok(())
        };
        let drained = self.drain();
        self.close();

        debug!(
            submitted = self.stats.submitted,
            decoded = self.stats.decoded,
            waits = self.stats.backpressure_waits,
            "Decode session closed"
        );

        flushed?;
        drained
    }

    /// Close the decoder without draining. Idempotent.
    pub fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.decoder.close();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Number of volume points produced so far.
    pub fn points_emitted(&self) -> usize {
        self.accumulator.len()
    }

    /// Hand over the accumulated timeline.
    pub fn take_timeline(&mut self) -> TimelineOutput {
        self.accumulator.finish()
    }
}

impl Drop for DecodeSession {
    fn drop(&mut self) {
        self.close();
    }
}
