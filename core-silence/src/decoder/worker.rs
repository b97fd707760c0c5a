//! # Streaming Codec Worker
//!
//! [`SymphoniaCodecDecoder`] decodes coded chunks on a dedicated thread so
//! the async ingest loop never blocks on codec work.
//!
//! ```text
//!  submit() ──CodedChunk──▶ [input channel] ──▶ worker thread ──▶ DecoderOutput
//!     │                                              │
//!     └── pending += 1                 pending -= 1 ─┴─▶ Notify
//! ```
//!
//! Output for a chunk is always sent before its pending slot is released, so
//! a zero pending count means every buffer is already in the output channel.

use crate::decoder::format_detector::FormatDetector;
use crate::decoder::sample_converter::SampleConverter;
use crate::error::{ProcessingError, Result};
use crate::traits::{
    CodecDecoder, CodedChunk, DecodedBuffer, DecoderOutput, DecoderOutputSender, SampleLayout,
    TrackInfo,
};
use async_trait::async_trait;
use core_async::sync::{mpsc, Notify};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use symphonia::core::audio::Channels;
use symphonia::core::codecs::{CodecParameters, Decoder, DecoderOptions};
use symphonia::core::formats::Packet;
use symphonia::core::units::TimeBase;
use tracing::{debug, error, info, warn};

#[derive(Debug, Default)]
struct WorkerShared {
    pending: usize,
    closed: bool,
    stopped: bool,
}

/// Streaming decoder backed by a Symphonia codec on a worker thread.
pub struct SymphoniaCodecDecoder {
    shared: Arc<Mutex<WorkerShared>>,
    notify: Arc<Notify>,
    input: Option<mpsc::UnboundedSender<CodedChunk>>,
}

impl Default for SymphoniaCodecDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl SymphoniaCodecDecoder {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Mutex::new(WorkerShared::default())),
            notify: Arc::new(Notify::new()),
            input: None,
        }
    }

    fn codec_parameters(track: &TrackInfo) -> Result<CodecParameters> {
        let codec_type = FormatDetector::codec_type(&track.codec).ok_or_else(|| {
            ProcessingError::UnsupportedCodec(format!("No decoder for {:?}", track.codec))
        })?;

        let mut params = CodecParameters::new();
        params
            .for_codec(codec_type)
            .with_sample_rate(track.sample_rate)
            .with_time_base(TimeBase::new(1, track.timescale.max(1)));
        if track.channels > 0 && track.channels <= 32 {
            let mask = if track.channels == 32 {
                u32::MAX
            } else {
                (1u32 << track.channels) - 1
            };
            params.with_channels(Channels::from_bits_truncate(mask));
        }
        if let Some(extra) = &track.codec_private {
            params.with_extra_data(extra.to_vec().into_boxed_slice());
        }
        Ok(params)
    }
}

#[async_trait]
impl CodecDecoder for SymphoniaCodecDecoder {
    fn configure(&mut self, track: &TrackInfo, output: DecoderOutputSender) -> Result<()> {
        if self.input.is_some() {
            return Err(ProcessingError::Internal(
                "Decoder configured twice".to_string(),
            ));
        }

        let params = Self::codec_parameters(track)?;
        let decoder = symphonia::default::get_codecs()
            .make(&params, &DecoderOptions::default())
            .map_err(|e| {
                error!("Failed to create decoder: {}", e);
                ProcessingError::UnsupportedCodec(format!("Failed to create codec decoder: {}", e))
            })?;

        let (tx, rx) = mpsc::unbounded_channel();
        let worker = Worker {
            decoder,
            input: rx,
            output,
            shared: Arc::clone(&self.shared),
            notify: Arc::clone(&self.notify),
            fallback_rate: track.sample_rate,
        };
        std::thread::Builder::new()
            .name("silence-decode".to_string())
            .spawn(move || worker.run())
            .map_err(|e| ProcessingError::Internal(format!("Failed to spawn decode worker: {}", e)))?;

        info!(codec = ?track.codec, sample_rate = track.sample_rate, "Codec worker started");
        self.input = Some(tx);
        Ok(())
    }

    fn submit(&mut self, chunk: CodedChunk) -> Result<()> {
        let input = self.input.as_ref().ok_or_else(|| {
            ProcessingError::Internal("Chunk submitted before configure".to_string())
        })?;

        {
            let mut shared = self.shared.lock();
            if shared.closed || shared.stopped {
                return Err(ProcessingError::DecodeFailure(
                    "Decode worker is no longer running".to_string(),
                ));
            }
            shared.pending += 1;
        }

        if input.send(chunk).is_err() {
            let mut shared = self.shared.lock();
            shared.pending = shared.pending.saturating_sub(1);
            return Err(ProcessingError::DecodeFailure(
                "Decode worker stopped unexpectedly".to_string(),
            ));
        }
        Ok(())
    }

    fn pending_count(&self) -> usize {
        self.shared.lock().pending
    }

    async fn flush(&mut self) -> Result<()> {
        loop {
            {
                let shared = self.shared.lock();
                if shared.pending == 0 {
                    return Ok(());
                }
                if shared.stopped {
                    return Err(ProcessingError::DecodeFailure(
                        "Decode worker exited with chunks pending".to_string(),
                    ));
                }
            }
            self.notify.notified().await;
        }
    }

    fn close(&mut self) {
        self.shared.lock().closed = true;
        if self.input.take().is_some() {
            debug!("Codec worker input closed");
        }
    }
}

impl Drop for SymphoniaCodecDecoder {
    fn drop(&mut self) {
        self.close();
    }
}

struct Worker {
    decoder: Box<dyn Decoder>,
    input: mpsc::UnboundedReceiver<CodedChunk>,
    output: DecoderOutputSender,
    shared: Arc<Mutex<WorkerShared>>,
    notify: Arc<Notify>,
    fallback_rate: u32,
}

impl Worker {
    fn run(mut self) {
        let mut decoded = 0u64;
        while let Some(chunk) = self.input.blocking_recv() {
            let message = self.decode(&chunk);
            let failed = matches!(message, DecoderOutput::Error(_));
            // The receiver may be gone after a failed run; pending still drains.
            let _ = self.output.send(message);
            decoded += 1;

            {
                let mut shared = self.shared.lock();
                shared.pending = shared.pending.saturating_sub(1);
            }
            self.notify.notify_one();

            if failed {
                break;
            }
        }

        {
            let mut shared = self.shared.lock();
            shared.stopped = true;
            shared.pending = 0;
        }
        self.notify.notify_one();
        debug!(decoded, "Codec worker exited");
    }

    fn decode(&mut self, chunk: &CodedChunk) -> DecoderOutput {
        let packet = Packet::new_from_slice(
            chunk.track_id,
            chunk.timestamp,
            u64::from(chunk.duration),
            &chunk.data,
        );

        match self.decoder.decode(&packet) {
            Ok(buffer) => {
                let spec = *buffer.spec();
                let sample_rate = if spec.rate > 0 {
                    spec.rate
                } else {
                    self.fallback_rate
                };
                let frames = buffer.frames();
                let duration = if sample_rate > 0 {
                    Duration::from_secs_f64(frames as f64 / sample_rate as f64)
                } else {
                    Duration::ZERO
                };
                DecoderOutput::Buffer(DecodedBuffer {
                    timestamp: Duration::from_secs_f64(chunk.timestamp_secs()),
                    duration,
                    sample_rate,
                    channels: spec.channels.count() as u16,
                    layout: SampleLayout::Planar,
                    samples: SampleConverter::to_planar_f32(&buffer),
                })
            }
            Err(e) => {
                warn!(timestamp = chunk.timestamp, "Chunk decode failed: {}", e);
                DecoderOutput::Error(format!(
                    "Failed to decode chunk at {:.3}s: {}",
                    chunk.timestamp_secs(),
                    e
                ))
            }
        }
    }
}
