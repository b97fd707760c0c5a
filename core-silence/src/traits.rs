//! # Collaborator Traits
//!
//! Abstractions for the pieces the engine coordinates but does not own the
//! algorithms of: the media source, the container parser, and the two codec
//! decoders (streaming and whole-buffer).
//!
//! ## Architecture
//!
//! ```text
//!  MediaSource ──bytes──▶ ContainerParser ──CodedChunk──▶ CodecDecoder
//!                                                              │
//!                                   DecoderOutput (mpsc) ◀─────┘
//! ```
//!
//! The parser is a plain push interface: each `feed` returns the events it
//! produced and the next file offset it wants. The codec decoder is
//! asynchronous: `submit` only queues work, decoded buffers arrive later
//! through the sender handed over in `configure`, and `pending_count` exposes
//! the queue depth used for backpressure.

use crate::error::Result;
use async_trait::async_trait;
use bytes::Bytes;
use core_async::sync::mpsc;
use serde::{Deserialize, Serialize};
use std::time::Duration;

// ============================================================================
// Container Types
// ============================================================================

/// Container families the engine distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerKind {
    /// ISO base media file format (MP4, M4A, MOV): self-contained and box
    /// structured, the only family the streaming path parses.
    IsoBmff,
    /// Anything else (WAV, MP3, Matroska, Ogg, ...).
    Other,
}

impl ContainerKind {
    /// Returns `true` if the streaming path can parse this container.
    pub fn is_streamable(&self) -> bool {
        matches!(self, ContainerKind::IsoBmff)
    }
}

/// Codec identifiers reported by the container parser.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodecId {
    /// Advanced Audio Coding (`mp4a`, object type 0x40/0x66-0x68)
    Aac,
    /// MPEG-1/2 Layer III carried in MP4 (`mp4a`, object type 0x69/0x6B)
    Mp3,
    /// Apple Lossless (`alac`)
    Alac,
    /// Free Lossless Audio Codec (`fLaC`)
    Flac,
    /// Opus (`Opus`)
    Opus,
    /// Sample entry the parser does not map, keyed by its four-character code
    Other(String),
}

/// Audio track description, available once the container's metadata has
/// been parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackInfo {
    pub track_id: u32,
    pub codec: CodecId,
    pub sample_rate: u32,
    pub channels: u16,
    /// Number of coded samples (access units) in the track.
    pub sample_count: u64,
    /// Media timescale (ticks per second) used by chunk timestamps.
    pub timescale: u32,
    /// Track duration, if the container reports it.
    pub duration: Option<Duration>,
    /// Codec private data (e.g. the AAC AudioSpecificConfig).
    pub codec_private: Option<Bytes>,
}

/// A unit of still-compressed audio extracted from the container.
#[derive(Debug, Clone, PartialEq)]
pub struct CodedChunk {
    pub track_id: u32,
    /// Decode timestamp in timescale ticks.
    pub timestamp: u64,
    /// Duration in timescale ticks.
    pub duration: u32,
    pub timescale: u32,
    pub is_key: bool,
    pub data: Bytes,
}

impl CodedChunk {
    /// Timestamp in seconds.
    pub fn timestamp_secs(&self) -> f64 {
        if self.timescale == 0 {
            return 0.0;
        }
        self.timestamp as f64 / self.timescale as f64
    }
}

/// Events produced by a [`ContainerParser`].
#[derive(Debug, Clone, PartialEq)]
pub enum ParserEvent {
    /// Track metadata is known. Fires once.
    TrackReady(TrackInfo),
    /// Metadata was parsed but it describes no audio track.
    NoAudioTrack,
    /// A batch of coded chunks, in decode order.
    Samples(Vec<CodedChunk>),
}

/// Result of feeding bytes to a parser.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeedOutcome {
    pub events: Vec<ParserEvent>,
    /// File offset the parser wants to receive next. Usually the end of the
    /// bytes just fed; differs when the parser skips or revisits a region.
    pub next_offset: u64,
    /// The parser has seen everything it needs; further input is ignored.
    pub finished: bool,
}

// ============================================================================
// Decoded Audio Data
// ============================================================================

/// Memory layout of decoded samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleLayout {
    /// `[L0, R0, L1, R1, ...]`
    Interleaved,
    /// `[L0, L1, ..., R0, R1, ...]`
    Planar,
}

/// Decoded PCM output for one coded chunk. Samples are f32 in [-1.0, 1.0].
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedBuffer {
    /// Presentation timestamp of the first frame.
    pub timestamp: Duration,
    pub duration: Duration,
    pub sample_rate: u32,
    pub channels: u16,
    pub layout: SampleLayout,
    pub samples: Vec<f32>,
}

impl DecodedBuffer {
    /// Number of frames (samples per channel).
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / self.channels as usize
    }

    /// Samples of the first channel, whatever the layout.
    pub fn first_channel(&self) -> Box<dyn Iterator<Item = f32> + '_> {
        let channels = self.channels.max(1) as usize;
        match self.layout {
            SampleLayout::Interleaved => {
                Box::new(self.samples.iter().step_by(channels).copied())
            }
            SampleLayout::Planar => Box::new(self.samples[..self.frames()].iter().copied()),
        }
    }
}

/// Messages delivered by a [`CodecDecoder`] through its output channel.
#[derive(Debug, Clone, PartialEq)]
pub enum DecoderOutput {
    Buffer(DecodedBuffer),
    Error(String),
}

pub type DecoderOutputSender = mpsc::UnboundedSender<DecoderOutput>;
pub type DecoderOutputReceiver = mpsc::UnboundedReceiver<DecoderOutput>;

/// The whole decoded track, first channel only.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl DecodedAudio {
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

// ============================================================================
// Core Traits
// ============================================================================

/// A readable media file.
#[async_trait]
pub trait MediaSource: Send + Sync {
    /// Display name (file name without directories).
    fn name(&self) -> &str;

    /// Total size in bytes.
    fn size(&self) -> u64;

    /// MIME type, if the host knows it.
    fn mime_type(&self) -> Option<&str> {
        None
    }

    /// Read up to `len` bytes starting at `offset`. Returns fewer bytes at end
    /// of file and an empty buffer past it.
    async fn read_at(&self, offset: u64, len: usize) -> Result<Bytes>;

    /// Read the whole file into memory.
    async fn read_all(&self) -> Result<Bytes>;
}

/// Incremental container parser.
///
/// Implementations must tolerate bytes arriving in arbitrary slices and must
/// only ever look at data they were fed.
pub trait ContainerParser: Send {
    /// Feed `bytes` located at file offset `offset`.
    ///
    /// # Errors
    ///
    /// Returns an error when the container is malformed or not one this
    /// parser understands.
    fn feed(&mut self, offset: u64, bytes: &[u8]) -> Result<FeedOutcome>;

    /// Drop bookkeeping for `count` samples the caller has consumed.
    fn release_consumed(&mut self, count: usize);

    /// Signal end of input; returns any events still buffered.
    fn flush(&mut self) -> Result<Vec<ParserEvent>>;

    /// Release parser resources. Called exactly once per run.
    fn release(&mut self);
}

/// Asynchronous, queue-limited codec decoder.
#[async_trait]
pub trait CodecDecoder: Send {
    /// Configure for the given track. Must be called before `submit`.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessingError::UnsupportedCodec`](crate::ProcessingError::UnsupportedCodec)
    /// when the codec parameters are rejected.
    fn configure(&mut self, track: &TrackInfo, output: DecoderOutputSender) -> Result<()>;

    /// Queue one coded chunk for decoding.
    fn submit(&mut self, chunk: CodedChunk) -> Result<()>;

    /// Number of submitted chunks whose output has not been delivered yet.
    fn pending_count(&self) -> usize;

    /// Wait until every submitted chunk has produced its output.
    async fn flush(&mut self) -> Result<()>;

    /// Release decoder resources.
    fn close(&mut self);
}

/// Decoder for the whole-buffer path: decodes an in-memory file at once.
pub trait WholeBufferDecoder: Send + Sync {
    /// Decode every audio frame of the first audio track.
    ///
    /// `name_hint` is the file name and `mime_type` the host-reported type;
    /// both are used to guess the format.
    fn decode_all(
        &self,
        data: Bytes,
        name_hint: &str,
        mime_type: Option<&str>,
    ) -> Result<DecodedAudio>;
}

/// What a backend can do on this platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendCapabilities {
    /// A streaming-capable codec decoder is available.
    pub streaming_decoder: bool,
}

/// Factory for the collaborators of one run.
pub trait MediaBackend: Send + Sync {
    fn capabilities(&self) -> BackendCapabilities;

    /// A fresh parser for `container`.
    ///
    /// # Errors
    ///
    /// Returns [`ProcessingError::UnsupportedContainer`](crate::ProcessingError::UnsupportedContainer)
    /// when the backend has no parser for it.
    fn create_parser(&self, container: ContainerKind) -> Result<Box<dyn ContainerParser>>;

    /// A fresh streaming codec decoder.
    fn create_decoder(&self) -> Result<Box<dyn CodecDecoder>>;

    /// The whole-buffer decoder.
    fn whole_buffer_decoder(&self) -> std::sync::Arc<dyn WholeBufferDecoder>;
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(layout: SampleLayout, samples: Vec<f32>, channels: u16) -> DecodedBuffer {
        DecodedBuffer {
            timestamp: Duration::ZERO,
            duration: Duration::from_millis(10),
            sample_rate: 1000,
            channels,
            layout,
            samples,
        }
    }

    #[test]
    fn first_channel_interleaved() {
        let buf = buffer(SampleLayout::Interleaved, vec![0.1, -1.0, 0.2, -1.0, 0.3, -1.0], 2);
        assert_eq!(buf.frames(), 3);
        assert_eq!(buf.first_channel().collect::<Vec<_>>(), vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn first_channel_planar() {
        let buf = buffer(SampleLayout::Planar, vec![0.1, 0.2, 0.3, -1.0, -1.0, -1.0], 2);
        assert_eq!(buf.first_channel().collect::<Vec<_>>(), vec![0.1, 0.2, 0.3]);
    }

    #[test]
    fn coded_chunk_timestamp() {
        let chunk = CodedChunk {
            track_id: 1,
            timestamp: 44100,
            duration: 1024,
            timescale: 44100,
            is_key: true,
            data: Bytes::from_static(&[0u8; 4]),
        };
        assert!((chunk.timestamp_secs() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn container_streamability() {
        assert!(ContainerKind::IsoBmff.is_streamable());
        assert!(!ContainerKind::Other.is_streamable());
    }

    #[test]
    fn decoded_audio_duration() {
        let audio = DecodedAudio {
            samples: vec![0.0; 22050],
            sample_rate: 44100,
        };
        assert!((audio.duration_secs() - 0.5).abs() < 1e-12);
    }
}
