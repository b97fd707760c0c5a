//! # Silence Detection Engine
//!
//! Turns a media file into the list of time ranges worth keeping.
//!
//! ## Overview
//!
//! This crate handles:
//! - Decoding the first audio channel of a file, either whole or streamed
//! - Reducing decoded audio to a fixed-resolution RMS volume timeline
//! - Segmenting the timeline into padded, merged keep segments
//! - Choosing between the two decode paths and falling back when one fails
//! - Symphonia-backed collaborators (optional, feature-gated)

pub mod config;
pub mod engine;
pub mod error;
pub mod ingest;
pub mod isobmff;
pub mod progress;
pub mod segmentation;
pub mod session;
pub mod source;
pub mod strategy;
pub mod timeline;
pub mod traits;
pub mod types;
pub mod whole;

#[cfg(feature = "symphonia-backend")]
pub mod decoder;

pub use config::EngineConfig;
pub use engine::SilenceEngine;
pub use error::{ProcessingError, Result};
pub use ingest::StreamingIngest;
pub use isobmff::IsoBmffParser;
pub use progress::ProgressReporter;
pub use segmentation::{detect_keep_segments, merge_overlapping};
pub use session::{DecodeSession, SessionStats};
pub use source::{LocalFile, MemorySource};
pub use strategy::{choose_strategy, sniff_container, Strategy, StrategySelector};
pub use timeline::{rms, rms_strided, TimelineOutput, WindowAccumulator};
pub use traits::{
    BackendCapabilities, CodecDecoder, CodecId, CodedChunk, ContainerKind, ContainerParser,
    DecodedAudio, DecodedBuffer, DecoderOutput, FeedOutcome, MediaBackend, MediaSource,
    ParserEvent, SampleLayout, TrackInfo, WholeBufferDecoder,
};
pub use types::{AnalysisSummary, AudioSegment, ProcessingSettings, VolumePoint, VolumeTimeline};
pub use whole::WholeBufferPipeline;

pub use core_async::CancellationToken;
