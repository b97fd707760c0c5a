//! # Symphonia Backend
//!
//! Concrete collaborators built on the Symphonia library.
//!
//! ## Components
//!
//! | Type | Role | Used by |
//! |------|------|---------|
//! | [`SymphoniaBufferDecoder`] | Probes and decodes a whole in-memory file | whole-buffer path |
//! | [`SymphoniaCodecDecoder`] | Decodes coded chunks on a worker thread | streaming path |
//! | [`SymphoniaBackend`] | Hands out the above plus the ISO-BMFF parser | [`SilenceEngine`](crate::SilenceEngine) |
//!
//! ## Supported Codecs (streaming)
//!
//! | Codec | MP4 sample entry | Decoder private data |
//! |-------|------------------|----------------------|
//! | AAC | `mp4a` (0x40, 0x66-0x68) | AudioSpecificConfig from `esds` |
//! | MP3 | `mp4a` (0x69, 0x6B), `.mp3` | none |
//! | ALAC | `alac` | magic cookie |
//! | FLAC | `fLaC` | `dfLa` metadata blocks |
//!
//! Anything else is rejected at configuration time, which sends the run down
//! the whole-buffer path.
//!
//! ## Threading Model
//!
//! Whole-buffer decoding is synchronous and runs on the blocking pool. The
//! streaming decoder owns one named OS thread per run; chunks go in through a
//! channel and decoded buffers come back through the session's output
//! channel, so the async side never blocks on codec work.

mod backend;
mod format_detector;
mod sample_converter;
mod whole;
mod worker;

pub use backend::SymphoniaBackend;
pub use format_detector::FormatDetector;
pub use sample_converter::SampleConverter;
pub use whole::SymphoniaBufferDecoder;
pub use worker::SymphoniaCodecDecoder;
