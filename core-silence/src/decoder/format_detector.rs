//! # Format Detection Module
//!
//! Probe hints for Symphonia and the mapping between the parser's codec
//! identifiers and Symphonia codec types.

use crate::traits::CodecId;
use std::path::Path;
use symphonia::core::codecs::{
    CodecType, CODEC_TYPE_AAC, CODEC_TYPE_ALAC, CODEC_TYPE_FLAC, CODEC_TYPE_MP3, CODEC_TYPE_OPUS,
};
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

pub struct FormatDetector;

impl FormatDetector {
    /// Create a probe hint from a file name and an optional MIME type.
    ///
    /// The extension steers Symphonia's probe towards the right demuxer,
    /// which matters for formats without a strong magic number (raw ADTS,
    /// MP3 without ID3). The MIME type covers uploads without an extension.
    ///
    /// # Example
    ///
    /// ```rust
    /// use core_silence::decoder::FormatDetector;
    ///
    /// let hint = FormatDetector::probe_hint("upload", Some("audio/mp4"));
    /// ```
    pub fn probe_hint(name: &str, mime_type: Option<&str>) -> Hint {
        let mut hint = Hint::new();

        match Self::file_extension(name) {
            Some(extension) => {
                debug!("Setting probe hint extension: {}", extension);
                hint.with_extension(extension);
            }
            None => debug!("No file extension found"),
        }
        if let Some(mime_type) = mime_type {
            debug!("Setting probe hint MIME type: {}", mime_type);
            hint.mime_type(mime_type);
        }

        hint
    }

    /// Extension of `name`, if it has one.
    pub fn file_extension(name: &str) -> Option<&str> {
        Path::new(name).extension().and_then(|ext| ext.to_str())
    }

    /// Symphonia codec type for a parser codec identifier.
    ///
    /// Returns `None` for codecs that have no Symphonia equivalent.
    pub fn codec_type(codec: &CodecId) -> Option<CodecType> {
        match codec {
            CodecId::Aac => Some(CODEC_TYPE_AAC),
            CodecId::Mp3 => Some(CODEC_TYPE_MP3),
            CodecId::Alac => Some(CODEC_TYPE_ALAC),
            CodecId::Flac => Some(CODEC_TYPE_FLAC),
            CodecId::Opus => Some(CODEC_TYPE_OPUS),
            CodecId::Other(name) => {
                warn!("No decoder mapping for codec: {}", name);
                None
            }
        }
    }

    /// Parser codec identifier for a Symphonia codec type.
    pub fn codec_id(codec_type: CodecType) -> CodecId {
        if codec_type == CODEC_TYPE_AAC {
            CodecId::Aac
        } else if codec_type == CODEC_TYPE_MP3 {
            CodecId::Mp3
        } else if codec_type == CODEC_TYPE_ALAC {
            CodecId::Alac
        } else if codec_type == CODEC_TYPE_FLAC {
            CodecId::Flac
        } else if codec_type == CODEC_TYPE_OPUS {
            CodecId::Opus
        } else {
            CodecId::Other(format!("{}", codec_type))
        }
    }
}
