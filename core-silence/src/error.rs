//! # Processing Error Types
//!
//! Every error carries two texts: the `Display` output is the diagnostic
//! cause (what a log line or bug report needs), while
//! [`ProcessingError::user_message`] is the sentence shown to the person who
//! picked the file.

use thiserror::Error;

/// Errors that can occur while turning a media file into keep segments.
#[derive(Error, Debug)]
pub enum ProcessingError {
    // ========================================================================
    // Format/Codec Errors
    // ========================================================================
    /// The container is not one the selected path can read.
    #[error("Unsupported container: {0}")]
    UnsupportedContainer(String),

    /// The container holds no audio track.
    #[error("No audio track found: {0}")]
    NoAudioTrack(String),

    /// The decoder rejected the track's codec configuration.
    #[error("Unsupported codec: {0}")]
    UnsupportedCodec(String),

    // ========================================================================
    // Decoding Errors
    // ========================================================================
    /// Decoding failed mid-stream.
    #[error("Decoding error: {0}")]
    DecodeFailure(String),

    /// The pipeline finished but produced no volume data.
    #[error("No audio data produced: {0}")]
    EmptyResult(String),

    // ========================================================================
    // Source Errors
    // ========================================================================
    /// File exceeds a size ceiling for the selected processing path.
    #[error("File too large: {size} bytes exceeds the {limit} byte limit")]
    FileTooLarge { size: u64, limit: u64 },

    /// Reading the source failed.
    #[error("I/O error: {0}")]
    IoReadFailure(#[from] std::io::Error),

    // ========================================================================
    // Run Control Errors
    // ========================================================================
    /// The run was cancelled through its cancellation token.
    #[error("Processing cancelled")]
    Cancelled,

    /// Caller-supplied settings or engine configuration are invalid.
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    /// Internal error (should not occur in normal operation).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ProcessingError {
    /// Message suitable for showing to the end user.
    pub fn user_message(&self) -> String {
        match self {
            ProcessingError::UnsupportedContainer(_) => {
                "This file format is not supported.".to_string()
            }
            ProcessingError::NoAudioTrack(_) => "The file does not contain an audio track.".to_string(),
            ProcessingError::UnsupportedCodec(_) => {
                "The audio codec of this file is not supported.".to_string()
            }
            ProcessingError::DecodeFailure(_) => {
                "The audio could not be decoded. The file may be damaged.".to_string()
            }
            ProcessingError::EmptyResult(_) => {
                "No audio data could be extracted from the file.".to_string()
            }
            ProcessingError::FileTooLarge { limit, .. } => format!(
                "The file is too large to process (limit: {} MiB).",
                limit / (1024 * 1024)
            ),
            ProcessingError::IoReadFailure(_) => "The file could not be read.".to_string(),
            ProcessingError::Cancelled => "Processing was cancelled.".to_string(),
            ProcessingError::InvalidSettings(_) => {
                "The processing settings are not valid.".to_string()
            }
            ProcessingError::Internal(_) => {
                "An unexpected error occurred while processing the file.".to_string()
            }
        }
    }

    /// Returns `true` if a failed streaming attempt may be retried through the
    /// whole-buffer path.
    pub fn is_fallback_eligible(&self) -> bool {
        !matches!(
            self,
            ProcessingError::Cancelled
                | ProcessingError::InvalidSettings(_)
                | ProcessingError::FileTooLarge { .. }
        )
    }

    /// Returns `true` if this error is related to container/codec support.
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            ProcessingError::UnsupportedContainer(_)
                | ProcessingError::UnsupportedCodec(_)
                | ProcessingError::NoAudioTrack(_)
        )
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, ProcessingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_message_differs_from_diagnostic() {
        let err = ProcessingError::DecodeFailure("packet 12: invalid huffman code".to_string());
        assert!(err.to_string().contains("invalid huffman code"));
        assert!(!err.user_message().contains("huffman"));
    }

    #[test]
    fn file_too_large_reports_limit_in_mib() {
        let err = ProcessingError::FileTooLarge {
            size: 3 * 1024 * 1024 * 1024,
            limit: 2 * 1024 * 1024 * 1024,
        };
        assert!(err.user_message().contains("2048 MiB"));
        assert!(err.to_string().contains("3221225472"));
    }

    #[test]
    fn classification() {
        assert!(ProcessingError::UnsupportedCodec("alac".into()).is_fallback_eligible());
        assert!(ProcessingError::EmptyResult("no moov".into()).is_fallback_eligible());
        assert!(!ProcessingError::Cancelled.is_fallback_eligible());
        assert!(!ProcessingError::FileTooLarge { size: 2, limit: 1 }.is_fallback_eligible());

        assert!(ProcessingError::NoAudioTrack("video only".into()).is_format_error());
        assert!(!ProcessingError::DecodeFailure("x".into()).is_format_error());
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: ProcessingError = io.into();
        assert!(matches!(err, ProcessingError::IoReadFailure(_)));
    }
}
