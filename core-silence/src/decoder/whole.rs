//! Whole-buffer decoding through Symphonia's probe and format readers.

use crate::decoder::format_detector::FormatDetector;
use crate::decoder::sample_converter::SampleConverter;
use crate::error::{ProcessingError, Result};
use crate::traits::{DecodedAudio, WholeBufferDecoder};
use bytes::Bytes;
use std::io::Cursor;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use tracing::{debug, error, info, instrument, warn};

/// Consecutive bad packets tolerated before the file is declared corrupt.
const MAX_CONSECUTIVE_ERRORS: usize = 10;

/// Decodes a complete in-memory file and keeps the first channel.
#[derive(Debug, Default, Clone, Copy)]
pub struct SymphoniaBufferDecoder;

impl SymphoniaBufferDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl WholeBufferDecoder for SymphoniaBufferDecoder {
    #[instrument(skip(self, data), fields(bytes = data.len()))]
    fn decode_all(
        &self,
        data: Bytes,
        name_hint: &str,
        mime_type: Option<&str>,
    ) -> Result<DecodedAudio> {
        let hint = FormatDetector::probe_hint(name_hint, mime_type);
        let stream = MediaSourceStream::new(Box::new(Cursor::new(data)), Default::default());

        let probe_result = symphonia::default::get_probe()
            .format(
                &hint,
                stream,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| {
                error!("Format probe failed: {}", e);
                ProcessingError::UnsupportedContainer(format!("Failed to probe format: {}", e))
            })?;
        let mut format_reader = probe_result.format;

        let track = format_reader
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL && t.codec_params.sample_rate.is_some())
            .ok_or_else(|| ProcessingError::NoAudioTrack(name_hint.to_string()))?;
        let track_id = track.id;
        let mut sample_rate = track.codec_params.sample_rate.unwrap_or_default();
        debug!(
            track_id,
            codec = ?FormatDetector::codec_id(track.codec_params.codec),
            sample_rate,
            "Selected audio track"
        );

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| {
                error!("Failed to create decoder: {}", e);
                ProcessingError::UnsupportedCodec(format!("Failed to create codec decoder: {}", e))
            })?;

        let mut samples = Vec::new();
        let mut consecutive_errors = 0;

        loop {
            let packet = match format_reader.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    break;
                }
                Err(SymphoniaError::ResetRequired) => {
                    return Err(ProcessingError::DecodeFailure(
                        "Stream reset required mid-file".to_string(),
                    ));
                }
                Err(e) => {
                    return Err(ProcessingError::DecodeFailure(format!(
                        "Failed to read packet: {}",
                        e
                    )));
                }
            };

            if packet.track_id() != track_id {
                continue;
            }

            match decoder.decode(&packet) {
                Ok(decoded) => {
                    consecutive_errors = 0;
                    sample_rate = decoded.spec().rate;
                    samples.extend(SampleConverter::first_channel_f32(&decoded));
                }
                Err(err @ (SymphoniaError::IoError(_) | SymphoniaError::DecodeError(_))) => {
                    consecutive_errors += 1;
                    warn!(
                        "Skipping bad packet (attempt {}/{}): {}",
                        consecutive_errors, MAX_CONSECUTIVE_ERRORS, err
                    );

                    if consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                        error!("Too many consecutive decode errors, stream may be corrupted");
                        return Err(ProcessingError::DecodeFailure(format!(
                            "Decoder failure after {} failed packets: {}",
                            MAX_CONSECUTIVE_ERRORS, err
                        )));
                    }
                }
                Err(e) => {
                    error!("Fatal decode error: {}", e);
                    return Err(ProcessingError::DecodeFailure(format!(
                        "Failed to decode packet: {}",
                        e
                    )));
                }
            }
        }

        if samples.is_empty() {
            return Err(ProcessingError::EmptyResult(format!(
                "{} decoded to no samples",
                name_hint
            )));
        }

        let audio = DecodedAudio {
            samples,
            sample_rate,
        };
        info!(
            seconds = audio.duration_secs(),
            sample_rate, "Whole-buffer decode complete"
        );
        Ok(audio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn garbage_is_unsupported_container() {
        let decoder = SymphoniaBufferDecoder::new();
        let err = decoder
            .decode_all(Bytes::from_static(b"definitely not audio data"), "noise.bin", None)
            .unwrap_err();
        assert!(matches!(err, ProcessingError::UnsupportedContainer(_)));
    }
}
