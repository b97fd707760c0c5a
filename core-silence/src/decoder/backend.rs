//! Symphonia-backed [`MediaBackend`].

use crate::decoder::whole::SymphoniaBufferDecoder;
use crate::decoder::worker::SymphoniaCodecDecoder;
use crate::error::{ProcessingError, Result};
use crate::isobmff::IsoBmffParser;
use crate::traits::{
    BackendCapabilities, CodecDecoder, ContainerKind, ContainerParser, MediaBackend,
    WholeBufferDecoder,
};
use std::sync::Arc;

/// Pairs the built-in ISO-BMFF parser with Symphonia codecs.
pub struct SymphoniaBackend {
    whole: Arc<SymphoniaBufferDecoder>,
}

impl Default for SymphoniaBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SymphoniaBackend {
    pub fn new() -> Self {
        Self {
            whole: Arc::new(SymphoniaBufferDecoder::new()),
        }
    }
}

impl MediaBackend for SymphoniaBackend {
    fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities {
            streaming_decoder: true,
        }
    }

    fn create_parser(&self, container: ContainerKind) -> Result<Box<dyn ContainerParser>> {
        match container {
            ContainerKind::IsoBmff => Ok(Box::new(IsoBmffParser::new())),
            ContainerKind::Other => Err(ProcessingError::UnsupportedContainer(
                "No streaming parser for this container".to_string(),
            )),
        }
    }

    fn create_decoder(&self) -> Result<Box<dyn CodecDecoder>> {
        Ok(Box::new(SymphoniaCodecDecoder::new()))
    }

    fn whole_buffer_decoder(&self) -> Arc<dyn WholeBufferDecoder> {
        self.whole.clone()
    }
}
