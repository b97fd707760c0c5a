//! Export options.

use crate::error::{ExportError, Result};
use serde::{Deserialize, Serialize};

/// Output frame size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoResolution {
    pub width: u32,
    pub height: u32,
}

impl VideoResolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for VideoResolution {
    /// 1920x1080, used when the source resolution is unknown (audio-only
    /// input or a file the host could not probe).
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

/// Sequence settings of the exported edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportOptions {
    /// Frames per second. Fractional rates (29.97, 23.976) are written as
    /// NTSC timebases.
    #[serde(default = "default_frame_rate")]
    pub frame_rate: f64,
    #[serde(default)]
    pub resolution: VideoResolution,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            frame_rate: default_frame_rate(),
            resolution: VideoResolution::default(),
        }
    }
}

impl ExportOptions {
    pub fn with_frame_rate(mut self, frame_rate: f64) -> Self {
        self.frame_rate = frame_rate;
        self
    }

    pub fn with_resolution(mut self, resolution: VideoResolution) -> Self {
        self.resolution = resolution;
        self
    }

    /// Integer timebase written to the document (29.97 becomes 30).
    pub fn timebase(&self) -> u32 {
        self.frame_rate.round() as u32
    }

    /// Returns `true` for fractional (NTSC) frame rates.
    pub fn is_ntsc(&self) -> bool {
        self.frame_rate.fract() != 0.0
    }

    pub fn validate(&self) -> Result<()> {
        if !self.frame_rate.is_finite() || self.frame_rate < 1.0 {
            return Err(ExportError::InvalidOptions(
                "frame_rate must be >= 1".to_string(),
            ));
        }
        if self.resolution.width == 0 || self.resolution.height == 0 {
            return Err(ExportError::InvalidOptions(
                "resolution must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_frame_rate() -> f64 {
    30.0
}
