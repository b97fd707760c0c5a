//! # Engine Data Model
//!
//! Settings supplied by the caller, the volume timeline derived from decoded
//! audio, and the keep segments produced by segmentation.

use crate::error::{ProcessingError, Result};
use serde::{Deserialize, Serialize};

// ============================================================================
// Processing Settings
// ============================================================================

/// Caller-supplied silence detection settings. Immutable for one run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingSettings {
    /// Silence cutoff in dBFS. Windows at or below this level are quiet.
    #[serde(default = "default_threshold_db")]
    pub threshold_db: f64,
    /// Minimum length of a quiet stretch, in seconds, before it is cut.
    #[serde(default = "default_min_silence_duration")]
    pub min_silence_duration: f64,
    /// Seconds of context kept around every loud stretch.
    #[serde(default = "default_padding")]
    pub padding: f64,
}

impl Default for ProcessingSettings {
    fn default() -> Self {
        Self {
            threshold_db: default_threshold_db(),
            min_silence_duration: default_min_silence_duration(),
            padding: default_padding(),
        }
    }
}

impl ProcessingSettings {
    pub fn new(threshold_db: f64, min_silence_duration: f64, padding: f64) -> Self {
        Self {
            threshold_db,
            min_silence_duration,
            padding,
        }
    }

    /// Linear amplitude equivalent of `threshold_db` (`10^(dB/20)`).
    pub fn amplitude_threshold(&self) -> f64 {
        10f64.powf(self.threshold_db / 20.0)
    }

    /// Validate settings values.
    pub fn validate(&self) -> Result<()> {
        if !self.threshold_db.is_finite() {
            return Err(ProcessingError::InvalidSettings(
                "threshold_db must be a finite number".to_string(),
            ));
        }

        if !self.min_silence_duration.is_finite() || self.min_silence_duration <= 0.0 {
            return Err(ProcessingError::InvalidSettings(
                "min_silence_duration must be > 0".to_string(),
            ));
        }

        if !self.padding.is_finite() || self.padding < 0.0 {
            return Err(ProcessingError::InvalidSettings(
                "padding must be >= 0".to_string(),
            ));
        }

        Ok(())
    }
}

fn default_threshold_db() -> f64 {
    -30.0
}

fn default_min_silence_duration() -> f64 {
    0.5
}

fn default_padding() -> f64 {
    0.1
}

// ============================================================================
// Volume Timeline
// ============================================================================

/// RMS level of one analysis window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumePoint {
    /// Window start, in seconds from the beginning of the media.
    pub time: f64,
    /// Root-mean-square amplitude of the window (linear, not dB).
    pub level: f64,
}

impl VolumePoint {
    pub fn new(time: f64, level: f64) -> Self {
        Self { time, level }
    }
}

/// Ordered `(time, level)` samples summarizing loudness over the media.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VolumeTimeline {
    points: Vec<VolumePoint>,
}

impl VolumeTimeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            points: Vec::with_capacity(capacity),
        }
    }

    /// Build a timeline from `(time, level)` pairs.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        Self {
            points: pairs
                .into_iter()
                .map(|(time, level)| VolumePoint::new(time, level))
                .collect(),
        }
    }

    pub fn push(&mut self, point: VolumePoint) {
        self.points.push(point);
    }

    pub fn points(&self) -> &[VolumePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first_time(&self) -> Option<f64> {
        self.points.first().map(|p| p.time)
    }

    pub fn last_time(&self) -> Option<f64> {
        self.points.last().map(|p| p.time)
    }

    /// Returns `true` if point times never decrease.
    pub fn is_monotonic(&self) -> bool {
        self.points.windows(2).all(|w| w[0].time <= w[1].time)
    }
}

// ============================================================================
// Keep Segments
// ============================================================================

/// A time range judged non-silent (plus padding) that should be kept.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AudioSegment {
    pub start: f64,
    pub end: f64,
    pub duration: f64,
}

impl AudioSegment {
    /// Create a segment; `duration` is derived from the bounds.
    pub fn new(start: f64, end: f64) -> Self {
        Self {
            start,
            end,
            duration: end - start,
        }
    }

    /// Move the end bound, keeping `duration` consistent.
    pub fn set_end(&mut self, end: f64) {
        self.end = end;
        self.duration = self.end - self.start;
    }

    /// Returns `true` if `other` starts at or before this segment's end.
    pub fn touches(&self, other: &AudioSegment) -> bool {
        other.start <= self.end
    }
}

/// Summary of one analysis run, as presented to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSummary {
    /// The keep segments.
    pub segments: Vec<AudioSegment>,
    /// Length of the analyzed audio in seconds.
    pub original_duration: f64,
    /// Total length of the kept segments in seconds.
    pub new_duration: f64,
    /// Number of kept segments.
    pub cut_count: usize,
}

impl AnalysisSummary {
    pub fn new(segments: Vec<AudioSegment>, original_duration: f64) -> Self {
        let new_duration = segments.iter().map(|s| s.duration).sum();
        let cut_count = segments.len();
        Self {
            segments,
            original_duration,
            new_duration,
            cut_count,
        }
    }

    /// Seconds removed by the edit.
    pub fn removed_duration(&self) -> f64 {
        (self.original_duration - self.new_duration).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_match_ui_defaults() {
        let settings = ProcessingSettings::default();
        assert_eq!(settings.threshold_db, -30.0);
        assert_eq!(settings.min_silence_duration, 0.5);
        assert_eq!(settings.padding, 0.1);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn amplitude_threshold_conversion() {
        assert!((ProcessingSettings::new(0.0, 0.5, 0.0).amplitude_threshold() - 1.0).abs() < 1e-12);
        assert!((ProcessingSettings::new(-20.0, 0.5, 0.0).amplitude_threshold() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn settings_validation() {
        assert!(ProcessingSettings::new(-30.0, 0.0, 0.1).validate().is_err());
        assert!(ProcessingSettings::new(-30.0, 0.5, -0.1).validate().is_err());
        assert!(ProcessingSettings::new(f64::NAN, 0.5, 0.1).validate().is_err());
        assert!(ProcessingSettings::new(-60.0, 0.01, 0.0).validate().is_ok());
    }

    #[test]
    fn settings_deserialize_with_wire_names() {
        let settings: ProcessingSettings =
            serde_json::from_str(r#"{"thresholdDb": -40, "minSilenceDuration": 1.0}"#).unwrap();
        assert_eq!(settings.threshold_db, -40.0);
        assert_eq!(settings.min_silence_duration, 1.0);
        assert_eq!(settings.padding, 0.1);
    }

    #[test]
    fn segment_keeps_duration_consistent() {
        let mut segment = AudioSegment::new(1.0, 2.5);
        assert_eq!(segment.duration, 1.5);
        segment.set_end(4.0);
        assert_eq!(segment.duration, 3.0);
    }

    #[test]
    fn summary_totals() {
        let summary = AnalysisSummary::new(
            vec![AudioSegment::new(0.0, 1.0), AudioSegment::new(2.0, 2.5)],
            4.0,
        );
        assert_eq!(summary.cut_count, 2);
        assert!((summary.new_duration - 1.5).abs() < 1e-12);
        assert!((summary.removed_duration() - 2.5).abs() < 1e-12);
    }

    #[test]
    fn timeline_monotonic_check() {
        let ordered = VolumeTimeline::from_pairs([(0.0, 0.1), (0.05, 0.2), (0.05, 0.0)]);
        assert!(ordered.is_monotonic());
        assert_eq!(ordered.last_time(), Some(0.05));

        let unordered = VolumeTimeline::from_pairs([(0.1, 0.1), (0.05, 0.2)]);
        assert!(!unordered.is_monotonic());
    }
}
