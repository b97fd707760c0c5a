//! # Volume Timeline Builder
//!
//! Turns decoded samples into a [`VolumeTimeline`]: the first channel is cut
//! into fixed-duration windows and each window's RMS becomes one point,
//! stamped with the window's start time.
//!
//! Both processing paths feed the same [`WindowAccumulator`], so a file
//! analyzed whole and the same file analyzed in streaming mode produce
//! timelines at the same resolution.
//!
//! Windows of at least `subsample_min_window` samples are measured on every
//! `subsample_stride`-th sample only. The loss of precision is irrelevant at
//! the level of a silence threshold and cuts the work for long windows.

use crate::config::EngineConfig;
use crate::types::{VolumePoint, VolumeTimeline};
use tracing::trace;

/// Root-mean-square of `samples`. Zero for an empty slice.
pub fn rms(samples: &[f32]) -> f64 {
    rms_strided(samples, 1)
}

/// RMS over every `stride`-th sample of `samples`, starting with the first.
pub fn rms_strided(samples: &[f32], stride: usize) -> f64 {
    let stride = stride.max(1);
    let mut sum = 0.0f64;
    let mut count = 0usize;
    for sample in samples.iter().step_by(stride) {
        let s = f64::from(*sample);
        sum += s * s;
        count += 1;
    }
    if count == 0 {
        return 0.0;
    }
    (sum / count as f64).sqrt()
}

/// A finished timeline plus the length of audio it covers.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineOutput {
    pub timeline: VolumeTimeline,
    /// Seconds of audio fed to the accumulator (end of the last sample).
    pub duration: f64,
}

/// Incremental windowed-RMS builder.
#[derive(Debug)]
pub struct WindowAccumulator {
    config: EngineConfig,
    stride: usize,
    min_window: usize,
    sample_rate: u32,
    window_len: usize,
    window_start: f64,
    pending: Vec<f32>,
    end_time: f64,
    timeline: VolumeTimeline,
}

impl WindowAccumulator {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            config: config.clone(),
            stride: config.subsample_stride.max(1),
            min_window: config.subsample_min_window,
            sample_rate: 0,
            window_len: 0,
            window_start: 0.0,
            pending: Vec::new(),
            end_time: 0.0,
            timeline: VolumeTimeline::new(),
        }
    }

    /// Feed first-channel samples starting at `timestamp` seconds.
    ///
    /// A partially filled window carries over when the buffer continues it.
    /// A jump of more than one window (a gap in the stream) or a sample rate
    /// change closes the partial window and re-anchors on `timestamp`.
    pub fn push<I>(&mut self, timestamp: f64, sample_rate: u32, samples: I)
    where
        I: IntoIterator<Item = f32>,
    {
        if sample_rate == 0 {
            return;
        }

        if sample_rate != self.sample_rate {
            self.emit_partial();
            self.sample_rate = sample_rate;
            self.window_len = self.config.window_samples(sample_rate);
            self.pending = Vec::with_capacity(self.window_len);
            self.window_start = timestamp.max(self.end_time);
        } else if self.pending.is_empty() {
            self.window_start = timestamp.max(self.end_time);
        } else if timestamp - self.end_time > self.config.window_secs {
            trace!(
                expected = self.end_time,
                actual = timestamp,
                "Gap in decoded audio, re-anchoring window"
            );
            self.emit_partial();
            self.window_start = timestamp;
        }

        for sample in samples {
            self.pending.push(sample);
            if self.pending.len() == self.window_len {
                self.emit_window();
            }
        }
        self.end_time = self.window_start + self.pending.len() as f64 / self.sample_rate as f64;
    }

    /// Number of points emitted so far.
    pub fn len(&self) -> usize {
        self.timeline.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timeline.is_empty() && self.pending.is_empty()
    }

    /// Emit the trailing partial window and hand over the timeline.
    /// The accumulator is left empty.
    pub fn finish(&mut self) -> TimelineOutput {
        self.emit_partial();
        let timeline = std::mem::take(&mut self.timeline);
        let duration = self.end_time;
        self.sample_rate = 0;
        self.end_time = 0.0;
        TimelineOutput { timeline, duration }
    }

    fn emit_partial(&mut self) {
        if !self.pending.is_empty() {
            self.emit_window();
        }
    }

    fn emit_window(&mut self) {
        let stride = if self.pending.len() >= self.min_window {
            self.stride
        } else {
            1
        };
        let level = rms_strided(&self.pending, stride);
        self.timeline.push(VolumePoint::new(self.window_start, level));

        self.window_start += self.pending.len() as f64 / self.sample_rate as f64;
        self.end_time = self.window_start;
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(window_secs: f64) -> EngineConfig {
        EngineConfig {
            window_secs,
            ..Default::default()
        }
    }

    #[test]
    fn rms_of_constant_signal() {
        assert!((rms(&[0.5; 64]) - 0.5).abs() < 1e-9);
        assert!((rms(&[-0.25; 10]) - 0.25).abs() < 1e-9);
        assert_eq!(rms(&[]), 0.0);
    }

    #[test]
    fn rms_of_square_wave() {
        let samples: Vec<f32> = (0..100).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        assert!((rms(&samples) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn strided_rms_skips_samples() {
        let samples = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0];
        assert!((rms_strided(&samples, 4) - 1.0).abs() < 1e-9);
        assert!((rms_strided(&samples, 1) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn window_length_follows_config() {
        let config = EngineConfig::default();
        let window = config.window_samples(44_100);
        let mut acc = WindowAccumulator::new(&config);
        acc.push(0.0, 44_100, vec![0.1f32; window * 2]);
        let out = acc.finish();

        let points = out.timeline.points();
        assert_eq!(points.len(), 2);
        assert!((points[1].time - window as f64 / 44_100.0).abs() < 1e-9);
    }

    #[test]
    fn windows_are_stamped_with_start_time() {
        // 100 Hz, 0.1 s windows => 10 samples per window
        let mut acc = WindowAccumulator::new(&config(0.1));
        let samples: Vec<f32> = (0..35).map(|i| if i < 10 { 0.0 } else { 0.5 }).collect();
        acc.push(0.0, 100, samples);
        let out = acc.finish();

        let points = out.timeline.points();
        assert_eq!(points.len(), 4);
        assert_eq!(points[0].level, 0.0);
        assert!((points[1].time - 0.1).abs() < 1e-9);
        assert!((points[1].level - 0.5).abs() < 1e-6);
        // Trailing partial window of 5 samples
        assert!((points[3].time - 0.3).abs() < 1e-9);
        assert!((out.duration - 0.35).abs() < 1e-9);
    }

    #[test]
    fn windows_span_buffer_boundaries() {
        let mut acc = WindowAccumulator::new(&config(0.1));
        acc.push(0.0, 100, vec![0.5; 6]);
        acc.push(0.06, 100, vec![0.5; 6]);
        let out = acc.finish();

        let points = out.timeline.points();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].time, 0.0);
        assert!((points[1].time - 0.1).abs() < 1e-9);
    }

    #[test]
    fn gap_reanchors_on_buffer_timestamp() {
        let mut acc = WindowAccumulator::new(&config(0.1));
        acc.push(0.0, 100, vec![0.5; 5]);
        acc.push(2.0, 100, vec![0.5; 10]);
        let out = acc.finish();

        let times: Vec<f64> = out.timeline.points().iter().map(|p| p.time).collect();
        assert_eq!(times, vec![0.0, 2.0]);
        assert!(out.timeline.is_monotonic());
    }

    #[test]
    fn large_windows_are_subsampled() {
        let cfg = EngineConfig {
            window_secs: 1.0,
            subsample_stride: 4,
            subsample_min_window: 8,
            ..Default::default()
        };
        let mut acc = WindowAccumulator::new(&cfg);
        // Only indices 0, 4, 8, 12 contribute
        let samples: Vec<f32> = (0..16).map(|i| if i % 4 == 0 { 1.0 } else { 0.0 }).collect();
        acc.push(0.0, 16, samples);
        let out = acc.finish();
        assert!((out.timeline.points()[0].level - 1.0).abs() < 1e-9);
    }

    #[test]
    fn finish_resets_accumulator() {
        let mut acc = WindowAccumulator::new(&config(0.1));
        acc.push(0.0, 100, vec![0.1; 20]);
        assert_eq!(acc.finish().timeline.len(), 2);
        assert!(acc.is_empty());
        assert!(acc.finish().timeline.is_empty());
    }
}
