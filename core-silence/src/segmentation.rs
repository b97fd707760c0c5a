//! # Segmentation
//!
//! Converts a [`VolumeTimeline`] into the ranges worth keeping.
//!
//! A point is loud when its level is strictly above the amplitude threshold.
//! Loud points open (or extend) a keep segment, padded at its start. Quiet
//! points run a silence timer; once the silence has lasted longer than
//! `min_silence_duration` the open segment is closed at its last loud point
//! plus padding. Shorter silences stay inside the segment.
//!
//! The walk starts with a provisional segment anchored on the first point, so
//! leading silence is treated like any other gap: kept when short, cut when
//! long. A provisional segment that expires before hearing anything loud is
//! dropped instead of emitted.

use crate::types::{AudioSegment, ProcessingSettings, VolumeTimeline};
use tracing::trace;

#[derive(Debug, Clone, Copy)]
struct OpenSegment {
    start: f64,
    /// Time of the last loud point (or the anchor for a provisional segment).
    end: f64,
    heard: bool,
}

/// Detect keep segments. Pure and deterministic.
///
/// The output is sorted by start, non-overlapping, and lies within
/// `[0, last point time]`.
pub fn detect_keep_segments(
    timeline: &VolumeTimeline,
    settings: &ProcessingSettings,
) -> Vec<AudioSegment> {
    let points = timeline.points();
    let (first_time, last_time) = match (points.first(), points.last()) {
        (Some(first), Some(last)) => (first.time, last.time),
        _ => return Vec::new(),
    };

    let amplitude = settings.amplitude_threshold();
    let padding = settings.padding;
    let min_silence = settings.min_silence_duration;

    let mut raw = Vec::new();
    let mut open = Some(OpenSegment {
        start: first_time.max(0.0),
        end: first_time,
        heard: false,
    });
    let mut silence_since = Some(first_time);

    for point in points {
        if point.level > amplitude {
            silence_since = None;
            let segment = open.get_or_insert(OpenSegment {
                start: (point.time - padding).max(0.0),
                end: point.time,
                heard: true,
            });
            segment.end = point.time;
            segment.heard = true;
            continue;
        }

        let since = *silence_since.get_or_insert(point.time);
        if point.time - since <= min_silence {
            continue;
        }

        if let Some(segment) = open.take() {
            if segment.heard {
                let end = last_time.min(segment.end + padding);
                trace!(start = segment.start, end, "Closing keep segment");
                raw.push(AudioSegment::new(segment.start, end));
            }
        }
    }

    if let Some(segment) = open {
        raw.push(AudioSegment::new(segment.start, last_time));
    }

    merge_overlapping(raw)
}

/// Merge segments that touch or overlap, in one left-to-right pass over the
/// segments sorted by start.
pub fn merge_overlapping(mut segments: Vec<AudioSegment>) -> Vec<AudioSegment> {
    segments.sort_by(|a, b| a.start.total_cmp(&b.start));

    let mut merged: Vec<AudioSegment> = Vec::with_capacity(segments.len());
    for segment in segments {
        match merged.last_mut() {
            Some(current) if current.touches(&segment) => {
                if segment.end > current.end {
                    current.set_end(segment.end);
                }
            }
            _ => merged.push(segment),
        }
    }
    merged
}
