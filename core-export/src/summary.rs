//! Plain-text rendering of an [`AnalysisSummary`].

use core_silence::AnalysisSummary;
use std::fmt::Write as _;

/// Render the headline figures of a run, one per line, with an optional
/// segment listing.
///
/// ```rust
/// use core_export::render_summary;
/// use core_silence::{AnalysisSummary, AudioSegment};
///
/// let summary = AnalysisSummary::new(vec![AudioSegment::new(0.0, 2.5)], 4.0);
/// let text = render_summary(&summary, false);
/// assert!(text.starts_with("1 clip found"));
/// ```
pub fn render_summary(summary: &AnalysisSummary, list_segments: bool) -> String {
    let mut out = String::new();
    let noun = if summary.cut_count == 1 { "clip" } else { "clips" };
    // Writing into a String cannot fail.
    let _ = writeln!(out, "{} {} found", summary.cut_count, noun);
    let _ = writeln!(out, "Original duration: {}", timecode(summary.original_duration));
    let _ = writeln!(
        out,
        "New duration: {} ({:.1}s)",
        timecode(summary.new_duration),
        summary.new_duration
    );
    let _ = writeln!(out, "Removed: {:.1}s", summary.removed_duration());

    if list_segments {
        for (index, segment) in summary.segments.iter().enumerate() {
            let _ = writeln!(
                out,
                "{:>4}  {} - {}  ({:.2}s)",
                index + 1,
                timecode(segment.start),
                timecode(segment.end),
                segment.duration
            );
        }
    }
    out
}

/// `m:ss.t` for durations under an hour, `h:mm:ss.t` above.
pub fn timecode(seconds: f64) -> String {
    let tenths = (seconds.max(0.0) * 10.0).round() as u64;
    let (whole, tenth) = (tenths / 10, tenths % 10);
    let (hours, minutes, secs) = (whole / 3600, (whole / 60) % 60, whole % 60);
    if hours > 0 {
        format!("{}:{:02}:{:02}.{}", hours, minutes, secs, tenth)
    } else {
        format!("{}:{:02}.{}", minutes, secs, tenth)
    }
}
