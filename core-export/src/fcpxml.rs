//! # Final Cut Pro 7 XML Writer
//!
//! Writes one xmeml v4 sequence that plays the keep segments back to back.
//!
//! ## Document layout
//!
//! ```text
//! xmeml
//! └── sequence "<file> (Edited)"
//!     └── media
//!         ├── video/track  clipitem per segment (carries the <file> element)
//!         └── audio/track  clipitem per segment (references file-1)
//! ```
//!
//! Segment bounds are quantized with `floor(seconds × frame_rate)`. Clips
//! that quantize to zero frames are left out.

use crate::error::{ExportError, Result};
use crate::options::ExportOptions;
use core_silence::AudioSegment;
use std::fmt::Write as _;
use std::io;
use tracing::{debug, info};

/// Suffix appended to the source name for the exported file.
const EXPORT_SUFFIX: &str = "_edited.xml";

/// Audio characteristics declared for the source file.
const AUDIO_SAMPLE_RATE: u32 = 48_000;
const AUDIO_CHANNELS: u32 = 2;
const AUDIO_DEPTH: u32 = 16;

/// File name for the edit list of `source_name`: everything before the first
/// dot, plus `_edited.xml`.
///
/// ```rust
/// use core_export::export_file_name;
///
/// assert_eq!(export_file_name("interview.mp4"), "interview_edited.xml");
/// ```
pub fn export_file_name(source_name: &str) -> String {
    let base = source_name.rsplit(['/', '\\']).next().unwrap_or(source_name);
    let stem = base.split('.').next().unwrap_or(base);
    format!("{}{}", stem, EXPORT_SUFFIX)
}

/// One segment placed on the sequence timeline, in frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Clip {
    source_in: u64,
    source_out: u64,
    sequence_start: u64,
}

impl Clip {
    fn duration(&self) -> u64 {
        self.source_out - self.source_in
    }

    fn sequence_end(&self) -> u64 {
        self.sequence_start + self.duration()
    }
}

#[derive(Debug, Clone, Default)]
pub struct FcpXmlWriter {
    options: ExportOptions,
}

impl FcpXmlWriter {
    pub fn new(options: ExportOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self { options })
    }

    pub fn options(&self) -> &ExportOptions {
        &self.options
    }

    /// Render the document for `segments` of the file `source_name`.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::InvalidSegment`] when a segment is negative,
    /// inverted, not finite, or overlaps its predecessor.
    pub fn render(&self, source_name: &str, segments: &[AudioSegment]) -> Result<String> {
        let clips = self.layout(segments)?;
        let total: u64 = clips.iter().map(Clip::duration).sum();
        let name = escape(source_name);
        let url = escape(&path_url(source_name));
        let rate = self.rate_element();
        let (width, height) = (self.options.resolution.width, self.options.resolution.height);

        let mut xml = String::with_capacity(1024 + clips.len() * 1024);
        writeln!(xml, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
        writeln!(xml, "<!DOCTYPE xmeml>")?;
        writeln!(xml, r#"<xmeml version="4">"#)?;
        writeln!(xml, r#"  <sequence id="sequence-1">"#)?;
        writeln!(xml, "    <name>{} (Edited)</name>", name)?;
        writeln!(xml, "    <duration>{}</duration>", total)?;
        writeln!(xml, "{}", indent(&rate, 4))?;
        writeln!(xml, "    <media>")?;
        writeln!(xml, "      <video>")?;
        writeln!(xml, "        <format>")?;
        writeln!(xml, "          <samplecharacteristics>")?;
        writeln!(xml, "{}", indent(&rate, 12))?;
        writeln!(xml, "            <width>{}</width>", width)?;
        writeln!(xml, "            <height>{}</height>", height)?;
        writeln!(xml, "            <anamorphic>FALSE</anamorphic>")?;
        writeln!(xml, "            <pixelaspectratio>square</pixelaspectratio>")?;
        writeln!(xml, "            <fielddominance>none</fielddominance>")?;
        writeln!(xml, "          </samplecharacteristics>")?;
        writeln!(xml, "        </format>")?;
        writeln!(xml, "        <track>")?;
        for (index, clip) in clips.iter().enumerate() {
            self.video_clip(&mut xml, index + 1, clip, &name, &url, &rate)?;
        }
        writeln!(xml, "        </track>")?;
        writeln!(xml, "      </video>")?;
        writeln!(xml, "      <audio>")?;
        writeln!(xml, "        <track>")?;
        for (index, clip) in clips.iter().enumerate() {
            self.audio_clip(&mut xml, index + 1, clip, &name, &rate)?;
        }
        writeln!(xml, "        </track>")?;
        writeln!(xml, "      </audio>")?;
        writeln!(xml, "    </media>")?;
        writeln!(xml, "  </sequence>")?;
        write!(xml, "</xmeml>")?;

        info!(
            clips = clips.len(),
            skipped = segments.len() - clips.len(),
            frames = total,
            "Rendered edit list"
        );
        Ok(xml)
    }

    /// Render and write the document to `writer`.
    pub fn write_to<W: io::Write>(
        &self,
        mut writer: W,
        source_name: &str,
        segments: &[AudioSegment],
    ) -> Result<()> {
        let xml = self.render(source_name, segments)?;
        writer.write_all(xml.as_bytes())?;
        writer.flush()?;
        Ok(())
    }

    fn layout(&self, segments: &[AudioSegment]) -> Result<Vec<Clip>> {
        let fps = self.options.frame_rate;
        let mut clips = Vec::with_capacity(segments.len());
        let mut sequence_time = 0u64;
        let mut previous_end = None;

        for (index, segment) in segments.iter().enumerate() {
            let invalid = |reason: &str| ExportError::InvalidSegment {
                index,
                reason: reason.to_string(),
            };
            if !segment.start.is_finite() || !segment.end.is_finite() {
                return Err(invalid("bounds must be finite"));
            }
            if segment.start < 0.0 {
                return Err(invalid("start is negative"));
            }
            if segment.end < segment.start {
                return Err(invalid("end precedes start"));
            }
            if previous_end.is_some_and(|end| segment.start < end) {
                return Err(invalid("overlaps the previous segment"));
            }
            previous_end = Some(segment.end);

            let source_in = (segment.start * fps).floor() as u64;
            let source_out = (segment.end * fps).floor() as u64;
            if source_out <= source_in {
                debug!(index, start = segment.start, end = segment.end, "Skipping sub-frame segment");
                continue;
            }

            let clip = Clip {
                source_in,
                source_out,
                sequence_start: sequence_time,
            };
            sequence_time = clip.sequence_end();
            clips.push(clip);
        }
        Ok(clips)
    }

    fn rate_element(&self) -> String {
        format!(
            "<rate>\n  <timebase>{}</timebase>\n  <ntsc>{}</ntsc>\n</rate>",
            self.options.timebase(),
            if self.options.is_ntsc() { "TRUE" } else { "FALSE" }
        )
    }

    fn clip_timing(xml: &mut String, clip: &Clip, name: &str, rate: &str) -> Result<()> {
        writeln!(xml, "            <name>{}</name>", name)?;
        writeln!(xml, "            <duration>{}</duration>", clip.duration())?;
        writeln!(xml, "{}", indent(rate, 12))?;
        writeln!(xml, "            <start>{}</start>", clip.sequence_start)?;
        writeln!(xml, "            <end>{}</end>", clip.sequence_end())?;
        writeln!(xml, "            <in>{}</in>", clip.source_in)?;
        writeln!(xml, "            <out>{}</out>", clip.source_out)?;
        Ok(())
    }

    fn video_clip(
        &self,
        xml: &mut String,
        number: usize,
        clip: &Clip,
        name: &str,
        url: &str,
        rate: &str,
    ) -> Result<()> {
        let (width, height) = (self.options.resolution.width, self.options.resolution.height);
        writeln!(xml, r#"          <clipitem id="clipitem-{}">"#, number)?;
        Self::clip_timing(xml, clip, name, rate)?;
        writeln!(xml, r#"            <file id="file-1">"#)?;
        writeln!(xml, "              <name>{}</name>", name)?;
        writeln!(xml, "              <pathurl>{}</pathurl>", url)?;
        writeln!(xml, "{}", indent(rate, 14))?;
        writeln!(xml, "              <media>")?;
        writeln!(xml, "                <video>")?;
        writeln!(xml, "                  <samplecharacteristics>")?;
        writeln!(xml, "                    <width>{}</width>", width)?;
        writeln!(xml, "                    <height>{}</height>", height)?;
        writeln!(xml, "                  </samplecharacteristics>")?;
        writeln!(xml, "                </video>")?;
        writeln!(xml, "                <audio>")?;
        writeln!(xml, "                  <samplecharacteristics>")?;
        writeln!(xml, "                    <depth>{}</depth>", AUDIO_DEPTH)?;
        writeln!(xml, "                    <samplerate>{}</samplerate>", AUDIO_SAMPLE_RATE)?;
        writeln!(xml, "                  </samplecharacteristics>")?;
        writeln!(xml, "                  <channelcount>{}</channelcount>", AUDIO_CHANNELS)?;
        writeln!(xml, "                </audio>")?;
        writeln!(xml, "              </media>")?;
        writeln!(xml, "            </file>")?;
        writeln!(xml, "          </clipitem>")?;
        Ok(())
    }

    fn audio_clip(
        &self,
        xml: &mut String,
        number: usize,
        clip: &Clip,
        name: &str,
        rate: &str,
    ) -> Result<()> {
        writeln!(xml, r#"          <clipitem id="clipitem-audio1-{}">"#, number)?;
        Self::clip_timing(xml, clip, name, rate)?;
        writeln!(xml, r#"            <file id="file-1"/>"#)?;
        writeln!(xml, "            <sourcetrack>")?;
        writeln!(xml, "              <mediatype>audio</mediatype>")?;
        writeln!(xml, "              <trackindex>1</trackindex>")?;
        writeln!(xml, "            </sourcetrack>")?;
        writeln!(xml, "          </clipitem>")?;
        Ok(())
    }
}

fn indent(block: &str, spaces: usize) -> String {
    let pad = " ".repeat(spaces);
    block
        .lines()
        .map(|line| format!("{}{}", pad, line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// `file://localhost/` URL of the source, each path segment percent-encoded.
fn path_url(source_name: &str) -> String {
    let path = source_name
        .trim_start_matches('/')
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/");
    format!("file://localhost/{}", path)
}

/// Escape the five XML special characters.
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(haystack: &str, needle: &str) -> usize {
        haystack.matches(needle).count()
    }

    #[test]
    fn clips_are_laid_back_to_back() {
        let writer = FcpXmlWriter::default();
        let xml = writer
            .render(
                "talk.mp4",
                &[AudioSegment::new(0.0, 1.05), AudioSegment::new(3.0, 4.0)],
            )
            .unwrap();

        // 0-1.05 s -> frames 0..31, 3.0-4.0 s -> frames 90..120
        assert!(xml.contains("<in>0</in>"));
        assert!(xml.contains("<out>31</out>"));
        assert!(xml.contains("<in>90</in>"));
        assert!(xml.contains("<out>120</out>"));
        assert!(xml.contains("<start>31</start>"));
        assert!(xml.contains("<end>61</end>"));
        assert!(xml.contains("    <duration>61</duration>"));

        assert_eq!(count(&xml, "<file id=\"file-1\">"), 2);
        assert_eq!(count(&xml, "<clipitem id=\"clipitem-audio1-"), 2);
        assert!(xml.contains("<name>talk.mp4 (Edited)</name>"));
        assert!(xml.contains("<pathurl>file://localhost/talk.mp4</pathurl>"));
        assert!(xml.contains("<ntsc>FALSE</ntsc>"));
        assert!(xml.ends_with("</xmeml>"));
    }

    #[test]
    fn sub_frame_segments_are_skipped() {
        let writer = FcpXmlWriter::default();
        let xml = writer
            .render(
                "a.mov",
                &[AudioSegment::new(1.0, 1.01), AudioSegment::new(2.0, 3.0)],
            )
            .unwrap();
        assert_eq!(count(&xml, "<clipitem id=\"clipitem-audio1-"), 1);
        assert!(xml.contains("<start>0</start>"));
        assert!(xml.contains("<in>60</in>"));
    }

    #[test]
    fn path_url_is_percent_encoded() {
        assert_eq!(path_url("talk.mp4"), "file://localhost/talk.mp4");
        assert_eq!(path_url("my clip.mp4"), "file://localhost/my%20clip.mp4");
        assert_eq!(
            path_url("/Users/me/Q&A #2.mov"),
            "file://localhost/Users/me/Q%26A%20%232.mov"
        );

        let xml = FcpXmlWriter::default()
            .render("my clip.mp4", &[AudioSegment::new(0.0, 1.0)])
            .unwrap();
        assert!(xml.contains("<pathurl>file://localhost/my%20clip.mp4</pathurl>"));
        assert!(xml.contains("<name>my clip.mp4</name>"));
    }

    #[test]
    fn names_are_escaped() {
        let writer = FcpXmlWriter::default();
        let xml = writer
            .render("Q&A <live>.mp4", &[AudioSegment::new(0.0, 1.0)])
            .unwrap();
        assert!(xml.contains("<name>Q&amp;A &lt;live&gt;.mp4 (Edited)</name>"));
        assert!(!xml.contains("Q&A"));
    }

    #[test]
    fn ntsc_flag_for_fractional_rates() {
        let writer = FcpXmlWriter::new(ExportOptions::default().with_frame_rate(29.97)).unwrap();
        let xml = writer.render("a.mp4", &[AudioSegment::new(0.0, 10.0)]).unwrap();
        assert!(xml.contains("<timebase>30</timebase>"));
        assert!(xml.contains("<ntsc>TRUE</ntsc>"));
        assert!(xml.contains("<out>299</out>"));
    }

    #[test]
    fn invalid_segments_are_rejected() {
        let writer = FcpXmlWriter::default();
        let overlapping = [AudioSegment::new(0.0, 2.0), AudioSegment::new(1.0, 3.0)];
        assert!(matches!(
            writer.render("a.mp4", &overlapping),
            Err(ExportError::InvalidSegment { index: 1, .. })
        ));
        assert!(writer.render("a.mp4", &[AudioSegment::new(-1.0, 1.0)]).is_err());
        assert!(writer.render("a.mp4", &[AudioSegment::new(2.0, 1.0)]).is_err());
    }

    #[test]
    fn empty_edit_is_still_a_document() {
        let xml = FcpXmlWriter::default().render("a.mp4", &[]).unwrap();
        assert!(xml.contains("<duration>0</duration>"));
        assert_eq!(count(&xml, "<clipitem"), 0);
    }

    #[test]
    fn export_names() {
        assert_eq!(export_file_name("interview.mp4"), "interview_edited.xml");
        assert_eq!(export_file_name("/videos/raw.take.mov"), "raw_edited.xml");
        assert_eq!(export_file_name("noext"), "noext_edited.xml");
    }

    #[test]
    fn write_to_buffer() {
        let mut out = Vec::new();
        FcpXmlWriter::default()
            .write_to(&mut out, "a.mp4", &[AudioSegment::new(0.0, 1.0)])
            .unwrap();
        assert!(String::from_utf8(out).unwrap().starts_with("<?xml"));
    }
}
