//! # ISO Base Media Parser
//!
//! Incremental parser for MP4/M4A/MOV files. It walks the top-level boxes as
//! bytes arrive, buffers the `moov` box until it is complete, builds the
//! sample table of the first audio track, and then cuts coded samples out of
//! the media data.
//!
//! Only the current read window and one partial sample are ever held in
//! memory. The parser steers the reader through `FeedOutcome::next_offset`:
//!
//! - a `mdat` box met before `moov` is skipped and revisited later,
//! - ranges between audio samples (video data, padding) are skipped,
//! - reading stops once the last audio sample has been emitted.

use crate::error::{ProcessingError, Result};
use crate::traits::{CodecId, CodedChunk, ContainerParser, FeedOutcome, ParserEvent, TrackInfo};
use bytes::Bytes;
use std::collections::VecDeque;
use std::time::Duration;
use tracing::{debug, trace, warn};

type FourCc = [u8; 4];

/// Largest `moov` box the parser agrees to buffer.
const MAX_MOOV_BYTES: u64 = 256 * 1024 * 1024;

/// Upper bound on the sample count of one track (about 16 days of AAC at 48 kHz).
const MAX_SAMPLES: usize = 1 << 26;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SampleEntry {
    offset: u64,
    size: u32,
    dts: u64,
    duration: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Walking top-level boxes, looking for `moov`.
    Scanning,
    /// Sample table known, extracting samples from media data.
    Samples,
    /// Every sample emitted (or no audio track).
    Done,
}

/// Incremental ISO-BMFF parser. See the module docs.
#[derive(Debug)]
pub struct IsoBmffParser {
    phase: Phase,
    buffer: Vec<u8>,
    buffer_offset: u64,
    scan_offset: u64,
    mdat_offset: Option<u64>,
    track: Option<TrackInfo>,
    samples: VecDeque<SampleEntry>,
    emitted: u64,
    unreleased: usize,
}

impl Default for IsoBmffParser {
    fn default() -> Self {
        Self::new()
    }
}

impl IsoBmffParser {
    pub fn new() -> Self {
        Self {
            phase: Phase::Scanning,
            buffer: Vec::new(),
            buffer_offset: 0,
            scan_offset: 0,
            mdat_offset: None,
            track: None,
            samples: VecDeque::new(),
            emitted: 0,
            unreleased: 0,
        }
    }

    /// Samples emitted so far.
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    /// Samples emitted but not yet reported consumed.
    pub fn unreleased(&self) -> usize {
        self.unreleased
    }

    fn buffer_end(&self) -> u64 {
        self.buffer_offset + self.buffer.len() as u64
    }

    /// Discard buffered bytes and position the buffer at `offset`.
    fn reposition(&mut self, offset: u64) -> u64 {
        self.buffer.clear();
        self.buffer_offset = offset;
        offset
    }

    /// Drop the first `count` buffered bytes.
    fn compact(&mut self, count: usize) {
        if count > 0 {
            self.buffer.drain(..count);
            self.buffer_offset += count as u64;
        }
    }

    fn scan(&mut self, events: &mut Vec<ParserEvent>) -> Result<u64> {
        loop {
            if self.scan_offset < self.buffer_offset
                || self.scan_offset >= self.buffer_end()
            {
                return Ok(self.reposition(self.scan_offset));
            }

            let rel = (self.scan_offset - self.buffer_offset) as usize;
            let header = match parse_box_header(&self.buffer[rel..])? {
                Some(header) => header,
                None => {
                    self.compact(rel);
                    return Ok(self.buffer_end());
                }
            };
            trace!(kind = %fourcc_str(&header.kind), offset = self.scan_offset, size = ?header.size, "Top-level box");

            match &header.kind {
                b"moov" => {
                    let size = header.size.ok_or_else(|| malformed("moov size"))?;
                    if size > MAX_MOOV_BYTES {
                        return Err(ProcessingError::UnsupportedContainer(format!(
                            "metadata box of {} bytes exceeds the {} byte limit",
                            size, MAX_MOOV_BYTES
                        )));
                    }
                    let available = self.buffer.len() - rel;
                    if (available as u64) < size {
                        self.compact(rel);
                        return Ok(self.buffer_end());
                    }

                    let body = &self.buffer[rel + header.header_len..rel + size as usize];
                    let parsed = parse_moov(body)?;
                    self.scan_offset += size;
                    self.compact(rel + size as usize);

                    return match parsed {
                        None => {
                            debug!("Metadata contains no audio track");
                            events.push(ParserEvent::NoAudioTrack);
                            self.phase = Phase::Done;
                            Ok(self.reposition(self.scan_offset))
                        }
                        Some((track, samples)) => {
                            debug!(
                                track_id = track.track_id,
                                samples = samples.len(),
                                mdat_before_moov = self.mdat_offset.is_some(),
                                "Sample table built"
                            );
                            events.push(ParserEvent::TrackReady(track.clone()));
                            self.track = Some(track);
                            self.samples = samples;
                            self.phase = Phase::Samples;
                            Ok(self.extract(events))
                        }
                    };
                }
                b"mdat" => {
                    self.mdat_offset.get_or_insert(self.scan_offset);
                    let size = header.size.ok_or_else(|| {
                        ProcessingError::UnsupportedContainer(
                            "media data runs to end of file before any metadata".to_string(),
                        )
                    })?;
                    debug!(offset = self.scan_offset, size, "Skipping media data until metadata is known");
                    self.scan_offset += size;
                }
                _ => {
                    let size = header.size.ok_or_else(|| {
                        ProcessingError::UnsupportedContainer(format!(
                            "box '{}' runs to end of file before any metadata",
                            fourcc_str(&header.kind)
                        ))
                    })?;
                    self.scan_offset += size;
                }
            }
        }
    }

    fn extract(&mut self, events: &mut Vec<ParserEvent>) -> u64 {
        let (track_id, timescale) = match &self.track {
            Some(track) => (track.track_id, track.timescale),
            None => return self.buffer_end(),
        };

        let mut batch = Vec::new();
        let next = loop {
            let Some(sample) = self.samples.front().copied() else {
                self.phase = Phase::Done;
                let end = self.buffer_end();
                self.buffer.clear();
                break end;
            };

            if sample.offset < self.buffer_offset || sample.offset >= self.buffer_end() {
                break self.reposition(sample.offset);
            }

            let start = (sample.offset - self.buffer_offset) as usize;
            let end = start + sample.size as usize;
            if end > self.buffer.len() {
                self.compact(start);
                break self.buffer_end();
            }

            batch.push(CodedChunk {
                track_id,
                timestamp: sample.dts,
                duration: sample.duration,
                timescale,
                is_key: true,
                data: Bytes::copy_from_slice(&self.buffer[start..end]),
            });
            self.samples.pop_front();
            self.emitted += 1;
            self.unreleased += 1;
        };

        if !batch.is_empty() {
            events.push(ParserEvent::Samples(batch));
        }
        next
    }
}

impl ContainerParser for IsoBmffParser {
    fn feed(&mut self, offset: u64, bytes: &[u8]) -> Result<FeedOutcome> {
        if self.phase == Phase::Done {
            return Ok(FeedOutcome {
                events: Vec::new(),
                next_offset: offset + bytes.len() as u64,
                finished: true,
            });
        }

        if self.buffer.is_empty() || offset != self.buffer_end() {
            if !self.buffer.is_empty() {
                trace!(
                    buffered_at = self.buffer_offset,
                    offset,
                    "Non-contiguous input, dropping buffered bytes"
                );
            }
            self.reposition(offset);
        }
        self.buffer.extend_from_slice(bytes);

        let mut events = Vec::new();
        let next_offset = match self.phase {
            Phase::Scanning => self.scan(&mut events)?,
            Phase::Samples => self.extract(&mut events),
            Phase::Done => self.buffer_end(),
        };

        Ok(FeedOutcome {
            events,
            next_offset,
            finished: self.phase == Phase::Done,
        })
    }

    fn release_consumed(&mut self, count: usize) {
        self.unreleased = self.unreleased.saturating_sub(count);
    }

    fn flush(&mut self) -> Result<Vec<ParserEvent>> {
        match self.phase {
            Phase::Scanning => debug!("Input ended before the metadata box was complete"),
            Phase::Samples => warn!(
                remaining = self.samples.len(),
                emitted = self.emitted,
                "Input ended before every audio sample was read"
            ),
            Phase::Done => {}
        }
        self.buffer.clear();
        Ok(Vec::new())
    }

    fn release(&mut self) {
        self.buffer = Vec::new();
        self.samples = VecDeque::new();
        self.phase = Phase::Done;
    }
}

// ============================================================================
// Box Parsing
// ============================================================================

#[derive(Debug, Clone, Copy)]
struct BoxHeader {
    kind: FourCc,
    /// Total box size including the header; `None` when the box extends to
    /// the end of the file.
    size: Option<u64>,
    header_len: usize,
}

fn malformed(what: &str) -> ProcessingError {
    ProcessingError::UnsupportedContainer(format!("malformed {}", what))
}

fn fourcc_str(kind: &FourCc) -> String {
    String::from_utf8_lossy(kind).into_owned()
}

/// Parse a box header from the start of `data`. `Ok(None)` means more bytes
/// are needed.
fn parse_box_header(data: &[u8]) -> Result<Option<BoxHeader>> {
    if data.len() < 8 {
        return Ok(None);
    }
    let size32 = u32::from_be_bytes([data[0], data[1], data[2], data[3]]);
    let kind = [data[4], data[5], data[6], data[7]];

    let header = match size32 {
        0 => BoxHeader {
            kind,
            size: None,
            header_len: 8,
        },
        1 => {
            if data.len() < 16 {
                return Ok(None);
            }
            let mut large = [0u8; 8];
            large.copy_from_slice(&data[8..16]);
            let size = u64::from_be_bytes(large);
            if size < 16 {
                return Err(malformed("box size"));
            }
            BoxHeader {
                kind,
                size: Some(size),
                header_len: 16,
            }
        }
        n if n < 8 => return Err(malformed("box size")),
        n => BoxHeader {
            kind,
            size: Some(u64::from(n)),
            header_len: 8,
        },
    };
    Ok(Some(header))
}

/// Child boxes of a complete container box body.
fn child_boxes(data: &[u8]) -> Result<Vec<(FourCc, &[u8])>> {
    let mut boxes = Vec::new();
    let mut pos = 0usize;
    while data.len() - pos >= 8 {
        let header = parse_box_header(&data[pos..])?.ok_or_else(|| malformed("box header"))?;
        let remaining = (data.len() - pos) as u64;
        let size = header.size.unwrap_or(remaining);
        if size > remaining {
            return Err(malformed(&format!("'{}' box", fourcc_str(&header.kind))));
        }
        let size = size as usize;
        boxes.push((header.kind, &data[pos + header.header_len..pos + size]));
        pos += size;
    }
    Ok(boxes)
}

fn find_box<'a>(data: &'a [u8], kind: &FourCc) -> Result<Option<&'a [u8]>> {
    Ok(child_boxes(data)?
        .into_iter()
        .find(|(k, _)| k == kind)
        .map(|(_, body)| body))
}

fn require_box<'a>(data: &'a [u8], kind: &FourCc) -> Result<&'a [u8]> {
    find_box(data, kind)?.ok_or_else(|| malformed(&format!("track, missing '{}'", fourcc_str(kind))))
}

/// Big-endian cursor over a box body.
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.data.len() - self.pos < n {
            return Err(malformed("box body"));
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn skip(&mut self, n: usize) -> Result<()> {
        self.take(n).map(|_| ())
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn u64(&mut self) -> Result<u64> {
        let b = self.take(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(b);
        Ok(u64::from_be_bytes(raw))
    }

    fn peek(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    fn rest(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }
}

/// Audio track metadata and sample table from a `moov` body.
fn parse_moov(body: &[u8]) -> Result<Option<(TrackInfo, VecDeque<SampleEntry>)>> {
    for (kind, trak) in child_boxes(body)? {
        if &kind != b"trak" {
            continue;
        }
        if let Some(parsed) = parse_trak(trak)? {
            return Ok(Some(parsed));
        }
    }
    Ok(None)
}

fn parse_trak(trak: &[u8]) -> Result<Option<(TrackInfo, VecDeque<SampleEntry>)>> {
    let mdia = match find_box(trak, b"mdia")? {
        Some(mdia) => mdia,
        None => return Ok(None),
    };
    let handler = match find_box(mdia, b"hdlr")? {
        Some(hdlr) => {
            let mut r = Reader::new(hdlr);
            r.skip(8)?;
            let mut kind = [0u8; 4];
            kind.copy_from_slice(r.take(4)?);
            kind
        }
        None => return Ok(None),
    };
    if &handler != b"soun" {
        return Ok(None);
    }

    let track_id = parse_tkhd(require_box(trak, b"tkhd")?)?;
    let (timescale, duration) = parse_mdhd(require_box(mdia, b"mdhd")?)?;
    if timescale == 0 {
        return Err(malformed("media timescale"));
    }

    let minf = require_box(mdia, b"minf")?;
    let stbl = require_box(minf, b"stbl")?;
    let entry = parse_stsd(require_box(stbl, b"stsd")?)?;

    let sizes = parse_stsz(require_box(stbl, b"stsz")?)?;
    let chunk_offsets = match find_box(stbl, b"stco")? {
        Some(stco) => parse_stco(stco)?,
        None => parse_co64(require_box(stbl, b"co64")?)?,
    };
    let sample_to_chunk = parse_stsc(require_box(stbl, b"stsc")?)?;
    let deltas = parse_stts(require_box(stbl, b"stts")?)?;

    let samples = build_sample_table(&sizes, &chunk_offsets, &sample_to_chunk, &deltas)?;

    let sample_rate = if entry.sample_rate > 0 {
        entry.sample_rate
    } else {
        timescale
    };
    let track = TrackInfo {
        track_id,
        codec: entry.codec,
        sample_rate,
        channels: entry.channels,
        sample_count: samples.len() as u64,
        timescale,
        duration: duration.map(|d| Duration::from_secs_f64(d as f64 / timescale as f64)),
        codec_private: entry.codec_private,
    };
    Ok(Some((track, samples)))
}

fn parse_tkhd(body: &[u8]) -> Result<u32> {
    let mut r = Reader::new(body);
    let version = r.u8()?;
    r.skip(3)?;
    if version == 1 {
        r.skip(16)?;
    } else {
        r.skip(8)?;
    }
    r.u32()
}

fn parse_mdhd(body: &[u8]) -> Result<(u32, Option<u64>)> {
    let mut r = Reader::new(body);
    let version = r.u8()?;
    r.skip(3)?;
    let (timescale, duration) = if version == 1 {
        r.skip(16)?;
        (r.u32()?, r.u64()?)
    } else {
        r.skip(8)?;
        (r.u32()?, u64::from(r.u32()?))
    };
    // All-ones means unknown.
    let duration = match duration {
        u64::MAX | 0xFFFF_FFFF => None,
        d => Some(d),
    };
    Ok((timescale, duration))
}

struct AudioEntry {
    codec: CodecId,
    channels: u16,
    sample_rate: u32,
    codec_private: Option<Bytes>,
}

fn parse_stsd(body: &[u8]) -> Result<AudioEntry> {
    let mut r = Reader::new(body);
    r.skip(4)?;
    let count = r.u32()?;
    if count == 0 {
        return Err(malformed("sample description"));
    }
    let (kind, entry) = child_boxes(r.rest())?
        .into_iter()
        .next()
        .ok_or_else(|| malformed("sample description"))?;
    parse_audio_entry(kind, entry)
}

fn parse_audio_entry(kind: FourCc, entry: &[u8]) -> Result<AudioEntry> {
    let mut r = Reader::new(entry);
    r.skip(8)?; // reserved + data_reference_index
    let version = r.u16()?;
    r.skip(6)?; // revision + vendor
    let mut channels = r.u16()?;
    r.skip(6)?; // sample size, pre-defined, reserved
    let mut sample_rate = r.u32()? >> 16;

    match version {
        1 => r.skip(16)?,
        2 => {
            r.skip(4)?;
            sample_rate = f64::from_bits(r.u64()?).round() as u32;
            channels = r.u32()? as u16;
            r.skip(20)?;
        }
        _ => {}
    }

    let children = r.rest();
    let (codec, codec_private) = match &kind {
        b"mp4a" => match find_box(children, b"esds")? {
            Some(esds) => {
                let (object_type, config) = parse_esds(esds)?;
                (codec_for_object_type(object_type), config)
            }
            None => (CodecId::Aac, None),
        },
        b"alac" => (
            CodecId::Alac,
            find_box(children, b"alac")?
                .filter(|b| b.len() > 4)
                .map(|b| Bytes::copy_from_slice(&b[4..])),
        ),
        b"fLaC" => (
            CodecId::Flac,
            find_box(children, b"dfLa")?
                .filter(|b| b.len() > 8)
                .map(|b| Bytes::copy_from_slice(&b[8..])),
        ),
        b"Opus" => (
            CodecId::Opus,
            find_box(children, b"dOps")?.map(Bytes::copy_from_slice),
        ),
        b".mp3" => (CodecId::Mp3, None),
        other => (CodecId::Other(fourcc_str(other)), None),
    };

    Ok(AudioEntry {
        codec,
        channels,
        sample_rate,
        codec_private,
    })
}

fn codec_for_object_type(object_type: u8) -> CodecId {
    match object_type {
        0x40 | 0x66 | 0x67 | 0x68 => CodecId::Aac,
        0x69 | 0x6B => CodecId::Mp3,
        other => CodecId::Other(format!("mp4a.{:02X}", other)),
    }
}

/// Length field of an MPEG-4 descriptor: up to four 7-bit groups.
fn descriptor_len(r: &mut Reader<'_>) -> Result<usize> {
    let mut len = 0usize;
    for _ in 0..4 {
        let byte = r.u8()?;
        len = (len << 7) | usize::from(byte & 0x7F);
        if byte & 0x80 == 0 {
            return Ok(len);
        }
    }
    Ok(len)
}

/// Object type indication and decoder specific info from an `esds` body.
fn parse_esds(body: &[u8]) -> Result<(u8, Option<Bytes>)> {
    let mut r = Reader::new(body);
    r.skip(4)?;

    if r.u8()? != 0x03 {
        return Err(malformed("ES descriptor"));
    }
    descriptor_len(&mut r)?;
    r.skip(2)?; // ES_ID
    let flags = r.u8()?;
    if flags & 0x80 != 0 {
        r.skip(2)?;
    }
    if flags & 0x40 != 0 {
        let url_len = r.u8()?;
        r.skip(usize::from(url_len))?;
    }
    if flags & 0x20 != 0 {
        r.skip(2)?;
    }

    if r.u8()? != 0x04 {
        return Err(malformed("decoder config descriptor"));
    }
    descriptor_len(&mut r)?;
    let object_type = r.u8()?;
    r.skip(12)?; // stream type, buffer size, bitrates

    let mut config = None;
    if r.peek() == Some(0x05) {
        r.u8()?;
        let len = descriptor_len(&mut r)?;
        config = Some(Bytes::copy_from_slice(r.take(len)?));
    }
    Ok((object_type, config))
}

fn parse_stsz(body: &[u8]) -> Result<Vec<u32>> {
    let mut r = Reader::new(body);
    r.skip(4)?;
    let uniform = r.u32()?;
    let count = r.u32()? as usize;
    if count > MAX_SAMPLES {
        return Err(malformed("sample size table"));
    }
    if uniform != 0 {
        return Ok(vec![uniform; count]);
    }
    if r.rest().len() / 4 < count {
        return Err(malformed("sample size table"));
    }
    (0..count).map(|_| r.u32()).collect()
}

fn parse_stco(body: &[u8]) -> Result<Vec<u64>> {
    let mut r = Reader::new(body);
    r.skip(4)?;
    let count = r.u32()? as usize;
    if r.rest().len() / 4 < count {
        return Err(malformed("chunk offset table"));
    }
    (0..count).map(|_| r.u32().map(u64::from)).collect()
}

fn parse_co64(body: &[u8]) -> Result<Vec<u64>> {
    let mut r = Reader::new(body);
    r.skip(4)?;
    let count = r.u32()? as usize;
    if r.rest().len() / 8 < count {
        return Err(malformed("chunk offset table"));
    }
    (0..count).map(|_| r.u64()).collect()
}

/// `(first_chunk, samples_per_chunk)` pairs; chunk numbers are 1-based.
fn parse_stsc(body: &[u8]) -> Result<Vec<(u32, u32)>> {
    let mut r = Reader::new(body);
    r.skip(4)?;
    let count = r.u32()? as usize;
    if r.rest().len() / 12 < count {
        return Err(malformed("sample-to-chunk table"));
    }
    (0..count)
        .map(|_| {
            let first_chunk = r.u32()?;
            let per_chunk = r.u32()?;
            r.skip(4)?;
            Ok((first_chunk, per_chunk))
        })
        .collect()
}

/// `(sample_count, sample_delta)` runs.
fn parse_stts(body: &[u8]) -> Result<Vec<(u32, u32)>> {
    let mut r = Reader::new(body);
    r.skip(4)?;
    let count = r.u32()? as usize;
    if r.rest().len() / 8 < count {
        return Err(malformed("time-to-sample table"));
    }
    (0..count).map(|_| Ok((r.u32()?, r.u32()?))).collect()
}

fn build_sample_table(
    sizes: &[u32],
    chunk_offsets: &[u64],
    sample_to_chunk: &[(u32, u32)],
    deltas: &[(u32, u32)],
) -> Result<VecDeque<SampleEntry>> {
    let mut samples = VecDeque::with_capacity(sizes.len());
    let mut durations = deltas
        .iter()
        .flat_map(|&(count, delta)| std::iter::repeat(delta).take(count as usize));

    let mut sample_index = 0usize;
    let mut dts = 0u64;
    for (chunk_index, &chunk_offset) in chunk_offsets.iter().enumerate() {
        let chunk_number = chunk_index as u32 + 1;
        let per_chunk = sample_to_chunk
            .iter()
            .take_while(|(first, _)| *first <= chunk_number)
            .last()
            .map(|&(_, per_chunk)| per_chunk)
            .ok_or_else(|| malformed("sample-to-chunk table"))?;

        let mut offset = chunk_offset;
        for _ in 0..per_chunk {
            let Some(&size) = sizes.get(sample_index) else {
                break;
            };
            let duration = durations.next().unwrap_or(0);
            samples.push_back(SampleEntry {
                offset,
                size,
                dts,
                duration,
            });
            offset += u64::from(size);
            dts += u64::from(duration);
            sample_index += 1;
        }
    }

    if sample_index < sizes.len() {
        return Err(malformed("sample table, samples outside any chunk"));
    }
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_header_variants() {
        let compact = [0, 0, 0, 16, b'f', b'r', b'e', b'e'];
        let header = parse_box_header(&compact).unwrap().unwrap();
        assert_eq!(header.size, Some(16));
        assert_eq!(header.header_len, 8);

        let mut large = vec![0, 0, 0, 1, b'm', b'd', b'a', b't'];
        large.extend_from_slice(&(1u64 << 33).to_be_bytes());
        let header = parse_box_header(&large).unwrap().unwrap();
        assert_eq!(header.size, Some(1 << 33));
        assert_eq!(header.header_len, 16);

        let to_end = [0, 0, 0, 0, b'm', b'd', b'a', b't'];
        assert_eq!(parse_box_header(&to_end).unwrap().unwrap().size, None);

        assert!(parse_box_header(&[0, 0, 0]).unwrap().is_none());
        assert!(parse_box_header(&[0, 0, 0, 4, b'b', b'a', b'd', b'!']).is_err());
    }

    #[test]
    fn descriptor_length_forms() {
        let mut r = Reader::new(&[0x80, 0x80, 0x80, 0x22]);
        assert_eq!(descriptor_len(&mut r).unwrap(), 0x22);
        let mut r = Reader::new(&[0x81, 0x01]);
        assert_eq!(descriptor_len(&mut r).unwrap(), 129);
    }

    #[test]
    fn esds_extracts_audio_specific_config() {
        let esds = [
            0, 0, 0, 0, // version + flags
            0x03, 0x19, 0x00, 0x01, 0x00, // ES descriptor, ES_ID 1, no flags
            0x04, 0x11, 0x40, 0x15, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, // AAC config
            0x05, 0x02, 0x12, 0x10, // AudioSpecificConfig
            0x06, 0x01, 0x02,
        ];
        let (object_type, config) = parse_esds(&esds).unwrap();
        assert_eq!(object_type, 0x40);
        assert_eq!(config.as_deref(), Some(&[0x12, 0x10][..]));
        assert_eq!(codec_for_object_type(object_type), CodecId::Aac);
        assert_eq!(codec_for_object_type(0x6B), CodecId::Mp3);
    }

    #[test]
    fn sample_table_expansion() {
        // Two chunks: 2 samples then 1 sample
        let sizes = [10, 20, 30];
        let offsets = [100, 500];
        let stsc = [(1, 2), (2, 1)];
        let stts = [(3, 1024)];

        let table = build_sample_table(&sizes, &offsets, &stsc, &stts).unwrap();
        let entries: Vec<(u64, u32, u64)> = table.iter().map(|s| (s.offset, s.size, s.dts)).collect();
        assert_eq!(entries, vec![(100, 10, 0), (110, 20, 1024), (500, 30, 2048)]);
    }

    #[test]
    fn sample_table_rejects_orphan_samples() {
        let result = build_sample_table(&[10, 10, 10], &[0], &[(1, 2)], &[(3, 1)]);
        assert!(result.is_err());
    }

    #[test]
    fn uniform_sample_sizes_are_bounded() {
        let uniform = [0, 0, 0, 0, 0, 0, 0, 7, 0, 0, 0, 3];
        assert_eq!(parse_stsz(&uniform).unwrap(), vec![7, 7, 7]);

        let huge = [0, 0, 0, 0, 0, 0, 0, 1, 0xFF, 0xFF, 0xFF, 0xFF];
        assert!(matches!(
            parse_stsz(&huge),
            Err(ProcessingError::UnsupportedContainer(_))
        ));
    }
}
