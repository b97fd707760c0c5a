//! Shared fixtures for the integration tests: synthetic MP4 and WAV files and
//! a decoder that turns each coded chunk into constant-level PCM.

#![allow(dead_code)]

use async_trait::async_trait;
use core_silence::{
    CodecDecoder, CodedChunk, ContainerParser, DecodedBuffer, DecoderOutput, FeedOutcome,
    ParserEvent, ProcessingError, Result, SampleLayout, TrackInfo,
};
use core_silence::traits::DecoderOutputSender;
use std::time::Duration;

// ============================================================================
// MP4 Builder
// ============================================================================

fn boxed(kind: &[u8; 4], body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(body.len() + 8);
    out.extend_from_slice(&((body.len() + 8) as u32).to_be_bytes());
    out.extend_from_slice(kind);
    out.extend_from_slice(body);
    out
}

fn full_box(kind: &[u8; 4], body: &[u8]) -> Vec<u8> {
    let mut full = vec![0u8; 4];
    full.extend_from_slice(body);
    boxed(kind, &full)
}

fn be32(values: &[u32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_be_bytes()).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoovPlacement {
    /// `ftyp, moov, mdat` ("fast start")
    Front,
    /// `ftyp, mdat, moov`
    End,
}

/// Builds a single-track MP4 whose samples are `sample_size` bytes filled
/// with the sample's level byte.
#[derive(Debug, Clone)]
pub struct Mp4Builder {
    levels: Vec<u8>,
    sample_size: u32,
    samples_per_chunk: u32,
    timescale: u32,
    sample_delta: u32,
    handler: [u8; 4],
    placement: MoovPlacement,
    leading_free: usize,
}

impl Mp4Builder {
    pub fn new(levels: Vec<u8>) -> Self {
        Self {
            levels,
            sample_size: 16,
            samples_per_chunk: 4,
            timescale: 1000,
            sample_delta: 10,
            handler: *b"soun",
            placement: MoovPlacement::Front,
            leading_free: 0,
        }
    }

    pub fn placement(mut self, placement: MoovPlacement) -> Self {
        self.placement = placement;
        self
    }

    pub fn samples_per_chunk(mut self, count: u32) -> Self {
        self.samples_per_chunk = count.max(1);
        self
    }

    pub fn sample_size(mut self, size: u32) -> Self {
        self.sample_size = size.max(1);
        self
    }

    /// Declare the only track as video.
    pub fn video_only(mut self) -> Self {
        self.handler = *b"vide";
        self
    }

    /// Insert a `free` box of `len` body bytes after `ftyp`.
    pub fn leading_free(mut self, len: usize) -> Self {
        self.leading_free = len;
        self
    }

    pub fn sample_count(&self) -> usize {
        self.levels.len()
    }

    pub fn build(&self) -> Vec<u8> {
        let mut ftyp_body = b"isom".to_vec();
        ftyp_body.extend_from_slice(&0x200u32.to_be_bytes());
        ftyp_body.extend_from_slice(b"isommp41");
        let mut head = boxed(b"ftyp", &ftyp_body);
        if self.leading_free > 0 {
            head.extend(boxed(b"free", &vec![0u8; self.leading_free]));
        }

        let payload: Vec<u8> = self
            .levels
            .iter()
            .flat_map(|&level| std::iter::repeat(level).take(self.sample_size as usize))
            .collect();
        let mdat = boxed(b"mdat", &payload);

        // Sizes do not depend on the offsets, so lay out once to measure.
        let moov_len = self.moov(0).len();
        let data_start = match self.placement {
            MoovPlacement::Front => head.len() + moov_len + 8,
            MoovPlacement::End => head.len() + 8,
        } as u32;
        let moov = self.moov(data_start);

        let mut file = head;
        match self.placement {
            MoovPlacement::Front => {
                file.extend(moov);
                file.extend(mdat);
            }
            MoovPlacement::End => {
                file.extend(mdat);
                file.extend(moov);
            }
        }
        file
    }

    fn moov(&self, data_start: u32) -> Vec<u8> {
        let count = self.levels.len() as u32;
        let duration = count * self.sample_delta;

        let mut mvhd = be32(&[0, 0, self.timescale, duration]);
        mvhd.resize(96, 0);
        let mvhd = full_box(b"mvhd", &mvhd);

        let mut tkhd = be32(&[0, 0, 1, 0, duration]);
        tkhd.resize(80, 0);
        let tkhd = full_box(b"tkhd", &tkhd);

        let mut mdhd = be32(&[0, 0, self.timescale, duration]);
        mdhd.extend_from_slice(&[0x55, 0xC4, 0, 0]);
        let mdhd = full_box(b"mdhd", &mdhd);

        let mut hdlr = be32(&[0]);
        hdlr.extend_from_slice(&self.handler);
        hdlr.extend_from_slice(&[0u8; 12]);
        hdlr.extend_from_slice(b"Sound\0");
        let hdlr = full_box(b"hdlr", &hdlr);

        let stbl = [
            self.stsd(),
            full_box(b"stts", &be32(&[1, count, self.sample_delta])),
            full_box(b"stsc", &be32(&[1, 1, self.samples_per_chunk, 1])),
            {
                let mut stsz = be32(&[0, count]);
                stsz.extend(be32(&vec![self.sample_size; count as usize]));
                full_box(b"stsz", &stsz)
            },
            {
                let chunks = count.div_ceil(self.samples_per_chunk);
                let chunk_bytes = self.samples_per_chunk * self.sample_size;
                let mut stco = be32(&[chunks]);
                stco.extend(be32(
                    &(0..chunks)
                        .map(|c| data_start + c * chunk_bytes)
                        .collect::<Vec<_>>(),
                ));
                full_box(b"stco", &stco)
            },
        ]
        .concat();
        let stbl = boxed(b"stbl", &stbl);

        let smhd = full_box(b"smhd", &[0, 0, 0, 0]);
        let minf = boxed(b"minf", &[smhd, stbl].concat());
        let mdia = boxed(b"mdia", &[mdhd, hdlr, minf].concat());
        let trak = boxed(b"trak", &[tkhd, mdia].concat());
        boxed(b"moov", &[mvhd, trak].concat())
    }

    fn stsd(&self) -> Vec<u8> {
        let esds = full_box(
            b"esds",
            &[
                0x03, 0x19, 0x00, 0x01, 0x00, // ES descriptor
                0x04, 0x11, 0x40, 0x15, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, // decoder config
                0x05, 0x02, 0x12, 0x10, // AudioSpecificConfig
                0x06, 0x01, 0x02, // SL config
            ],
        );

        let mut entry = vec![0u8; 6];
        entry.extend_from_slice(&1u16.to_be_bytes()); // data reference index
        entry.extend_from_slice(&[0u8; 8]); // version, revision, vendor
        entry.extend_from_slice(&1u16.to_be_bytes()); // channels
        entry.extend_from_slice(&16u16.to_be_bytes()); // sample size
        entry.extend_from_slice(&[0u8; 4]);
        entry.extend_from_slice(&(self.timescale << 16).to_be_bytes());
        entry.extend(esds);
        let mp4a = boxed(b"mp4a", &entry);

        let mut stsd = be32(&[1]);
        stsd.extend(mp4a);
        full_box(b"stsd", &stsd)
    }
}

/// Feed `data` to `parser` the way the streaming ingest does, reading
/// `read_len` bytes at the offset the parser asks for.
pub fn drive_parser(
    parser: &mut dyn ContainerParser,
    data: &[u8],
    read_len: usize,
) -> Result<Vec<ParserEvent>> {
    let mut events = Vec::new();
    let mut offset = 0u64;
    let mut feeds = 0usize;
    while (offset as usize) < data.len() {
        feeds += 1;
        assert!(feeds < 100_000, "parser does not make progress");

        let start = offset as usize;
        let end = (start + read_len).min(data.len());
        let FeedOutcome {
            events: produced,
            next_offset,
            finished,
        } = parser.feed(offset, &data[start..end])?;
        events.extend(produced);
        if finished {
            break;
        }
        offset = next_offset;
    }
    events.extend(parser.flush()?);
    parser.release();
    Ok(events)
}

/// Every coded chunk in `events`, in order.
pub fn chunks(events: &[ParserEvent]) -> Vec<CodedChunk> {
    events
        .iter()
        .filter_map(|e| match e {
            ParserEvent::Samples(batch) => Some(batch.clone()),
            _ => None,
        })
        .flatten()
        .collect()
}

// ============================================================================
// WAV Builder
// ============================================================================

/// 16-bit mono PCM WAV.
pub fn wav_pcm16(sample_rate: u32, samples: &[f32]) -> Vec<u8> {
    let data: Vec<u8> = samples
        .iter()
        .flat_map(|s| ((s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16).to_le_bytes())
        .collect();

    let mut out = Vec::with_capacity(44 + data.len());
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data.len() as u32).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes()); // PCM
    out.extend_from_slice(&1u16.to_le_bytes()); // mono
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&(sample_rate * 2).to_le_bytes());
    out.extend_from_slice(&2u16.to_le_bytes());
    out.extend_from_slice(&16u16.to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&(data.len() as u32).to_le_bytes());
    out.extend(data);
    out
}

/// `seconds` of a square wave at `amplitude`, or silence for amplitude 0.
pub fn tone(sample_rate: u32, seconds: f64, amplitude: f32) -> Vec<f32> {
    let count = (sample_rate as f64 * seconds).round() as usize;
    (0..count)
        .map(|i| if (i / 20) % 2 == 0 { amplitude } else { -amplitude })
        .collect()
}

// ============================================================================
// Level Decoder
// ============================================================================

/// Decodes a chunk into `duration` samples at the chunk's timescale, each
/// equal to the chunk's first byte scaled to [0, 1].
pub fn level_buffer(chunk: &CodedChunk) -> DecodedBuffer {
    let level = chunk.data.first().copied().unwrap_or(0) as f32 / 255.0;
    DecodedBuffer {
        timestamp: Duration::from_secs_f64(chunk.timestamp_secs()),
        duration: Duration::from_secs_f64(chunk.duration as f64 / chunk.timescale as f64),
        sample_rate: chunk.timescale,
        channels: 1,
        layout: SampleLayout::Interleaved,
        samples: vec![level; chunk.duration as usize],
    }
}

/// Decoder that answers every submit immediately.
#[derive(Default)]
pub struct LevelDecoder {
    output: Option<DecoderOutputSender>,
}

#[async_trait]
impl CodecDecoder for LevelDecoder {
    fn configure(&mut self, _track: &TrackInfo, output: DecoderOutputSender) -> Result<()> {
        self.output = Some(output);
        Ok(())
    }

    fn submit(&mut self, chunk: CodedChunk) -> Result<()> {
        let output = self
            .output
            .as_ref()
            .ok_or_else(|| ProcessingError::Internal("not configured".to_string()))?;
        let _ = output.send(DecoderOutput::Buffer(level_buffer(&chunk)));
        Ok(())
    }

    fn pending_count(&self) -> usize {
        0
    }

    async fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn close(&mut self) {
        self.output = None;
    }
}
