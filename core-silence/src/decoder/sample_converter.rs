//! # Sample Format Converter
//!
//! Converts Symphonia's decoded buffers (any sample format) to f32 in
//! [-1.0, 1.0].

use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::conv::IntoSample;
use symphonia::core::sample::Sample;

/// Sample converter that normalizes audio to f32.
///
/// Symphonia outputs planar buffers in various formats (i16, i24, i32, f32,
/// f64, ...). The engine only measures loudness, so it either keeps the
/// planar layout or takes the first channel alone.
pub struct SampleConverter;

impl SampleConverter {
    /// All channels as planar f32 (`[L0, L1, ..., R0, R1, ...]`).
    pub fn to_planar_f32(buffer: &AudioBufferRef<'_>) -> Vec<f32> {
        Self::convert(buffer, None)
    }

    /// The first channel only, as f32.
    pub fn first_channel_f32(buffer: &AudioBufferRef<'_>) -> Vec<f32> {
        Self::convert(buffer, Some(0))
    }

    fn convert(buffer: &AudioBufferRef<'_>, channel: Option<usize>) -> Vec<f32> {
        match buffer {
            AudioBufferRef::F32(buf) => Self::collect_planes(&**buf, channel, |sample: f32| sample),
            AudioBufferRef::F64(buf) => {
                Self::collect_planes(&**buf, channel, |sample: f64| sample.into_sample())
            }
            AudioBufferRef::S32(buf) => {
                Self::collect_planes(&**buf, channel, |sample: i32| sample.into_sample())
            }
            AudioBufferRef::S24(buf) => {
                Self::collect_planes(&**buf, channel, |sample| IntoSample::into_sample(sample))
            }
            AudioBufferRef::S16(buf) => {
                Self::collect_planes(&**buf, channel, |sample: i16| sample.into_sample())
            }
            AudioBufferRef::S8(buf) => {
                Self::collect_planes(&**buf, channel, |sample: i8| sample.into_sample())
            }
            AudioBufferRef::U32(buf) => {
                Self::collect_planes(&**buf, channel, |sample: u32| sample.into_sample())
            }
            AudioBufferRef::U24(buf) => {
                Self::collect_planes(&**buf, channel, |sample| IntoSample::into_sample(sample))
            }
            AudioBufferRef::U16(buf) => {
                Self::collect_planes(&**buf, channel, |sample: u16| sample.into_sample())
            }
            AudioBufferRef::U8(buf) => {
                Self::collect_planes(&**buf, channel, |sample: u8| sample.into_sample())
            }
        }
    }

    /// Convert the selected channel (or all channels, plane after plane).
    fn collect_planes<T>(buf: &AudioBuffer<T>, channel: Option<usize>, convert: fn(T) -> f32) -> Vec<f32>
    where
        T: Sample + Copy,
    {
        let num_channels = buf.spec().channels.count();
        let num_frames = buf.frames();
        if num_channels == 0 {
            return Vec::new();
        }

        let channels = match channel {
            Some(index) if index < num_channels => index..index + 1,
            Some(_) => return Vec::new(),
            None => 0..num_channels,
        };

        let mut out = Vec::with_capacity(num_frames * channels.len());
        for chan_idx in channels {
            out.extend(buf.chan(chan_idx).iter().map(|sample| convert(*sample)));
        }
        out
    }
}
