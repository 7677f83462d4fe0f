//! Self-describing PCM buffers passed in and out of the mixer.

use super::format::{PcmFormat, SampleFormat};

/// Interleaved sample storage, tagged with its representation.
#[derive(Debug, Clone, PartialEq)]
pub enum PcmData {
    U8(Vec<u8>),
    I16(Vec<i16>),
    /// 24-bit samples in the low bits of each `i32`.
    I24(Vec<i32>),
    I32(Vec<i32>),
    F32(Vec<f32>),
}

impl PcmData {
    /// Number of interleaved samples.
    pub fn len(&self) -> usize {
        match self {
            Self::U8(samples) => samples.len(),
            Self::I16(samples) => samples.len(),
            Self::I24(samples) | Self::I32(samples) => samples.len(),
            Self::F32(samples) => samples.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn sample_format(&self) -> SampleFormat {
        match self {
            Self::U8(_) => SampleFormat::U8,
            Self::I16(_) => SampleFormat::I16,
            Self::I24(_) => SampleFormat::I24,
            Self::I32(_) => SampleFormat::I32,
            Self::F32(_) => SampleFormat::F32,
        }
    }

    fn silence(&mut self) {
        match self {
            Self::U8(samples) => samples.fill(128),
            Self::I16(samples) => samples.fill(0),
            Self::I24(samples) | Self::I32(samples) => samples.fill(0),
            Self::F32(samples) => samples.fill(0.0),
        }
    }
}

/// A block of interleaved PCM audio plus the format describing it.
#[derive(Debug, Clone, PartialEq)]
pub struct PcmBuffer {
    format: PcmFormat,
    data: PcmData,
}

impl PcmBuffer {
    /// Create a buffer; the sample representation is taken from `data`.
    pub fn new(sample_rate: u32, channels: u16, data: PcmData) -> Self {
        Self {
            format: PcmFormat::new(sample_rate, channels, data.sample_format()),
            data,
        }
    }

    /// Create a 32-bit float buffer.
    pub fn from_f32(sample_rate: u32, channels: u16, samples: Vec<f32>) -> Self {
        Self::new(sample_rate, channels, PcmData::F32(samples))
    }

    pub fn format(&self) -> PcmFormat {
        self.format
    }

    pub fn data(&self) -> &PcmData {
        &self.data
    }

    /// Number of whole frames held by the buffer.
    pub fn frame_count(&self) -> usize {
        match self.format.channels {
            0 => 0,
            channels => self.data.len() / channels as usize,
        }
    }

    /// Borrow the samples when the buffer holds 32-bit floats.
    pub fn as_f32(&self) -> Option<&[f32]> {
        match &self.data {
            PcmData::F32(samples) => Some(samples),
            _ => None,
        }
    }

    /// Take the samples when the buffer holds 32-bit floats.
    pub fn into_f32(self) -> Option<Vec<f32>> {
        match self.data {
            PcmData::F32(samples) => Some(samples),
            _ => None,
        }
    }

    /// Return the buffer unchanged, or silenced in place when `muted` is set.
    pub fn muted(mut self, muted: bool) -> Self {
        if muted {
            self.data.silence();
        }
        self
    }
}
