//! PCM format descriptions shared by tracks, buffers and graphs.

use serde::{Deserialize, Serialize};

/// Sample representation of interleaved PCM data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SampleFormat {
    /// Unsigned 8-bit, centered on 128.
    U8,
    I16,
    /// Signed 24-bit stored in the low bits of an `i32`.
    I24,
    I32,
    F32,
}

impl SampleFormat {
    /// Number of significant bits per sample.
    pub fn bits_per_sample(self) -> u16 {
        match self {
            Self::U8 => 8,
            Self::I16 => 16,
            Self::I24 => 24,
            Self::I32 | Self::F32 => 32,
        }
    }
}

/// Format of a PCM stream: rate, channel count and sample representation.
///
/// Samples are always interleaved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PcmFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub sample_format: SampleFormat,
}

impl PcmFormat {
    pub fn new(sample_rate: u32, channels: u16, sample_format: SampleFormat) -> Self {
        Self {
            sample_rate,
            channels,
            sample_format,
        }
    }

    /// Interleaved 32-bit float format, the representation used for mixing.
    pub fn f32(sample_rate: u32, channels: u16) -> Self {
        Self::new(sample_rate, channels, SampleFormat::F32)
    }

    /// Return `true` when the format can describe real audio.
    pub fn is_valid(&self) -> bool {
        self.sample_rate > 0 && self.channels > 0
    }

    /// Number of interleaved samples needed for `frames` frames.
    pub fn samples_for_frames(&self, frames: usize) -> usize {
        frames * self.channels as usize
    }
}

impl std::fmt::Display for PcmFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}Hz/{}ch/{:?}",
            self.sample_rate, self.channels, self.sample_format
        )
    }
}
