//! Normalization of incoming PCM to a track's output format.
//!
//! The pipeline is: decode samples to `f32`, remap channels, resample, then
//! apply the track's gain.

use rodio::buffer::SamplesBuffer;
use rodio::source::UniformSourceIterator;
use symphonia::core::conv::FromSample;
use thiserror::Error;

use crate::audio::{PcmBuffer, PcmData, PcmFormat};

use super::settings::TrackSettings;

/// Failure while normalizing an appended buffer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConversionError {
    #[error("invalid input format {0}")]
    InvalidFormat(PcmFormat),
    #[error("buffer holds {samples} samples, not a whole number of {channels}-channel frames")]
    MisalignedBuffer { samples: usize, channels: u16 },
    #[error("channel map has {len} entries but the output has {channels} channels")]
    ChannelMapLength { len: usize, channels: usize },
    #[error("channel map entry {entry} exceeds input channel count {channels}")]
    ChannelMapOutOfRange { entry: usize, channels: usize },
}

/// Convert a signed 24-bit sample stored in an `i32` to `f32`.
pub fn convert_signed_24bit_to_f32(sample: i32) -> f32 {
    // The sample lives in the low 24 bits; shift up and back to sign-extend.
    let shifted_sample = sample << 8 >> 8;
    shifted_sample as f32 / 2f32.powi(23)
}

/// Decode any supported representation to interleaved `f32`.
pub fn decode_to_f32(data: &PcmData) -> Vec<f32> {
    match data {
        PcmData::U8(samples) => samples.iter().map(|&s| f32::from_sample(s)).collect(),
        PcmData::I16(samples) => samples.iter().map(|&s| f32::from_sample(s)).collect(),
        PcmData::I24(samples) => samples
            .iter()
            .map(|&s| convert_signed_24bit_to_f32(s))
            .collect(),
        PcmData::I32(samples) => samples.iter().map(|&s| f32::from_sample(s)).collect(),
        PcmData::F32(samples) => samples.clone(),
    }
}

/// Rearrange interleaved frames from `input_channels` to `output_channels`.
///
/// An explicit `channel_map` wins. Otherwise channels are kept, duplicated
/// cyclically when expanding, and either averaged (`downmix`) or truncated to
/// the leading channels when reducing.
pub fn remap_channels(
    samples: Vec<f32>,
    input_channels: usize,
    output_channels: usize,
    downmix: bool,
    channel_map: Option<&[usize]>,
) -> Result<Vec<f32>, ConversionError> {
    if let Some(map) = channel_map {
        if map.len() != output_channels {
            return Err(ConversionError::ChannelMapLength {
                len: map.len(),
                channels: output_channels,
            });
        }
        if let Some(&entry) = map.iter().find(|&&entry| entry >= input_channels) {
            return Err(ConversionError::ChannelMapOutOfRange {
                entry,
                channels: input_channels,
            });
        }
        return Ok(samples
            .chunks_exact(input_channels)
            .flat_map(|frame| map.iter().map(move |&source| frame[source]))
            .collect());
    }

    if input_channels == output_channels {
        return Ok(samples);
    }

    let frames = samples.len() / input_channels;
    let mut out = Vec::with_capacity(frames * output_channels);
    for frame in samples.chunks_exact(input_channels) {
        if output_channels > input_channels {
            out.extend((0..output_channels).map(|channel| frame[channel % input_channels]));
        } else if downmix {
            for channel in 0..output_channels {
                let (sum, count) = frame
                    .iter()
                    .skip(channel)
                    .step_by(output_channels)
                    .fold((0.0_f32, 0usize), |(sum, count), &s| (sum + s, count + 1));
                out.push(sum / count.max(1) as f32);
            }
        } else {
            out.extend_from_slice(&frame[..output_channels]);
        }
    }
    Ok(out)
}

/// Resample interleaved frames from `from_rate` to `to_rate`.
pub fn resample(samples: Vec<f32>, channels: u16, from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() {
        return samples;
    }
    let source = SamplesBuffer::new(channels, from_rate, samples);
    let mut out: Vec<f32> = UniformSourceIterator::new(source, channels, to_rate).collect();
    let whole = out.len() - out.len() % channels.max(1) as usize;
    out.truncate(whole);
    out
}

/// Apply per-track gain and mute in place.
pub fn apply_track_gain(samples: &mut [f32], settings: &TrackSettings) {
    if settings.is_muted {
        samples.fill(0.0);
    } else if settings.volume != 1.0 {
        let gain = if settings.volume.is_finite() {
            settings.volume
        } else {
            1.0
        };
        samples.iter_mut().for_each(|sample| *sample *= gain);
    }
}

/// Normalize `buffer` to `output` and apply `settings`.
pub fn convert_buffer(
    buffer: &PcmBuffer,
    output: PcmFormat,
    settings: &TrackSettings,
) -> Result<PcmBuffer, ConversionError> {
    let input = buffer.format();
    if !input.is_valid() {
        return Err(ConversionError::InvalidFormat(input));
    }
    let sample_count = buffer.data().len();
    if sample_count % input.channels as usize != 0 {
        return Err(ConversionError::MisalignedBuffer {
            samples: sample_count,
            channels: input.channels,
        });
    }

    let samples = decode_to_f32(buffer.data());
    let samples = remap_channels(
        samples,
        input.channels as usize,
        output.channels as usize,
        settings.downmix,
        settings.channel_map.as_deref(),
    )?;
    let mut samples = resample(
        samples,
        output.channels,
        input.sample_rate,
        output.sample_rate,
    );
    apply_track_gain(&mut samples, settings);

    Ok(PcmBuffer::from_f32(
        output.sample_rate,
        output.channels,
        samples,
    ))
}
