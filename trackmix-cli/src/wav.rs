//! WAV file I/O through `hound`.

use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use trackmix_lib::{PcmBuffer, PcmData, PcmFormat};

use crate::error::CliError;

/// A decoded WAV file held in its native sample representation.
#[derive(Debug, Clone)]
pub struct WavTrack {
    pub sample_rate: u32,
    pub channels: u16,
    pub data: PcmData,
}

impl WavTrack {
    pub fn frame_count(&self) -> usize {
        self.data.len() / self.channels.max(1) as usize
    }

    /// Copy `frames` frames starting at `start`, clipped to the end of the file.
    pub fn chunk(&self, start: usize, frames: usize) -> Option<PcmBuffer> {
        let end = (start + frames).min(self.frame_count());
        if start >= end {
            return None;
        }
        let channels = self.channels as usize;
        let range = start * channels..end * channels;
        let data = match &self.data {
            PcmData::U8(samples) => PcmData::U8(samples[range].to_vec()),
            PcmData::I16(samples) => PcmData::I16(samples[range].to_vec()),
            PcmData::I24(samples) => PcmData::I24(samples[range].to_vec()),
            PcmData::I32(samples) => PcmData::I32(samples[range].to_vec()),
            PcmData::F32(samples) => PcmData::F32(samples[range].to_vec()),
        };
        Some(PcmBuffer::new(self.sample_rate, self.channels, data))
    }
}

pub fn read_wav(path: &Path) -> Result<WavTrack, CliError> {
    let read_err = |source| CliError::ReadWav {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = WavReader::open(path).map_err(read_err)?;
    let spec = reader.spec();

    let data = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Int, 8) => PcmData::U8(
            reader
                .samples::<i8>()
                .map(|sample| sample.map(|s| (s as i16 + 128) as u8))
                .collect::<Result<_, _>>()
                .map_err(read_err)?,
        ),
        (SampleFormat::Int, 16) => PcmData::I16(
            reader
                .samples::<i16>()
                .collect::<Result<_, _>>()
                .map_err(read_err)?,
        ),
        (SampleFormat::Int, 24) => PcmData::I24(
            reader
                .samples::<i32>()
                .collect::<Result<_, _>>()
                .map_err(read_err)?,
        ),
        (SampleFormat::Int, 32) => PcmData::I32(
            reader
                .samples::<i32>()
                .collect::<Result<_, _>>()
                .map_err(read_err)?,
        ),
        (SampleFormat::Float, 32) => PcmData::F32(
            reader
                .samples::<f32>()
                .collect::<Result<_, _>>()
                .map_err(read_err)?,
        ),
        (format, bits) => {
            return Err(CliError::UnsupportedWav {
                path: path.to_path_buf(),
                bits,
                format: match format {
                    SampleFormat::Int => "integer",
                    SampleFormat::Float => "float",
                },
            })
        }
    };

    log::info!(
        "read {}: {}Hz/{}ch/{}-bit",
        path.display(),
        spec.sample_rate,
        spec.channels,
        spec.bits_per_sample
    );
    Ok(WavTrack {
        sample_rate: spec.sample_rate,
        channels: spec.channels,
        data,
    })
}

/// Write interleaved `f32` samples as a 32-bit float WAV.
pub fn write_wav(path: &Path, format: PcmFormat, samples: &[f32]) -> Result<(), CliError> {
    let write_err = |source| CliError::WriteWav {
        path: path.to_path_buf(),
        source,
    };
    let spec = WavSpec {
        channels: format.channels,
        sample_rate: format.sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let mut writer = WavWriter::create(path, spec).map_err(write_err)?;
    for &sample in samples {
        writer.write_sample(sample).map_err(write_err)?;
    }
    writer.finalize().map_err(write_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_integer_wav_in_native_format() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("pcm16.wav");
        let spec = WavSpec {
            channels: 2,
            sample_rate: 44_100,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(&path, spec).expect("writer");
        for sample in [0_i16, 1, -1, i16::MAX, i16::MIN, 7] {
            writer.write_sample(sample).expect("sample");
        }
        writer.finalize().expect("finalize");

        let track = read_wav(&path).expect("read");
        assert_eq!(track.sample_rate, 44_100);
        assert_eq!(track.frame_count(), 3);
        assert_eq!(track.data, PcmData::I16(vec![0, 1, -1, i16::MAX, i16::MIN, 7]));

        let chunk = track.chunk(2, 4).expect("tail chunk");
        assert_eq!(chunk.frame_count(), 1);
        assert_eq!(chunk.data(), &PcmData::I16(vec![i16::MIN, 7]));
        assert!(track.chunk(3, 1).is_none());
    }

    #[test]
    fn writes_float_output() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("out.wav");
        write_wav(&path, PcmFormat::f32(48_000, 1), &[0.5, -0.25]).expect("write");

        let mut reader = WavReader::open(&path).expect("open");
        assert_eq!(reader.spec().sample_format, SampleFormat::Float);
        let samples: Vec<f32> = reader.samples::<f32>().map(|s| s.expect("sample")).collect();
        assert_eq!(samples, vec![0.5, -0.25]);
    }

    #[test]
    fn missing_file_reports_path() {
        let err = read_wav(Path::new("/nonexistent/input.wav")).expect_err("missing");
        assert!(err.to_string().contains("/nonexistent/input.wav"));
    }
}
