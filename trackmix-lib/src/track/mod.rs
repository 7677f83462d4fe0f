//! Per-source track state: normalization, settings and the frame queue.

mod buffer;
mod convert;
mod settings;

use std::sync::{Arc, Mutex};

use crate::audio::{AudioTime, PcmBuffer, PcmFormat};
use crate::tools::lock;

pub use buffer::{RingBuffer, DEFAULT_BUFFER_FRAMES};
pub use convert::{
    apply_track_gain, convert_buffer, convert_signed_24bit_to_f32, decode_to_f32, remap_channels,
    resample, ConversionError,
};
pub use settings::TrackSettings;

#[derive(Debug, Default)]
struct Ingress {
    input_format: Option<PcmFormat>,
    next_time: Option<AudioTime>,
}

/// One logical audio source.
///
/// A track is bound to a single output format for its whole life; the mixer
/// replaces every track when that format changes.
#[derive(Debug)]
pub struct Track {
    id: u8,
    output_format: PcmFormat,
    buffer: Arc<RingBuffer>,
    settings: Mutex<TrackSettings>,
    ingress: Mutex<Ingress>,
}

impl Track {
    pub fn new(id: u8, output_format: PcmFormat) -> Self {
        Self::with_buffer(id, output_format, RingBuffer::new(output_format))
    }

    pub fn with_buffer(id: u8, output_format: PcmFormat, buffer: RingBuffer) -> Self {
        Self {
            id,
            output_format,
            buffer: Arc::new(buffer),
            settings: Mutex::new(TrackSettings::default()),
            ingress: Mutex::new(Ingress::default()),
        }
    }

    pub fn id(&self) -> u8 {
        self.id
    }

    pub fn output_format(&self) -> PcmFormat {
        self.output_format
    }

    pub fn buffer(&self) -> &Arc<RingBuffer> {
        &self.buffer
    }

    /// Format of the most recent buffer appended to this track.
    pub fn input_format(&self) -> Option<PcmFormat> {
        lock(&self.ingress).input_format
    }

    pub fn settings(&self) -> TrackSettings {
        lock(&self.settings).clone()
    }

    /// Replace the settings; picked up by the next append.
    pub fn set_settings(&self, settings: TrackSettings) {
        *lock(&self.settings) = settings;
    }

    /// Normalize `buffer` to the output format.
    ///
    /// Returns the converted audio and its time on the output timeline. When
    /// `when` is absent the track continues from the end of its previous
    /// buffer, starting at sample time zero without a host time.
    pub fn append(
        &self,
        buffer: &PcmBuffer,
        when: Option<AudioTime>,
    ) -> Result<(PcmBuffer, AudioTime), ConversionError> {
        let settings = self.settings();
        let input = buffer.format();

        let when = {
            let mut ingress = lock(&self.ingress);
            ingress.input_format = Some(input);
            let when = when
                .or(ingress.next_time)
                .unwrap_or_else(|| AudioTime::from_sample_time(0, input.sample_rate));
            let when = when.rescaled(input.sample_rate);
            ingress.next_time = Some(when.advanced_by(buffer.frame_count() as u64));
            when
        };

        let converted = convert_buffer(buffer, self.output_format, &settings)?;
        Ok((converted, when.rescaled(self.output_format.sample_rate)))
    }

    /// Queue converted samples for the next render pull.
    pub fn enqueue(&self, buffer: &PcmBuffer) {
        if let Some(samples) = buffer.as_f32() {
            self.buffer.append(samples);
        }
    }
}
