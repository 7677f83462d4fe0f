//! Serializable mixer configuration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::audio::PcmFormat;
use crate::track::TrackSettings;

use super::error::SettingsError;

/// Highest output sample rate the mixer will produce.
pub const MAXIMUM_SAMPLE_RATE: u32 = 48_000;
/// Highest output channel count the mixer will produce.
pub const MAXIMUM_CHANNELS: u16 = 2;

/// How the output format follows the main track's input format.
///
/// `None` passes the source value through; `Some` fixes it. Either way the
/// result is capped at [`MAXIMUM_SAMPLE_RATE`] and [`MAXIMUM_CHANNELS`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputFormatPolicy {
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,
}

impl OutputFormatPolicy {
    pub fn passthrough() -> Self {
        Self::default()
    }

    pub fn fixed(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate: Some(sample_rate),
            channels: Some(channels),
        }
    }

    /// Derive the canonical output format from the main track's input.
    pub fn output_format(&self, input: &PcmFormat) -> Option<PcmFormat> {
        if !input.is_valid() {
            return None;
        }
        let sample_rate = self
            .sample_rate
            .unwrap_or(input.sample_rate)
            .min(MAXIMUM_SAMPLE_RATE);
        let channels = self.channels.unwrap_or(input.channels).min(MAXIMUM_CHANNELS);
        Some(PcmFormat::f32(sample_rate, channels))
    }

    pub(crate) fn validate(&self) -> Result<(), SettingsError> {
        if self.sample_rate == Some(0) {
            return Err(SettingsError::Invalid("output sample rate must be positive".into()));
        }
        if self.channels == Some(0) {
            return Err(SettingsError::Invalid("output channel count must be positive".into()));
        }
        Ok(())
    }
}

/// Complete mixer configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixerSettings {
    /// Track whose arrivals drive the mix cycle and the output timeline.
    pub main_track: u8,
    /// Silence every emitted buffer.
    pub is_muted: bool,
    pub output_format: OutputFormatPolicy,
    pub tracks: BTreeMap<u8, TrackSettings>,
}

impl MixerSettings {
    /// Parse settings from a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, SettingsError> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let settings = Self::from_json_str(&contents)?;
        log::info!("loaded mixer settings from {}", path.display());
        Ok(settings)
    }

    pub fn to_json_pretty(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check ranges that serde alone cannot express.
    pub fn validate(&self) -> Result<(), SettingsError> {
        self.output_format.validate()?;
        for (id, track) in &self.tracks {
            validate_track(*id, track)?;
        }
        Ok(())
    }
}

pub(crate) fn validate_track(id: u8, settings: &TrackSettings) -> Result<(), SettingsError> {
    if !settings.volume.is_finite() || settings.volume < 0.0 {
        return Err(SettingsError::Invalid(format!(
            "track {} volume must be a finite non-negative gain",
            id
        )));
    }
    if matches!(&settings.channel_map, Some(map) if map.is_empty()) {
        return Err(SettingsError::Invalid(format!(
            "track {} channel map must not be empty",
            id
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::SampleFormat;

    #[test]
    fn passthrough_follows_source_up_to_caps() {
        let policy = OutputFormatPolicy::passthrough();
        let input = PcmFormat::new(44_100, 1, SampleFormat::I16);
        assert_eq!(policy.output_format(&input), Some(PcmFormat::f32(44_100, 1)));

        let wide = PcmFormat::new(96_000, 6, SampleFormat::F32);
        assert_eq!(policy.output_format(&wide), Some(PcmFormat::f32(48_000, 2)));
    }

    #[test]
    fn fixed_fields_override_source() {
        let policy = OutputFormatPolicy {
            sample_rate: Some(44_100),
            channels: None,
        };
        let input = PcmFormat::f32(48_000, 1);
        assert_eq!(policy.output_format(&input), Some(PcmFormat::f32(44_100, 1)));
        assert_eq!(policy.output_format(&PcmFormat::f32(0, 1)), None);
    }

    #[test]
    fn parses_json_with_track_map() {
        let json = r#"{
            "main_track": 1,
            "is_muted": false,
            "output_format": {"sample_rate": 48000, "channels": 2},
            "tracks": {"0": {"volume": "-6db"}, "1": {"is_muted": true}}
        }"#;
        let settings = MixerSettings::from_json_str(json).expect("settings");
        assert_eq!(settings.main_track, 1);
        assert_eq!(settings.output_format, OutputFormatPolicy::fixed(48_000, 2));
        assert!(settings.tracks[&1].is_muted);
        assert!(settings.tracks[&0].volume < 1.0);
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(matches!(
            MixerSettings::from_json_str(r#"{"output_format":{"channels":0}}"#),
            Err(SettingsError::Invalid(_))
        ));
        assert!(matches!(
            MixerSettings::from_json_str(r#"{"tracks":{"2":{"volume":-1.0}}}"#),
            Err(SettingsError::Invalid(_))
        ));
        assert!(matches!(
            MixerSettings::from_json_str("{not json"),
            Err(SettingsError::Parse(_))
        ));
    }

    #[test]
    fn defaults_serialize_and_parse_back() {
        let json = MixerSettings::default().to_json_pretty().expect("json");
        assert!(json.contains("main_track"));
        assert_eq!(
            MixerSettings::from_json_str(&json).expect("parse"),
            MixerSettings::default()
        );
    }
}
