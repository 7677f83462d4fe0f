use serde::{Deserialize, Serialize};

use crate::audio::level::deserialize_linear_gain;

const DEFAULT_VOLUME: f32 = 1.0;

/// Per-track controls, applied after format conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackSettings {
    /// Linear gain. JSON also accepts dB strings such as `"-6db"`.
    #[serde(deserialize_with = "deserialize_linear_gain")]
    pub volume: f32,
    pub is_muted: bool,
    /// Average input channels when reducing the channel count instead of
    /// keeping the leading channels.
    pub downmix: bool,
    /// Output channel `i` takes input channel `channel_map[i]`.
    pub channel_map: Option<Vec<usize>>,
}

impl TrackSettings {
    pub fn with_volume(volume: f32) -> Self {
        Self {
            volume,
            ..Self::default()
        }
    }
}

impl Default for TrackSettings {
    fn default() -> Self {
        Self {
            volume: DEFAULT_VOLUME,
            is_muted: false,
            downmix: true,
            channel_map: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::level::db_to_linear;

    #[test]
    fn missing_fields_use_defaults() {
        let settings: TrackSettings = serde_json::from_str(r#"{"is_muted":true}"#).expect("json");
        assert!(settings.is_muted);
        assert_eq!(settings.volume, 1.0);
        assert!(settings.downmix);
        assert_eq!(settings.channel_map, None);
    }

    #[test]
    fn volume_accepts_db() {
        let settings: TrackSettings =
            serde_json::from_str(r#"{"volume":"-12db","channel_map":[1,0]}"#).expect("json");
        assert!((settings.volume - db_to_linear(-12.0)).abs() < 1e-6);
        assert_eq!(settings.channel_map, Some(vec![1, 0]));
    }
}
