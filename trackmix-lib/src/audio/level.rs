//! Gain helpers: dB conversion and lenient gain deserialization.

use serde::de::{Error as DeError, Visitor};
use serde::Deserializer;
use std::fmt;

/// Convert a dB value to linear gain.
pub fn db_to_linear(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// Peak absolute sample value of an interleaved block.
pub fn peak(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0_f32, |peak, s| peak.max(s.abs()))
}

/// Deserialize a linear gain that may also be written as a dB string
/// (`0.5`, `"0.5"`, `"-6db"`).
pub fn deserialize_linear_gain<'de, D>(deserializer: D) -> Result<f32, D::Error>
where
    D: Deserializer<'de>,
{
    struct GainVisitor;

    impl<'de> Visitor<'de> for GainVisitor {
        type Value = f32;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a number or a string like \"-6db\"")
        }

        fn visit_f64<E>(self, value: f64) -> Result<Self::Value, E>
        where
            E: DeError,
        {
            Ok(value as f32)
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: DeError,
        {
            Ok(value as f32)
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: DeError,
        {
            Ok(value as f32)
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: DeError,
        {
            parse_linear_or_db(value)
                .ok_or_else(|| DeError::custom(format!("invalid gain value \"{}\"", value)))
        }
    }

    deserializer.deserialize_any(GainVisitor)
}

fn parse_linear_or_db(value: &str) -> Option<f32> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    let lower = trimmed.to_ascii_lowercase();
    if let Some(db) = lower.strip_suffix("db") {
        return db.trim().parse::<f32>().ok().map(db_to_linear);
    }
    lower.parse::<f32>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(serde::Deserialize)]
    struct Gain {
        #[serde(deserialize_with = "deserialize_linear_gain")]
        gain: f32,
    }

    #[test]
    fn db_converts_to_linear_gain() {
        assert_eq!(db_to_linear(0.0), 1.0);
        assert!((db_to_linear(-6.0) - 0.501_187).abs() < 1e-5);
        assert!((db_to_linear(20.0) - 10.0).abs() < 1e-4);
    }

    #[test]
    fn gain_accepts_numbers_and_db_strings() {
        let plain: Gain = serde_json::from_str(r#"{"gain":0.5}"#).expect("number");
        assert_eq!(plain.gain, 0.5);

        let db: Gain = serde_json::from_str(r#"{"gain":"-6dB"}"#).expect("db string");
        assert!((db.gain - db_to_linear(-6.0)).abs() < 1e-6);

        assert!(serde_json::from_str::<Gain>(r#"{"gain":"loud"}"#).is_err());
    }

    #[test]
    fn peak_tracks_absolute_maximum() {
        assert_eq!(peak(&[0.1, -0.7, 0.3]), 0.7);
        assert_eq!(peak(&[]), 0.0);
    }
}
