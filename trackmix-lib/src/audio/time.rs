//! Sample-time / host-time pairs used to timestamp audio.

use std::time::Duration;

const NANOS_PER_SECOND: i128 = 1_000_000_000;

/// A point on an audio timeline.
///
/// `sample_time` counts frames at `sample_rate`. `host_time` is the wall-clock
/// instant of that frame, measured from an arbitrary host epoch; a time
/// without it can only be placed on the wall clock by extrapolating from an
/// anchor that has one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioTime {
    pub sample_time: i64,
    pub sample_rate: u32,
    pub host_time: Option<Duration>,
}

impl AudioTime {
    pub fn new(sample_time: i64, sample_rate: u32, host_time: Duration) -> Self {
        Self {
            sample_time,
            sample_rate,
            host_time: Some(host_time),
        }
    }

    /// A time known only by its position in samples.
    pub fn from_sample_time(sample_time: i64, sample_rate: u32) -> Self {
        Self {
            sample_time,
            sample_rate,
            host_time: None,
        }
    }

    /// Place this time on the wall clock using `anchor` as the reference.
    ///
    /// Returns `None` when the anchor has no host time, either rate is zero,
    /// or the result would fall before the host epoch.
    pub fn extrapolate_from(&self, anchor: &AudioTime) -> Option<AudioTime> {
        let anchor_host = anchor.host_time?;
        if self.sample_rate == 0 || anchor.sample_rate == 0 {
            return None;
        }
        let anchor_samples =
            rescale_sample_time(anchor.sample_time, anchor.sample_rate, self.sample_rate);
        let delta_frames = self.sample_time as i128 - anchor_samples as i128;
        let delta_nanos = delta_frames * NANOS_PER_SECOND / self.sample_rate as i128;
        let host_nanos = anchor_host.as_nanos() as i128 + delta_nanos;
        let host_nanos = u64::try_from(host_nanos).ok()?;
        Some(AudioTime::new(
            self.sample_time,
            self.sample_rate,
            Duration::from_nanos(host_nanos),
        ))
    }

    /// Express the same instant at another sample rate.
    pub fn rescaled(&self, sample_rate: u32) -> AudioTime {
        if self.sample_rate == sample_rate || self.sample_rate == 0 {
            return AudioTime {
                sample_rate,
                ..*self
            };
        }
        AudioTime {
            sample_time: rescale_sample_time(self.sample_time, self.sample_rate, sample_rate),
            sample_rate,
            host_time: self.host_time,
        }
    }

    /// The time `frames` frames later, carrying the host time along.
    pub fn advanced_by(&self, frames: u64) -> AudioTime {
        let host_time = match (self.host_time, self.sample_rate) {
            (Some(host), rate) if rate > 0 => {
                let nanos = frames as i128 * NANOS_PER_SECOND / rate as i128;
                u64::try_from(nanos)
                    .ok()
                    .and_then(|nanos| host.checked_add(Duration::from_nanos(nanos)))
            }
            _ => None,
        };
        AudioTime {
            sample_time: self.sample_time.saturating_add(frames as i64),
            sample_rate: self.sample_rate,
            host_time,
        }
    }
}

fn rescale_sample_time(sample_time: i64, from_rate: u32, to_rate: u32) -> i64 {
    if from_rate == to_rate || from_rate == 0 {
        return sample_time;
    }
    (sample_time as i128 * to_rate as i128 / from_rate as i128) as i64
}
