use crate::audio::AudioTime;

/// Frame counter plus wall-clock anchor for one mixing epoch.
///
/// A reset clock has no sample time; the next main-track buffer seeds it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleClock {
    sample_time: Option<i64>,
    anchor: Option<AudioTime>,
}

impl SampleClock {
    pub fn reset(&mut self) {
        self.sample_time = None;
        self.anchor = None;
    }

    pub fn is_reset(&self) -> bool {
        self.sample_time.is_none()
    }

    /// Start an epoch at `when`.
    pub fn seed(&mut self, when: AudioTime) {
        self.sample_time = Some(when.sample_time);
        self.anchor = Some(when);
    }

    pub fn sample_time(&self) -> Option<i64> {
        self.sample_time
    }

    pub fn anchor(&self) -> Option<AudioTime> {
        self.anchor
    }

    /// Wall-clock time of the current sample position, if anchored.
    pub fn timestamp(&self, sample_rate: u32) -> Option<AudioTime> {
        let sample_time = self.sample_time?;
        let anchor = self.anchor.as_ref()?;
        AudioTime::from_sample_time(sample_time, sample_rate).extrapolate_from(anchor)
    }

    pub fn advance(&mut self, frames: usize) {
        if let Some(sample_time) = self.sample_time.as_mut() {
            *sample_time += frames as i64;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn seeded_clock_extrapolates_after_advance() {
        let mut clock = SampleClock::default();
        assert!(clock.is_reset());
        assert_eq!(clock.timestamp(48_000), None);

        clock.seed(AudioTime::new(960, 48_000, Duration::from_secs(3)));
        assert_eq!(
            clock.timestamp(48_000).and_then(|t| t.host_time),
            Some(Duration::from_secs(3))
        );

        clock.advance(480);
        assert_eq!(clock.sample_time(), Some(1_440));
        assert_eq!(
            clock.timestamp(48_000).and_then(|t| t.host_time),
            Some(Duration::from_millis(3_010))
        );

        clock.reset();
        assert!(clock.is_reset());
        assert_eq!(clock.anchor(), None);
    }

    #[test]
    fn unanchored_seed_cannot_timestamp() {
        let mut clock = SampleClock::default();
        clock.seed(AudioTime::from_sample_time(0, 48_000));
        assert!(!clock.is_reset());
        assert_eq!(clock.timestamp(48_000), None);
    }
}
