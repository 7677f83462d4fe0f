//! Adaptive bitrate boundary.
//!
//! The streaming layer reports periodic throughput samples to a
//! [`BitRateStrategy`], split into sufficient and insufficient bandwidth
//! events. Nothing here depends on the mixing engine.

use serde::{Deserialize, Serialize};

/// One periodic throughput sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitRateStats {
    pub queued_bytes_out: i64,
    pub bytes_in_per_second: i32,
    pub bytes_out_per_second: i32,
}

/// Reacts to bandwidth events, typically by adjusting encoder bitrates.
pub trait BitRateStrategy: Send {
    /// Ceiling for the video encoder in bits per second; zero when unmanaged.
    fn maximum_video_bit_rate(&self) -> u32;

    /// Ceiling for the audio encoder in bits per second; zero when unmanaged.
    fn maximum_audio_bit_rate(&self) -> u32;

    /// Reset internal state when a stream starts publishing.
    fn set_up(&mut self);

    fn sufficient_bandwidth(&mut self, stats: BitRateStats);

    fn insufficient_bandwidth(&mut self, stats: BitRateStats);
}

/// Leaves every bitrate alone.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopBitRateStrategy;

impl BitRateStrategy for NoopBitRateStrategy {
    fn maximum_video_bit_rate(&self) -> u32 {
        0
    }

    fn maximum_audio_bit_rate(&self) -> u32 {
        0
    }

    fn set_up(&mut self) {}

    fn sufficient_bandwidth(&mut self, stats: BitRateStats) {
        log::trace!("sufficient bandwidth ignored: {:?}", stats);
    }

    fn insufficient_bandwidth(&mut self, stats: BitRateStats) {
        log::trace!("insufficient bandwidth ignored: {:?}", stats);
    }
}

/// Drops the video bitrate to the measured throughput when bandwidth runs
/// short and climbs back in tenths of the maximum once it has been
/// sufficient for [`VideoAdaptiveBitRateStrategy::SUFFICIENT_THRESHOLD`]
/// consecutive samples.
#[derive(Debug, Clone)]
pub struct VideoAdaptiveBitRateStrategy {
    maximum_video_bit_rate: u32,
    audio_bit_rate: u32,
    video_bit_rate: u32,
    sufficient_counts: u32,
    stalled_counts: u32,
}

impl VideoAdaptiveBitRateStrategy {
    pub const SUFFICIENT_THRESHOLD: u32 = 15;

    pub fn new(maximum_video_bit_rate: u32, audio_bit_rate: u32) -> Self {
        Self {
            maximum_video_bit_rate,
            audio_bit_rate,
            video_bit_rate: maximum_video_bit_rate,
            sufficient_counts: 0,
            stalled_counts: 0,
        }
    }

    /// Bitrate the video encoder should currently use.
    pub fn video_bit_rate(&self) -> u32 {
        self.video_bit_rate
    }

    fn floor(&self) -> u32 {
        self.maximum_video_bit_rate / 10
    }
}

impl BitRateStrategy for VideoAdaptiveBitRateStrategy {
    fn maximum_video_bit_rate(&self) -> u32 {
        self.maximum_video_bit_rate
    }

    fn maximum_audio_bit_rate(&self) -> u32 {
        0
    }

    fn set_up(&mut self) {
        self.stalled_counts = 0;
        self.video_bit_rate = self.maximum_video_bit_rate;
    }

    fn sufficient_bandwidth(&mut self, _stats: BitRateStats) {
        if self.video_bit_rate == self.maximum_video_bit_rate {
            return;
        }
        if self.sufficient_counts >= Self::SUFFICIENT_THRESHOLD {
            self.video_bit_rate = self
                .video_bit_rate
                .saturating_add(self.floor())
                .min(self.maximum_video_bit_rate);
            log::debug!("video bitrate raised to {}", self.video_bit_rate);
        } else {
            self.sufficient_counts += 1;
        }
    }

    fn insufficient_bandwidth(&mut self, stats: BitRateStats) {
        if stats.bytes_out_per_second <= 0 {
            self.stalled_counts += 1;
            log::debug!("no outgoing bytes for {} samples", self.stalled_counts);
            return;
        }
        let measured =
            (stats.bytes_out_per_second as u32).saturating_mul(8) / (self.stalled_counts + 1);
        self.video_bit_rate = measured
            .saturating_sub(self.audio_bit_rate)
            .max(self.floor());
        self.sufficient_counts = 0;
        self.stalled_counts = 0;
        log::debug!("video bitrate lowered to {}", self.video_bit_rate);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(bytes_out_per_second: i32) -> BitRateStats {
        BitRateStats {
            queued_bytes_out: 64_000,
            bytes_in_per_second: 1_000,
            bytes_out_per_second,
        }
    }

    #[test]
    fn noop_strategy_manages_nothing() {
        let mut strategy: Box<dyn BitRateStrategy> = Box::new(NoopBitRateStrategy);
        strategy.set_up();
        strategy.sufficient_bandwidth(stats(16_000));
        strategy.insufficient_bandwidth(stats(0));
        assert_eq!(strategy.maximum_video_bit_rate(), 0);
        assert_eq!(strategy.maximum_audio_bit_rate(), 0);
    }

    #[test]
    fn insufficient_bandwidth_follows_measured_throughput() {
        let mut strategy = VideoAdaptiveBitRateStrategy::new(2_000_000, 128_000);
        strategy.set_up();
        assert_eq!(strategy.video_bit_rate(), 2_000_000);

        strategy.insufficient_bandwidth(stats(100_000));
        assert_eq!(strategy.video_bit_rate(), 800_000 - 128_000);

        strategy.insufficient_bandwidth(stats(10_000));
        assert_eq!(strategy.video_bit_rate(), 200_000);
    }

    #[test]
    fn stalled_samples_divide_the_next_measurement() {
        let mut strategy = VideoAdaptiveBitRateStrategy::new(2_000_000, 0);
        strategy.insufficient_bandwidth(stats(0));
        strategy.insufficient_bandwidth(stats(0));
        assert_eq!(strategy.video_bit_rate(), 2_000_000);

        strategy.insufficient_bandwidth(stats(150_000));
        assert_eq!(strategy.video_bit_rate(), 400_000);
    }

    #[test]
    fn sufficient_bandwidth_recovers_after_threshold() {
        let mut strategy = VideoAdaptiveBitRateStrategy::new(1_000_000, 0);
        strategy.insufficient_bandwidth(stats(25_000));
        assert_eq!(strategy.video_bit_rate(), 200_000);

        for _ in 0..VideoAdaptiveBitRateStrategy::SUFFICIENT_THRESHOLD {
            strategy.sufficient_bandwidth(stats(25_000));
        }
        assert_eq!(strategy.video_bit_rate(), 200_000);

        strategy.sufficient_bandwidth(stats(25_000));
        assert_eq!(strategy.video_bit_rate(), 300_000);
        for _ in 0..20 {
            strategy.sufficient_bandwidth(stats(25_000));
        }
        assert_eq!(strategy.video_bit_rate(), 1_000_000);
        assert_eq!(strategy.maximum_video_bit_rate(), 1_000_000);
    }
}
