//! Bounded per-track frame queue between ingress and the render pull.

use dasp_ring_buffer::Bounded;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crate::audio::PcmFormat;
use crate::graph::FrameSource;
use crate::tools::lock;

/// Default queue depth in frames.
pub const DEFAULT_BUFFER_FRAMES: usize = 90 * 1024;

/// Bounded FIFO of interleaved float frames in a track's output format.
///
/// One producer (the track's ingress path) and one consumer (the graph pull)
/// share the queue. Both sides only copy samples while the lock is held; the
/// consumer zero-fills any shortfall after releasing it.
pub struct RingBuffer {
    format: PcmFormat,
    channels: usize,
    queue: Mutex<Bounded<Vec<f32>>>,
    dropped_frames: AtomicU64,
    underrun_frames: AtomicU64,
}

impl RingBuffer {
    /// Create a queue holding [`DEFAULT_BUFFER_FRAMES`] frames of `format`.
    pub fn new(format: PcmFormat) -> Self {
        Self::with_capacity(format, DEFAULT_BUFFER_FRAMES)
    }

    pub fn with_capacity(format: PcmFormat, frames: usize) -> Self {
        let channels = (format.channels as usize).max(1);
        let capacity = frames.max(1) * channels;
        Self {
            format,
            channels,
            queue: Mutex::new(Bounded::from(vec![0.0; capacity])),
            dropped_frames: AtomicU64::new(0),
            underrun_frames: AtomicU64::new(0),
        }
    }

    pub fn format(&self) -> PcmFormat {
        self.format
    }

    /// Number of whole frames currently queued.
    pub fn queued_frames(&self) -> usize {
        lock(&self.queue).len() / self.channels
    }

    /// Frames overwritten because the queue was full.
    pub fn dropped_frames(&self) -> u64 {
        self.dropped_frames.load(Ordering::Relaxed)
    }

    /// Frames of silence emitted because the queue ran dry.
    pub fn underrun_frames(&self) -> u64 {
        self.underrun_frames.load(Ordering::Relaxed)
    }

    /// Queue interleaved samples; a trailing partial frame is ignored.
    ///
    /// When the queue is full the oldest frames are overwritten.
    pub fn append(&self, samples: &[f32]) {
        let usable = samples.len() - samples.len() % self.channels;
        let mut overwritten = 0usize;
        {
            let mut queue = lock(&self.queue);
            for &sample in &samples[..usable] {
                if queue.push(sample).is_some() {
                    overwritten += 1;
                }
            }
        }

        if overwritten > 0 {
            let frames = (overwritten / self.channels) as u64;
            self.dropped_frames.fetch_add(frames, Ordering::Relaxed);
            log::warn!("ring buffer full: dropped {} oldest frames", frames);
        }
    }

    /// Fill `out` with queued frames, zero-filling whatever is not available.
    ///
    /// Returns the number of frames taken from the queue. Never blocks on
    /// anything but the copy-only queue lock.
    pub fn render_into(&self, out: &mut [f32]) -> usize {
        let requested = out.len() - out.len() % self.channels;
        let taken = {
            let mut queue = lock(&self.queue);
            let available = queue.len().min(requested);
            let mut taken = 0usize;
            for slot in out[..available].iter_mut() {
                match queue.pop() {
                    Some(sample) => {
                        *slot = sample;
                        taken += 1;
                    }
                    None => break,
                }
            }
            taken
        };

        out[taken..].fill(0.0);
        if taken < requested {
            let missing = ((requested - taken) / self.channels) as u64;
            self.underrun_frames.fetch_add(missing, Ordering::Relaxed);
        }
        taken / self.channels
    }

    /// Render `frames` frames into a fresh vector.
    pub fn render(&self, frames: usize) -> Vec<f32> {
        let mut out = vec![0.0; frames * self.channels];
        self.render_into(&mut out);
        out
    }

    /// Drop every queued frame.
    pub fn clear(&self) {
        let mut queue = lock(&self.queue);
        while queue.pop().is_some() {}
    }
}

impl FrameSource for RingBuffer {
    fn pull(&self, out: &mut [f32]) -> usize {
        self.render_into(out)
    }
}

impl std::fmt::Debug for RingBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RingBuffer")
            .field("format", &self.format)
            .field("queued_frames", &self.queued_frames())
            .field("dropped_frames", &self.dropped_frames())
            .finish()
    }
}
