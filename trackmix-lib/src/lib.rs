//! # Trackmix Audio Library
//!
//! Real-time multi-track PCM mixing. Tracks are normalized to a shared output
//! format, buffered in bounded ring buffers and combined by a pull-based
//! mixing graph whenever the main track delivers audio.

pub mod audio;
pub mod graph;
pub mod mixer;
pub mod net;
mod tools;
pub mod track;

pub use audio::{AudioTime, PcmBuffer, PcmData, PcmFormat, SampleFormat};
pub use graph::{FrameSource, GraphError, GraphFactory, MixOutput, MixingGraph};
pub use mixer::{AudioMixer, MixerError, MixerSettings, OutputFormatPolicy, SettingsError};
pub use net::{BitRateStats, BitRateStrategy, NoopBitRateStrategy, VideoAdaptiveBitRateStrategy};
pub use track::{ConversionError, TrackSettings};
