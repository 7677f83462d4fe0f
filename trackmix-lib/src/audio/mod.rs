//! PCM primitives: formats, buffers, timestamps and gain helpers.

pub mod format;
pub mod level;
pub mod pcm;
pub mod time;

pub use format::{PcmFormat, SampleFormat};
pub use pcm::{PcmBuffer, PcmData};
pub use time::AudioTime;
