use std::path::PathBuf;
use thiserror::Error;

use trackmix_lib::SettingsError;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("failed to read {path}: {source}")]
    ReadWav {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },
    #[error("failed to write {path}: {source}")]
    WriteWav {
        path: PathBuf,
        #[source]
        source: hound::Error,
    },
    #[error("{path}: unsupported {bits}-bit {format} samples")]
    UnsupportedWav {
        path: PathBuf,
        bits: u16,
        format: &'static str,
    },
    #[error("too many inputs: {0} (at most 256 tracks)")]
    TooManyInputs(usize),
    #[error("main track {main} has no input ({tracks} inputs given)")]
    MainTrackOutOfRange { main: u8, tracks: usize },
    #[error("mixer produced no output")]
    NoOutput,
    #[error(transparent)]
    Settings(#[from] SettingsError),
}
