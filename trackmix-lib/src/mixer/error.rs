use thiserror::Error;

use crate::graph::GraphError;
use crate::track::ConversionError;

/// Recoverable failure reported through the mixer's error handler.
///
/// None of these end the session: the mixer keeps accepting appends and
/// either bypasses or waits for the next successful graph rebuild.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MixerError {
    /// A bus pulled from a source that no longer exists.
    #[error("unable to provide input data for bus {bus}")]
    UnableToProvideInputData { bus: usize },
    #[error("mixing graph setup failed: {0}")]
    GraphSetupFailed(#[source] GraphError),
    #[error("track {track} conversion failed: {source}")]
    ConversionFailed {
        track: u8,
        #[source]
        source: ConversionError,
    },
    #[error("mix cycle failed: {0}")]
    MixFailed(#[source] GraphError),
}

/// Failure loading or validating [`MixerSettings`](super::MixerSettings).
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid settings json: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid settings: {0}")]
    Invalid(String),
}
