//! Mixing graph contract: build, connect and pull.
//!
//! A graph is provided by the host. It owns one input bus per active track,
//! sums whatever its buses pull on each render and hands the result to an
//! output stage. Buses reference their audio through [`FrameSource`]s held as
//! [`Weak`] pointers, so a graph never keeps a track alive.

use std::sync::Weak;
use thiserror::Error;

use crate::audio::{PcmBuffer, PcmFormat};

mod summing;

pub use summing::{SummingGraph, SummingGraphFactory, DEFAULT_INPUT_BUS_COUNT};

/// Something a bus can pull frames from during a render.
///
/// `pull` fills the whole of `out` (interleaved, in the graph's format),
/// writing silence for anything it cannot supply, and returns the number of
/// real frames provided. It runs on the render path: no blocking beyond a
/// copy-only critical section, no allocation, no I/O.
pub trait FrameSource: Send + Sync {
    fn pull(&self, out: &mut [f32]) -> usize;
}

/// Failure while building or rendering a mixing graph.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GraphError {
    #[error("unsupported graph format {0}")]
    UnsupportedFormat(PcmFormat),
    #[error("bus {bus} out of range (bus count {count})")]
    BusOutOfRange { bus: usize, count: usize },
    #[error("output stage is not connected")]
    NotConnected,
    #[error("graph is not initialized")]
    NotInitialized,
    #[error("graph host error: {0}")]
    Host(String),
}

/// Result of one render cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct MixOutput {
    /// Combined audio in the graph's format.
    pub buffer: PcmBuffer,
    /// Enabled buses whose source was gone and contributed silence.
    pub unavailable_buses: Vec<usize>,
}

/// A summation stage feeding an output stage.
///
/// Configuration calls happen while the graph is being (re)built; only
/// [`MixingGraph::render`] runs per cycle.
pub trait MixingGraph: Send {
    /// Format shared by every bus and the output stage.
    fn format(&self) -> PcmFormat;

    /// Request at least `count` input buses. Hosts may round up.
    fn set_input_bus_count(&mut self, count: usize) -> Result<(), GraphError>;

    fn input_bus_count(&self) -> usize;

    fn set_bus_enabled(&mut self, bus: usize, enabled: bool) -> Result<(), GraphError>;

    fn set_bus_volume(&mut self, bus: usize, volume: f32) -> Result<(), GraphError>;

    fn set_output_volume(&mut self, volume: f32) -> Result<(), GraphError>;

    /// Attach the pull source for `bus`.
    fn connect_input(&mut self, bus: usize, source: Weak<dyn FrameSource>)
        -> Result<(), GraphError>;

    /// Connect the summation stage to the output stage.
    fn connect_output(&mut self) -> Result<(), GraphError>;

    /// Initialize both stages; must follow `connect_output`.
    fn initialize(&mut self) -> Result<(), GraphError>;

    /// Pull every enabled bus for `frames` frames and return the sum.
    fn render(&mut self, frames: usize, sample_time: i64) -> Result<MixOutput, GraphError>;
}

/// Builds graphs for the coordinator, once per rebuild.
pub trait GraphFactory: Send + Sync {
    fn make_graph(&self, format: PcmFormat) -> Result<Box<dyn MixingGraph>, GraphError>;
}
