//! Software mixing graph: sum-then-clamp of every enabled bus.

use std::sync::Weak;

use super::{FrameSource, GraphError, GraphFactory, MixOutput, MixingGraph};
use crate::audio::{PcmBuffer, PcmFormat, SampleFormat};

/// Buses are allocated in groups of this size.
pub const DEFAULT_INPUT_BUS_COUNT: usize = 8;

struct InputBus {
    enabled: bool,
    volume: f32,
    source: Option<Weak<dyn FrameSource>>,
}

impl Default for InputBus {
    fn default() -> Self {
        Self {
            enabled: true,
            volume: 1.0,
            source: None,
        }
    }
}

/// Default host graph.
///
/// Each output sample is `clamp(Σ volume_b · sample_b, -1, 1) · output_volume`
/// over the enabled buses `b`. Buses without a source contribute nothing; a
/// bus whose source was dropped contributes silence and is reported in
/// [`MixOutput::unavailable_buses`].
pub struct SummingGraph {
    format: PcmFormat,
    buses: Vec<InputBus>,
    output_volume: f32,
    connected: bool,
    initialized: bool,
    scratch: Vec<f32>,
}

impl SummingGraph {
    pub fn new(format: PcmFormat) -> Result<Self, GraphError> {
        if !format.is_valid() || format.sample_format != SampleFormat::F32 {
            return Err(GraphError::UnsupportedFormat(format));
        }
        let mut buses = Vec::with_capacity(DEFAULT_INPUT_BUS_COUNT);
        buses.resize_with(DEFAULT_INPUT_BUS_COUNT, InputBus::default);
        Ok(Self {
            format,
            buses,
            output_volume: 1.0,
            connected: false,
            initialized: false,
            scratch: Vec::new(),
        })
    }

    fn bus_mut(&mut self, bus: usize) -> Result<&mut InputBus, GraphError> {
        let count = self.buses.len();
        self.buses
            .get_mut(bus)
            .ok_or(GraphError::BusOutOfRange { bus, count })
    }
}

impl MixingGraph for SummingGraph {
    fn format(&self) -> PcmFormat {
        self.format
    }

    fn set_input_bus_count(&mut self, count: usize) -> Result<(), GraphError> {
        let groups = count.max(1).div_ceil(DEFAULT_INPUT_BUS_COUNT);
        self.buses
            .resize_with(groups * DEFAULT_INPUT_BUS_COUNT, InputBus::default);
        self.initialized = false;
        Ok(())
    }

    fn input_bus_count(&self) -> usize {
        self.buses.len()
    }

    fn set_bus_enabled(&mut self, bus: usize, enabled: bool) -> Result<(), GraphError> {
        self.bus_mut(bus)?.enabled = enabled;
        Ok(())
    }

    fn set_bus_volume(&mut self, bus: usize, volume: f32) -> Result<(), GraphError> {
        self.bus_mut(bus)?.volume = if volume.is_finite() { volume } else { 1.0 };
        Ok(())
    }

    fn set_output_volume(&mut self, volume: f32) -> Result<(), GraphError> {
        self.output_volume = if volume.is_finite() { volume } else { 1.0 };
        Ok(())
    }

    fn connect_input(
        &mut self,
        bus: usize,
        source: Weak<dyn FrameSource>,
    ) -> Result<(), GraphError> {
        self.bus_mut(bus)?.source = Some(source);
        Ok(())
    }

    fn connect_output(&mut self) -> Result<(), GraphError> {
        self.connected = true;
        Ok(())
    }

    fn initialize(&mut self) -> Result<(), GraphError> {
        if !self.connected {
            return Err(GraphError::NotConnected);
        }
        self.initialized = true;
        Ok(())
    }

    fn render(&mut self, frames: usize, _sample_time: i64) -> Result<MixOutput, GraphError> {
        if !self.initialized {
            return Err(GraphError::NotInitialized);
        }

        let len = self.format.samples_for_frames(frames);
        if self.scratch.len() < len {
            self.scratch.resize(len, 0.0);
        }
        let mut mixed = vec![0.0_f32; len];
        let mut unavailable_buses = Vec::new();

        for (index, bus) in self.buses.iter().enumerate() {
            if !bus.enabled {
                continue;
            }
            let Some(source) = bus.source.as_ref() else {
                continue;
            };
            let Some(source) = source.upgrade() else {
                unavailable_buses.push(index);
                continue;
            };
            let scratch = &mut self.scratch[..len];
            source.pull(scratch);
            for (sample, input) in mixed.iter_mut().zip(scratch.iter()) {
                *sample += input * bus.volume;
            }
        }

        for sample in mixed.iter_mut() {
            *sample = sample.clamp(-1.0, 1.0) * self.output_volume;
        }

        Ok(MixOutput {
            buffer: PcmBuffer::from_f32(self.format.sample_rate, self.format.channels, mixed),
            unavailable_buses,
        })
    }
}

/// Factory producing [`SummingGraph`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct SummingGraphFactory;

impl GraphFactory for SummingGraphFactory {
    fn make_graph(&self, format: PcmFormat) -> Result<Box<dyn MixingGraph>, GraphError> {
        Ok(Box::new(SummingGraph::new(format)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    struct Constant(f32);

    impl FrameSource for Constant {
        fn pull(&self, out: &mut [f32]) -> usize {
            out.fill(self.0);
            out.len()
        }
    }

    fn ready_graph(sources: &[Arc<dyn FrameSource>]) -> SummingGraph {
        let mut graph = SummingGraph::new(PcmFormat::f32(48_000, 1)).expect("graph");
        graph.set_input_bus_count(sources.len()).expect("bus count");
        for bus in sources.len()..graph.input_bus_count() {
            graph.set_bus_enabled(bus, false).expect("disable");
        }
        for (bus, source) in sources.iter().enumerate() {
            graph
                .connect_input(bus, Arc::downgrade(source))
                .expect("connect");
        }
        graph.connect_output().expect("output");
        graph.initialize().expect("initialize");
        graph
    }

    #[test]
    fn sums_enabled_buses() {
        let a: Arc<dyn FrameSource> = Arc::new(Constant(0.25));
        let b: Arc<dyn FrameSource> = Arc::new(Constant(0.5));
        let mut graph = ready_graph(&[a.clone(), b.clone()]);
        let output = graph.render(4, 0).expect("render");
        assert_eq!(output.buffer.as_f32(), Some(&[0.75_f32; 4][..]));
        assert!(output.unavailable_buses.is_empty());
    }

    #[test]
    fn clamps_after_summing() {
        let a: Arc<dyn FrameSource> = Arc::new(Constant(0.75));
        let b: Arc<dyn FrameSource> = Arc::new(Constant(0.75));
        let mut graph = ready_graph(&[a.clone(), b.clone()]);
        let output = graph.render(2, 0).expect("render");
        assert_eq!(output.buffer.as_f32(), Some(&[1.0_f32; 2][..]));

        let c: Arc<dyn FrameSource> = Arc::new(Constant(-0.75));
        let d: Arc<dyn FrameSource> = Arc::new(Constant(-0.75));
        let mut graph = ready_graph(&[c.clone(), d.clone()]);
        let output = graph.render(2, 0).expect("render");
        assert_eq!(output.buffer.as_f32(), Some(&[-1.0_f32; 2][..]));
    }

    #[test]
    fn applies_bus_and_output_volume() {
        let a: Arc<dyn FrameSource> = Arc::new(Constant(0.5));
        let b: Arc<dyn FrameSource> = Arc::new(Constant(0.5));
        let mut graph = ready_graph(&[a.clone(), b.clone()]);
        graph.set_bus_volume(1, 0.5).expect("volume");
        graph.set_output_volume(0.5).expect("output volume");
        let output = graph.render(1, 0).expect("render");
        assert_eq!(output.buffer.as_f32(), Some(&[0.375_f32][..]));
    }

    #[test]
    fn dropped_source_reports_unavailable_bus() {
        let a: Arc<dyn FrameSource> = Arc::new(Constant(0.5));
        let b: Arc<dyn FrameSource> = Arc::new(Constant(0.25));
        let mut graph = ready_graph(&[a.clone(), b]);
        let output = graph.render(2, 0).expect("render");
        assert_eq!(output.unavailable_buses, vec![1]);
        assert_eq!(output.buffer.as_f32(), Some(&[0.5_f32; 2][..]));
    }

    #[test]
    fn bus_count_rounds_up_to_groups() {
        let mut graph = SummingGraph::new(PcmFormat::f32(48_000, 2)).expect("graph");
        graph.set_input_bus_count(9).expect("bus count");
        assert_eq!(graph.input_bus_count(), 16);
        assert!(matches!(
            graph.set_bus_enabled(16, false),
            Err(GraphError::BusOutOfRange { bus: 16, count: 16 })
        ));
    }

    #[test]
    fn render_requires_initialization() {
        let mut graph = SummingGraph::new(PcmFormat::f32(48_000, 2)).expect("graph");
        assert_eq!(graph.initialize(), Err(GraphError::NotConnected));
        assert!(matches!(graph.render(1, 0), Err(GraphError::NotInitialized)));
    }

    #[test]
    fn rejects_non_float_formats() {
        let format = PcmFormat::new(48_000, 2, SampleFormat::I16);
        assert!(matches!(
            SummingGraph::new(format),
            Err(GraphError::UnsupportedFormat(_))
        ));
    }
}
