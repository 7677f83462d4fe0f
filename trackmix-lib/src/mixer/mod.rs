//! Multi-track mixing coordinator.
//!
//! [`AudioMixer`] accepts PCM from any number of tracks, normalizes each to a
//! shared output format and combines them into a single stream. Arrivals on
//! the main track drive the mix cycle; with a single active track the graph
//! is bypassed and the converted buffer is emitted as is.

mod clock;
mod error;
mod registry;
mod settings;

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use crate::audio::{AudioTime, PcmBuffer, PcmFormat};
use crate::graph::{FrameSource, GraphError, GraphFactory, MixingGraph, SummingGraphFactory};
use crate::tools::lock;
use crate::track::{ConversionError, Track, TrackSettings};

pub use clock::SampleClock;
pub use error::{MixerError, SettingsError};
pub use registry::TrackRegistry;
pub use settings::{MixerSettings, OutputFormatPolicy, MAXIMUM_CHANNELS, MAXIMUM_SAMPLE_RATE};

/// Receives every emitted buffer together with its wall-clock time.
pub type OutputHandler = Arc<dyn Fn(PcmBuffer, AudioTime) + Send + Sync>;
/// Receives recoverable failures.
pub type ErrorHandler = Arc<dyn Fn(MixerError) + Send + Sync>;

/// Outcome collected under the state lock and delivered after it is released.
enum MixerEvent {
    Output(PcmBuffer, AudioTime),
    Error(MixerError),
}

#[derive(Default)]
struct MixerState {
    settings: MixerSettings,
    /// Last observed input format of the main track.
    input_format: Option<PcmFormat>,
    output_format: Option<PcmFormat>,
    registry: TrackRegistry,
    graph: Option<Box<dyn MixingGraph>>,
    clock: SampleClock,
}

impl MixerState {
    fn should_mix(&self) -> bool {
        self.registry.len() > 1
    }
}

/// Combines the audio of several tracks into one output stream.
pub struct AudioMixer {
    state: Mutex<MixerState>,
    factory: Box<dyn GraphFactory>,
    output_handler: Mutex<Option<OutputHandler>>,
    error_handler: Mutex<Option<ErrorHandler>>,
}

impl Default for AudioMixer {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioMixer {
    /// Create a mixer backed by the built-in [`SummingGraphFactory`].
    pub fn new() -> Self {
        Self::with_factory(SummingGraphFactory)
    }

    pub fn with_factory(factory: impl GraphFactory + 'static) -> Self {
        Self {
            state: Mutex::new(MixerState::default()),
            factory: Box::new(factory),
            output_handler: Mutex::new(None),
            error_handler: Mutex::new(None),
        }
    }

    /// Create a mixer with `settings` applied up front.
    pub fn with_settings(settings: MixerSettings) -> Result<Self, SettingsError> {
        let mixer = Self::new();
        mixer.set_settings(settings)?;
        Ok(mixer)
    }

    pub fn set_output_handler<F>(&self, handler: F)
    where
        F: Fn(PcmBuffer, AudioTime) + Send + Sync + 'static,
    {
        *lock(&self.output_handler) = Some(Arc::new(handler));
    }

    pub fn set_error_handler<F>(&self, handler: F)
    where
        F: Fn(MixerError) + Send + Sync + 'static,
    {
        *lock(&self.error_handler) = Some(Arc::new(handler));
    }

    /// Feed one buffer of `track_id`'s audio.
    ///
    /// Buffers on the main track define the input format and, while more
    /// than one track is active, run one mix cycle of the same length.
    /// Buffers for other tracks that arrive before the output format is known
    /// are dropped. A main-track buffer with an invalid format is reported
    /// and leaves the established formats untouched.
    pub fn append(&self, track_id: u8, buffer: PcmBuffer, when: Option<AudioTime>) {
        let mut events = Vec::new();

        let track = {
            let mut state = lock(&self.state);
            if track_id == state.settings.main_track {
                let format = buffer.format();
                if !format.is_valid() {
                    drop(state);
                    log::warn!("track {} has invalid format {}", track_id, format);
                    self.dispatch(vec![MixerEvent::Error(MixerError::ConversionFailed {
                        track: track_id,
                        source: ConversionError::InvalidFormat(format),
                    })]);
                    return;
                }
                self.observe_main_format(&mut state, format, &mut events);
            }
            self.track_for(&mut state, track_id, &mut events)
        };

        if let Some(track) = track {
            match track.append(&buffer, when) {
                Ok((converted, when)) => self.route(&track, converted, when, &mut events),
                Err(source) => {
                    log::warn!("track {} conversion failed: {}", track_id, source);
                    events.push(MixerEvent::Error(MixerError::ConversionFailed {
                        track: track_id,
                        source,
                    }));
                }
            }
        } else {
            log::debug!(
                "dropping {} frames for track {}: output format not established",
                buffer.frame_count(),
                track_id
            );
        }

        self.dispatch(events);
    }

    /// Remove a track and its queued audio. Returns `false` for unknown ids.
    pub fn remove_track(&self, track_id: u8) -> bool {
        let mut events = Vec::new();
        let removed = {
            let mut state = lock(&self.state);
            let removed = state.registry.remove(track_id).is_some();
            if removed {
                log::debug!("removed track {}", track_id);
                self.rebuild(&mut state, &mut events);
            }
            removed
        };
        self.dispatch(events);
        removed
    }

    pub fn settings(&self) -> MixerSettings {
        lock(&self.state).settings.clone()
    }

    /// Replace the whole configuration.
    ///
    /// Track settings reach existing tracks without discarding their queued
    /// audio. The graph is rebuilt only when the derived output format
    /// changes.
    pub fn set_settings(&self, settings: MixerSettings) -> Result<(), SettingsError> {
        settings.validate()?;
        let mut events = Vec::new();
        {
            let mut state = lock(&self.state);
            let main_changed = state.settings.main_track != settings.main_track;
            for (id, track_settings) in &settings.tracks {
                if let Some(track) = state.registry.get(*id) {
                    track.set_settings(track_settings.clone());
                }
            }
            state.settings = settings;
            if main_changed {
                self.adopt_main_track(&mut state);
            }
            self.refresh_output_format(&mut state, &mut events);
        }
        self.dispatch(events);
        Ok(())
    }

    /// Write one track's settings, creating the track once the output
    /// format is known.
    pub fn set_track_settings(
        &self,
        track_id: u8,
        track_settings: TrackSettings,
    ) -> Result<(), SettingsError> {
        settings::validate_track(track_id, &track_settings)?;
        let mut events = Vec::new();
        {
            let mut state = lock(&self.state);
            state
                .settings
                .tracks
                .insert(track_id, track_settings.clone());
            if let Some(track) = state.registry.get(track_id) {
                track.set_settings(track_settings);
            } else {
                self.track_for(&mut state, track_id, &mut events);
            }
        }
        self.dispatch(events);
        Ok(())
    }

    pub fn set_main_track(&self, track_id: u8) {
        let mut events = Vec::new();
        {
            let mut state = lock(&self.state);
            if state.settings.main_track == track_id {
                return;
            }
            state.settings.main_track = track_id;
            self.adopt_main_track(&mut state);
            self.refresh_output_format(&mut state, &mut events);
        }
        self.dispatch(events);
    }

    /// Silence (or restore) every emitted buffer.
    pub fn set_muted(&self, muted: bool) {
        lock(&self.state).settings.is_muted = muted;
    }

    pub fn set_output_format_policy(&self, policy: OutputFormatPolicy) -> Result<(), SettingsError> {
        policy.validate()?;
        let mut events = Vec::new();
        {
            let mut state = lock(&self.state);
            state.settings.output_format = policy;
            self.refresh_output_format(&mut state, &mut events);
        }
        self.dispatch(events);
        Ok(())
    }

    pub fn number_of_tracks(&self) -> usize {
        lock(&self.state).registry.len()
    }

    /// Return `true` when more than one track is active.
    pub fn should_mix(&self) -> bool {
        lock(&self.state).should_mix()
    }

    pub fn output_format(&self) -> Option<PcmFormat> {
        lock(&self.state).output_format
    }

    /// Last observed input format of every track that has received audio.
    pub fn input_formats(&self) -> BTreeMap<u8, PcmFormat> {
        let state = lock(&self.state);
        state
            .registry
            .iter()
            .filter_map(|track| track.input_format().map(|format| (track.id(), format)))
            .collect()
    }

    /// Return `true` when mixing is required and a graph is ready for it.
    pub fn is_mixing_ready(&self) -> bool {
        let state = lock(&self.state);
        state.should_mix() && state.graph.is_some()
    }

    /// Frames waiting in `track_id`'s buffer.
    pub fn queued_frames(&self, track_id: u8) -> Option<usize> {
        lock(&self.state)
            .registry
            .get(track_id)
            .map(|track| track.buffer().queued_frames())
    }

    fn observe_main_format(
        &self,
        state: &mut MixerState,
        format: PcmFormat,
        events: &mut Vec<MixerEvent>,
    ) {
        if state.input_format == Some(format) {
            return;
        }
        log::info!("main track input format: {}", format);
        state.input_format = Some(format);
        self.refresh_output_format(state, events);
    }

    /// Take over the input format the new main track last reported.
    fn adopt_main_track(&self, state: &mut MixerState) {
        let main = state.settings.main_track;
        if let Some(format) = state.registry.get(main).and_then(|track| track.input_format()) {
            state.input_format = Some(format);
        }
        state.clock.reset();
        log::info!("main track set to {}", main);
    }

    fn refresh_output_format(&self, state: &mut MixerState, events: &mut Vec<MixerEvent>) {
        let derived = state
            .input_format
            .and_then(|input| state.settings.output_format.output_format(&input));
        let Some(format) = derived else {
            return;
        };
        if state.output_format == Some(format) {
            return;
        }

        log::info!("output format changed to {}", format);
        state.output_format = Some(format);
        let track_settings = state.settings.tracks.clone();
        state
            .registry
            .recreate_all(format, |id| track_settings.get(&id).cloned());
        self.rebuild(state, events);
    }

    /// Look up `track_id`, creating it when the output format is known.
    fn track_for(
        &self,
        state: &mut MixerState,
        track_id: u8,
        events: &mut Vec<MixerEvent>,
    ) -> Option<Arc<Track>> {
        if let Some(track) = state.registry.get(track_id) {
            return Some(track.clone());
        }
        let format = state.output_format?;
        let track = Arc::new(Track::new(track_id, format));
        if let Some(track_settings) = state.settings.tracks.get(&track_id) {
            track.set_settings(track_settings.clone());
        }
        state.registry.insert(track.clone());
        log::debug!("added track {} ({} active)", track_id, state.registry.len());
        self.rebuild(state, events);
        Some(track)
    }

    /// Discard the current graph and, while mixing is required, build a new
    /// one wired to every active track. Starts a new timing epoch either way.
    fn rebuild(&self, state: &mut MixerState, events: &mut Vec<MixerEvent>) {
        state.graph = None;
        state.clock.reset();
        if !state.should_mix() {
            return;
        }
        let Some(format) = state.output_format else {
            return;
        };
        match self.build_graph(&state.registry, format) {
            Ok(graph) => {
                log::info!(
                    "mixing graph ready: {} tracks on {} buses at {}",
                    state.registry.len(),
                    graph.input_bus_count(),
                    format
                );
                state.graph = Some(graph);
            }
            Err(err) => {
                log::warn!("mixing graph setup failed: {}", err);
                events.push(MixerEvent::Error(MixerError::GraphSetupFailed(err)));
            }
        }
    }

    fn build_graph(
        &self,
        registry: &TrackRegistry,
        format: PcmFormat,
    ) -> Result<Box<dyn MixingGraph>, GraphError> {
        let mut graph = self.factory.make_graph(format)?;
        graph.set_input_bus_count(registry.len())?;

        for bus in registry.len()..graph.input_bus_count() {
            graph.set_bus_enabled(bus, false)?;
        }
        for (bus, track) in registry.iter().enumerate() {
            let buffer = Arc::clone(track.buffer());
            let buffer: Arc<dyn FrameSource> = buffer;
            graph.set_bus_enabled(bus, true)?;
            graph.set_bus_volume(bus, 1.0)?;
            graph.connect_input(bus, Arc::downgrade(&buffer))?;
        }

        graph.set_output_volume(1.0)?;
        graph.connect_output()?;
        graph.initialize()?;
        Ok(graph)
    }

    /// Deliver converted audio: straight out when bypassing, otherwise into
    /// the track's buffer and, for the main track, through one mix cycle.
    fn route(
        &self,
        track: &Arc<Track>,
        converted: PcmBuffer,
        when: AudioTime,
        events: &mut Vec<MixerEvent>,
    ) {
        let mut state = lock(&self.state);
        if !state.registry.is_current(track) {
            log::debug!("discarding audio for replaced track {}", track.id());
            return;
        }

        if !state.should_mix() {
            let muted = state.settings.is_muted;
            events.push(MixerEvent::Output(converted.muted(muted), when));
            return;
        }

        track.enqueue(&converted);
        if track.id() == state.settings.main_track {
            Self::mix(&mut state, converted.frame_count(), when, events);
        }
    }

    fn mix(state: &mut MixerState, frames: usize, when: AudioTime, events: &mut Vec<MixerEvent>) {
        let Some(format) = state.output_format else {
            return;
        };
        if state.graph.is_none() {
            return;
        }
        if state.clock.is_reset() {
            state.clock.seed(when);
        }
        let sample_time = state.clock.sample_time().unwrap_or(when.sample_time);

        let Some(graph) = state.graph.as_mut() else {
            return;
        };
        let output = match graph.render(frames, sample_time) {
            Ok(output) => output,
            Err(err) => {
                log::warn!("mix cycle failed: {}", err);
                events.push(MixerEvent::Error(MixerError::MixFailed(err)));
                return;
            }
        };
        for bus in output.unavailable_buses {
            events.push(MixerEvent::Error(MixerError::UnableToProvideInputData { bus }));
        }

        let Some(timestamp) = state.clock.timestamp(format.sample_rate) else {
            log::debug!("discarding {} mixed frames without a time anchor", frames);
            state.clock.reset();
            return;
        };

        #[cfg(feature = "debug")]
        log::debug!(
            "mixed {} frames at sample {} (peak {:.3})",
            frames,
            sample_time,
            output
                .buffer
                .as_f32()
                .map(crate::audio::level::peak)
                .unwrap_or(0.0)
        );

        let muted = state.settings.is_muted;
        events.push(MixerEvent::Output(output.buffer.muted(muted), timestamp));
        state.clock.advance(frames);
    }

    fn dispatch(&self, events: Vec<MixerEvent>) {
        if events.is_empty() {
            return;
        }
        let output_handler = lock(&self.output_handler).clone();
        let error_handler = lock(&self.error_handler).clone();
        for event in events {
            match event {
                MixerEvent::Output(buffer, when) => {
                    if let Some(handler) = output_handler.as_ref() {
                        handler(buffer, when);
                    }
                }
                MixerEvent::Error(err) => {
                    if let Some(handler) = error_handler.as_ref() {
                        handler(err);
                    }
                }
            }
        }
    }
}
