use std::collections::BTreeMap;
use std::sync::Arc;

use crate::audio::PcmFormat;
use crate::track::{Track, TrackSettings};

/// Active tracks keyed by id.
///
/// Iteration is in id order, which is also the bus order of the graph.
#[derive(Debug, Default)]
pub struct TrackRegistry {
    tracks: BTreeMap<u8, Arc<Track>>,
}

impl TrackRegistry {
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn get(&self, id: u8) -> Option<&Arc<Track>> {
        self.tracks.get(&id)
    }

    /// Return `true` when `track` is the registered instance for its id.
    pub fn is_current(&self, track: &Arc<Track>) -> bool {
        self.tracks
            .get(&track.id())
            .map(|current| Arc::ptr_eq(current, track))
            .unwrap_or(false)
    }

    pub fn insert(&mut self, track: Arc<Track>) -> Option<Arc<Track>> {
        self.tracks.insert(track.id(), track)
    }

    pub fn remove(&mut self, id: u8) -> Option<Arc<Track>> {
        self.tracks.remove(&id)
    }

    pub fn ids(&self) -> Vec<u8> {
        self.tracks.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Track>> {
        self.tracks.values()
    }

    /// Replace every track with a fresh one in `format`, keeping ids and
    /// settings. Queued audio in the old tracks is discarded.
    pub fn recreate_all(
        &mut self,
        format: PcmFormat,
        settings_for: impl Fn(u8) -> Option<TrackSettings>,
    ) {
        for (id, track) in self.tracks.iter_mut() {
            let replacement = Track::new(*id, format);
            replacement.set_settings(settings_for(*id).unwrap_or_else(|| track.settings()));
            *track = Arc::new(replacement);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recreate_replaces_instances_and_keeps_settings() {
        let format = PcmFormat::f32(48_000, 2);
        let mut registry = TrackRegistry::default();
        let old = Arc::new(Track::new(3, format));
        old.set_settings(TrackSettings::with_volume(0.25));
        old.buffer().append(&[0.5; 8]);
        registry.insert(old.clone());
        registry.insert(Arc::new(Track::new(1, format)));

        registry.recreate_all(PcmFormat::f32(44_100, 2), |_| None);

        assert_eq!(registry.ids(), vec![1, 3]);
        assert!(!registry.is_current(&old));
        let new = registry.get(3).expect("track 3");
        assert_eq!(new.output_format(), PcmFormat::f32(44_100, 2));
        assert_eq!(new.buffer().queued_frames(), 0);
        assert_eq!(new.settings().volume, 0.25);
    }

    #[test]
    fn remove_drops_the_entry() {
        let mut registry = TrackRegistry::default();
        registry.insert(Arc::new(Track::new(0, PcmFormat::f32(48_000, 1))));
        assert!(registry.remove(0).is_some());
        assert!(registry.remove(0).is_none());
        assert!(registry.is_empty());
    }
}
