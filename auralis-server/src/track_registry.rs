/// Track Registry — a minimal stand-in for the out-of-scope "library
/// database that stores track metadata" (§1 collaborators). The core
/// specifies only the boundary it needs: given a track id, a decoded-file
/// path and a duration. A real deployment swaps this for a call into the
/// actual library service; nothing downstream depends on how the mapping
/// is produced.
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

#[derive(Debug, Clone)]
pub struct TrackInfo {
    pub track_id: u32,
    pub path: PathBuf,
}

pub trait TrackRegistry: Send + Sync {
    fn lookup(&self, track_id: u32) -> Option<TrackInfo>;
}

/// Process-local in-memory registry, populated by whatever wires the
/// server up (tests, a CLI flag, or — in a real deployment — a sync pass
/// against the actual library database).
#[derive(Default)]
pub struct InMemoryTrackRegistry {
    tracks: RwLock<HashMap<u32, TrackInfo>>,
}

impl InMemoryTrackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, track_id: u32, path: impl Into<PathBuf>) {
        self.tracks.write().unwrap().insert(
            track_id,
            TrackInfo {
                track_id,
                path: path.into(),
            },
        );
    }
}

impl TrackRegistry for InMemoryTrackRegistry {
    fn lookup(&self, track_id: u32) -> Option<TrackInfo> {
        self.tracks.read().unwrap().get(&track_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registered_track_resolves() {
        let registry = InMemoryTrackRegistry::new();
        registry.register(42, "/music/track42.flac");
        let info = registry.lookup(42).unwrap();
        assert_eq!(info.path, PathBuf::from("/music/track42.flac"));
    }

    #[test]
    fn unknown_track_is_none() {
        let registry = InMemoryTrackRegistry::new();
        assert!(registry.lookup(999).is_none());
    }
}
