/// Track Cache Entry and Processed Chunk (§3) — the records the Streaming
/// Cache owns. A `TrackCacheEntry` exclusively owns its `ProcessedChunk`s;
/// the cache exclusively owns entries (§3 "Ownership").
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use auralis_dsp::{Fingerprint, PcmBuffer, PresetBias};

/// `(chunk_index, preset, intensity, origin)` — the key named in §3's
/// Track Cache Entry. Intensity is quantised to 3 decimal places so the
/// key can be hashed/compared; `enhanced=false` requests never vary by
/// preset or intensity, so they get their own variant instead of forcing
/// an arbitrary placeholder into the processed key shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChunkKey {
    Original(usize),
    Processed(usize, PresetKey, IntensityKey),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PresetKey(pub PresetBias);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IntensityKey(pub i32);

impl IntensityKey {
    pub fn quantize(intensity: f32) -> Self {
        Self((intensity.clamp(0.0, 1.0) * 1000.0).round() as i32)
    }
}

/// Content origin tag (§3): whether the bytes are the unmodified decoded
/// source or the output of the Hybrid Processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkOrigin {
    Original,
    Processed,
}

/// One finished audio fragment (§3). Immutable once written; the bytes
/// are reference-counted so handing a cache hit to an HTTP response body
/// never copies the WebM payload.
#[derive(Debug, Clone)]
pub struct ProcessedChunk {
    pub chunk_index: usize,
    pub start_time_seconds: f64,
    pub duration_seconds: f64,
    pub frame_count: usize,
    pub bytes: Arc<Vec<u8>>,
    pub mime_type: &'static str,
    pub origin: ChunkOrigin,
}

impl ProcessedChunk {
    pub fn byte_len(&self) -> usize {
        self.bytes.len()
    }
}

/// Per-track cache state (§3): the Fingerprint once computed, and every
/// chunk produced so far across every `(preset, intensity, origin)`
/// combination a client has asked for.
pub struct TrackCacheEntry {
    pub track_id: u32,
    pub content_hash: String,
    pub total_duration_seconds: f64,
    pub total_chunk_count: usize,
    pub sample_rate: u32,
    pub channels: u16,
    /// The fully decoded source track, kept alongside the entry so the
    /// Chunked Processor's neighbour-overlap reads never re-decode the
    /// file per request. Not part of the spec's literal data model for
    /// this record, just the obvious cache for it (see DESIGN.md).
    pub decoded_pcm: Arc<PcmBuffer>,
    pub fingerprint: Option<Fingerprint>,
    pub chunks: HashMap<ChunkKey, ProcessedChunk>,
    /// `(preset, intensity)` pairs for which every chunk has been
    /// produced at least once.
    complete_pairs: HashSet<(PresetKey, IntensityKey)>,
}

impl TrackCacheEntry {
    pub fn new(
        track_id: u32,
        content_hash: String,
        total_duration_seconds: f64,
        total_chunk_count: usize,
        sample_rate: u32,
        channels: u16,
        decoded_pcm: Arc<PcmBuffer>,
    ) -> Self {
        Self {
            track_id,
            content_hash,
            total_duration_seconds,
            total_chunk_count,
            sample_rate,
            channels,
            decoded_pcm,
            fingerprint: None,
            chunks: HashMap::new(),
            complete_pairs: HashSet::new(),
        }
    }

    pub fn total_bytes(&self) -> usize {
        self.chunks.values().map(|c| c.byte_len()).sum()
    }

    pub fn insert(&mut self, key: ChunkKey, chunk: ProcessedChunk) {
        self.chunks.insert(key, chunk);
        if let ChunkKey::Processed(_, preset, intensity) = key {
            let produced = self
                .chunks
                .keys()
                .filter(|k| matches!(k, ChunkKey::Processed(_, p, i) if *p == preset && *i == intensity))
                .count();
            if produced >= self.total_chunk_count {
                self.complete_pairs.insert((preset, intensity));
            }
        }
    }

    pub fn is_complete(&self, preset: PresetKey, intensity: IntensityKey) -> bool {
        self.complete_pairs.contains(&(preset, intensity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use auralis_dsp::PresetBias;

    fn chunk(i: usize) -> ProcessedChunk {
        ProcessedChunk {
            chunk_index: i,
            start_time_seconds: 0.0,
            duration_seconds: 10.0,
            frame_count: 441_000,
            bytes: Arc::new(vec![0u8; 10]),
            mime_type: "audio/webm; codecs=opus",
            origin: ChunkOrigin::Processed,
        }
    }

    #[test]
    fn completion_tracks_one_pair_at_a_time() {
        let pcm = Arc::new(PcmBuffer::silence(2 * 441_000, 44_100, 2));
        let mut entry = TrackCacheEntry::new(42, "hash".into(), 20.0, 2, 44_100, 2, pcm);
        let preset = PresetKey(PresetBias::Adaptive);
        let intensity = IntensityKey::quantize(1.0);
        assert!(!entry.is_complete(preset, intensity));

        entry.insert(ChunkKey::Processed(0, preset, intensity), chunk(0));
        assert!(!entry.is_complete(preset, intensity));
        entry.insert(ChunkKey::Processed(1, preset, intensity), chunk(1));
        assert!(entry.is_complete(preset, intensity));
    }
}
