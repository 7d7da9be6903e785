/// Streaming Cache — request orchestration (§4.4/§4.7).
///
/// Coordinates chunk production: hot tier (L1, current track), warm tier
/// (L2, up to `l2_capacity` full-track entries under LRU), an in-flight
/// dedup table so concurrent identical requests share one encode, and a
/// bounded, best-effort prefetch queue drained by a small worker pool
/// (§5: "size = CPU cores - 1, minimum 1").
use std::collections::HashMap;
use std::sync::Arc;

use lru::LruCache;
use md5::{Digest, Md5};
use parking_lot::Mutex as SyncMutex;
use tokio::sync::{mpsc, Mutex as AsyncMutex, Notify};

use auralis_dsp::{
    AdaptiveTargetGenerator, ChunkConfig, ChunkProcessor, FingerprintGenerator, HybridProcessor,
    PcmBuffer, PresetBias,
};

use crate::cache::entry::{ChunkKey, ChunkOrigin, IntensityKey, PresetKey, ProcessedChunk, TrackCacheEntry};
use crate::config::Config;
use crate::error::{AuralisError, Result};
use crate::fingerprint_store::FingerprintStore;
use crate::track_registry::TrackRegistry;
use crate::webm_encoder;

/// Incremented once per real encode in `produce_chunk`. Exists only so the
/// concurrent-dedup test can observe "exactly one encode" directly, per the
/// boundary scenario's own requirement ("observable via a process counter").
#[cfg(test)]
static ENCODE_CALL_COUNT: std::sync::atomic::AtomicUsize = std::sync::atomic::AtomicUsize::new(0);

const MIME_TYPE: &str = "audio/webm; codecs=opus";
/// Approximate L1 byte budget (§4.4: "12 MiB"); enforced loosely by
/// dropping the oldest chunks once the hot entry exceeds it.
const L1_BYTE_BUDGET: usize = 12 * 1024 * 1024;
const DEFAULT_L2_CAPACITY: usize = 2;
const PREFETCH_QUEUE_CAPACITY: usize = 64;
const CONTENT_HASH_PREFIX_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheTier {
    L1,
    L2,
    Miss,
    Original,
}

impl CacheTier {
    pub fn header_value(self) -> &'static str {
        match self {
            CacheTier::L1 => "L1",
            CacheTier::L2 => "L2",
            CacheTier::Miss => "MISS",
            CacheTier::Original => "ORIGINAL",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChunkResponse {
    pub bytes: Arc<Vec<u8>>,
    pub mime_type: &'static str,
    pub tier: CacheTier,
    pub chunk_index: usize,
    pub duration_seconds: f64,
}

#[derive(Debug, Clone)]
pub struct TrackMetadata {
    pub chunk_count: usize,
    pub chunk_duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub total_duration_seconds: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct RequestKey {
    track_id: u32,
    chunk: ChunkKey,
}

type EntryHandle = Arc<AsyncMutex<TrackCacheEntry>>;

struct Inner {
    hot: Option<(u32, EntryHandle)>,
    warm: LruCache<u32, EntryHandle>,
    pending: HashMap<RequestKey, Arc<Notify>>,
}

pub struct StreamingCache {
    inner: SyncMutex<Inner>,
    config: Config,
    track_registry: Arc<dyn TrackRegistry>,
    fingerprint_store: Arc<FingerprintStore>,
    fingerprint_generator: Arc<dyn FingerprintGenerator>,
    target_generator: AdaptiveTargetGenerator,
    prefetch_tx: mpsc::Sender<PrefetchTask>,
}

#[derive(Debug, Clone, Copy)]
struct PrefetchTask {
    track_id: u32,
    chunk_index: usize,
    preset: PresetBias,
    intensity: f32,
    enhanced: bool,
}

impl StreamingCache {
    pub fn new(
        config: Config,
        track_registry: Arc<dyn TrackRegistry>,
        fingerprint_store: Arc<FingerprintStore>,
        fingerprint_generator: Arc<dyn FingerprintGenerator>,
    ) -> Arc<Self> {
        let (prefetch_tx, prefetch_rx) = mpsc::channel(PREFETCH_QUEUE_CAPACITY);

        let cache = Arc::new(Self {
            inner: SyncMutex::new(Inner {
                hot: None,
                warm: LruCache::new(std::num::NonZeroUsize::new(DEFAULT_L2_CAPACITY).unwrap()),
                pending: HashMap::new(),
            }),
            config,
            track_registry,
            fingerprint_store,
            fingerprint_generator,
            target_generator: AdaptiveTargetGenerator::default(),
            prefetch_tx,
        });

        cache.clone().spawn_prefetch_workers(prefetch_rx);
        cache
    }

    fn worker_pool_size() -> usize {
        std::thread::available_parallelism()
            .map(|n| n.get().saturating_sub(1).max(1))
            .unwrap_or(1)
    }

    fn spawn_prefetch_workers(self: Arc<Self>, rx: mpsc::Receiver<PrefetchTask>) {
        let rx = Arc::new(AsyncMutex::new(rx));
        for _ in 0..Self::worker_pool_size() {
            let cache = self.clone();
            let rx = rx.clone();
            tokio::spawn(async move {
                loop {
                    let task = {
                        let mut guard = rx.lock().await;
                        guard.recv().await
                    };
                    let Some(task) = task else { break };
                    tracing::debug!(
                        track_id = task.track_id,
                        chunk = task.chunk_index,
                        "draining prefetch task"
                    );
                    if let Err(e) = cache
                        .get_chunk(task.track_id, task.chunk_index, task.preset, task.intensity, task.enhanced)
                        .await
                    {
                        tracing::debug!(error = %e, "prefetch task did not complete");
                    }
                }
            });
        }
    }

    /// Authoritative metadata for `/metadata` (§6): clients must derive
    /// chunk boundaries from this response, never hardcode a duration.
    pub async fn metadata(&self, track_id: u32) -> Result<TrackMetadata> {
        let entry = self.resolve_entry(track_id).await?.1;
        let guard = entry.lock().await;
        Ok(TrackMetadata {
            chunk_count: guard.total_chunk_count,
            chunk_duration_seconds: self.config.chunk_duration_seconds,
            sample_rate: guard.sample_rate,
            channels: guard.channels,
            total_duration_seconds: guard.total_duration_seconds,
        })
    }

    pub async fn get_chunk(
        &self,
        track_id: u32,
        chunk_index: usize,
        preset: PresetBias,
        intensity: f32,
        enhanced: bool,
    ) -> Result<ChunkResponse> {
        let intensity = intensity.clamp(0.0, 1.0);
        let (tier_hint, entry) = self.resolve_entry(track_id).await?;

        let key = if enhanced {
            ChunkKey::Processed(chunk_index, PresetKey(preset), IntensityKey::quantize(intensity))
        } else {
            ChunkKey::Original(chunk_index)
        };

        {
            let guard = entry.lock().await;
            if chunk_index >= guard.total_chunk_count {
                return Err(AuralisError::NotFound(format!(
                    "chunk {chunk_index} out of range for track {track_id}"
                )));
            }
            if let Some(chunk) = guard.chunks.get(&key) {
                let tier = if enhanced { tier_hint } else { CacheTier::Original };
                let response = ChunkResponse {
                    bytes: chunk.bytes.clone(),
                    mime_type: chunk.mime_type,
                    tier: self.resolve_hit_tier(track_id, tier),
                    chunk_index,
                    duration_seconds: chunk.duration_seconds,
                };
                drop(guard);
                self.schedule_prefetch(track_id, chunk_index + 1, preset, intensity, enhanced);
                return Ok(response);
            }
        }

        let request_key = RequestKey { track_id, chunk: key };
        let produced = self.produce_or_wait(track_id, &entry, request_key, chunk_index, preset, intensity, enhanced).await?;
        self.schedule_prefetch(track_id, chunk_index + 1, preset, intensity, enhanced);
        Ok(produced)
    }

    /// Tier reported for an already-cached chunk: `L1` while the owning
    /// entry is the hot track, `L2` otherwise (it was found in the warm
    /// tier without being promoted to hot).
    fn resolve_hit_tier(&self, track_id: u32, fallback: CacheTier) -> CacheTier {
        let inner = self.inner.lock();
        match &inner.hot {
            Some((id, _)) if *id == track_id => CacheTier::L1,
            _ => {
                if matches!(fallback, CacheTier::Original) {
                    CacheTier::Original
                } else {
                    CacheTier::L2
                }
            }
        }
    }

    async fn produce_or_wait(
        &self,
        track_id: u32,
        entry: &EntryHandle,
        request_key: RequestKey,
        chunk_index: usize,
        preset: PresetBias,
        intensity: f32,
        enhanced: bool,
    ) -> Result<ChunkResponse> {
        // The "is this key already being produced" check and "register as a
        // waiter" step must happen in the same critical section the producer
        // uses to remove the pending entry and call `notify_waiters()` below.
        // `Notify::notify_waiters()` only wakes waiters already registered at
        // the time it runs and buffers nothing, so a waiter that clones the
        // `Arc<Notify>` and calls `.notified()` only *after* releasing this
        // lock can have the wakeup fire in the gap and block forever.
        // `Notified::enable()` registers the waiter synchronously, so calling
        // it before dropping the lock closes that gap.
        let mut inner = self.inner.lock();
        if let Some(existing) = inner.pending.get(&request_key) {
            let notify = existing.clone();
            let notified = notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            drop(inner);

            notified.await;

            let guard = entry.lock().await;
            let chunk = guard
                .chunks
                .get(&request_key.chunk)
                .ok_or_else(|| AuralisError::Internal("producer finished without publishing chunk".into()))?;
            return Ok(ChunkResponse {
                bytes: chunk.bytes.clone(),
                mime_type: chunk.mime_type,
                tier: if enhanced { CacheTier::Miss } else { CacheTier::Original },
                chunk_index,
                duration_seconds: chunk.duration_seconds,
            });
        }
        inner.pending.insert(request_key, Arc::new(Notify::new()));
        drop(inner);

        let result = self
            .produce_chunk(track_id, entry, chunk_index, preset, intensity, enhanced)
            .await;

        {
            let mut inner = self.inner.lock();
            if let Some(notify) = inner.pending.remove(&request_key) {
                notify.notify_waiters();
            }
        }

        result
    }

    async fn produce_chunk(
        &self,
        track_id: u32,
        entry: &EntryHandle,
        chunk_index: usize,
        preset: PresetBias,
        intensity: f32,
        enhanced: bool,
    ) -> Result<ChunkResponse> {
        let track_info = self
            .track_registry
            .lookup(track_id)
            .ok_or_else(|| AuralisError::NotFound(format!("track {track_id} not known")))?;
        let path = track_info.path.clone();

        // `resolve_entry` already decoded and validated this track's sample
        // rate when the entry was created; reuse that buffer rather than
        // hitting the decoder again for every chunk request.
        let pcm = entry.lock().await.decoded_pcm.clone();

        let chunk_processor = self.chunk_processor_for_rate(pcm.sample_rate());
        let (emit_start, emit_end) = chunk_processor
            .emitted_bounds(chunk_index, pcm.frame_count())
            .ok_or_else(|| AuralisError::NotFound(format!("chunk {chunk_index} out of range")))?;
        let start_time_seconds = emit_start as f64 / pcm.sample_rate() as f64;
        let duration_seconds =
            (emit_end - emit_start) as f64 / pcm.sample_rate() as f64;

        let pcm_out = if enhanced {
            let true_peak_ceiling = -0.3;
            let profile = match self.ensure_fingerprint(entry, &path, &pcm).await? {
                Some(fp) => self.target_generator.generate(&fp, preset, intensity, true_peak_ceiling),
                None => auralis_dsp::TargetProfile::neutral(true_peak_ceiling),
            };
            let hybrid = HybridProcessor::new(pcm.sample_rate());
            chunk_processor
                .process_chunk(&pcm, chunk_index, &profile, &hybrid)?
                .pcm
        } else {
            extract_original(&pcm, emit_start, emit_end)
        };

        let frame_count = pcm_out.frame_count();
        #[cfg(test)]
        ENCODE_CALL_COUNT.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let encoded = webm_encoder::encode(&pcm_out)?;

        let chunk = ProcessedChunk {
            chunk_index,
            start_time_seconds,
            duration_seconds,
            frame_count,
            bytes: Arc::new(encoded),
            mime_type: MIME_TYPE,
            origin: if enhanced { ChunkOrigin::Processed } else { ChunkOrigin::Original },
        };

        let key = if enhanced {
            ChunkKey::Processed(chunk_index, PresetKey(preset), IntensityKey::quantize(intensity))
        } else {
            ChunkKey::Original(chunk_index)
        };

        let response = ChunkResponse {
            bytes: chunk.bytes.clone(),
            mime_type: chunk.mime_type,
            tier: if enhanced { CacheTier::Miss } else { CacheTier::Original },
            chunk_index,
            duration_seconds: chunk.duration_seconds,
        };

        {
            let mut guard = entry.lock().await;
            guard.insert(key, chunk);
            self.enforce_l1_budget(&mut guard, track_id);
        }

        Ok(response)
    }

    /// Drop the oldest chunks once a hot entry exceeds the L1 byte budget
    /// (§4.4). Only applies while `track_id` is actually hot; warm-tier
    /// entries are bounded by track count, not per-track size.
    fn enforce_l1_budget(&self, entry: &mut TrackCacheEntry, track_id: u32) {
        let is_hot = matches!(&self.inner.lock().hot, Some((id, _)) if *id == track_id);
        if !is_hot {
            return;
        }
        while entry.total_bytes() > L1_BYTE_BUDGET && entry.chunks.len() > 1 {
            if let Some(&oldest_key) = entry.chunks.keys().next() {
                entry.chunks.remove(&oldest_key);
            } else {
                break;
            }
        }
    }

    /// Resolve the track's `Fingerprint`, in priority order: already on
    /// the entry, on disk in the store, or freshly computed. On a timeout
    /// or generator failure, either degrades to `None` (caller falls back
    /// to the neutral profile, §5) or surfaces `FingerprintUnavailable`
    /// when `strict_fingerprint` is set (§7).
    async fn ensure_fingerprint(
        &self,
        entry: &EntryHandle,
        path: &std::path::Path,
        pcm: &PcmBuffer,
    ) -> Result<Option<auralis_dsp::Fingerprint>> {
        {
            let guard = entry.lock().await;
            if let Some(fp) = guard.fingerprint {
                return Ok(Some(fp));
            }
        }

        let prefix: Vec<u8> = pcm
            .samples()
            .iter()
            .take(CONTENT_HASH_PREFIX_BYTES / 4)
            .flat_map(|s| s.to_le_bytes())
            .collect();
        let store_key = FingerprintStore::key_for(path, &prefix);

        if let Some(fp) = self.fingerprint_store.read(&store_key) {
            entry.lock().await.fingerprint.get_or_insert(fp);
            return Ok(Some(fp));
        }

        let generator = self.fingerprint_generator.clone();
        let left = pcm.channel(0);
        let right = pcm.channel(1);
        let sample_rate = pcm.sample_rate();
        let timeout = std::time::Duration::from_secs(self.config.fingerprint_timeout_seconds);

        let generated = tokio::time::timeout(
            timeout,
            tokio::task::spawn_blocking(move || generator.generate(&left, &right, sample_rate)),
        )
        .await;

        match generated {
            Ok(Ok(fp)) => {
                if let Err(e) = self.fingerprint_store.write(&store_key, &fp) {
                    tracing::warn!(error = %e, "failed to persist fingerprint record");
                }
                entry.lock().await.fingerprint.get_or_insert(fp);
                Ok(Some(fp))
            }
            _ if self.config.strict_fingerprint => Err(AuralisError::FingerprintUnavailable(
                "fingerprint generator timed out or failed".into(),
            )),
            _ => {
                tracing::warn!("fingerprint generator timed out or failed; using neutral profile");
                Ok(None)
            }
        }
    }

    /// Find or create the `TrackCacheEntry` for `track_id`, making it the
    /// new hot (L1) track and demoting the previous hot entry into the
    /// warm (L2) tier, evicting the LRU warm track if that overflows
    /// capacity (§4.4).
    async fn resolve_entry(&self, track_id: u32) -> Result<(CacheTier, EntryHandle)> {
        {
            let mut inner = self.inner.lock();
            if let Some((id, handle)) = &inner.hot {
                if *id == track_id {
                    return Ok((CacheTier::L1, handle.clone()));
                }
            }
            if let Some(handle) = inner.warm.pop(&track_id) {
                if let Some((old_id, old_handle)) = inner.hot.replace((track_id, handle.clone())) {
                    inner.warm.put(old_id, old_handle);
                }
                return Ok((CacheTier::L2, handle));
            }
        }

        let track_info = self
            .track_registry
            .lookup(track_id)
            .ok_or_else(|| AuralisError::NotFound(format!("track {track_id} not known")))?;
        let pcm = crate::audio::loader::load_audio(&track_info.path.to_string_lossy()).await?;
        crate::config::is_supported_sample_rate(pcm.sample_rate())
            .then_some(())
            .ok_or_else(|| {
                AuralisError::InvalidInput(format!("unsupported sample rate {} Hz", pcm.sample_rate()))
            })?;
        let content_hash = content_hash_of(&pcm);
        let total_duration_seconds = pcm.frame_count() as f64 / pcm.sample_rate().max(1) as f64;
        let chunk_processor = self.chunk_processor_for_rate(pcm.sample_rate());
        let total_chunk_count = chunk_processor.chunk_count(pcm.frame_count());
        let sample_rate = pcm.sample_rate();
        let channels = pcm.channels();

        let handle: EntryHandle = Arc::new(AsyncMutex::new(TrackCacheEntry::new(
            track_id,
            content_hash,
            total_duration_seconds,
            total_chunk_count,
            sample_rate,
            channels,
            Arc::new(pcm),
        )));

        let mut inner = self.inner.lock();
        if let Some((old_id, old_handle)) = inner.hot.replace((track_id, handle.clone())) {
            inner.warm.put(old_id, old_handle);
        }
        Ok((CacheTier::Miss, handle))
    }

    fn chunk_processor_for_rate(&self, sample_rate: u32) -> ChunkProcessor {
        ChunkProcessor::new(ChunkConfig::new(self.config.chunk_duration_seconds, 0.25, sample_rate))
    }

    fn schedule_prefetch(&self, track_id: u32, chunk_index: usize, preset: PresetBias, intensity: f32, enhanced: bool) {
        let task = PrefetchTask {
            track_id,
            chunk_index,
            preset,
            intensity,
            enhanced,
        };
        // Lowest-priority work: dropped silently on a full queue (§4.4
        // backpressure — "on-demand requests never pay backpressure").
        let _ = self.prefetch_tx.try_send(task);
    }
}

fn extract_original(pcm: &PcmBuffer, start_frame: usize, end_frame: usize) -> PcmBuffer {
    let channels = pcm.channels() as usize;
    let samples = pcm.samples();
    let slice = &samples[start_frame * channels..end_frame * channels];
    PcmBuffer::new(slice.to_vec(), pcm.sample_rate(), pcm.channels())
        .expect("slice of a valid buffer preserves channel alignment")
}

fn content_hash_of(pcm: &PcmBuffer) -> String {
    let mut hasher = Md5::new();
    let prefix_len = (CONTENT_HASH_PREFIX_BYTES / 4).min(pcm.samples().len());
    for s in &pcm.samples()[..prefix_len] {
        hasher.update(s.to_le_bytes());
    }
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track_registry::InMemoryTrackRegistry;
    use auralis_dsp::DefaultFingerprintGenerator;

    fn test_config(data_root: &std::path::Path) -> Config {
        Config {
            data_root: data_root.to_path_buf(),
            tmp_root: data_root.join("tmp"),
            chunk_duration_seconds: 10.0,
            bind_addr: "127.0.0.1:0".into(),
            strict_fingerprint: false,
            fingerprint_timeout_seconds: 60,
        }
    }

    #[test]
    fn chunk_key_quantizes_intensity_for_dedup() {
        let a = IntensityKey::quantize(0.50001);
        let b = IntensityKey::quantize(0.5);
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn unknown_track_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let cache = StreamingCache::new(
            test_config(dir.path()),
            Arc::new(InMemoryTrackRegistry::new()),
            Arc::new(FingerprintStore::new(dir.path())),
            Arc::new(DefaultFingerprintGenerator),
        );
        let err = cache
            .get_chunk(999, 0, PresetBias::Adaptive, 1.0, true)
            .await
            .unwrap_err();
        assert!(matches!(err, AuralisError::NotFound(_)));
    }

    /// Writes a minimal PCM16 stereo WAV file symphonia can decode, so the
    /// boundary-scenario tests below exercise the real decode -> chunk ->
    /// DSP -> encode path instead of a synthetic `PcmBuffer`.
    fn write_test_wav(path: &std::path::Path, seconds: f64, sample_rate: u32) {
        let frame_count = (seconds * sample_rate as f64) as usize;
        let mut data = Vec::with_capacity(frame_count * 4);
        for i in 0..frame_count {
            let t = i as f32 / sample_rate as f32;
            let sample = (2.0 * std::f32::consts::PI * 220.0 * t).sin() * 0.3;
            let quantized = (sample * i16::MAX as f32) as i16;
            data.extend_from_slice(&quantized.to_le_bytes());
            data.extend_from_slice(&quantized.to_le_bytes());
        }

        let byte_rate = sample_rate * 2 * 2;
        let block_align: u16 = 4;
        let mut wav = Vec::with_capacity(44 + data.len());
        wav.extend_from_slice(b"RIFF");
        wav.extend_from_slice(&(36 + data.len() as u32).to_le_bytes());
        wav.extend_from_slice(b"WAVE");
        wav.extend_from_slice(b"fmt ");
        wav.extend_from_slice(&16u32.to_le_bytes());
        wav.extend_from_slice(&1u16.to_le_bytes()); // PCM
        wav.extend_from_slice(&2u16.to_le_bytes()); // stereo
        wav.extend_from_slice(&sample_rate.to_le_bytes());
        wav.extend_from_slice(&byte_rate.to_le_bytes());
        wav.extend_from_slice(&block_align.to_le_bytes());
        wav.extend_from_slice(&16u16.to_le_bytes()); // bits per sample
        wav.extend_from_slice(b"data");
        wav.extend_from_slice(&(data.len() as u32).to_le_bytes());
        wav.extend_from_slice(&data);

        std::fs::write(path, wav).unwrap();
    }

    fn harness(dir: &std::path::Path, chunk_duration_seconds: f64) -> (Arc<StreamingCache>, std::path::PathBuf) {
        let track_path = dir.join("track.wav");
        write_test_wav(&track_path, 12.0, 44_100);

        let registry = InMemoryTrackRegistry::new();
        registry.register(42, track_path.clone());

        let mut config = test_config(dir);
        config.chunk_duration_seconds = chunk_duration_seconds;

        let cache = StreamingCache::new(
            config,
            Arc::new(registry),
            Arc::new(FingerprintStore::new(dir)),
            Arc::new(DefaultFingerprintGenerator),
        );
        (cache, track_path)
    }

    // Boundary scenario 1 (§8): cold cache, first chunk.
    #[tokio::test]
    async fn cold_cache_first_chunk_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let (cache, _path) = harness(dir.path(), 5.0);

        let response = cache
            .get_chunk(42, 0, PresetBias::Adaptive, 1.0, true)
            .await
            .unwrap();

        assert_eq!(response.tier, CacheTier::Miss);
        assert_eq!(response.mime_type, MIME_TYPE);
        assert!((response.duration_seconds - 5.0).abs() < 1e-6);
        assert_eq!(&response.bytes[0..4], &[0x1A, 0x45, 0xDF, 0xA3]);
    }

    // Boundary scenario 2 (§8): warm cache, repeat.
    #[tokio::test]
    async fn warm_cache_repeat_returns_identical_bytes_and_l1_tier() {
        let dir = tempfile::tempdir().unwrap();
        let (cache, _path) = harness(dir.path(), 5.0);

        let first = cache
            .get_chunk(42, 0, PresetBias::Adaptive, 1.0, true)
            .await
            .unwrap();
        let second = cache
            .get_chunk(42, 0, PresetBias::Adaptive, 1.0, true)
            .await
            .unwrap();

        assert_eq!(second.tier, CacheTier::L1);
        assert_eq!(first.bytes, second.bytes);
    }

    // Boundary scenario 3 (§8): toggling enhanced off changes both the
    // bytes and the reported tier, and warms its own cache slot.
    #[tokio::test]
    async fn toggling_enhanced_off_yields_distinct_bytes_and_tier() {
        let dir = tempfile::tempdir().unwrap();
        let (cache, _path) = harness(dir.path(), 5.0);

        let enhanced = cache
            .get_chunk(42, 0, PresetBias::Adaptive, 1.0, true)
            .await
            .unwrap();
        let original_first = cache
            .get_chunk(42, 0, PresetBias::Adaptive, 1.0, false)
            .await
            .unwrap();
        let original_second = cache
            .get_chunk(42, 0, PresetBias::Adaptive, 1.0, false)
            .await
            .unwrap();

        assert_ne!(enhanced.bytes, original_first.bytes);
        assert_eq!(original_first.tier, CacheTier::Original);
        // Repeat hit: the track is hot (L1) by now, so a cached hit reports
        // L1 even for an `enhanced=false` chunk (§8 scenario 3).
        assert_eq!(original_second.tier, CacheTier::L1);
        assert_eq!(original_first.bytes, original_second.bytes);
    }

    // Boundary scenario 4 (§8): intensity = 0 should be near-identical to
    // the unprocessed original at the PCM level, measured here by encoded
    // byte-size proximity (decoding Opus back out is not worth the
    // machinery for a size-in-the-same-ballpark assertion).
    #[tokio::test]
    async fn zero_intensity_chunk_is_close_in_size_to_original() {
        let dir = tempfile::tempdir().unwrap();
        let (cache, _path) = harness(dir.path(), 5.0);

        let zero_intensity = cache
            .get_chunk(42, 0, PresetBias::Punchy, 0.0, true)
            .await
            .unwrap();
        let original = cache
            .get_chunk(42, 0, PresetBias::Adaptive, 1.0, false)
            .await
            .unwrap();

        let ratio = zero_intensity.bytes.len() as f64 / original.bytes.len() as f64;
        assert!(ratio > 0.5 && ratio < 2.0, "sizes diverged too much: {ratio}");
    }

    // Boundary scenario 5 (§8): out-of-range chunk indices are always 404,
    // never dependent on preset, and well past the end is handled the same.
    #[tokio::test]
    async fn out_of_range_chunk_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let (cache, _path) = harness(dir.path(), 5.0);

        // 12s track at 5s chunks -> 3 chunks, indices 0..=2.
        let at_boundary = cache
            .get_chunk(42, 3, PresetBias::Adaptive, 1.0, true)
            .await
            .unwrap_err();
        let far_out = cache
            .get_chunk(42, 999, PresetBias::Gentle, 1.0, true)
            .await
            .unwrap_err();

        assert!(matches!(at_boundary, AuralisError::NotFound(_)));
        assert!(matches!(far_out, AuralisError::NotFound(_)));
    }

    // Boundary scenario 6 (§8): 50 concurrent identical requests on a cold
    // cache collapse into exactly one encode, and every caller sees the
    // same bytes.
    #[tokio::test]
    async fn concurrent_identical_requests_dedup_to_one_encode() {
        let dir = tempfile::tempdir().unwrap();
        let (cache, _path) = harness(dir.path(), 5.0);

        let before = ENCODE_CALL_COUNT.load(std::sync::atomic::Ordering::SeqCst);

        let mut handles = Vec::new();
        for _ in 0..50 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get_chunk(42, 1, PresetBias::Adaptive, 1.0, true)
                    .await
                    .unwrap()
            }));
        }
        let mut responses = Vec::new();
        for handle in handles {
            responses.push(handle.await.unwrap());
        }

        let after = ENCODE_CALL_COUNT.load(std::sync::atomic::Ordering::SeqCst);
        assert_eq!(after - before, 1);

        let first_bytes = &responses[0].bytes;
        assert!(responses.iter().all(|r| &r.bytes == first_bytes));
    }
}
