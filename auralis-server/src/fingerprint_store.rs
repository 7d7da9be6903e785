/// Fingerprint Store — content-addressed disk sidecar cache (§4.5).
///
/// Key = MD5(absolute decoded-audio path ‖ first 1 MiB of decoded content),
/// never the file path alone, so a file replacement at the same path picks
/// up a fresh analysis. Records live under `<data_root>/fingerprints/`,
/// never inside the user's music library (§9). Reads are lock-free;
/// writes are atomic (write-temp-then-rename, §5) so two concurrent
/// writers for the same key are both safe — the later rename simply wins.
use std::path::{Path, PathBuf};

use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};

use auralis_dsp::{ContentClass, Fingerprint};

/// Bumping this invalidates every prior record; the reader rejects a
/// mismatched version rather than attempting a lossy upgrade (§6).
const SCHEMA_VERSION: u32 = 1;

const CONTENT_PREFIX_BYTES: usize = 1024 * 1024;

/// On-disk shape matches §6's documented record format exactly:
/// `content_class` and `confidence` sit alongside `fingerprint` at the
/// top level, not nested inside it, even though both are also carried
/// on the `Fingerprint` value itself.
#[derive(Debug, Serialize, Deserialize)]
struct StoreRecord {
    schema_version: u32,
    key: String,
    created_at: chrono::DateTime<chrono::Utc>,
    fingerprint: Fingerprint,
    content_class: ContentClass,
    confidence: f64,
}

pub struct FingerprintStore {
    root: PathBuf,
}

impl FingerprintStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// MD5 of (absolute path ‖ first 1 MiB of `decoded_content_prefix`).
    /// `decoded_content_prefix` should already be the first MiB worth of
    /// decoded samples' raw byte representation (or any stable prefix the
    /// caller derives) — this function does not re-read the file.
    pub fn key_for(path: &Path, decoded_content_prefix: &[u8]) -> String {
        let mut hasher = Md5::new();
        hasher.update(path.to_string_lossy().as_bytes());
        let n = decoded_content_prefix.len().min(CONTENT_PREFIX_BYTES);
        hasher.update(&decoded_content_prefix[..n]);
        format!("{:x}", hasher.finalize())
    }

    fn record_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }

    /// Look up `key`; `None` on miss, schema mismatch, or a corrupt record
    /// — all three are treated identically by the caller (§4.5 "signal
    /// cache miss").
    pub fn read(&self, key: &str) -> Option<Fingerprint> {
        let path = self.record_path(key);
        let bytes = std::fs::read(&path).ok()?;
        let record: StoreRecord = serde_json::from_slice(&bytes).ok()?;
        if record.schema_version != SCHEMA_VERSION {
            tracing::debug!(key, found = record.schema_version, expected = SCHEMA_VERSION, "fingerprint store schema mismatch");
            return None;
        }
        Some(record.fingerprint)
    }

    /// Same as `read`, but also returns the top-level `content_class` and
    /// `confidence` fields a client inspecting the record file would see
    /// without deserialising the nested `fingerprint` object (§6).
    pub fn read_with_classification(&self, key: &str) -> Option<(Fingerprint, ContentClass, f64)> {
        let path = self.record_path(key);
        let bytes = std::fs::read(&path).ok()?;
        let record: StoreRecord = serde_json::from_slice(&bytes).ok()?;
        if record.schema_version != SCHEMA_VERSION {
            return None;
        }
        Some((record.fingerprint, record.content_class, record.confidence))
    }

    /// Atomically publish `fingerprint` under `key`: write to a sibling
    /// temp file, then rename over the final path. Never writes inside
    /// the user's music directory — `root` is always the app data dir.
    pub fn write(&self, key: &str, fingerprint: &Fingerprint) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.root)?;
        let record = StoreRecord {
            schema_version: SCHEMA_VERSION,
            key: key.to_string(),
            created_at: chrono::Utc::now(),
            fingerprint: *fingerprint,
            content_class: fingerprint.content_class,
            confidence: fingerprint.confidence,
        };
        let body = serde_json::to_vec_pretty(&record)?;

        let final_path = self.record_path(key);
        let tmp_path = self.root.join(format!("{key}.json.tmp-{}", std::process::id()));
        std::fs::write(&tmp_path, &body)?;
        std::fs::rename(&tmp_path, &final_path)?;
        Ok(())
    }

    /// Delete every record. No per-record TTL (§4.5).
    pub fn clear_all(&self) -> std::io::Result<()> {
        if self.root.exists() {
            std::fs::remove_dir_all(&self.root)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_changes_with_path_or_content() {
        let k1 = FingerprintStore::key_for(Path::new("/a/b.flac"), b"hello");
        let k2 = FingerprintStore::key_for(Path::new("/a/c.flac"), b"hello");
        let k3 = FingerprintStore::key_for(Path::new("/a/b.flac"), b"world");
        assert_ne!(k1, k2);
        assert_ne!(k1, k3);
    }

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = FingerprintStore::new(dir.path());
        let fp = Fingerprint::neutral(180.0);
        let key = FingerprintStore::key_for(Path::new("/music/track.flac"), b"abc");

        assert!(store.read(&key).is_none());
        store.write(&key, &fp).unwrap();
        let read_back = store.read(&key).unwrap();
        assert_eq!(read_back, fp);
    }

    #[test]
    fn record_carries_content_class_and_confidence_at_top_level() {
        let dir = tempfile::tempdir().unwrap();
        let store = FingerprintStore::new(dir.path());
        let fp = Fingerprint::neutral(180.0);
        let key = FingerprintStore::key_for(Path::new("/music/track.flac"), b"abc");
        store.write(&key, &fp).unwrap();

        let body = std::fs::read(store.record_path(&key)).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(value.get("content_class").is_some());
        assert!(value.get("confidence").is_some());
        assert!(value.get("fingerprint").is_some());

        let (read_back, content_class, confidence) = store.read_with_classification(&key).unwrap();
        assert_eq!(read_back, fp);
        assert_eq!(content_class, fp.content_class);
        assert_eq!(confidence, fp.confidence);
    }

    #[test]
    fn clear_all_removes_every_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = FingerprintStore::new(dir.path());
        let fp = Fingerprint::neutral(180.0);
        let key = FingerprintStore::key_for(Path::new("/music/track.flac"), b"abc");
        store.write(&key, &fp).unwrap();

        store.clear_all().unwrap();
        assert!(store.read(&key).is_none());
    }
}
