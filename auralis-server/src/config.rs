/// Engine-wide configuration, read once at startup from the environment.
///
/// No config-file layer — matches the teacher's lack of one. Every value
/// has a documented default and is clamped to the range the spec commits
/// to rather than failing startup on an out-of-range override.
use std::path::PathBuf;

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8766";
const DEFAULT_CHUNK_DURATION_SECONDS: f64 = 10.0;
const MIN_CHUNK_DURATION_SECONDS: f64 = 5.0;
const MAX_CHUNK_DURATION_SECONDS: f64 = 30.0;

/// Sample rates the Hybrid Processor's filter bank is designed for. The
/// engine refuses anything else rather than silently resampling (§6/§9
/// Open Question: "document the supported set and refuse others
/// explicitly").
pub const SUPPORTED_SAMPLE_RATES: [u32; 2] = [44_100, 48_000];

#[derive(Debug, Clone)]
pub struct Config {
    /// Root directory for the Fingerprint Store's JSON sidecars, never
    /// inside the user's music library (§4.5, §9 "sidecar files forbidden").
    pub data_root: PathBuf,
    /// Scratch directory for the per-chunk PCM temp files the Chunked
    /// Processor hands to the encoder (§4.3); deleted after encode.
    pub tmp_root: PathBuf,
    /// Build-time-tunable chunk duration, clamped to `[5, 30]` s (§4.3).
    pub chunk_duration_seconds: f64,
    /// Local bind address for the axum listener. Internal-only knob, not
    /// part of the distilled spec's documented environment variables.
    pub bind_addr: String,
    /// When true, a `FingerprintUnavailable` timeout surfaces as a 503
    /// instead of the default graceful neutral-profile fallback (§5, §7).
    pub strict_fingerprint: bool,
    /// Timeout budget for the fingerprint generator collaborator (§5).
    pub fingerprint_timeout_seconds: u64,
}

impl Config {
    pub fn from_env() -> Self {
        let data_root = std::env::var("AURALIS_DATA_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::data_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join("auralis")
            });

        let tmp_root = std::env::temp_dir().join("auralis").join("chunks");

        let chunk_duration_seconds = std::env::var("AURALIS_CHUNK_DURATION_SECONDS")
            .ok()
            .and_then(|v| v.parse::<f64>().ok())
            .unwrap_or(DEFAULT_CHUNK_DURATION_SECONDS)
            .clamp(MIN_CHUNK_DURATION_SECONDS, MAX_CHUNK_DURATION_SECONDS);

        let bind_addr =
            std::env::var("AURALIS_BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());

        let strict_fingerprint = std::env::var("AURALIS_STRICT_FINGERPRINT")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let fingerprint_timeout_seconds = std::env::var("AURALIS_FINGERPRINT_TIMEOUT_SECONDS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(60);

        Self {
            data_root,
            tmp_root,
            chunk_duration_seconds,
            bind_addr,
            strict_fingerprint,
            fingerprint_timeout_seconds,
        }
    }

    pub fn fingerprint_store_dir(&self) -> PathBuf {
        self.data_root.join("fingerprints")
    }
}

/// True when `rate` is one the Hybrid Processor's filter bank supports.
pub fn is_supported_sample_rate(rate: u32) -> bool {
    SUPPORTED_SAMPLE_RATES.contains(&rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supported_rates_include_the_common_pair() {
        assert!(is_supported_sample_rate(44_100));
        assert!(is_supported_sample_rate(48_000));
        assert!(!is_supported_sample_rate(22_050));
    }
}
