/// Auralis DSP - adaptive audio mastering signal processing in Rust
///
/// A side-effect-free library: every stage consumes a `PcmBuffer` and
/// produces a new one. No IO, no async, no network — those concerns live
/// in `auralis-server`.
///
/// - `pcm`: the shared owned audio buffer type
/// - `biquad_filter`, `eq`: psychoacoustic EQ (stage 1 of the Hybrid Processor)
/// - `envelope`, `compressor`: dynamics (stage 2)
/// - `soft_clip`: saturation (stage 3)
/// - `limiter`: brick-wall lookahead limiting (stage 4)
/// - `stereo_width`: mid/side width adjustment (stage 5)
/// - `hybrid_processor`: the fixed-order chain tying stages 1-5 together
/// - `frequency_analysis`, `spectral_features`, `variation_analysis`,
///   `stereo_analysis`, `tempo`, `onset_detector`: analysis primitives
///   consumed by the fingerprint generator
/// - `fingerprint`, `fingerprint_generator`: the per-track feature summary
/// - `target_profile`, `reference_profiles`, `adaptive_target_generator`:
///   turning a fingerprint into a concrete DSP plan
/// - `chunk_processor`: fixed-duration tiling with crossfade-warmup padding

pub mod error;
pub mod pcm;

pub mod envelope;
pub mod biquad_filter;
pub mod eq;
pub mod compressor;
pub mod soft_clip;
pub mod limiter;
pub mod stereo_width;
pub mod hybrid_processor;

pub mod frequency_analysis;
pub mod spectral_features;
pub mod variation_analysis;
pub mod stereo_analysis;
pub mod tempo;
pub mod onset_detector;

pub mod fingerprint;
pub mod fingerprint_generator;

pub mod target_profile;
pub mod reference_profiles;
pub mod adaptive_target_generator;

pub mod chunk_processor;

pub use error::DspError;
pub use pcm::PcmBuffer;

pub use envelope::{envelope_follow, EnvelopeConfig, EnvelopeFollower};
pub use compressor::{compress, CompressionInfo, Compressor, CompressorConfig, DetectionMode};
pub use limiter::{limit, Limiter, LimiterConfig, LimitingInfo};
pub use eq::{EqRegion, PsychoacousticEq, NUM_BANDS};
pub use soft_clip::SoftClipper;
pub use stereo_width::StereoWidthAdjust;
pub use hybrid_processor::HybridProcessor;

pub use frequency_analysis::{compute_frequency_distribution, FrequencyBands};
pub use spectral_features::{
    audio_to_freq_domain, compute_spectral_centroid, compute_spectral_flatness,
    compute_spectral_rolloff,
};
pub use variation_analysis::{
    compute_dynamic_range_variation, compute_loudness_variation, compute_peak_consistency,
};
pub use stereo_analysis::{compute_phase_correlation, compute_stereo_width, is_stereo};
pub use tempo::detect_tempo;
pub use onset_detector::OnsetDetector;

pub use fingerprint::{ContentClass, Fingerprint};
pub use fingerprint_generator::{compute_fingerprint, DefaultFingerprintGenerator, FingerprintGenerator};

pub use target_profile::{CompressorParams, MakeupMode, PresetBias, TargetProfile};
pub use adaptive_target_generator::{saturate_gain, AdaptiveTargetGenerator};

pub use chunk_processor::{ChunkConfig, ChunkProcessor, ChunkStats, ProcessedChunk};
