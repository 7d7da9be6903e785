/// Target Profile — the concrete, numeric DSP plan the Hybrid Processor
/// tries to hit for one track. Produced by the Adaptive Target Generator
/// (see `adaptive_target_generator`), consumed by `hybrid_processor`.

use crate::eq::NUM_BANDS;
use serde::{Deserialize, Serialize};

/// Categorical modifier applied by the Adaptive Target Generator before
/// saturation. Kept on the profile for logging/traceability only — the
/// DSP stages never branch on it directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PresetBias {
    Adaptive,
    Gentle,
    Warm,
    Bright,
    Punchy,
}

/// How the compressor stage derives its makeup gain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MakeupMode {
    /// Measure integrated loudness of the compressed output and apply a
    /// static gain to hit `integrated_lufs_target`, clamped to [-6, 12] dB.
    Auto,
    /// Apply exactly `g` dB, no measurement.
    Fixed(f32),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CompressorParams {
    pub threshold_db: f32,
    pub ratio: f32,
    pub attack_ms: f32,
    pub release_ms: f32,
    pub makeup_mode: MakeupMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetProfile {
    pub integrated_lufs_target: f32,
    pub true_peak_ceiling_dbtp: f32,
    #[serde(with = "eq_band_serde")]
    pub eq_band_gains_db: [f64; NUM_BANDS],
    pub compressor: CompressorParams,
    pub soft_clip_threshold_db: f32,
    pub stereo_width: f32,
    pub preset_bias: PresetBias,
}

mod eq_band_serde {
    use super::NUM_BANDS;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(bands: &[f64; NUM_BANDS], s: S) -> Result<S::Ok, S::Error> {
        bands.to_vec().serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<[f64; NUM_BANDS], D::Error> {
        let v: Vec<f64> = Vec::deserialize(d)?;
        v.try_into()
            .map_err(|_| serde::de::Error::custom("expected exactly NUM_BANDS gains"))
    }
}

impl TargetProfile {
    /// The transparent (near-no-op) profile used when the fingerprint
    /// collaborator is unreachable or times out (§5 "neutral profile"),
    /// and the profile interpolated toward at intensity = 0.
    pub fn neutral(sample_rate_ceiling_dbtp: f32) -> Self {
        Self {
            integrated_lufs_target: -14.0,
            true_peak_ceiling_dbtp: sample_rate_ceiling_dbtp,
            eq_band_gains_db: [0.0; NUM_BANDS],
            compressor: CompressorParams {
                threshold_db: -20.0,
                ratio: 1.0,
                attack_ms: 10.0,
                release_ms: 100.0,
                makeup_mode: MakeupMode::Fixed(0.0),
            },
            soft_clip_threshold_db: (sample_rate_ceiling_dbtp - 0.2).min(-0.1),
            stereo_width: 1.0,
            preset_bias: PresetBias::Adaptive,
        }
    }

    /// True when every numeric field is finite and within its documented
    /// range, and `soft_clip_threshold_db <= true_peak_ceiling_dbtp <= 0`.
    pub fn is_valid(&self) -> bool {
        if !self.integrated_lufs_target.is_finite()
            || !self.true_peak_ceiling_dbtp.is_finite()
            || !self.soft_clip_threshold_db.is_finite()
            || !self.stereo_width.is_finite()
        {
            return false;
        }
        if self.eq_band_gains_db.iter().any(|g| !g.is_finite() || g.abs() >= 18.0) {
            return false;
        }
        if self.true_peak_ceiling_dbtp > 0.0 {
            return false;
        }
        if self.soft_clip_threshold_db > self.true_peak_ceiling_dbtp {
            return false;
        }
        if !(0.0..=1.5).contains(&self.stereo_width) {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neutral_profile_is_valid() {
        assert!(TargetProfile::neutral(-0.3).is_valid());
    }

    #[test]
    fn neutral_profile_is_valid_for_any_ceiling() {
        for ceiling in [-0.1, -0.3, -1.0, -3.0] {
            let p = TargetProfile::neutral(ceiling);
            assert!(p.is_valid(), "neutral({ceiling}) produced an invalid profile");
            assert!(p.soft_clip_threshold_db <= p.true_peak_ceiling_dbtp);
        }
    }

    #[test]
    fn rejects_positive_ceiling() {
        let mut p = TargetProfile::neutral(-0.3);
        p.true_peak_ceiling_dbtp = 0.5;
        assert!(!p.is_valid());
    }

    #[test]
    fn rejects_out_of_range_eq_gain() {
        let mut p = TargetProfile::neutral(-0.3);
        p.eq_band_gains_db[0] = 20.0;
        assert!(!p.is_valid());
    }
}
