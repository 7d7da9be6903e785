/// Adaptive Target Generator — turns a `Fingerprint` into a `TargetProfile`.
///
/// Pipeline: look up the reference profile for the fingerprint's content
/// class, nudge loudness/EQ/compression toward the track's measured
/// characteristics, apply the preset bias, scale the whole delta by
/// `intensity`, then saturate anything that would otherwise overshoot a
/// hard safety bound. The gain saturator is the same curve shape as
/// `soft_clip::SoftClipper`, just expressed in the dB domain with two
/// thresholds (nominal, hard) instead of one.

use crate::eq::{EqRegion, NUM_BANDS};
use crate::fingerprint::Fingerprint;
use crate::reference_profiles::{self, region_bias_db};
use crate::target_profile::{CompressorParams, MakeupMode, PresetBias, TargetProfile};

/// Saturate `g` toward `hard` once it exceeds `nominal`, identity below
/// `nominal`. Both bounds are magnitudes; `g` may be negative (the curve
/// is applied to `|g|` and the sign is restored), matching the symmetric
/// adjustment the spec calls for on both boost and cut.
pub fn saturate_gain(g: f32, nominal: f32, hard: f32) -> f32 {
    let sign = g.signum();
    let mag = g.abs();
    if mag <= nominal {
        return g;
    }
    let span = hard - nominal;
    if span <= 0.0 {
        return sign * hard;
    }
    let y = hard - span * (-(mag - nominal) / span).exp();
    sign * y
}

pub struct AdaptiveTargetGenerator {
    /// dB amount below which EQ region nudges are applied untouched.
    eq_nominal_db: f32,
    /// Hard asymptote no region gain may cross.
    eq_hard_db: f32,
}

impl Default for AdaptiveTargetGenerator {
    fn default() -> Self {
        Self {
            eq_nominal_db: 12.0,
            eq_hard_db: 18.0,
        }
    }
}

impl AdaptiveTargetGenerator {
    pub fn new(eq_nominal_db: f32, eq_hard_db: f32) -> Self {
        Self {
            eq_nominal_db,
            eq_hard_db,
        }
    }

    /// Build a `TargetProfile` for `fingerprint`. `intensity` in `[0, 1]`
    /// interpolates between the neutral (no-op) profile at 0 and the full
    /// adaptive recommendation at 1, per the spec's dry/wet control.
    pub fn generate(
        &self,
        fingerprint: &Fingerprint,
        preset_bias: PresetBias,
        intensity: f32,
        true_peak_ceiling_dbtp: f32,
    ) -> TargetProfile {
        let intensity = intensity.clamp(0.0, 1.0);
        let reference = reference_profiles::lookup(fingerprint.content_class);

        let loudness_delta =
            (reference.integrated_lufs_target as f64 - fingerprint.integrated_lufs) as f32;
        let integrated_lufs_target =
            fingerprint.integrated_lufs as f32 + loudness_delta * intensity;

        let mut eq_band_gains_db = [0.0f64; NUM_BANDS];
        for band in 0..NUM_BANDS {
            let region = crate::eq::region_for_band(band);
            let raw_bias = region_bias_db(reference, region) + self.spectral_nudge_db(fingerprint, region);
            let saturated = saturate_gain(raw_bias, self.eq_nominal_db, self.eq_hard_db);
            eq_band_gains_db[band] = (saturated * intensity) as f64;
        }

        let ratio_delta = reference.compressor_ratio - 1.0;
        let ratio = 1.0 + ratio_delta * intensity;
        let threshold_db =
            reference.compressor_threshold_db + (fingerprint.crest_factor as f32 - 12.0) * 0.1 * intensity;

        let compressor = CompressorParams {
            threshold_db,
            ratio,
            attack_ms: attack_ms_for(preset_bias),
            release_ms: release_ms_for(preset_bias),
            makeup_mode: MakeupMode::Auto,
        };

        let stereo_width_delta = reference.stereo_width - 1.0;
        let stereo_width = (1.0 + stereo_width_delta * intensity).clamp(0.0, 1.5);

        let soft_clip_threshold_db = (true_peak_ceiling_dbtp - 0.2).min(-0.1);

        let mut profile = TargetProfile {
            integrated_lufs_target,
            true_peak_ceiling_dbtp,
            eq_band_gains_db,
            compressor,
            soft_clip_threshold_db,
            stereo_width,
            preset_bias,
        };

        self.apply_preset_bias(&mut profile, preset_bias, intensity);
        profile
    }

    fn spectral_nudge_db(&self, fingerprint: &Fingerprint, region: EqRegion) -> f32 {
        let measured_pct = match region {
            EqRegion::SubBass => fingerprint.sub_bass_pct,
            EqRegion::Bass => fingerprint.bass_pct,
            EqRegion::LowMid => fingerprint.low_mid_pct,
            EqRegion::Mid => fingerprint.mid_pct,
            EqRegion::UpperMid => fingerprint.upper_mid_pct,
            EqRegion::Presence => fingerprint.presence_pct,
            EqRegion::Air => fingerprint.air_pct,
        };
        // 1/7 is the flat-spectrum baseline; deviation from it nudges the
        // opposite direction, gently (capped well before the saturator).
        let deviation = (1.0 / 7.0) - measured_pct;
        (deviation * 20.0) as f32
    }

    /// Warm/Bright add their fixed per-region dB offsets scaled by
    /// `intensity`, same as the main fingerprint-driven gains above, so
    /// intensity = 0 still saturates every EQ band to 0 dB (§8 universal
    /// invariant) regardless of which preset is selected.
    fn apply_preset_bias(&self, profile: &mut TargetProfile, bias: PresetBias, intensity: f32) {
        match bias {
            PresetBias::Adaptive => {}
            PresetBias::Gentle => {
                profile.compressor.ratio = (profile.compressor.ratio * 0.7).max(1.0);
                for gain in profile.eq_band_gains_db.iter_mut() {
                    *gain *= 0.6;
                }
            }
            PresetBias::Warm => {
                for band in 0..NUM_BANDS {
                    let region = crate::eq::region_for_band(band);
                    if matches!(region, EqRegion::Bass | EqRegion::LowMid) {
                        profile.eq_band_gains_db[band] += 1.0 * intensity as f64;
                    } else if matches!(region, EqRegion::Presence | EqRegion::Air) {
                        profile.eq_band_gains_db[band] -= 0.5 * intensity as f64;
                    }
                }
            }
            PresetBias::Bright => {
                for band in 0..NUM_BANDS {
                    let region = crate::eq::region_for_band(band);
                    if matches!(region, EqRegion::Presence | EqRegion::Air) {
                        profile.eq_band_gains_db[band] += 1.0 * intensity as f64;
                    }
                }
            }
            PresetBias::Punchy => {
                profile.compressor.ratio = (profile.compressor.ratio * 1.3).max(1.0);
                profile.compressor.attack_ms = (profile.compressor.attack_ms * 0.6).max(1.0);
            }
        }
        for gain in profile.eq_band_gains_db.iter_mut() {
            *gain = saturate_gain(*gain as f32, self.eq_nominal_db, self.eq_hard_db) as f64;
        }
    }
}

fn attack_ms_for(bias: PresetBias) -> f32 {
    match bias {
        PresetBias::Punchy => 5.0,
        PresetBias::Gentle => 20.0,
        _ => 10.0,
    }
}

fn release_ms_for(bias: PresetBias) -> f32 {
    match bias {
        PresetBias::Punchy => 80.0,
        PresetBias::Gentle => 150.0,
        _ => 100.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn saturate_gain_is_identity_below_nominal() {
        assert!((saturate_gain(2.0, 4.0, 9.0) - 2.0).abs() < 1e-6);
        assert!((saturate_gain(-2.0, 4.0, 9.0) + 2.0).abs() < 1e-6);
    }

    #[test]
    fn saturate_gain_never_crosses_hard_bound() {
        let y = saturate_gain(100.0, 4.0, 9.0);
        assert!(y < 9.0);
        assert!(y > 8.5);
    }

    #[test]
    fn zero_intensity_is_near_neutral_loudness_and_eq() {
        let fp = Fingerprint::neutral(180.0);
        let gen = AdaptiveTargetGenerator::default();
        let profile = gen.generate(&fp, PresetBias::Adaptive, 0.0, -1.0);
        assert!((profile.integrated_lufs_target - fp.integrated_lufs as f32).abs() < 1e-3);
        assert!(profile.eq_band_gains_db.iter().all(|&g| g.abs() < 1e-6));
    }

    #[test]
    fn zero_intensity_is_eq_neutral_for_every_preset() {
        let fp = Fingerprint::neutral(180.0);
        let gen = AdaptiveTargetGenerator::default();
        for bias in [
            PresetBias::Adaptive,
            PresetBias::Gentle,
            PresetBias::Warm,
            PresetBias::Bright,
            PresetBias::Punchy,
        ] {
            let profile = gen.generate(&fp, bias, 0.0, -1.0);
            assert!(
                profile.eq_band_gains_db.iter().all(|&g| g.abs() < 1e-6),
                "preset {bias:?} left a non-zero EQ gain at intensity 0"
            );
        }
    }

    #[test]
    fn full_intensity_profile_is_valid() {
        let fp = Fingerprint::neutral(180.0);
        let gen = AdaptiveTargetGenerator::default();
        let profile = gen.generate(&fp, PresetBias::Adaptive, 1.0, -1.0);
        assert!(profile.is_valid());
    }

    #[test]
    fn punchy_bias_shortens_attack() {
        let fp = Fingerprint::neutral(180.0);
        let gen = AdaptiveTargetGenerator::default();
        let adaptive = gen.generate(&fp, PresetBias::Adaptive, 1.0, -1.0);
        let punchy = gen.generate(&fp, PresetBias::Punchy, 1.0, -1.0);
        assert!(punchy.compressor.attack_ms < adaptive.compressor.attack_ms);
    }
}
