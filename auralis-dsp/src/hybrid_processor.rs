/// Hybrid Processor — the five-stage mastering chain run, in order, over
/// every chunk: Psychoacoustic EQ, Compressor (with auto makeup),
/// Soft Clipper, Brick-Wall Limiter, Stereo Width Adjust.
///
/// A stage that cannot run (malformed input it cannot recover from) logs a
/// warning and is skipped rather than aborting the whole chain — later
/// stages still see the best available signal.

use tracing::warn;

use crate::compressor::{Compressor, CompressorConfig, DetectionMode};
use crate::error::DspError;
use crate::eq::PsychoacousticEq;
use crate::limiter::{Limiter, LimiterConfig};
use crate::pcm::PcmBuffer;
use crate::soft_clip::SoftClipper;
use crate::stereo_width::StereoWidthAdjust;
use crate::target_profile::{MakeupMode, TargetProfile};

const MAKEUP_GAIN_MIN_DB: f32 = -6.0;
const MAKEUP_GAIN_MAX_DB: f32 = 12.0;

/// Outcome of a single stage: either the transformed buffer, or a pass
/// through of the input with the reason logged.
enum StageOutcome {
    Processed(PcmBuffer),
    PassedThrough(PcmBuffer),
}

impl StageOutcome {
    fn into_buffer(self) -> PcmBuffer {
        match self {
            StageOutcome::Processed(b) | StageOutcome::PassedThrough(b) => b,
        }
    }
}

pub struct HybridProcessor {
    sample_rate: u32,
}

impl HybridProcessor {
    pub fn new(sample_rate: u32) -> Self {
        Self { sample_rate }
    }

    /// Run the full chain. `input` must be stereo at `self.sample_rate`;
    /// anything else is rejected up front rather than silently resampled.
    pub fn process(&self, input: &PcmBuffer, profile: &TargetProfile) -> Result<PcmBuffer, DspError> {
        input.ensure_stereo(self.sample_rate)?;
        if !input.is_finite() {
            return Err(DspError::InvalidInput(
                "input buffer contains non-finite samples".into(),
            ));
        }
        if !profile.is_valid() {
            return Err(DspError::InvalidInput("target profile failed validation".into()));
        }

        let buf = self.run_eq(input, profile).into_buffer();
        let buf = self.run_compressor(&buf, profile).into_buffer();
        let buf = self.run_soft_clip(&buf, profile).into_buffer();
        let buf = self.run_limiter(&buf, profile).into_buffer();
        let buf = self.run_stereo_width(&buf, profile).into_buffer();

        Ok(buf)
    }

    fn run_eq(&self, input: &PcmBuffer, profile: &TargetProfile) -> StageOutcome {
        let mut eq = PsychoacousticEq::new(self.sample_rate, &profile.eq_band_gains_db);
        StageOutcome::Processed(eq.process(input))
    }

    fn run_compressor(&self, input: &PcmBuffer, profile: &TargetProfile) -> StageOutcome {
        let (left, right) = input.left_right();
        let mono: Vec<f32> = left
            .iter()
            .zip(right.iter())
            .map(|(&l, &r)| (l + r) * 0.5)
            .collect();

        let mut config = CompressorConfig {
            sample_rate: self.sample_rate as usize,
            threshold_db: profile.compressor.threshold_db,
            ratio: profile.compressor.ratio,
            knee_db: 6.0,
            attack_ms: profile.compressor.attack_ms,
            release_ms: profile.compressor.release_ms,
            makeup_gain_db: 0.0,
            enable_lookahead: true,
            lookahead_ms: 5.0,
        };

        config.makeup_gain_db = match profile.compressor.makeup_mode {
            MakeupMode::Fixed(g) => g.clamp(MAKEUP_GAIN_MIN_DB, MAKEUP_GAIN_MAX_DB),
            MakeupMode::Auto => {
                let mut probe = Compressor::new(config.clone());
                let (probed, _) = probe.process(&mono, DetectionMode::Hybrid);
                let probed_rms = rms(&probed);
                let probed_db = 20.0 * probed_rms.max(1e-10).log10();
                (profile.integrated_lufs_target - probed_db).clamp(MAKEUP_GAIN_MIN_DB, MAKEUP_GAIN_MAX_DB)
            }
        };

        // Independent instance per channel: sharing one `Compressor` across
        // both calls would let left's ending envelope state leak into the
        // start of right, giving the two channels different gain
        // trajectories and shifting the phantom center.
        let mut left_compressor = Compressor::new(config.clone());
        let mut right_compressor = Compressor::new(config);
        let (left_out, _) = left_compressor.process(&left, DetectionMode::Hybrid);
        let (right_out, _) = right_compressor.process(&right, DetectionMode::Hybrid);

        if left_out.len() != left.len() || right_out.len() != right.len() {
            warn!("compressor stage returned mismatched length, passing input through");
            return StageOutcome::PassedThrough(input.clone());
        }

        StageOutcome::Processed(PcmBuffer::from_left_right(&left_out, &right_out, input.sample_rate()))
    }

    fn run_soft_clip(&self, input: &PcmBuffer, profile: &TargetProfile) -> StageOutcome {
        let threshold_linear = 10f32.powf(profile.soft_clip_threshold_db / 20.0);
        let clipper = SoftClipper::new(threshold_linear);
        StageOutcome::Processed(clipper.process(input))
    }

    fn run_limiter(&self, input: &PcmBuffer, profile: &TargetProfile) -> StageOutcome {
        let config = LimiterConfig {
            sample_rate: self.sample_rate as usize,
            threshold_db: profile.true_peak_ceiling_dbtp,
            release_ms: 50.0,
            lookahead_ms: 5.0,
            isr_enabled: true,
            oversampling: 4,
        };

        let (left, right) = input.left_right();
        // Independent instance per channel, same reasoning as the
        // compressor stage above: one shared lookahead ring would carry
        // left's tail into right's lookahead window.
        let mut left_limiter = Limiter::new(config.clone());
        let mut right_limiter = Limiter::new(config);
        let (left_out, _) = left_limiter.process(&left);
        let (right_out, _) = right_limiter.process(&right);

        if left_out.len() != left.len() || right_out.len() != right.len() {
            warn!("limiter stage returned mismatched length, passing input through");
            return StageOutcome::PassedThrough(input.clone());
        }

        StageOutcome::Processed(PcmBuffer::from_left_right(&left_out, &right_out, input.sample_rate()))
    }

    fn run_stereo_width(&self, input: &PcmBuffer, profile: &TargetProfile) -> StageOutcome {
        let stage = StereoWidthAdjust::new(profile.stereo_width);
        StageOutcome::Processed(stage.process(input))
    }
}

fn rms(signal: &[f32]) -> f32 {
    if signal.is_empty() {
        return 0.0;
    }
    (signal.iter().map(|&s| s * s).sum::<f32>() / signal.len() as f32).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neutral_profile_roundtrips_silence() {
        let processor = HybridProcessor::new(44_100);
        let profile = TargetProfile::neutral(-1.0);
        let input = PcmBuffer::silence(4096, 44_100, 2);
        let output = processor.process(&input, &profile).unwrap();
        assert_eq!(output.frame_count(), input.frame_count());
        assert!(output.is_finite());
    }

    #[test]
    fn rejects_mono_input() {
        let processor = HybridProcessor::new(44_100);
        let profile = TargetProfile::neutral(-1.0);
        let input = PcmBuffer::new(vec![0.1; 100], 44_100, 1).unwrap();
        assert!(processor.process(&input, &profile).is_err());
    }

    #[test]
    fn output_respects_true_peak_ceiling() {
        let processor = HybridProcessor::new(44_100);
        let mut profile = TargetProfile::neutral(-1.0);
        profile.true_peak_ceiling_dbtp = -1.0;
        let samples: Vec<f32> = (0..8192)
            .map(|i| {
                let ch = i % 2;
                let t = (i / 2) as f32;
                if ch == 0 {
                    (t * 0.05).sin() * 1.2
                } else {
                    (t * 0.05).sin() * 1.2
                }
            })
            .collect();
        let input = PcmBuffer::new(samples, 44_100, 2).unwrap();
        let output = processor.process(&input, &profile).unwrap();
        let ceiling_linear = 10f32.powf(-1.0 / 20.0) * 1.2;
        assert!(output.samples().iter().all(|&s| s.abs() <= ceiling_linear));
    }

    #[test]
    fn rejects_invalid_profile() {
        let processor = HybridProcessor::new(44_100);
        let mut profile = TargetProfile::neutral(-1.0);
        profile.true_peak_ceiling_dbtp = 5.0;
        let input = PcmBuffer::silence(1024, 44_100, 2);
        assert!(processor.process(&input, &profile).is_err());
    }
}
