/// Soft Clipper — stage 3 of the Hybrid Processor.
///
/// Odd-symmetric, C1-continuous saturation. Below `threshold - 0.05` (in
/// linear amplitude) the stage is exact identity; above it, an exponential
/// knee asymptotes to the threshold without ever reaching it. This is the
/// same curve shape as the Adaptive Target Generator's gain saturator
/// (`adaptive_target_generator::saturate_gain`), just applied in the
/// amplitude domain with a single threshold instead of two.

use crate::pcm::PcmBuffer;

const LINEAR_MARGIN: f32 = 0.05;

#[derive(Debug, Clone, Copy)]
pub struct SoftClipper {
    threshold_linear: f32,
    linear_bound: f32,
}

impl SoftClipper {
    pub fn new(threshold_linear: f32) -> Self {
        let linear_bound = (threshold_linear - LINEAR_MARGIN).max(0.0);
        Self {
            threshold_linear,
            linear_bound,
        }
    }

    /// Saturate one sample. Odd-symmetric: `saturate(-x) == -saturate(x)`.
    #[inline]
    pub fn saturate(&self, x: f32) -> f32 {
        let sign = x.signum();
        let mag = x.abs();
        if mag <= self.linear_bound {
            return x;
        }
        let span = self.threshold_linear - self.linear_bound;
        if span <= 0.0 {
            return sign * self.threshold_linear;
        }
        let y = self.threshold_linear - span * (-(mag - self.linear_bound) / span).exp();
        sign * y
    }

    pub fn process(&self, pcm: &PcmBuffer) -> PcmBuffer {
        let samples: Vec<f32> = pcm.samples().iter().map(|&s| self.saturate(s)).collect();
        PcmBuffer::new(samples, pcm.sample_rate(), pcm.channels())
            .expect("shape preserved by sample-wise transform")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_below_linear_bound() {
        let clipper = SoftClipper::new(0.9);
        for &x in &[0.0, 0.1, -0.3, 0.5, -0.8] {
            assert!((clipper.saturate(x) - x).abs() < 1e-4);
        }
    }

    #[test]
    fn asymptotes_to_threshold() {
        let clipper = SoftClipper::new(0.9);
        let y = clipper.saturate(100.0);
        assert!(y < 0.9);
        assert!(y > 0.89);
    }

    #[test]
    fn odd_symmetric() {
        let clipper = SoftClipper::new(0.8);
        for &x in &[0.1, 0.5, 0.9, 2.0, 10.0] {
            assert!((clipper.saturate(x) + clipper.saturate(-x)).abs() < 1e-6);
        }
    }

    #[test]
    fn monotonic() {
        let clipper = SoftClipper::new(0.8);
        let xs: Vec<f32> = (0..200).map(|i| i as f32 * 0.05).collect();
        let ys: Vec<f32> = xs.iter().map(|&x| clipper.saturate(x)).collect();
        for w in ys.windows(2) {
            assert!(w[1] >= w[0] - 1e-6);
        }
    }
}
