/// Stereo Width Adjust — stage 5 of the Hybrid Processor.
///
/// Mid/side decomposition: `mid = (L+R)/2`, `side = (L-R)/2`. The side
/// channel is scaled by `profile.stereo_width` and the pair is recomposed.
/// If the input is already mono-summed (side energy below -60 dBFS) the
/// stage is a no-op regardless of the requested width, since widening a
/// signal with no side information would only amplify noise.

use crate::pcm::PcmBuffer;

const SIDE_ENERGY_FLOOR_DB: f32 = -60.0;

pub struct StereoWidthAdjust {
    width: f32,
}

impl StereoWidthAdjust {
    pub fn new(width: f32) -> Self {
        Self { width }
    }

    pub fn process(&self, pcm: &PcmBuffer) -> PcmBuffer {
        let (left, right) = pcm.left_right();

        let side: Vec<f32> = left
            .iter()
            .zip(right.iter())
            .map(|(&l, &r)| (l - r) * 0.5)
            .collect();

        let side_rms = rms(&side);
        let side_db = 20.0 * side_rms.max(1e-10).log10();
        if side_db < SIDE_ENERGY_FLOOR_DB {
            return pcm.clone();
        }

        let mut out_left = Vec::with_capacity(left.len());
        let mut out_right = Vec::with_capacity(right.len());
        for (&l, &r) in left.iter().zip(right.iter()) {
            let mid = (l + r) * 0.5;
            let s = (l - r) * 0.5 * self.width;
            out_left.push(mid + s);
            out_right.push(mid - s);
        }

        PcmBuffer::from_left_right(&out_left, &out_right, pcm.sample_rate())
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
    fn mono_input_is_noop() {
        let pcm = PcmBuffer::new(vec![0.3, 0.3, -0.2, -0.2, 0.1, 0.1], 44_100, 2).unwrap();
        let stage = StereoWidthAdjust::new(1.5);
        let out = stage.process(&pcm);
        assert_eq!(out, pcm);
    }

    #[test]
    fn widening_increases_side_magnitude() {
        let pcm = PcmBuffer::new(vec![0.6, 0.2, 0.5, 0.1, 0.55, 0.15], 44_100, 2).unwrap();
        let unity = StereoWidthAdjust::new(1.0).process(&pcm);
        let widened = StereoWidthAdjust::new(1.5).process(&pcm);

        let (ul, ur) = unity.left_right();
        let (wl, wr) = widened.left_right();
        let unity_spread: f32 = ul.iter().zip(ur.iter()).map(|(a, b)| (a - b).abs()).sum();
        let wide_spread: f32 = wl.iter().zip(wr.iter()).map(|(a, b)| (a - b).abs()).sum();
        assert!(wide_spread > unity_spread);
    }

    #[test]
    fn mono_collapse_at_zero_width() {
        let pcm = PcmBuffer::new(vec![0.6, 0.2, 0.5, 0.1], 44_100, 2).unwrap();
        let stage = StereoWidthAdjust::new(0.0);
        let out = stage.process(&pcm);
        let (l, r) = out.left_right();
        for (a, b) in l.iter().zip(r.iter()) {
            assert!((a - b).abs() < 1e-6);
        }
    }
}
