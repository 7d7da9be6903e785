/// PCM Buffer
///
/// Owned, contiguous, interleaved floating-point audio shared by every DSP
/// stage. A single implementation-wide choice: interleaved layout, stereo
/// assumed unless explicitly stated otherwise.

use crate::error::DspError;

/// An owned block of interleaved 32-bit float samples with an attached
/// sample rate and channel count.
///
/// Invariant: `samples.len() == frame_count() * channels as usize`.
#[derive(Debug, Clone, PartialEq)]
pub struct PcmBuffer {
    samples: Vec<f32>,
    sample_rate: u32,
    channels: u16,
}

impl PcmBuffer {
    /// Build a buffer from interleaved samples. Returns `InvalidInput` if
    /// the sample count isn't a multiple of `channels`, or `channels == 0`.
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Result<Self, DspError> {
        if channels == 0 {
            return Err(DspError::InvalidInput("channel count must be > 0".into()));
        }
        if samples.len() % channels as usize != 0 {
            return Err(DspError::InvalidInput(
                "sample count is not a multiple of channel count".into(),
            ));
        }
        Ok(Self {
            samples,
            sample_rate,
            channels,
        })
    }

    /// An all-silence buffer of the given frame count.
    pub fn silence(frame_count: usize, sample_rate: u32, channels: u16) -> Self {
        Self {
            samples: vec![0.0; frame_count * channels as usize],
            sample_rate,
            channels,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn frame_count(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn samples_mut(&mut self) -> &mut [f32] {
        &mut self.samples
    }

    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }

    /// True if every sample is finite (no NaN / Inf).
    pub fn is_finite(&self) -> bool {
        self.samples.iter().all(|s| s.is_finite())
    }

    /// Extract one channel as an owned vector (stride = channel count).
    pub fn channel(&self, index: usize) -> Vec<f32> {
        self.samples
            .iter()
            .skip(index)
            .step_by(self.channels as usize)
            .copied()
            .collect()
    }

    /// Stereo left/right split. Panics if `channels != 2` — callers must
    /// check shape before calling (the Hybrid Processor does, via
    /// `ensure_stereo`).
    pub fn left_right(&self) -> (Vec<f32>, Vec<f32>) {
        assert_eq!(self.channels, 2, "left_right requires a stereo buffer");
        (self.channel(0), self.channel(1))
    }

    /// Rebuild an interleaved stereo buffer from separate channels.
    pub fn from_left_right(left: &[f32], right: &[f32], sample_rate: u32) -> Self {
        let mut samples = Vec::with_capacity(left.len() * 2);
        for (l, r) in left.iter().zip(right.iter()) {
            samples.push(*l);
            samples.push(*r);
        }
        Self {
            samples,
            sample_rate,
            channels: 2,
        }
    }

    /// Checked accessor used by the Hybrid Processor: fails with
    /// `ShapeMismatch` unless the buffer is stereo at `expected_rate`.
    pub fn ensure_stereo(&self, expected_rate: u32) -> Result<(), DspError> {
        if self.channels != 2 {
            return Err(DspError::ShapeMismatch(format!(
                "expected 2 channels, got {}",
                self.channels
            )));
        }
        if self.sample_rate != expected_rate {
            return Err(DspError::ShapeMismatch(format!(
                "expected {} Hz, got {} Hz",
                expected_rate, self.sample_rate
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_count_matches_channels() {
        let buf = PcmBuffer::new(vec![0.0; 8], 44_100, 2).unwrap();
        assert_eq!(buf.frame_count(), 4);
    }

    #[test]
    fn rejects_misaligned_sample_count() {
        let err = PcmBuffer::new(vec![0.0; 7], 44_100, 2).unwrap_err();
        assert!(matches!(err, DspError::InvalidInput(_)));
    }

    #[test]
    fn left_right_roundtrip() {
        let buf = PcmBuffer::new(vec![1.0, -1.0, 0.5, -0.5], 48_000, 2).unwrap();
        let (l, r) = buf.left_right();
        assert_eq!(l, vec![1.0, 0.5]);
        assert_eq!(r, vec![-1.0, -0.5]);

        let rebuilt = PcmBuffer::from_left_right(&l, &r, 48_000);
        assert_eq!(rebuilt, buf);
    }

    #[test]
    fn detects_non_finite_samples() {
        let buf = PcmBuffer::new(vec![0.0, f32::NAN], 44_100, 2).unwrap();
        assert!(!buf.is_finite());
    }

    #[test]
    fn ensure_stereo_rejects_mono() {
        let buf = PcmBuffer::new(vec![0.0; 4], 44_100, 1).unwrap();
        assert!(buf.ensure_stereo(44_100).is_err());
    }
}
