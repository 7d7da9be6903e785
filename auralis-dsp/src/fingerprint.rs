/// Fingerprint — an immutable value object summarising a track.
///
/// Field names are contractual (they are the wire format of the
/// Fingerprint Store, §4.5/§6). All fields are finite; the seven
/// `*_pct` band percentages sum to 1.0 ± 1e-3.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentClass {
    Studio,
    Live,
    Acoustic,
    Electronic,
    CompressedLoud,
    QuietDynamic,
    Unknown,
}

impl ContentClass {
    pub const ALL: [ContentClass; 7] = [
        ContentClass::Studio,
        ContentClass::Live,
        ContentClass::Acoustic,
        ContentClass::Electronic,
        ContentClass::CompressedLoud,
        ContentClass::QuietDynamic,
        ContentClass::Unknown,
    ];
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Fingerprint {
    // Loudness
    pub integrated_lufs: f64,
    pub loudness_range_lu: f64,
    pub true_peak_dbtp: f64,
    pub crest_factor: f64,
    pub rms_db: f64,

    // Spectral
    pub spectral_centroid_hz: f64,
    pub spectral_rolloff_hz: f64,
    pub spectral_flux: f64,
    pub sub_bass_pct: f64,
    pub bass_pct: f64,
    pub low_mid_pct: f64,
    pub mid_pct: f64,
    pub upper_mid_pct: f64,
    pub presence_pct: f64,
    pub air_pct: f64,

    // Dynamics
    pub dr_ebu_db: f64,
    pub transient_density: f64,
    pub attack_sharpness: f64,

    // Stereo
    pub stereo_width: f64,
    pub phase_correlation: f64,
    pub side_energy_db: f64,

    // Temporal
    pub tempo_bpm: f64,
    pub rhythm_stability: f64,
    pub onset_rate: f64,

    // Meta
    pub duration_seconds: f64,
    pub content_class_id: u8,

    pub content_class: ContentClass,
    pub confidence: f64,
}

impl Fingerprint {
    /// The neutral fingerprint used when analysis is unavailable and the
    /// engine proceeds with a degraded path (§5 "neutral profile").
    /// All measured values are set to neutral midpoints.
    pub fn neutral(duration_seconds: f64) -> Self {
        Self {
            integrated_lufs: -18.0,
            loudness_range_lu: 6.0,
            true_peak_dbtp: -1.0,
            crest_factor: 12.0,
            rms_db: -20.0,
            spectral_centroid_hz: 2000.0,
            spectral_rolloff_hz: 8000.0,
            spectral_flux: 0.0,
            sub_bass_pct: 1.0 / 7.0,
            bass_pct: 1.0 / 7.0,
            low_mid_pct: 1.0 / 7.0,
            mid_pct: 1.0 / 7.0,
            upper_mid_pct: 1.0 / 7.0,
            presence_pct: 1.0 / 7.0,
            air_pct: 1.0 / 7.0,
            dr_ebu_db: 10.0,
            transient_density: 0.3,
            attack_sharpness: 0.5,
            stereo_width: 0.5,
            phase_correlation: 1.0,
            side_energy_db: -20.0,
            tempo_bpm: 120.0,
            rhythm_stability: 0.5,
            onset_rate: 1.0,
            duration_seconds,
            content_class_id: ContentClass::Unknown as u8,
            content_class: ContentClass::Unknown,
            confidence: 0.0,
        }
    }

    /// All fields finite, and the 7 band percentages sum to 1.0 ± 1e-3.
    pub fn is_valid(&self) -> bool {
        let scalars = [
            self.integrated_lufs,
            self.loudness_range_lu,
            self.true_peak_dbtp,
            self.crest_factor,
            self.rms_db,
            self.spectral_centroid_hz,
            self.spectral_rolloff_hz,
            self.spectral_flux,
            self.sub_bass_pct,
            self.bass_pct,
            self.low_mid_pct,
            self.mid_pct,
            self.upper_mid_pct,
            self.presence_pct,
            self.air_pct,
            self.dr_ebu_db,
            self.transient_density,
            self.attack_sharpness,
            self.stereo_width,
            self.phase_correlation,
            self.side_energy_db,
            self.tempo_bpm,
            self.rhythm_stability,
            self.onset_rate,
            self.duration_seconds,
        ];
        if scalars.iter().any(|v| !v.is_finite()) {
            return false;
        }
        let band_sum = self.sub_bass_pct
            + self.bass_pct
            + self.low_mid_pct
            + self.mid_pct
            + self.upper_mid_pct
            + self.presence_pct
            + self.air_pct;
        (band_sum - 1.0).abs() <= 1e-3
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neutral_fingerprint_is_valid() {
        assert!(Fingerprint::neutral(180.0).is_valid());
    }

    #[test]
    fn rejects_band_sum_drift() {
        let mut fp = Fingerprint::neutral(180.0);
        fp.air_pct += 0.1;
        assert!(!fp.is_valid());
    }

    #[test]
    fn rejects_non_finite_field() {
        let mut fp = Fingerprint::neutral(180.0);
        fp.tempo_bpm = f64::NAN;
        assert!(!fp.is_valid());
    }
}
