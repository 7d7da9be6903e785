/// Reference Profiles — one baseline target row per `ContentClass`,
/// consulted by the Adaptive Target Generator before fingerprint-driven
/// adjustment. These are compiled-in starting points, not learned; tuning
/// them further is an Open Question left to a future calibration pass.

use crate::eq::EqRegion;
use crate::fingerprint::ContentClass;

#[derive(Debug, Clone, Copy)]
pub struct ReferenceProfile {
    pub content_class: ContentClass,
    pub integrated_lufs_target: f32,
    pub true_peak_ceiling_dbtp: f32,
    pub compressor_ratio: f32,
    pub compressor_threshold_db: f32,
    pub stereo_width: f32,
    /// Per-region nudge applied before band interpolation, dB.
    pub region_bias_db: [f32; 7],
}

const fn region_bias(sub_bass: f32, bass: f32, low_mid: f32, mid: f32, upper_mid: f32, presence: f32, air: f32) -> [f32; 7] {
    [sub_bass, bass, low_mid, mid, upper_mid, presence, air]
}

pub const PROFILES: [ReferenceProfile; 7] = [
    ReferenceProfile {
        content_class: ContentClass::Studio,
        integrated_lufs_target: -14.0,
        true_peak_ceiling_dbtp: -1.0,
        compressor_ratio: 2.5,
        compressor_threshold_db: -18.0,
        stereo_width: 1.0,
        region_bias_db: region_bias(0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0),
    },
    ReferenceProfile {
        content_class: ContentClass::Live,
        integrated_lufs_target: -16.0,
        true_peak_ceiling_dbtp: -1.0,
        compressor_ratio: 3.0,
        compressor_threshold_db: -20.0,
        stereo_width: 1.05,
        region_bias_db: region_bias(0.0, 0.5, 0.0, 0.5, 1.0, 0.5, 0.0),
    },
    ReferenceProfile {
        content_class: ContentClass::Acoustic,
        integrated_lufs_target: -16.0,
        true_peak_ceiling_dbtp: -1.0,
        compressor_ratio: 1.8,
        compressor_threshold_db: -22.0,
        stereo_width: 0.95,
        region_bias_db: region_bias(-0.5, 0.0, 0.5, 0.5, 0.0, 0.5, 1.0),
    },
    ReferenceProfile {
        content_class: ContentClass::Electronic,
        integrated_lufs_target: -12.0,
        true_peak_ceiling_dbtp: -1.0,
        compressor_ratio: 3.5,
        compressor_threshold_db: -16.0,
        stereo_width: 1.1,
        region_bias_db: region_bias(1.5, 1.0, -0.5, 0.0, 0.5, 1.0, 1.0),
    },
    ReferenceProfile {
        content_class: ContentClass::CompressedLoud,
        integrated_lufs_target: -14.0,
        true_peak_ceiling_dbtp: -1.0,
        compressor_ratio: 1.5,
        compressor_threshold_db: -14.0,
        stereo_width: 1.0,
        region_bias_db: region_bias(0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0),
    },
    ReferenceProfile {
        content_class: ContentClass::QuietDynamic,
        integrated_lufs_target: -18.0,
        true_peak_ceiling_dbtp: -1.5,
        compressor_ratio: 1.5,
        compressor_threshold_db: -26.0,
        stereo_width: 1.0,
        region_bias_db: region_bias(0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.5),
    },
    ReferenceProfile {
        content_class: ContentClass::Unknown,
        integrated_lufs_target: -14.0,
        true_peak_ceiling_dbtp: -1.0,
        compressor_ratio: 1.0,
        compressor_threshold_db: -20.0,
        stereo_width: 1.0,
        region_bias_db: region_bias(0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0),
    },
];

pub fn lookup(content_class: ContentClass) -> &'static ReferenceProfile {
    PROFILES
        .iter()
        .find(|p| p.content_class == content_class)
        .unwrap_or(&PROFILES[6])
}

pub fn region_bias_db(profile: &ReferenceProfile, region: EqRegion) -> f32 {
    let index = EqRegion::ALL.iter().position(|r| *r == region).unwrap_or(0);
    profile.region_bias_db[index]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_content_class_has_a_profile() {
        for class in ContentClass::ALL {
            let p = lookup(class);
            assert_eq!(p.content_class, class);
        }
    }

    #[test]
    fn profiles_have_non_positive_ceiling() {
        for p in PROFILES.iter() {
            assert!(p.true_peak_ceiling_dbtp <= 0.0);
        }
    }
}
