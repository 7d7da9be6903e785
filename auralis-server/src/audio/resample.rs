/// Sample-rate conversion for the encoder boundary only.
///
/// The Hybrid Processor refuses to resample (§6, §9 Open Question — the
/// filter bank is tuned for a fixed rate table); the *encoder* is allowed
/// to, since Opus only natively carries 8/12/16/24/48 kHz and the engine's
/// other supported rate is 44.1 kHz (§4.6: "the encoder resamples if the
/// engine ran at 44.1 kHz").
use rubato::{FftFixedIn, Resampler};

use crate::error::{AuralisError, Result};

/// Resample interleaved stereo `samples` from `from_rate` to `to_rate`.
/// No-op (clone) when the rates already match.
pub fn resample_stereo(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>> {
    if from_rate == to_rate {
        return Ok(samples.to_vec());
    }

    let channels = 2usize;
    let frame_count = samples.len() / channels;
    let mut left = Vec::with_capacity(frame_count);
    let mut right = Vec::with_capacity(frame_count);
    for frame in samples.chunks_exact(channels) {
        left.push(frame[0]);
        right.push(frame[1]);
    }

    let chunk_size = 4096usize;
    let mut resampler = FftFixedIn::<f32>::new(from_rate as usize, to_rate as usize, chunk_size, 2, channels)
        .map_err(|e| AuralisError::EncodeError(format!("resampler init failed: {e}")))?;

    let mut out_left = Vec::new();
    let mut out_right = Vec::new();
    let mut pos = 0usize;

    while pos < frame_count {
        let end = (pos + chunk_size).min(frame_count);
        let mut in_left = left[pos..end].to_vec();
        let mut in_right = right[pos..end].to_vec();
        if in_left.len() < chunk_size {
            in_left.resize(chunk_size, 0.0);
            in_right.resize(chunk_size, 0.0);
        }

        let waves_in = vec![in_left, in_right];
        let waves_out = resampler
            .process(&waves_in, None)
            .map_err(|e| AuralisError::EncodeError(format!("resample failed: {e}")))?;

        out_left.extend_from_slice(&waves_out[0]);
        out_right.extend_from_slice(&waves_out[1]);

        pos = end;
    }

    let ratio = to_rate as f64 / from_rate as f64;
    let expected_frames = (frame_count as f64 * ratio).round() as usize;
    out_left.truncate(expected_frames.min(out_left.len()));
    out_right.truncate(expected_frames.min(out_right.len()));

    let mut interleaved = Vec::with_capacity(out_left.len() * 2);
    for (l, r) in out_left.iter().zip(out_right.iter()) {
        interleaved.push(*l);
        interleaved.push(*r);
    }
    Ok(interleaved)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_rate_is_identity() {
        let samples = vec![0.1, -0.1, 0.2, -0.2];
        let out = resample_stereo(&samples, 44_100, 44_100).unwrap();
        assert_eq!(out, samples);
    }

    #[test]
    fn resampling_44_1_to_48_changes_frame_count() {
        let frame_count = 44_100usize;
        let samples: Vec<f32> = (0..frame_count * 2)
            .map(|i| ((i / 2) as f32 * 0.01).sin() * 0.2)
            .collect();
        let out = resample_stereo(&samples, 44_100, 48_000).unwrap();
        let out_frames = out.len() / 2;
        // Roughly a 48/44.1 ratio; allow generous tolerance for chunked FFT resampling.
        assert!(out_frames > frame_count);
        assert!((out_frames as f64 / frame_count as f64 - 48_000.0 / 44_100.0).abs() < 0.05);
    }
}
