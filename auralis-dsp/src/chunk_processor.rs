// Chunk Processor
// Fixed-duration, non-overlapping tile slicing with crossfade-warmup padding
//
// Copyright (C) 2024 Auralis Team
// License: GPLv3

use crate::error::DspError;
use crate::hybrid_processor::HybridProcessor;
use crate::pcm::PcmBuffer;
use crate::target_profile::TargetProfile;

const MIN_CHUNK_DURATION_SECONDS: f64 = 5.0;
const MAX_CHUNK_DURATION_SECONDS: f64 = 30.0;
const DEFAULT_CHUNK_DURATION_SECONDS: f64 = 10.0;
const DEFAULT_OVERLAP_SECONDS: f64 = 0.25;

#[derive(Debug, Clone)]
pub struct ChunkConfig {
    pub chunk_duration_seconds: f64,
    pub overlap_seconds: f64,
    pub sample_rate: u32,
}

impl ChunkConfig {
    /// `chunk_duration_seconds` is clamped to `[5, 30]` per the engine's
    /// documented invariant; out-of-range values are a caller mistake,
    /// not a reason to fail.
    pub fn new(chunk_duration_seconds: f64, overlap_seconds: f64, sample_rate: u32) -> Self {
        Self {
            chunk_duration_seconds: chunk_duration_seconds
                .clamp(MIN_CHUNK_DURATION_SECONDS, MAX_CHUNK_DURATION_SECONDS),
            overlap_seconds: overlap_seconds.max(0.0),
            sample_rate,
        }
    }

    fn frames_per_chunk(&self) -> usize {
        (self.chunk_duration_seconds * self.sample_rate as f64).round() as usize
    }

    fn overlap_frames(&self) -> usize {
        (self.overlap_seconds * self.sample_rate as f64).round() as usize
    }
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_DURATION_SECONDS, DEFAULT_OVERLAP_SECONDS, 44_100)
    }
}

/// One tile of a track: the emitted region never overlaps its neighbours,
/// even though the DSP chain was warmed up on padding pulled from them.
#[derive(Debug, Clone)]
pub struct ProcessedChunk {
    pub chunk_index: usize,
    pub start_frame: usize,
    pub frame_count: usize,
    pub pcm: PcmBuffer,
}

pub struct ChunkProcessor {
    config: ChunkConfig,
}

impl ChunkProcessor {
    pub fn new(config: ChunkConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ChunkConfig {
        &self.config
    }

    /// Number of chunks a track of `total_frames` partitions into. A
    /// zero-length track still reports one (empty) chunk so callers can
    /// request chunk 0 without a special case.
    pub fn chunk_count(&self, total_frames: usize) -> usize {
        if total_frames == 0 {
            return 1;
        }
        let d = self.config.frames_per_chunk().max(1);
        (total_frames + d - 1) / d
    }

    /// The emitted frame range `[start, end)` for chunk `chunk_index`,
    /// without running any DSP. Used by callers that only need boundaries
    /// (e.g. the metadata endpoint).
    pub fn emitted_bounds(&self, chunk_index: usize, total_frames: usize) -> Option<(usize, usize)> {
        if chunk_index >= self.chunk_count(total_frames) {
            return None;
        }
        if total_frames == 0 {
            return Some((0, 0));
        }
        let d = self.config.frames_per_chunk().max(1);
        let start = chunk_index * d;
        let end = ((chunk_index + 1) * d).min(total_frames);
        Some((start, end))
    }

    /// Produce chunk `chunk_index` of `track` under fixed-target mode:
    /// `profile` is reused verbatim, never re-derived per chunk.
    ///
    /// The processor pulls `overlap_frames` of context from each neighbour,
    /// runs the full Hybrid Processor over the padded buffer so stateful
    /// stages warm up, then discards the padding before returning.
    pub fn process_chunk(
        &self,
        track: &PcmBuffer,
        chunk_index: usize,
        profile: &TargetProfile,
        processor: &HybridProcessor,
    ) -> Result<ProcessedChunk, DspError> {
        track.ensure_stereo(self.config.sample_rate)?;
        let total_frames = track.frame_count();
        let count = self.chunk_count(total_frames);
        if chunk_index >= count {
            return Err(DspError::OutOfRange(format!(
                "chunk {chunk_index} out of range (chunk_count = {count})"
            )));
        }

        if total_frames == 0 {
            return Ok(ProcessedChunk {
                chunk_index,
                start_frame: 0,
                frame_count: 0,
                pcm: PcmBuffer::silence(0, self.config.sample_rate, track.channels()),
            });
        }

        let (emit_start, emit_end) = self
            .emitted_bounds(chunk_index, total_frames)
            .expect("chunk_index validated above");

        let overlap = self.config.overlap_frames();
        let pad_start = emit_start.saturating_sub(overlap);
        let pad_end = (emit_end + overlap).min(total_frames);

        let padded = extract_frames(track, pad_start, pad_end);
        let processed_padded = processor.process(&padded, profile)?;

        let local_start = emit_start - pad_start;
        let local_len = emit_end - emit_start;
        let emitted = extract_frames(&processed_padded, local_start, local_start + local_len);

        Ok(ProcessedChunk {
            chunk_index,
            start_frame: emit_start,
            frame_count: emitted.frame_count(),
            pcm: emitted,
        })
    }
}

fn extract_frames(buf: &PcmBuffer, start_frame: usize, end_frame: usize) -> PcmBuffer {
    let channels = buf.channels() as usize;
    let samples = buf.samples();
    let slice = &samples[start_frame * channels..end_frame * channels];
    PcmBuffer::new(slice.to_vec(), buf.sample_rate(), buf.channels())
        .expect("slice of a valid buffer preserves channel alignment")
}

/// Diagnostic loudness/crest statistics for one emitted chunk. Not part of
/// the processing contract; useful for logging and the integration-test
/// acceptance scenarios in the external spec (RMS/centroid deltas).
#[derive(Debug, Clone, Copy)]
pub struct ChunkStats {
    pub peak: f32,
    pub rms: f32,
    pub crest_db: f32,
}

impl ChunkStats {
    pub fn compute(pcm: &PcmBuffer) -> Self {
        let samples = pcm.samples();
        if samples.is_empty() {
            return Self {
                peak: 0.0,
                rms: 0.0,
                crest_db: 0.0,
            };
        }
        let peak = samples.iter().map(|&x| x.abs()).fold(0.0f32, f32::max);
        let rms = (samples.iter().map(|&x| x * x).sum::<f32>() / samples.len() as f32).sqrt();
        let crest_db = if rms > 0.0 {
            20.0 * (peak / rms).log10()
        } else {
            0.0
        };
        Self { peak, rms, crest_db }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target_profile::TargetProfile;

    fn track(seconds: f64, sample_rate: u32) -> PcmBuffer {
        let n = (seconds * sample_rate as f64) as usize;
        let samples: Vec<f32> = (0..n * 2)
            .map(|i| ((i / 2) as f32 * 0.001).sin() * 0.2)
            .collect();
        PcmBuffer::new(samples, sample_rate, 2).unwrap()
    }

    #[test]
    fn chunk_count_matches_ceil_division() {
        let config = ChunkConfig::new(10.0, 0.25, 44_100);
        let processor = ChunkProcessor::new(config);
        // 180s at 10s chunks -> 18 whole chunks.
        assert_eq!(processor.chunk_count(180 * 44_100), 18);
        // 185s -> 19 chunks, last one partial.
        assert_eq!(processor.chunk_count(185 * 44_100), 19);
    }

    #[test]
    fn zero_length_track_has_one_empty_chunk() {
        let config = ChunkConfig::new(10.0, 0.25, 44_100);
        let processor = ChunkProcessor::new(config);
        assert_eq!(processor.chunk_count(0), 1);
        assert_eq!(processor.emitted_bounds(0, 0), Some((0, 0)));
    }

    #[test]
    fn emitted_regions_tile_without_overlap() {
        let config = ChunkConfig::new(10.0, 0.25, 44_100);
        let processor = ChunkProcessor::new(config);
        let total = 25 * 44_100;
        let count = processor.chunk_count(total);
        let mut covered = 0usize;
        for i in 0..count {
            let (start, end) = processor.emitted_bounds(i, total).unwrap();
            assert_eq!(start, covered);
            covered = end;
        }
        assert_eq!(covered, total);
    }

    #[test]
    fn out_of_range_chunk_index_errors() {
        let config = ChunkConfig::new(10.0, 0.25, 44_100);
        let processor = ChunkProcessor::new(config);
        let hybrid = HybridProcessor::new(44_100);
        let profile = TargetProfile::neutral(-1.0);
        let t = track(5.0, 44_100);
        let err = processor.process_chunk(&t, 99, &profile, &hybrid).unwrap_err();
        assert!(matches!(err, DspError::OutOfRange(_)));
    }

    #[test]
    fn zero_length_track_skips_dsp_chain() {
        let config = ChunkConfig::new(10.0, 0.25, 44_100);
        let processor = ChunkProcessor::new(config);
        let hybrid = HybridProcessor::new(44_100);
        let profile = TargetProfile::neutral(-1.0);
        let empty = PcmBuffer::new(Vec::new(), 44_100, 2).unwrap();
        let chunk = processor.process_chunk(&empty, 0, &profile, &hybrid).unwrap();
        assert_eq!(chunk.frame_count, 0);
    }

    #[test]
    fn consecutive_chunks_reconstruct_every_frame_once() {
        let config = ChunkConfig::new(5.0, 0.25, 44_100);
        let processor = ChunkProcessor::new(config);
        let hybrid = HybridProcessor::new(44_100);
        let profile = TargetProfile::neutral(-1.0);
        let t = track(12.0, 44_100);
        let total = t.frame_count();
        let count = processor.chunk_count(total);

        let mut reconstructed_frames = 0usize;
        for i in 0..count {
            let chunk = processor.process_chunk(&t, i, &profile, &hybrid).unwrap();
            reconstructed_frames += chunk.frame_count;
        }
        assert_eq!(reconstructed_frames, total);
    }

    #[test]
    fn chunk_stats_reports_peak_and_rms() {
        let pcm = PcmBuffer::new(vec![1.0, 0.0, 0.5, 0.0], 44_100, 2).unwrap();
        let stats = ChunkStats::compute(&pcm);
        assert_eq!(stats.peak, 1.0);
        assert!(stats.rms > 0.0);
    }
}
