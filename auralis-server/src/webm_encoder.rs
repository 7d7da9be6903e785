/// WebM/Opus Encoder — the boundary described in §4.6/§6: `encode(pcm) →
/// bytes`, hidden behind this module so the rest of the engine never sees
/// a media-library type directly. No process-wide global state (§6).
///
/// Structure grounded on a hand-rolled EBML/WebM muxer pattern (the only
/// WebM-writing reference retrieved in the pack): EBML header, Segment
/// (Info + Tracks + Clusters), one `A_OPUS` track, SimpleBlocks carrying
/// 20 ms Opus frames. Stereo, generalised from that reference's mono case.
use audiopus::coder::Encoder as OpusEncoder;
use audiopus::{Application, Bitrate, Channels, SampleRate};

use crate::audio::resample::resample_stereo;
use crate::ebml::EbmlBuilder;
use crate::error::{AuralisError, Result};
use auralis_dsp::PcmBuffer;

/// Opus only natively carries a handful of rates; 48 kHz is the one the
/// encoder always emits (§4.6 "typical parameters ... 48 kHz").
const OPUS_SAMPLE_RATE: u32 = 48_000;
const FRAME_SAMPLES_PER_CHANNEL: usize = 960; // 20 ms at 48 kHz
const TARGET_BITRATE_BPS: i32 = 192_000;
const CLUSTER_DURATION_MS: u32 = 1000;

mod ids {
    pub const EBML: u32 = 0x1A45_DFA3;
    pub const SEGMENT: u32 = 0x1853_8067;

    pub const EBML_VERSION: u16 = 0x4286;
    pub const EBML_READ_VERSION: u16 = 0x42F7;
    pub const EBML_MAX_ID_LENGTH: u16 = 0x42F2;
    pub const EBML_MAX_SIZE_LENGTH: u16 = 0x42F3;
    pub const DOC_TYPE: u16 = 0x4282;
    pub const DOC_TYPE_VERSION: u16 = 0x4287;
    pub const DOC_TYPE_READ_VERSION: u16 = 0x4285;

    pub const INFO: u32 = 0x1549_A966;
    pub const TRACKS: u32 = 0x1654_AE6B;
    pub const CLUSTER: u32 = 0x1F43_B675;

    pub const TIMECODE_SCALE: [u8; 3] = [0x2A, 0xD7, 0xB1];
    pub const DURATION: u16 = 0x4489;
    pub const MUXING_APP: u16 = 0x4D80;
    pub const WRITING_APP: u16 = 0x5741;

    pub const TRACK_ENTRY: u8 = 0xAE;
    pub const TRACK_NUMBER: u8 = 0xD7;
    pub const TRACK_UID: u16 = 0x73C5;
    pub const TRACK_TYPE: u8 = 0x83;
    pub const FLAG_LACING: u8 = 0x9C;
    pub const LANGUAGE: [u8; 3] = [0x22, 0xB5, 0x9C];
    pub const CODEC_ID: u8 = 0x86;
    pub const CODEC_PRIVATE: u16 = 0x63A2;
    pub const CODEC_DELAY: u16 = 0x56AA;
    pub const SEEK_PRE_ROLL: u16 = 0x56BB;
    pub const AUDIO: u8 = 0xE1;

    pub const CHANNELS: u8 = 0x9F;
    pub const SAMPLING_FREQUENCY: u8 = 0xB5;
    pub const BIT_DEPTH: u16 = 0x6264;

    pub const TIMESTAMP: u8 = 0xE7;
    pub const SIMPLE_BLOCK: u8 = 0xA3;
}

/// Encode one PCM window into a self-contained WebM segment carrying a
/// single stereo Opus track. Resamples to 48 kHz first if the engine ran
/// at 44.1 kHz; a zero-frame buffer yields a structurally valid, empty
/// (zero-cluster) WebM segment rather than an error.
pub fn encode(pcm: &PcmBuffer) -> Result<Vec<u8>> {
    if pcm.channels() != 2 {
        return Err(AuralisError::EncodeError(format!(
            "encoder requires stereo input, got {} channels",
            pcm.channels()
        )));
    }

    let samples = if pcm.sample_rate() == OPUS_SAMPLE_RATE {
        pcm.samples().to_vec()
    } else {
        resample_stereo(pcm.samples(), pcm.sample_rate(), OPUS_SAMPLE_RATE)?
    };

    let mut encoder = OpusEncoder::new(SampleRate::Hz48000, Channels::Stereo, Application::Audio)
        .map_err(|e| AuralisError::EncodeError(format!("opus encoder init failed: {e}")))?;
    encoder
        .set_bitrate(Bitrate::BitsPerSecond(TARGET_BITRATE_BPS))
        .map_err(|e| AuralisError::EncodeError(format!("opus bitrate config failed: {e}")))?;

    let preskip: u16 = 312; // audiopus/libopus default encoder lookahead at 48 kHz.
    let frame_count = samples.len() / 2;

    let mut clusters = Vec::new();
    let mut current_cluster = EbmlBuilder::with_capacity(32 * 1024);
    let mut cluster_start_ms: u32 = 0;
    let mut current_ms: u32 = 0;
    init_cluster(&mut current_cluster, cluster_start_ms);

    let mut out_buf = vec![0u8; 4000];
    let mut pos = 0usize;
    while pos < frame_count {
        let end = (pos + FRAME_SAMPLES_PER_CHANNEL).min(frame_count);
        let mut frame: Vec<f32> = samples[pos * 2..end * 2].to_vec();
        if end - pos < FRAME_SAMPLES_PER_CHANNEL {
            frame.resize(FRAME_SAMPLES_PER_CHANNEL * 2, 0.0);
        }

        let written = encoder
            .encode_float(&frame, &mut out_buf)
            .map_err(|e| AuralisError::EncodeError(format!("opus frame encode failed: {e}")))?;

        write_simple_block(&mut current_cluster, &out_buf[..written], current_ms, cluster_start_ms);

        current_ms += 20;
        pos = end;

        if current_ms >= cluster_start_ms + CLUSTER_DURATION_MS {
            flush_cluster(&mut clusters, &mut current_cluster);
            cluster_start_ms = current_ms;
            init_cluster(&mut current_cluster, cluster_start_ms);
        }
    }
    if current_cluster.len() > cluster_header_len() {
        flush_cluster(&mut clusters, &mut current_cluster);
    }

    let duration_ms = (frame_count as f64 / OPUS_SAMPLE_RATE as f64) * 1000.0;
    Ok(build_webm_file(&clusters, preskip, duration_ms))
}

fn cluster_header_len() -> usize {
    let mut probe = EbmlBuilder::new();
    init_cluster(&mut probe, 0);
    probe.len()
}

fn init_cluster(builder: &mut EbmlBuilder, start_ms: u32) {
    builder.clear();
    builder.u1(ids::TIMESTAMP).size(4).u4(start_ms);
}

fn write_simple_block(builder: &mut EbmlBuilder, opus_data: &[u8], current_ms: u32, cluster_start_ms: u32) {
    let offset = (current_ms - cluster_start_ms) as u16;
    builder
        .u1(ids::SIMPLE_BLOCK)
        .size(4 + opus_data.len() as u64)
        .u1(0x81) // track number 1, vint-encoded
        .u2(offset)
        .u1(0x80) // flags: keyframe
        .bytes(opus_data);
}

fn flush_cluster(clusters: &mut Vec<Vec<u8>>, current: &mut EbmlBuilder) {
    let mut cluster = EbmlBuilder::new();
    cluster.u4(ids::CLUSTER).payload(current);
    clusters.push(cluster.build());
    current.clear();
}

fn build_webm_file(clusters: &[Vec<u8>], preskip: u16, duration_ms: f64) -> Vec<u8> {
    let ebml_header = build_ebml_header();
    let segment_info = build_segment_info(duration_ms);
    let tracks = build_tracks(preskip);

    let mut segment_payload = EbmlBuilder::new();
    segment_payload.bytes(segment_info.as_slice());
    segment_payload.bytes(tracks.as_slice());
    for cluster in clusters {
        segment_payload.bytes(cluster);
    }

    let mut webm = EbmlBuilder::new();
    webm.u4(ids::EBML).payload(&ebml_header);
    webm.u4(ids::SEGMENT).payload(&segment_payload);
    webm.build()
}

fn build_ebml_header() -> EbmlBuilder {
    let mut header = EbmlBuilder::new();
    header.u2(ids::EBML_VERSION).size(1).u1(1);
    header.u2(ids::EBML_READ_VERSION).size(1).u1(1);
    header.u2(ids::EBML_MAX_ID_LENGTH).size(1).u1(4);
    header.u2(ids::EBML_MAX_SIZE_LENGTH).size(1).u1(8);
    header.u2(ids::DOC_TYPE).size(4).bytes(b"webm");
    header.u2(ids::DOC_TYPE_VERSION).size(1).u1(4);
    header.u2(ids::DOC_TYPE_READ_VERSION).size(1).u1(2);
    header
}

fn build_segment_info(duration_ms: f64) -> EbmlBuilder {
    let mut info_children = EbmlBuilder::new();
    info_children.bytes(&ids::TIMECODE_SCALE).size(4).u4(1_000_000);
    info_children.u2(ids::DURATION).size(8).f8(duration_ms);
    let app_name = b"auralis";
    info_children
        .u2(ids::MUXING_APP)
        .size(app_name.len() as u64)
        .bytes(app_name);
    info_children
        .u2(ids::WRITING_APP)
        .size(app_name.len() as u64)
        .bytes(app_name);

    let mut info = EbmlBuilder::new();
    info.u4(ids::INFO).payload(&info_children);
    info
}

fn build_tracks(preskip: u16) -> EbmlBuilder {
    let mut audio = EbmlBuilder::new();
    audio.u1(ids::CHANNELS).size(1).u1(2);
    audio
        .u1(ids::SAMPLING_FREQUENCY)
        .size(8)
        .f8(OPUS_SAMPLE_RATE as f64);
    audio.u2(ids::BIT_DEPTH).size(1).u1(32);

    let opus_head = build_opus_head(preskip);

    let mut track_entry = EbmlBuilder::new();
    track_entry.u1(ids::TRACK_NUMBER).size(1).u1(1);
    track_entry.u2(ids::TRACK_UID).size(8).u4(0xA0_DA0).u4(0x1C_E5);
    track_entry.u1(ids::FLAG_LACING).size(1).u1(0);
    track_entry.bytes(&ids::LANGUAGE).size(3).bytes(b"und");
    track_entry.u1(ids::CODEC_ID).size(6).bytes(b"A_OPUS");
    track_entry
        .u2(ids::CODEC_DELAY)
        .size(8)
        .u8((preskip as u64) * 1_000_000_000 / OPUS_SAMPLE_RATE as u64);
    track_entry.u2(ids::SEEK_PRE_ROLL).size(4).u4(80_000_000);
    track_entry.u1(ids::TRACK_TYPE).size(1).u1(0x02);
    track_entry.u1(ids::AUDIO).payload(&audio);
    track_entry
        .u2(ids::CODEC_PRIVATE)
        .size(opus_head.len() as u64)
        .bytes(&opus_head);

    let mut track = EbmlBuilder::new();
    track.u1(ids::TRACK_ENTRY).payload(&track_entry);

    let mut tracks = EbmlBuilder::new();
    tracks.u4(ids::TRACKS).payload(&track);
    tracks
}

fn build_opus_head(preskip: u16) -> Vec<u8> {
    let mut head = Vec::with_capacity(19);
    head.extend_from_slice(b"OpusHead");
    head.push(1); // version
    head.push(2); // stereo
    head.extend_from_slice(&preskip.to_le_bytes());
    head.extend_from_slice(&OPUS_SAMPLE_RATE.to_le_bytes());
    head.extend_from_slice(&0i16.to_le_bytes()); // output gain
    head.push(0); // channel mapping family
    head
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stereo_tone(seconds: f64, sample_rate: u32) -> PcmBuffer {
        let n = (seconds * sample_rate as f64) as usize;
        let samples: Vec<f32> = (0..n * 2)
            .map(|i| ((i / 2) as f32 * 0.02).sin() * 0.3)
            .collect();
        PcmBuffer::new(samples, sample_rate, 2).unwrap()
    }

    #[test]
    fn encodes_48k_stereo_to_webm_with_ebml_magic() {
        let pcm = stereo_tone(0.5, 48_000);
        let bytes = encode(&pcm).unwrap();
        assert_eq!(&bytes[0..4], &[0x1A, 0x45, 0xDF, 0xA3]);
    }

    #[test]
    fn encodes_44_1k_stereo_by_resampling_first() {
        let pcm = stereo_tone(0.5, 44_100);
        let bytes = encode(&pcm).unwrap();
        assert_eq!(&bytes[0..4], &[0x1A, 0x45, 0xDF, 0xA3]);
    }

    #[test]
    fn rejects_mono_input() {
        let pcm = PcmBuffer::new(vec![0.0; 100], 48_000, 1).unwrap();
        assert!(encode(&pcm).is_err());
    }

    #[test]
    fn empty_buffer_yields_structurally_valid_segment() {
        let pcm = PcmBuffer::new(Vec::new(), 48_000, 2).unwrap();
        let bytes = encode(&pcm).unwrap();
        assert_eq!(&bytes[0..4], &[0x1A, 0x45, 0xDF, 0xA3]);
    }
}
