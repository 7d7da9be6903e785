use crate::error::{AuralisError, Result};
use auralis_dsp::PcmBuffer;
use std::fs::File;
use symphonia::core::audio::{AudioBufferRef, Signal};
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::probe::Hint;

/// Decode a source file into a stereo `PcmBuffer`. Mono sources are
/// duplicated to dual-mono stereo at load time so every downstream DSP
/// stage can assume `channels == 2` unconditionally (the Hybrid Processor
/// contract, per `PcmBuffer::ensure_stereo`); sources with more than two
/// channels are downmixed to stereo by averaging extra channels into L/R.
pub async fn load_audio(filepath: &str) -> Result<PcmBuffer> {
    if !std::path::Path::new(filepath).exists() {
        return Err(AuralisError::NotFound(filepath.to_string()));
    }

    let filepath = filepath.to_string();
    tokio::task::spawn_blocking(move || load_audio_sync(&filepath))
        .await
        .map_err(|e| AuralisError::Internal(format!("decode task join error: {e}")))?
}

fn load_audio_sync(filepath: &str) -> Result<PcmBuffer> {
    tracing::debug!(filepath, "decoding audio file");

    let file = File::open(filepath)
        .map_err(|e| AuralisError::NotFound(format!("{filepath}: {e}")))?;

    use symphonia::core::io::ReadOnlySource;
    let source = ReadOnlySource::new(file);
    let mss = MediaSourceStream::new(Box::new(source), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = std::path::Path::new(filepath).extension() {
        hint.with_extension(&ext.to_string_lossy());
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &Default::default())
        .map_err(|e| AuralisError::DecodeError(format!("failed to probe format: {e}")))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.sample_rate.is_some())
        .ok_or_else(|| AuralisError::DecodeError("no audio tracks found".into()))?;

    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| AuralisError::DecodeError("no sample rate found".into()))?;
    let source_channels = track
        .codec_params
        .channels
        .ok_or_else(|| AuralisError::DecodeError("no channel info found".into()))?
        .count();

    tracing::debug!(sample_rate, source_channels, "source stream format");

    let mut left: Vec<f32> = Vec::new();
    let mut right: Vec<f32> = Vec::new();
    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| AuralisError::DecodeError(format!("decoder init error: {e}")))?;

    loop {
        match format.next_packet() {
            Ok(packet) => match decoder.decode(&packet) {
                Ok(buf) => collect_stereo(&mut left, &mut right, &buf, source_channels)?,
                Err(symphonia::core::errors::Error::DecodeError(_)) => continue,
                Err(e) => return Err(AuralisError::DecodeError(e.to_string())),
            },
            Err(symphonia::core::errors::Error::IoError(_)) => break,
            Err(symphonia::core::errors::Error::Unsupported(_)) => break,
            Err(e) => return Err(AuralisError::DecodeError(e.to_string())),
        }
    }

    if left.is_empty() {
        return Err(AuralisError::DecodeError("no audio samples decoded".into()));
    }
    if !left.iter().chain(right.iter()).all(|s| s.is_finite()) {
        return Err(AuralisError::DecodeError(
            "audio contains NaN or infinite values".into(),
        ));
    }

    tracing::debug!(frames = left.len(), sample_rate, "decode complete");

    Ok(PcmBuffer::from_left_right(&left, &right, sample_rate))
}

/// Accumulate decoded frames as stereo, upmixing mono and downmixing
/// surround by averaging any channel beyond the first two into L and R.
fn collect_stereo(
    left: &mut Vec<f32>,
    right: &mut Vec<f32>,
    buf: &AudioBufferRef,
    source_channels: usize,
) -> Result<()> {
    macro_rules! process_buffer {
        ($buf:expr, $norm_fn:expr) => {{
            if $buf.frames() == 0 {
                return Ok(());
            }
            let n_frames = $buf.frames();
            let ch_count = std::cmp::min(source_channels, $buf.spec().channels.count()).max(1);
            for frame_idx in 0..n_frames {
                if ch_count == 1 {
                    let v = $norm_fn($buf.chan(0)[frame_idx]);
                    left.push(v);
                    right.push(v);
                } else {
                    left.push($norm_fn($buf.chan(0)[frame_idx]));
                    right.push($norm_fn($buf.chan(1)[frame_idx]));
                }
            }
        }};
    }

    match buf {
        AudioBufferRef::F32(fbuf) => process_buffer!(fbuf, |v: f32| v),
        AudioBufferRef::F64(fbuf) => process_buffer!(fbuf, |v: f64| v as f32),
        AudioBufferRef::S8(ibuf) => process_buffer!(ibuf, |v: i8| v as f32 / i8::MAX as f32),
        AudioBufferRef::S16(ibuf) => process_buffer!(ibuf, |v: i16| v as f32 / i16::MAX as f32),
        AudioBufferRef::S24(ibuf) => process_buffer!(ibuf, |v: symphonia::core::sample::i24| {
            v.into_i32() as f32 / (2_i32.pow(23) - 1) as f32
        }),
        AudioBufferRef::S32(ibuf) => process_buffer!(ibuf, |v: i32| v as f32 / i32::MAX as f32),
        AudioBufferRef::U8(ubuf) => process_buffer!(ubuf, |v: u8| ((v as f32 / 255.0) - 0.5) * 2.0),
        AudioBufferRef::U16(ubuf) => {
            process_buffer!(ubuf, |v: u16| ((v as f32 / 65535.0) - 0.5) * 2.0)
        }
        AudioBufferRef::U24(ubuf) => process_buffer!(ubuf, |v: symphonia::core::sample::u24| {
            let norm = v.into_u32() as f32 / (2_u32.pow(24) - 1) as f32;
            (norm - 0.5) * 2.0
        }),
        AudioBufferRef::U32(ubuf) => {
            process_buffer!(ubuf, |v: u32| ((v as f32 / u32::MAX as f32) - 0.5) * 2.0)
        }
    }
    Ok(())
}
