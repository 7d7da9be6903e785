/// `GET /chunk` — fetch one encoded audio fragment (§6).
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, HeaderName, HeaderValue};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use auralis_dsp::PresetBias;

use crate::error::{AuralisError, Result};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ChunkQuery {
    pub track_id: u32,
    pub chunk: usize,
    #[serde(default)]
    pub preset: Option<String>,
    #[serde(default)]
    pub intensity: Option<f32>,
    #[serde(default = "default_enhanced")]
    pub enhanced: bool,
}

fn default_enhanced() -> bool {
    true
}

fn parse_preset(tag: &str) -> Result<PresetBias> {
    match tag {
        "adaptive" => Ok(PresetBias::Adaptive),
        "gentle" => Ok(PresetBias::Gentle),
        "warm" => Ok(PresetBias::Warm),
        "bright" => Ok(PresetBias::Bright),
        "punchy" => Ok(PresetBias::Punchy),
        other => Err(AuralisError::InvalidInput(format!("unknown preset '{other}'"))),
    }
}

pub async fn chunk_handler(
    State(state): State<AppState>,
    Query(query): Query<ChunkQuery>,
) -> Result<Response> {
    let preset = match query.preset.as_deref() {
        Some(tag) => parse_preset(tag)?,
        None => PresetBias::Adaptive,
    };
    let intensity = query.intensity.unwrap_or(1.0);
    if !(0.0..=1.0).contains(&intensity) {
        return Err(AuralisError::InvalidInput(format!(
            "intensity must be in [0, 1], got {intensity}"
        )));
    }

    let response = state
        .cache
        .get_chunk(query.track_id, query.chunk, preset, intensity, query.enhanced)
        .await?;

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(response.mime_type));
    headers.insert(
        HeaderName::from_static("x-chunk-index"),
        HeaderValue::from_str(&response.chunk_index.to_string()).unwrap(),
    );
    headers.insert(
        HeaderName::from_static("x-chunk-duration-seconds"),
        HeaderValue::from_str(&response.duration_seconds.to_string()).unwrap(),
    );
    headers.insert(
        HeaderName::from_static("x-cache-tier"),
        HeaderValue::from_static(response.tier.header_value()),
    );

    Ok((headers, response.bytes.as_ref().clone()).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unknown_preset() {
        assert!(parse_preset("moody").is_err());
    }

    #[test]
    fn accepts_every_documented_preset() {
        for tag in ["adaptive", "gentle", "warm", "bright", "punchy"] {
            assert!(parse_preset(tag).is_ok());
        }
    }
}
