/// `GET /metadata` — authoritative chunk layout for a track (§6). Clients
/// must derive chunk boundaries from this response rather than assuming
/// the configured chunk duration, since it is clamped server-side.
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct MetadataQuery {
    pub track_id: u32,
}

#[derive(Debug, Serialize)]
pub struct MetadataResponse {
    pub chunk_count: usize,
    pub chunk_duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub total_duration_seconds: f64,
}

pub async fn metadata_handler(
    State(state): State<AppState>,
    Query(query): Query<MetadataQuery>,
) -> Result<Json<MetadataResponse>> {
    let meta = state.cache.metadata(query.track_id).await?;
    Ok(Json(MetadataResponse {
        chunk_count: meta.chunk_count,
        chunk_duration_seconds: meta.chunk_duration_seconds,
        sample_rate: meta.sample_rate,
        channels: meta.channels,
        total_duration_seconds: meta.total_duration_seconds,
    }))
}
