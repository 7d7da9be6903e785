use axum::Json;
use serde::Serialize;
use std::sync::OnceLock;

static START_TIME: OnceLock<std::time::Instant> = OnceLock::new();

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_sec: u64,
}

pub async fn health_handler() -> Json<HealthResponse> {
    let start = START_TIME.get_or_init(std::time::Instant::now);

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        uptime_sec: start.elapsed().as_secs(),
    })
}
