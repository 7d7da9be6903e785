use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// The closed set of failure kinds the engine surfaces to its transport.
/// DSP stages never produce this type (they log and pass through); only
/// the Chunked Processor and above propagate errors.
#[derive(Error, Debug)]
pub enum AuralisError {
    /// Track id unknown to the library, or chunk index >= chunk count.
    #[error("not found: {0}")]
    NotFound(String),

    /// Malformed request parameters (bad preset tag, out-of-range intensity).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The decoder could not parse the source file.
    #[error("decode error: {0}")]
    DecodeError(String),

    /// The Opus/WebM encoder failed.
    #[error("encode error: {0}")]
    EncodeError(String),

    /// The fingerprint generator collaborator is unreachable and the
    /// deployment is configured to refuse degraded processing.
    #[error("fingerprint unavailable: {0}")]
    FingerprintUnavailable(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<auralis_dsp::DspError> for AuralisError {
    fn from(err: auralis_dsp::DspError) -> Self {
        match err {
            auralis_dsp::DspError::OutOfRange(msg) => AuralisError::NotFound(msg),
            auralis_dsp::DspError::ShapeMismatch(msg) | auralis_dsp::DspError::InvalidInput(msg) => {
                AuralisError::InvalidInput(msg)
            }
        }
    }
}

impl IntoResponse for AuralisError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AuralisError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AuralisError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AuralisError::DecodeError(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            AuralisError::EncodeError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            AuralisError::FingerprintUnavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, msg.clone())
            }
            AuralisError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            AuralisError::Io(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
        };

        let body = Json(json!({ "error": message }));
        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AuralisError>;
