use thiserror::Error;

/// Errors surfaced at the Hybrid Processor's top-level boundary.
///
/// Individual DSP stages never return this type (see `docs` on
/// `hybrid_processor`): a stage that cannot satisfy its contract logs a
/// warning and passes its input through. Only the shape/finiteness checks
/// performed before the chain runs can fail.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DspError {
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// A chunk index outside `[0, chunk_count)`. The server maps this to
    /// a 404, per §7's `NotFound` kind.
    #[error("out of range: {0}")]
    OutOfRange(String),
}
