//! Error taxonomy for the processing pipeline.

use crate::config::StageId;

/// Errors surfaced by the processing API.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    /// The input image has an invalid shape, zero size, or non-finite values.
    #[error("invalid input image: {0}")]
    InvalidInput(String),

    /// Unknown parameter name or a value that cannot be coerced and clamped.
    #[error("invalid parameter '{name}' for stage {stage}: {reason}")]
    InvalidParameter {
        stage: StageId,
        name: String,
        reason: String,
    },

    /// The operation was aborted cooperatively via a cancel token.
    #[error("operation cancelled")]
    Cancelled,

    /// An individual stage failed during apply or auto-tune.
    #[error("stage {stage} failed: {reason}")]
    StageFailure { stage: StageId, reason: String },

    /// A cached result no longer matched the live configuration at install
    /// time. The result is discarded; callers normally never observe this.
    #[error("cache fingerprint mismatch")]
    CacheInconsistency,

    /// Allocation or capacity failure.
    #[error("resource exhaustion: {0}")]
    ResourceExhaustion(String),

    /// Configuration file could not be read or written.
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed or serialized.
    #[error("config parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),
}

impl ProcessError {
    /// True for cooperative cancellation, which is a distinguished outcome
    /// rather than a failure worth logging.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ProcessError::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, ProcessError>;
