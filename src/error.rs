//! Error types for the generation pipeline.

use thiserror::Error;

use crate::store::StoreError;

/// Result type alias using GenError.
pub type Result<T, E = GenError> = std::result::Result<T, E>;

/// Unified error type for a generation run.
///
/// The taxonomy matters for control flow: `Config` aborts before any
/// writes, `Invariant` indicates a logic defect and is never retried,
/// `Collision` means bounded resampling was exhausted, and `Write`
/// means the batch writer gave up after its retry budget.
#[derive(Error, Debug)]
pub enum GenError {
    /// Missing or out-of-range run parameters or reference data.
    #[error("configuration error: {0}")]
    Config(String),

    /// A generated record violated referential integrity. Logic defect.
    #[error("invariant violated in {stage}: {detail}")]
    Invariant { stage: &'static str, detail: String },

    /// Identifier or email uniqueness could not be satisfied by resampling.
    #[error("uniqueness collision in {stage} after {attempts} attempts: {detail}")]
    Collision {
        stage: &'static str,
        attempts: u32,
        detail: String,
    },

    /// A batch write failed after exhausting retries. Carries enough
    /// context (collection, batch offset) to resume the run.
    #[error("write to '{collection}' failed at batch offset {offset} ({written} documents written before failure): {source}")]
    Write {
        collection: &'static str,
        offset: usize,
        written: usize,
        source: StoreError,
    },

    /// Document serialization error.
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl GenError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        GenError::Config(msg.into())
    }

    /// Create an invariant-violation error.
    pub fn invariant(stage: &'static str, detail: impl Into<String>) -> Self {
        GenError::Invariant {
            stage,
            detail: detail.into(),
        }
    }
}
