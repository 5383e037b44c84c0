//! Error types for quarry.
//!
//! Errors here are configuration-time only. Retrieval itself never fails:
//! empty documents, empty queries, and zero-match corpora all degrade to
//! structured empty or fallback results.

/// Errors that can occur while configuring the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid chunk size (must be > 0).
    #[error("invalid chunk size: {0} tokens (must be > 0)")]
    InvalidChunkSize(usize),

    /// Budget fraction must be in (0, 1].
    #[error("invalid budget fraction: {0} (must be in (0, 1])")]
    InvalidBudgetFraction(f64),

    /// Unknown model or encoding name for the exact tokenizer.
    #[error("unsupported tokenizer model/encoding: {0}")]
    UnsupportedEncoding(String),
}

/// Result type for quarry operations.
pub type Result<T> = std::result::Result<T, Error>;
