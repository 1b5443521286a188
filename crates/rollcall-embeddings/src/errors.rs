//! Error types for embedding storage, matching, and extraction.

/// Errors from the embedding store, matcher, and extraction seam.
#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    /// Query or appended vector length disagrees with the store dimension.
    /// This is a caller programming/config error, distinct from "no match".
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension the store holds.
        expected: usize,
        /// Dimension the caller supplied.
        actual: usize,
    },

    /// Persisted snapshot could not be decoded into (labels, vectors).
    #[error("embedding snapshot corrupt: {0}")]
    Corrupt(String),

    /// Persistence layer could not complete a durable read or write.
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// Upstream model could not produce a vector (e.g. no face detected).
    #[error("feature extraction failed: {0}")]
    Extraction(String),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result alias for embedding operations.
pub type Result<T> = std::result::Result<T, EmbeddingError>;
