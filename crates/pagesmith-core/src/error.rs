//! Error types for pagesmith-core.
//!
//! This module defines error types shared across the core library:
//! embedding, pooling, decomposition, and answer-synthesis errors.
//! Store and search errors live next to their modules
//! ([`StoreError`](crate::store::StoreError),
//! [`SearchError`](crate::search::SearchError)).

use thiserror::Error;

/// Errors that can occur during embedding operations.
///
/// Embedding failures are fatal for the request that triggered them:
/// without a query embedding there is nothing to retrieve with.
#[derive(Debug, Clone, Error)]
pub enum EmbeddingError {
    /// Failed to load model weights or processor
    #[error("Failed to load model: {0}")]
    ModelLoad(String),
    /// Forward pass through the model failed
    #[error("Inference failed: {0}")]
    InferenceFailed(String),
    /// Model not available or initialization failed
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),
    /// External embedding call exceeded its deadline
    #[error("Embedding timed out after {0}ms")]
    Timeout(u64),
}

/// Errors that can occur while deriving pooled vector representations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PoolingError {
    /// The spatial block cannot be reshaped into the expected square grid.
    ///
    /// Callers must surface this rather than truncating the matrix.
    #[error("spatial block of {spatial_len} rows does not form a {grid}x{grid} grid")]
    InvalidGrid {
        /// Number of rows in the spatial block (sequence length minus special tokens)
        spatial_len: usize,
        /// Expected grid side length
        grid: usize,
    },
    /// The matrix claims more special tokens than it has rows.
    #[error("matrix has {rows} rows but declares {special} special tokens")]
    SpecialTokenOverflow {
        /// Total rows in the matrix
        rows: usize,
        /// Declared trailing special tokens
        special: usize,
    },
    /// The matrix has no rows to pool.
    #[error("cannot pool an empty embedding matrix")]
    EmptyMatrix,
}

/// Errors from the query-decomposition capability.
///
/// Decomposition failures are never fatal: the pipeline falls back to
/// retrieving with the original question as the sole sub-question.
#[derive(Debug, Clone, Error)]
pub enum DecompositionError {
    /// The decomposition model call failed
    #[error("Decomposition call failed: {0}")]
    CallFailed(String),
    /// The model returned a response that could not be parsed
    #[error("Malformed decomposition response: {0}")]
    MalformedResponse(String),
    /// External decomposition call exceeded its deadline
    #[error("Decomposition timed out after {0}ms")]
    Timeout(u64),
}

/// Errors from the answer-synthesis capability.
#[derive(Debug, Clone, Error)]
pub enum SynthesisError {
    /// The synthesis model call failed
    #[error("Answer synthesis failed: {0}")]
    CallFailed(String),
    /// External synthesis call exceeded its deadline
    #[error("Answer synthesis timed out after {0}ms")]
    Timeout(u64),
}

impl From<EmbeddingError> for String {
    fn from(err: EmbeddingError) -> String {
        err.to_string()
    }
}
