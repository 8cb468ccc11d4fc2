//! Types for multi-vector embeddings.

use serde::{Deserialize, Serialize};

/// Raw per-token embedding matrix for one page or query.
///
/// Produced once by the embedding capability and immutable thereafter.
/// The first `len() - special_tokens` rows are spatial (patch) tokens;
/// the trailing `special_tokens` rows are special tokens that pooling
/// leaves untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingMatrix {
    rows: Vec<Vec<f32>>,
    special_tokens: usize,
}

impl EmbeddingMatrix {
    /// Wraps a per-token matrix with a trailing special-token count.
    pub fn new(rows: Vec<Vec<f32>>, special_tokens: usize) -> Self {
        Self {
            rows,
            special_tokens,
        }
    }

    /// Wraps a matrix with no special tokens (typical for text queries).
    pub fn from_rows(rows: Vec<Vec<f32>>) -> Self {
        Self::new(rows, 0)
    }

    /// Number of token rows (sequence length).
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True if the matrix has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Per-token embedding dimension, or 0 for an empty matrix.
    pub fn dim(&self) -> usize {
        self.rows.first().map(|r| r.len()).unwrap_or(0)
    }

    /// Number of trailing special-token rows.
    pub fn special_tokens(&self) -> usize {
        self.special_tokens
    }

    /// All token rows in sequence order.
    pub fn rows(&self) -> &[Vec<f32>] {
        &self.rows
    }

    /// Consumes the matrix, returning its rows.
    pub fn into_rows(self) -> Vec<Vec<f32>> {
        self.rows
    }
}

/// One vector payload for a named vector space.
///
/// Flat vectors are compared by plain cosine similarity. Multivectors
/// are ordered sequences of vectors compared by max-similarity-over-pairs
/// (MaxSim): for each query row take the best-matching point row, then
/// sum over query rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VectorData {
    /// Single vector
    Flat(Vec<f32>),
    /// Ordered sequence of vectors (late-interaction style)
    Multi(Vec<Vec<f32>>),
}

impl VectorData {
    /// Number of component vectors (1 for flat).
    pub fn vector_count(&self) -> usize {
        match self {
            VectorData::Flat(_) => 1,
            VectorData::Multi(rows) => rows.len(),
        }
    }

    /// Per-vector dimension, or 0 for an empty multivector.
    pub fn dim(&self) -> usize {
        match self {
            VectorData::Flat(v) => v.len(),
            VectorData::Multi(rows) => rows.first().map(|r| r.len()).unwrap_or(0),
        }
    }
}

/// The learned vector representations derived from one page embedding.
///
/// Each variant names a vector space within the collection; the string
/// labels double as named-vector keys in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VectorKind {
    /// Full per-token embedding, highest quality, slowest to compare
    Initial,
    /// Grid rows max-pooled, good at preserving peaks
    MaxPooling,
    /// Grid rows mean-pooled, good general summary
    MeanPooling,
}

impl VectorKind {
    /// All pooled representations, in fusion-weight order.
    pub const ALL: [VectorKind; 3] = [
        VectorKind::Initial,
        VectorKind::MaxPooling,
        VectorKind::MeanPooling,
    ];

    /// Named-vector key used by the vector store.
    pub fn as_str(&self) -> &'static str {
        match self {
            VectorKind::Initial => "initial",
            VectorKind::MaxPooling => "max_pooling",
            VectorKind::MeanPooling => "mean_pooling",
        }
    }
}

impl std::fmt::Display for VectorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
