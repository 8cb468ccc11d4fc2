//! Multi-vector embeddings and pooled representation derivation.
//!
//! One page embedding feeds three named vector spaces:
//!
//! - `initial`: the full per-token matrix, compared by MaxSim
//! - `max_pooling`: grid rows max-pooled (recall-oriented, fast)
//! - `mean_pooling`: grid rows mean-pooled (general summary)
//!
//! The [`Embedder`] trait abstracts the model itself; [`pooling`]
//! derives the representations from its output.

mod pooling;
mod traits;
mod types;

pub use pooling::{derive_all, derive_vector};
pub use traits::Embedder;
pub use types::{EmbeddingMatrix, VectorData, VectorKind};
