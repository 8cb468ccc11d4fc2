//! Traits for the external embedding capability.

use super::types::EmbeddingMatrix;
use crate::error::EmbeddingError;
use async_trait::async_trait;

/// Late-interaction embedding model producing per-token matrices.
///
/// Implementations wrap whatever serves the model (local inference,
/// remote endpoint). The engine only requires the matrix shape contract:
/// page images yield a full spatial grid plus trailing special tokens,
/// text queries yield a short non-spatial sequence.
///
/// Model or device failures are fatal for the request (retrieval is
/// impossible without a query embedding) and must be surfaced, not
/// swallowed.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embeds one page image (raw encoded bytes).
    async fn embed_image(&self, image: &[u8]) -> Result<EmbeddingMatrix, EmbeddingError>;

    /// Embeds one query text.
    async fn embed_text(&self, text: &str) -> Result<EmbeddingMatrix, EmbeddingError>;

    /// Per-token embedding dimension this model produces.
    fn embedding_dim(&self) -> usize;
}
