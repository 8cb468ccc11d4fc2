//! Deterministic feature-hashing embedder.
//!
//! Stands in for a model-backed late-interaction embedder: each token
//! becomes one 128-dimensional row, so token-level MaxSim matching
//! still behaves sensibly (shared vocabulary between a page and a
//! question produces aligned rows). Good enough for demos and offline
//! smoke tests; real deployments plug in a model behind the same
//! trait.

use async_trait::async_trait;
use pagesmith_core::config::EMBEDDING_DIM;
use pagesmith_core::embedding::{Embedder, EmbeddingMatrix};
use pagesmith_core::error::EmbeddingError;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Dimensions lit per token.
const FEATURES_PER_TOKEN: usize = 4;

pub struct HashEmbedder;

impl HashEmbedder {
    fn token_row(token: &str) -> Vec<f32> {
        let mut row = vec![0.0f32; EMBEDDING_DIM];
        let mut hasher = DefaultHasher::new();
        token.hash(&mut hasher);
        let mut state = hasher.finish();
        for _ in 0..FEATURES_PER_TOKEN {
            // xorshift step per feature
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            let dim = (state as usize) % EMBEDDING_DIM;
            let sign = if state & (1 << 63) == 0 { 1.0 } else { -1.0 };
            row[dim] += sign;
        }
        let norm = row.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut row {
                *x /= norm;
            }
        }
        row
    }

    fn embed(text: &str) -> Result<EmbeddingMatrix, EmbeddingError> {
        let rows: Vec<Vec<f32>> = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|token| !token.is_empty())
            .map(|token| Self::token_row(&token.to_lowercase()))
            .collect();
        if rows.is_empty() {
            return Err(EmbeddingError::InferenceFailed(
                "no tokens to embed".to_string(),
            ));
        }
        Ok(EmbeddingMatrix::new(rows, 0))
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed_image(&self, image: &[u8]) -> Result<EmbeddingMatrix, EmbeddingError> {
        let text = std::str::from_utf8(image)
            .map_err(|e| EmbeddingError::InferenceFailed(format!("non-text page input: {e}")))?;
        Self::embed(text)
    }

    async fn embed_text(&self, text: &str) -> Result<EmbeddingMatrix, EmbeddingError> {
        Self::embed(text)
    }

    fn embedding_dim(&self) -> usize {
        EMBEDDING_DIM
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_same_token_embeds_identically() {
        let a = HashEmbedder.embed_text("bleeder valve").await.unwrap();
        let b = HashEmbedder.embed_text("valve").await.unwrap();
        assert_eq!(a.rows()[1], b.rows()[0]);
    }

    #[tokio::test]
    async fn test_rows_are_unit_length() {
        let m = HashEmbedder.embed_text("hydraulic pump").await.unwrap();
        for row in m.rows() {
            let norm = row.iter().map(|x| x * x).sum::<f32>().sqrt();
            assert!((norm - 1.0).abs() < 1e-5);
        }
    }

    #[tokio::test]
    async fn test_empty_text_is_an_error() {
        assert!(HashEmbedder.embed_text("  ,, ").await.is_err());
    }
}
