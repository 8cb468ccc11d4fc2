//! Production configuration constants and the retrieval config object.
//!
//! Constants here mirror the indexed collection's layout: all three named
//! vector spaces are 128-dimensional cosine spaces derived from the same
//! late-interaction page embedding.

use std::time::Duration;

// =============================================================================
// Embedding Layout
// =============================================================================

/// Per-token embedding dimension produced by the page embedding model.
pub const EMBEDDING_DIM: usize = 128;

/// Side length of the spatial patch grid for a full page image.
///
/// Page embeddings lay out the first `GRID_SIZE * GRID_SIZE` tokens as a
/// square grid of image patches; pooling reduces one grid axis.
pub const GRID_SIZE: usize = 32;

/// Number of spatial (patch) tokens in a page embedding.
///
/// Query embeddings at or below this length are treated as non-spatial
/// and pooled across the whole sequence instead of the grid.
pub const IMAGE_SEQ_LEN: usize = GRID_SIZE * GRID_SIZE;

// =============================================================================
// Fusion Scoring
// =============================================================================

/// Score multiplier for precision-oriented (refined) cascade results.
///
/// Items found by the `initial` pass always outrank recall-only
/// candidates at equal raw score; an item found by both passes keeps
/// only its boosted refined entry.
pub const CASCADE_REFINED_BOOST: f32 = 1.2;

/// Score multiplier for recall-oriented (fast) cascade results.
pub const CASCADE_FAST_BOOST: f32 = 1.0;

/// Fusion weight for results found by the full late-interaction space.
pub const FUSION_WEIGHT_INITIAL: f32 = 1.0;

/// Fusion weight for results found by the max-pooled space.
pub const FUSION_WEIGHT_MAX_POOLING: f32 = 0.8;

/// Fusion weight for results found by the mean-pooled space.
pub const FUSION_WEIGHT_MEAN_POOLING: f32 = 0.7;

/// Per-agreeing-vector-space reward applied on top of the fused score.
///
/// `agreement_boost = 1 + (vector_count - 1) * AGREEMENT_BOOST_STEP`
pub const AGREEMENT_BOOST_STEP: f32 = 0.1;

/// Candidate over-fetch multiplier for merged strategies.
///
/// Cascade and parallel searches request `limit * OVERFETCH_FACTOR`
/// candidates per vector space so the merge has enough overlap to rank.
pub const OVERFETCH_FACTOR: usize = 2;

// =============================================================================
// Retrieval Defaults
// =============================================================================

/// Default minimum fused score kept after ranking.
///
/// Applied uniformly after fusion, never inside individual vector
/// queries (those return gateway-ordered raw scores).
pub const DEFAULT_SCORE_THRESHOLD: f32 = 0.0;

/// Default per-sub-question result limit.
///
/// Smaller than a typical overall evidence size since bundles are
/// merged across sub-questions downstream.
pub const DEFAULT_SUB_QUESTION_LIMIT: usize = 6;

/// Default bound on concurrently retrieving sub-questions.
pub const MAX_CONCURRENT_SUB_QUESTIONS: usize = 4;

/// Default timeout for external calls (vector store, decomposition, synthesis).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default number of points per upsert batch during indexing.
pub const DEFAULT_UPSERT_BATCH_SIZE: usize = 16;

/// Configuration for the retrieval engine.
///
/// Constructed once at process start and passed to every component that
/// needs it; there are no module-level client singletons.
#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    /// Vector store endpoint URL (e.g. `http://localhost:6333`)
    pub store_url: String,
    /// Optional API key for the vector store
    pub store_api_key: Option<String>,
    /// Collection holding the indexed manual pages
    pub collection: String,
    /// Bounded timeout for every external call
    pub timeout: Duration,
    /// Minimum fused score kept after ranking
    pub score_threshold: f32,
    /// Per-sub-question result limit
    pub sub_question_limit: usize,
    /// Root of the page artifact tree (`page_<n>/tables`, `page_<n>/images`)
    pub artifact_root: std::path::PathBuf,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            store_url: "http://localhost:6333".to_string(),
            store_api_key: None,
            collection: "manual_pages".to_string(),
            timeout: DEFAULT_TIMEOUT,
            score_threshold: DEFAULT_SCORE_THRESHOLD,
            sub_question_limit: DEFAULT_SUB_QUESTION_LIMIT,
            artifact_root: std::path::PathBuf::from("scratch"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spatial_length_is_square_grid() {
        assert_eq!(IMAGE_SEQ_LEN, GRID_SIZE * GRID_SIZE);
    }

    #[test]
    fn test_refined_boost_outranks_fast() {
        assert!(CASCADE_REFINED_BOOST > CASCADE_FAST_BOOST);
    }

    #[test]
    fn test_default_config_has_bounded_timeout() {
        let config = RetrievalConfig::default();
        assert!(config.timeout > Duration::ZERO);
        assert!(config.sub_question_limit > 0);
    }
}
