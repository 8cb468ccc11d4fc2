//! Core types shared across the search module.

use crate::embedding::VectorKind;
use crate::store::{Payload, StoreError};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// How a query is executed against the vector spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchStrategy {
    /// Single pass over the full late-interaction space. Highest
    /// precision, one store round-trip, no degradation margin.
    BestOnly,
    /// Recall pass over the max-pooled space merged with a refined
    /// pass over the full space.
    Cascade,
    /// All three spaces queried concurrently and rank-fused.
    Parallel,
}

impl SearchStrategy {
    pub const ALL: [SearchStrategy; 3] = [
        SearchStrategy::BestOnly,
        SearchStrategy::Cascade,
        SearchStrategy::Parallel,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SearchStrategy::BestOnly => "best_only",
            SearchStrategy::Cascade => "cascade",
            SearchStrategy::Parallel => "parallel",
        }
    }
}

impl fmt::Display for SearchStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "best_only" => Ok(SearchStrategy::BestOnly),
            "cascade" => Ok(SearchStrategy::Cascade),
            "parallel" => Ok(SearchStrategy::Parallel),
            other => Err(format!("unknown search strategy: {other}")),
        }
    }
}

/// Which cascade pass produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultSource {
    /// Found by the full late-interaction pass (possibly also by the
    /// fast pass; the refined entry wins).
    Refined,
    /// Found only by the pooled recall pass.
    Fast,
}

/// A ranked search result after strategy-level merging.
///
/// `scores` holds the raw per-space scores that contributed;
/// `final_score` is what results are ordered by.
#[derive(Debug, Clone)]
pub struct FusedResult {
    pub id: u64,
    pub payload: Payload,
    /// Raw score per vector space that returned this point.
    pub scores: HashMap<VectorKind, f32>,
    /// Number of vector spaces that agreed on this point.
    pub vector_count: usize,
    /// Weighted mean of the per-space scores.
    pub fusion_score: f32,
    /// `fusion_score` after the agreement boost (or cascade boost).
    pub final_score: f32,
    /// Set for cascade results, `None` for other strategies.
    pub source: Option<ResultSource>,
}

/// Errors surfaced by strategy execution.
///
/// A single vector space failing under a multi-space strategy is
/// degraded to an empty result set and never reaches this type; only
/// a total loss of candidates does.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// The sole query of a single-space strategy failed.
    #[error("search failed: {0}")]
    Store(#[from] StoreError),

    /// Every vector space query under a multi-space strategy failed.
    #[error("all vector space queries failed: {reasons:?}")]
    AllQueriesFailed { reasons: Vec<String> },
}
