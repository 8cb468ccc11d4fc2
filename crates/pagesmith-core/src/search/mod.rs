//! Multi-space search: strategy execution and score fusion.
//!
//! A query embedding can be matched against the collection three ways
//! ([`SearchStrategy`]): a single full-resolution pass, a two-pass
//! cascade, or a concurrent fan-out over every vector space with rank
//! fusion. All strategies produce the same [`FusedResult`] shape so
//! downstream retrieval code is strategy-agnostic.

mod fusion;
mod strategy;
mod types;

pub use fusion::{combine_cascade, fusion_rerank, fusion_weight};
pub use strategy::StrategyExecutor;
pub use types::{FusedResult, ResultSource, SearchError, SearchStrategy};
