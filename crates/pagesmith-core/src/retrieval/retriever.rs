//! Retriever implementations and the search-space factory.
//!
//! A [`Retriever`] owns the full text-to-results path for one search
//! space: embed the sub-question, execute the configured strategy,
//! return fused results. The [`RetrieverFactory`] builds retrievers
//! lazily and memoizes them per [`SearchSpace`], so repeated requests
//! share the underlying clients.

use super::decompose::SubQuestion;
use crate::config::RetrievalConfig;
use crate::embedding::Embedder;
use crate::error::EmbeddingError;
use crate::search::{FusedResult, SearchError, SearchStrategy, StrategyExecutor};
use crate::store::VectorStore;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, instrument};

/// Errors from running one sub-question through a retriever.
#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("query embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),
    #[error(transparent)]
    Search(#[from] SearchError),
}

/// Which search space a retriever is built over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchSpace {
    /// Pooled multi-space search with strategy-level fusion.
    MultiVector,
    /// Full-resolution late-interaction matching only.
    LateInteraction,
}

impl SearchSpace {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchSpace::MultiVector => "multi_vector",
            SearchSpace::LateInteraction => "late_interaction",
        }
    }
}

/// Runs one sub-question end to end against a search space.
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn retrieve(
        &self,
        question: &SubQuestion,
        limit: usize,
    ) -> Result<Vec<FusedResult>, RetrievalError>;
}

/// Retriever over the pooled vector spaces, with a configurable
/// merge strategy.
pub struct MultiVectorRetriever {
    embedder: Arc<dyn Embedder>,
    executor: StrategyExecutor,
    strategy: SearchStrategy,
}

impl MultiVectorRetriever {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        executor: StrategyExecutor,
        strategy: SearchStrategy,
    ) -> Self {
        Self {
            embedder,
            executor,
            strategy,
        }
    }
}

#[async_trait]
impl Retriever for MultiVectorRetriever {
    #[instrument(skip_all, fields(strategy = %self.strategy, limit))]
    async fn retrieve(
        &self,
        question: &SubQuestion,
        limit: usize,
    ) -> Result<Vec<FusedResult>, RetrievalError> {
        let embedding = self.embedder.embed_text(&question.text).await?;
        let results = self
            .executor
            .search(&embedding, self.strategy, limit, None)
            .await?;
        debug!(results = results.len(), "Sub-question retrieved");
        Ok(results)
    }
}

/// Retriever pinned to the full late-interaction space.
///
/// Always runs the single-pass strategy regardless of what the
/// factory's default strategy is.
pub struct LateInteractionRetriever {
    inner: MultiVectorRetriever,
}

impl LateInteractionRetriever {
    pub fn new(embedder: Arc<dyn Embedder>, executor: StrategyExecutor) -> Self {
        Self {
            inner: MultiVectorRetriever::new(embedder, executor, SearchStrategy::BestOnly),
        }
    }
}

#[async_trait]
impl Retriever for LateInteractionRetriever {
    async fn retrieve(
        &self,
        question: &SubQuestion,
        limit: usize,
    ) -> Result<Vec<FusedResult>, RetrievalError> {
        self.inner.retrieve(question, limit).await
    }
}

/// Builds and memoizes retrievers per search space.
pub struct RetrieverFactory {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    config: RetrievalConfig,
    strategy: SearchStrategy,
    cache: Mutex<HashMap<SearchSpace, Arc<dyn Retriever>>>,
}

impl RetrieverFactory {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        config: RetrievalConfig,
        strategy: SearchStrategy,
    ) -> Self {
        Self {
            embedder,
            store,
            config,
            strategy,
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn executor(&self) -> StrategyExecutor {
        StrategyExecutor::new(
            Arc::clone(&self.store),
            self.config.collection.clone(),
            self.config.score_threshold,
        )
    }

    /// Returns the retriever for `space`, constructing it on first use.
    pub fn retriever(&self, space: SearchSpace) -> Arc<dyn Retriever> {
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(cache.entry(space).or_insert_with(|| {
            debug!(space = space.as_str(), "Constructing retriever");
            match space {
                SearchSpace::MultiVector => Arc::new(MultiVectorRetriever::new(
                    Arc::clone(&self.embedder),
                    self.executor(),
                    self.strategy,
                )),
                SearchSpace::LateInteraction => Arc::new(LateInteractionRetriever::new(
                    Arc::clone(&self.embedder),
                    self.executor(),
                )),
            }
        }))
    }
}
