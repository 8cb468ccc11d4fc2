//! # Pagesmith Core
//!
//! Retrieval engine for question answering over scanned technical
//! manuals. Pages are indexed as late-interaction embedding matrices
//! with pooled companion vector spaces; questions are decomposed,
//! retrieved per sub-question under a configurable search strategy,
//! rank-fused, and answered with page, table, and figure references.
//!
//! ## Architecture
//!
//! - [`embedding`]: embedding matrix types, the `Embedder` seam, and
//!   pooled vector derivation
//! - [`store`]: the vector store gateway (in-memory engine plus an
//!   optional Qdrant REST backend)
//! - [`search`]: search strategies and score fusion
//! - [`retrieval`]: query decomposition and per-sub-question fan-out
//! - [`references`]: table and figure reference collection
//! - [`indexing`]: collection bootstrap and batched page ingestion
//! - [`engine`]: the full ask-a-question cycle
//!
//! ## Example
//!
//! ```no_run
//! use pagesmith_core::config::RetrievalConfig;
//! use pagesmith_core::retrieval::{PassthroughDecomposer, RetrievalPipeline, RetrieverFactory, SearchSpace};
//! use pagesmith_core::search::SearchStrategy;
//! use pagesmith_core::store::InMemoryVectorStore;
//! use std::sync::Arc;
//!
//! # async fn example(embedder: Arc<dyn pagesmith_core::embedding::Embedder>) {
//! let config = RetrievalConfig::default();
//! let store = Arc::new(InMemoryVectorStore::new());
//! let factory = RetrieverFactory::new(embedder, store, config.clone(), SearchStrategy::Parallel);
//! let pipeline = RetrievalPipeline::new(
//!     Arc::new(PassthroughDecomposer),
//!     factory.retriever(SearchSpace::MultiVector),
//!     config.sub_question_limit,
//! );
//! let bundle = pipeline.run("how do I bleed the brakes?").await.unwrap();
//! # }
//! ```

pub mod config;
pub mod embedding;
pub mod engine;
pub mod error;
pub mod indexing;
pub mod references;
pub mod retrieval;
pub mod search;
pub mod store;

pub use engine::{AnswerSynthesizer, QaEngine, QaError, QaResponse};
pub use error::{DecompositionError, EmbeddingError, PoolingError, SynthesisError};
