//! Vector store gateway.
//!
//! A thin contract over a vector database holding one point per manual
//! page, with several named vectors per point (`initial`, `max_pooling`,
//! `mean_pooling`) and an opaque metadata payload.
//!
//! # Implementations
//!
//! - [`InMemoryVectorStore`]: brute-force cosine/MaxSim scoring over
//!   RwLock'd maps; used by tests and self-contained demos.
//! - `QdrantVectorStore`: REST gateway to a Qdrant server (feature
//!   `qdrant`).

mod memory;

#[cfg(feature = "qdrant")]
mod qdrant;

pub use memory::InMemoryVectorStore;

#[cfg(feature = "qdrant")]
pub use qdrant::QdrantVectorStore;

use crate::embedding::VectorData;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Opaque page metadata attached to a point.
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// Errors that can occur during vector store operations.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Collection does not exist
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    /// A single named-vector query failed (network, timeout, malformed filter)
    #[error("Query against '{vector_name}' failed: {reason}")]
    QueryFailed {
        /// Named vector the query targeted
        vector_name: String,
        /// Backend-reported failure
        reason: String,
    },

    /// A batch write failed; the failing id range is reported so the
    /// caller can retry or skip it while remaining batches continue.
    #[error("Upsert of points {start_id}..{start_id}+{count} failed: {reason}")]
    UpsertFailed {
        /// First point id in the failing batch
        start_id: u64,
        /// Number of points in the failing batch
        count: usize,
        /// Backend-reported failure
        reason: String,
    },

    /// Vector dimension or shape does not match the collection spec
    #[error("Dimension mismatch for '{vector_name}': expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Named vector with the mismatch
        vector_name: String,
        /// Dimension declared by the collection
        expected: usize,
        /// Dimension of the offending vector
        actual: usize,
    },

    /// Could not reach the store at all
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The call exceeded its bounded timeout
    #[error("Store call timed out after {0}ms")]
    Timeout(u64),

    /// Backend-internal error (lock poisoning, serialization)
    #[error("Store backend error: {0}")]
    Backend(String),
}

/// Declaration of one named vector space within a collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorSpec {
    /// Named-vector key (e.g. `initial`)
    pub name: String,
    /// Per-vector dimension
    pub dim: usize,
    /// True for multivector spaces compared by MaxSim; false for flat
    /// cosine spaces
    pub multivector: bool,
}

impl VectorSpec {
    /// A multivector space compared by max-similarity-over-pairs.
    pub fn multi(name: impl Into<String>, dim: usize) -> Self {
        Self {
            name: name.into(),
            dim,
            multivector: true,
        }
    }

    /// A flat cosine vector space.
    pub fn flat(name: impl Into<String>, dim: usize) -> Self {
        Self {
            name: name.into(),
            dim,
            multivector: false,
        }
    }
}

/// One point to upsert: id, named vectors, payload.
#[derive(Debug, Clone)]
pub struct PointStruct {
    /// Point identifier, unique within the collection
    pub id: u64,
    /// Named vectors stored together under this id
    pub vectors: HashMap<String, VectorData>,
    /// Opaque page metadata
    pub payload: Payload,
}

/// A scored query hit.
#[derive(Debug, Clone)]
pub struct ScoredPoint {
    /// Point identifier
    pub id: u64,
    /// Similarity score, higher is better
    pub score: f32,
    /// Payload stored with the point
    pub payload: Payload,
}

/// Equality match on one payload field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldMatch {
    /// Payload key
    pub key: String,
    /// Value the key must equal
    pub value: serde_json::Value,
}

/// Conjunction of payload field matches.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PayloadFilter {
    /// All conditions must hold
    pub must: Vec<FieldMatch>,
}

impl PayloadFilter {
    /// Filter requiring `key == value`.
    pub fn field(key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Self {
            must: vec![FieldMatch {
                key: key.into(),
                value: value.into(),
            }],
        }
    }

    /// True when `payload` satisfies every condition.
    pub fn matches(&self, payload: &Payload) -> bool {
        self.must
            .iter()
            .all(|m| payload.get(&m.key) == Some(&m.value))
    }
}

/// Collection statistics.
#[derive(Debug, Clone, Copy, Default)]
pub struct CollectionInfo {
    /// Total stored vectors across all named spaces
    pub vector_count: usize,
    /// Number of points
    pub point_count: usize,
}

/// Contract over the vector database.
///
/// Query results are always sorted by descending score; callers must
/// not assume any tie-break beyond that order. The connection is a
/// process-wide resource read concurrently by retrieval calls and never
/// mutated mid-request.
#[async_trait::async_trait]
pub trait VectorStore: Send + Sync {
    /// Creates a collection with the given named vector spaces.
    ///
    /// Creating an existing collection is not an error.
    async fn create_collection(&self, name: &str, specs: &[VectorSpec]) -> Result<(), StoreError>;

    /// Upserts points into a collection, overwriting existing ids.
    async fn upsert(&self, collection: &str, points: Vec<PointStruct>) -> Result<(), StoreError>;

    /// Queries one named vector space.
    ///
    /// Returns up to `limit` hits sorted by descending score, each with
    /// its payload. `filter` restricts candidates by payload equality.
    async fn query(
        &self,
        collection: &str,
        vector_name: &str,
        query: &VectorData,
        limit: usize,
        filter: Option<&PayloadFilter>,
    ) -> Result<Vec<ScoredPoint>, StoreError>;

    /// Deletes a collection and all its points.
    async fn delete_collection(&self, name: &str) -> Result<(), StoreError>;

    /// Returns collection statistics.
    async fn collection_info(&self, name: &str) -> Result<CollectionInfo, StoreError>;
}
