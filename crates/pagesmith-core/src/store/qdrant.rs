//! Qdrant REST backend for the [`VectorStore`] trait.
//!
//! Talks to a Qdrant server over its HTTP API. Multivector spaces are
//! declared with the `max_sim` comparator so whole-matrix `initial`
//! queries are scored by max-similarity-over-pairs server-side.
//!
//! Every request carries the configured bounded timeout; a timed-out
//! query surfaces as [`StoreError::Timeout`] and is handled by the
//! strategy executor's degradation policy, not here.

use super::{
    CollectionInfo, PayloadFilter, PointStruct, ScoredPoint, StoreError, VectorSpec, VectorStore,
};
use crate::embedding::VectorData;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, instrument};

/// REST gateway to a Qdrant server.
pub struct QdrantVectorStore {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    timeout_ms: u64,
}

impl QdrantVectorStore {
    /// Connects to a Qdrant server.
    ///
    /// `timeout` bounds every request issued through this store.
    pub fn new(
        url: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;
        Ok(Self {
            http,
            base_url: url.trim_end_matches('/').to_string(),
            api_key,
            timeout_ms: timeout.as_millis() as u64,
        })
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self.http.request(method, format!("{}{}", self.base_url, path));
        if let Some(key) = &self.api_key {
            builder = builder.header("api-key", key);
        }
        builder
    }

    fn map_transport(&self, err: reqwest::Error) -> StoreError {
        if err.is_timeout() {
            StoreError::Timeout(self.timeout_ms)
        } else {
            StoreError::ConnectionFailed(err.to_string())
        }
    }

    async fn collection_exists(&self, name: &str) -> Result<bool, StoreError> {
        let response = self
            .request(reqwest::Method::GET, &format!("/collections/{name}"))
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;
        Ok(response.status().is_success())
    }
}

fn vector_value(vector: &VectorData) -> Value {
    // VectorData serializes untagged: flat -> [..], multi -> [[..]],
    // which is exactly the wire shape Qdrant expects.
    serde_json::to_value(vector).unwrap_or(Value::Null)
}

fn filter_value(filter: &PayloadFilter) -> Value {
    let must: Vec<Value> = filter
        .must
        .iter()
        .map(|m| json!({ "key": m.key, "match": { "value": m.value } }))
        .collect();
    json!({ "must": must })
}

#[derive(Deserialize)]
struct QueryResponse {
    result: QueryResult,
}

#[derive(Deserialize)]
struct QueryResult {
    points: Vec<QueryHit>,
}

#[derive(Deserialize)]
struct QueryHit {
    id: u64,
    score: f32,
    payload: Option<super::Payload>,
}

#[derive(Deserialize)]
struct InfoResponse {
    result: InfoResult,
}

#[derive(Deserialize)]
struct InfoResult {
    #[serde(default)]
    vectors_count: Option<usize>,
    #[serde(default)]
    points_count: Option<usize>,
}

#[async_trait::async_trait]
impl VectorStore for QdrantVectorStore {
    async fn create_collection(&self, name: &str, specs: &[VectorSpec]) -> Result<(), StoreError> {
        if self.collection_exists(name).await? {
            debug!(collection = name, "Using existing collection");
            return Ok(());
        }

        let mut vectors = serde_json::Map::new();
        for spec in specs {
            let mut params = json!({
                "size": spec.dim,
                "distance": "Cosine",
            });
            if spec.multivector {
                params["multivector_config"] = json!({ "comparator": "max_sim" });
            }
            vectors.insert(spec.name.clone(), params);
        }

        let response = self
            .request(reqwest::Method::PUT, &format!("/collections/{name}"))
            .json(&json!({ "vectors": vectors }))
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;

        if response.status().is_success() {
            debug!(collection = name, spaces = specs.len(), "Created collection");
            Ok(())
        } else {
            Err(StoreError::Backend(format!(
                "create_collection {name}: {} {}",
                response.status(),
                response.text().await.unwrap_or_default()
            )))
        }
    }

    #[instrument(skip_all, fields(collection, points = points.len()))]
    async fn upsert(&self, collection: &str, points: Vec<PointStruct>) -> Result<(), StoreError> {
        if points.is_empty() {
            return Ok(());
        }
        let start_id = points.first().map(|p| p.id).unwrap_or(0);
        let count = points.len();

        let body: Vec<Value> = points
            .iter()
            .map(|p| {
                let vectors: serde_json::Map<String, Value> = p
                    .vectors
                    .iter()
                    .map(|(name, vector)| (name.clone(), vector_value(vector)))
                    .collect();
                json!({ "id": p.id, "vector": vectors, "payload": p.payload })
            })
            .collect();

        let response = self
            .request(
                reqwest::Method::PUT,
                &format!("/collections/{collection}/points?wait=true"),
            )
            .json(&json!({ "points": body }))
            .send()
            .await
            .map_err(|e| match self.map_transport(e) {
                StoreError::Timeout(ms) => StoreError::Timeout(ms),
                other => StoreError::UpsertFailed {
                    start_id,
                    count,
                    reason: other.to_string(),
                },
            })?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(StoreError::UpsertFailed {
                start_id,
                count,
                reason: format!(
                    "{} {}",
                    response.status(),
                    response.text().await.unwrap_or_default()
                ),
            })
        }
    }

    #[instrument(skip_all, fields(collection, vector_name, limit))]
    async fn query(
        &self,
        collection: &str,
        vector_name: &str,
        query: &VectorData,
        limit: usize,
        filter: Option<&PayloadFilter>,
    ) -> Result<Vec<ScoredPoint>, StoreError> {
        let mut body = json!({
            "query": vector_value(query),
            "using": vector_name,
            "limit": limit,
            "with_payload": true,
        });
        if let Some(f) = filter {
            body["filter"] = filter_value(f);
        }

        let response = self
            .request(
                reqwest::Method::POST,
                &format!("/collections/{collection}/points/query"),
            )
            .json(&body)
            .send()
            .await
            .map_err(|e| match self.map_transport(e) {
                StoreError::Timeout(ms) => StoreError::Timeout(ms),
                other => StoreError::QueryFailed {
                    vector_name: vector_name.to_string(),
                    reason: other.to_string(),
                },
            })?;

        if !response.status().is_success() {
            return Err(StoreError::QueryFailed {
                vector_name: vector_name.to_string(),
                reason: format!(
                    "{} {}",
                    response.status(),
                    response.text().await.unwrap_or_default()
                ),
            });
        }

        let parsed: QueryResponse = response.json().await.map_err(|e| StoreError::QueryFailed {
            vector_name: vector_name.to_string(),
            reason: format!("malformed response: {e}"),
        })?;

        Ok(parsed
            .result
            .points
            .into_iter()
            .map(|hit| ScoredPoint {
                id: hit.id,
                score: hit.score,
                payload: hit.payload.unwrap_or_default(),
            })
            .collect())
    }

    async fn delete_collection(&self, name: &str) -> Result<(), StoreError> {
        let response = self
            .request(reqwest::Method::DELETE, &format!("/collections/{name}"))
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(StoreError::Backend(format!(
                "delete_collection {name}: {}",
                response.status()
            )))
        }
    }

    async fn collection_info(&self, name: &str) -> Result<CollectionInfo, StoreError> {
        let response = self
            .request(reqwest::Method::GET, &format!("/collections/{name}"))
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(StoreError::CollectionNotFound(name.to_string()));
        }
        if !response.status().is_success() {
            return Err(StoreError::Backend(format!(
                "collection_info {name}: {}",
                response.status()
            )));
        }

        let parsed: InfoResponse = response
            .json()
            .await
            .map_err(|e| StoreError::Backend(format!("malformed response: {e}")))?;
        Ok(CollectionInfo {
            vector_count: parsed.result.vectors_count.unwrap_or_default(),
            point_count: parsed.result.points_count.unwrap_or_default(),
        })
    }
}
