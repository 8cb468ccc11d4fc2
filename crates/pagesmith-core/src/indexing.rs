//! Indexing-side support: collection bootstrap and batched page
//! ingestion.
//!
//! Every page image is embedded once; all named vector spaces are
//! derived from that single embedding before upsert. Batches fail
//! independently: a failed batch is reported with its id range and
//! the remaining batches still run.

use crate::config::{DEFAULT_UPSERT_BATCH_SIZE, EMBEDDING_DIM};
use crate::embedding::{derive_all, Embedder, VectorKind};
use crate::store::{Payload, PointStruct, StoreError, VectorSpec, VectorStore};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// The named vector spaces an indexed collection carries.
pub fn collection_specs() -> Vec<VectorSpec> {
    VectorKind::ALL
        .iter()
        .map(|kind| VectorSpec::multi(kind.as_str(), EMBEDDING_DIM))
        .collect()
}

/// One scanned page queued for indexing.
pub struct PageRecord {
    pub id: u64,
    /// Encoded page image bytes handed to the embedder.
    pub image: Vec<u8>,
    pub payload: Payload,
}

/// Outcome of an indexing run.
#[derive(Debug, Default)]
pub struct IndexReport {
    /// Points accepted by the store.
    pub indexed: usize,
    /// Pages dropped because embedding or pooling failed.
    pub skipped_pages: Vec<u64>,
    /// Human-readable descriptions of batches the store rejected.
    pub failed_batches: Vec<String>,
}

impl IndexReport {
    pub fn is_clean(&self) -> bool {
        self.skipped_pages.is_empty() && self.failed_batches.is_empty()
    }
}

/// Embeds pages and upserts them in batches.
pub struct PageIndexer {
    store: Arc<dyn VectorStore>,
    embedder: Arc<dyn Embedder>,
    collection: String,
    batch_size: usize,
}

impl PageIndexer {
    pub fn new(store: Arc<dyn VectorStore>, embedder: Arc<dyn Embedder>, collection: String) -> Self {
        Self {
            store,
            embedder,
            collection,
            batch_size: DEFAULT_UPSERT_BATCH_SIZE,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Creates the collection with all named vector spaces.
    ///
    /// Safe to call against an existing collection.
    pub async fn bootstrap(&self) -> Result<(), StoreError> {
        self.store
            .create_collection(&self.collection, &collection_specs())
            .await
    }

    /// Embeds and upserts `pages`, batch by batch.
    #[instrument(skip_all, fields(pages = pages.len(), batch_size = self.batch_size))]
    pub async fn index_pages(&self, pages: Vec<PageRecord>) -> IndexReport {
        let mut report = IndexReport::default();
        let mut points = Vec::with_capacity(pages.len());

        for page in pages {
            match self.embed_page(&page).await {
                Ok(point) => points.push(point),
                Err(reason) => {
                    warn!(page = page.id, %reason, "Skipping page");
                    report.skipped_pages.push(page.id);
                }
            }
        }

        for batch in points.chunks(self.batch_size) {
            let start_id = batch.first().map(|p| p.id).unwrap_or(0);
            let end_id = batch.last().map(|p| p.id).unwrap_or(0);
            match self.store.upsert(&self.collection, batch.to_vec()).await {
                Ok(()) => report.indexed += batch.len(),
                Err(e) => {
                    warn!(start_id, end_id, error = %e, "Batch upsert failed, continuing");
                    report
                        .failed_batches
                        .push(format!("points {start_id}..={end_id}: {e}"));
                }
            }
        }

        info!(
            indexed = report.indexed,
            skipped = report.skipped_pages.len(),
            failed_batches = report.failed_batches.len(),
            "Indexing run complete"
        );
        report
    }

    async fn embed_page(&self, page: &PageRecord) -> Result<PointStruct, String> {
        let matrix = self
            .embedder
            .embed_image(&page.image)
            .await
            .map_err(|e| e.to_string())?;
        let vectors = derive_all(&matrix)
            .map_err(|e| e.to_string())?
            .into_iter()
            .map(|(kind, vector)| (kind.as_str().to_string(), vector))
            .collect();
        Ok(PointStruct {
            id: page.id,
            vectors,
            payload: page.payload.clone(),
        })
    }
}
