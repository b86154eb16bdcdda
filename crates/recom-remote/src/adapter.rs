use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, info, warn};

use recom_core::config::QdrantSettings;
use recom_core::similarity::round4;
use recom_core::traits::SimilarityBackend;
use recom_core::types::{BackendKind, Point, ScoredPoint, SearchResult, NAME_FIELD};
use recom_core::{Error, Result};

use crate::qdrant::QdrantStore;
use crate::store::{CollectionInfo, VectorStore};

/// Points per upsert round-trip.
pub const UPSERT_BATCH_SIZE: usize = 100;

/// Owns the lifecycle of one named collection in a [`VectorStore`].
pub struct RemoteIndex<S> {
    store: S,
    collection: String,
    dim: Mutex<Option<usize>>,
}

impl RemoteIndex<QdrantStore> {
    pub fn connect(settings: &QdrantSettings) -> Result<Self> {
        let store = QdrantStore::from_settings(settings)?;
        info!(url = store.base_url(), collection = %settings.collection_name, "using qdrant");
        Ok(Self::new(store, settings.collection_name.clone()))
    }
}

impl<S: VectorStore> RemoteIndex<S> {
    pub fn new(store: S, collection: impl Into<String>) -> Self {
        Self { store, collection: collection.into(), dim: Mutex::new(None) }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn collection_exists(&self) -> Result<bool> {
        Ok(self.store.collection_info(&self.collection).await?.is_some())
    }

    /// Creates the collection with cosine distance unless it already exists.
    /// Returns whether a new collection was created.
    pub async fn create_collection(&self, dim: usize) -> Result<bool> {
        *self.dim.lock() = None;
        if let Some(existing) = self.store.collection_info(&self.collection).await? {
            if existing.dim != dim {
                warn!(
                    collection = %self.collection,
                    existing = existing.dim,
                    requested = dim,
                    "collection exists with a different vector size"
                );
            }
            *self.dim.lock() = Some(existing.dim);
            debug!(collection = %self.collection, points = existing.points_count, "collection already exists");
            return Ok(false);
        }
        self.store.create_collection(&self.collection, dim).await?;
        *self.dim.lock() = Some(dim);
        info!(collection = %self.collection, dim, "created collection");
        Ok(true)
    }

    /// Deletes the collection and all its points; a missing one is only logged.
    pub async fn drop_collection(&self) -> Result<()> {
        *self.dim.lock() = None;
        if self.store.delete_collection(&self.collection).await? {
            info!(collection = %self.collection, "dropped collection");
        } else {
            warn!(collection = %self.collection, "drop requested but collection does not exist");
        }
        Ok(())
    }

    /// Current shape of the collection; `IndexNotFound` when it is absent.
    /// Refreshes the cached dimension.
    pub async fn collection_info(&self) -> Result<CollectionInfo> {
        let info = self
            .store
            .collection_info(&self.collection)
            .await?
            .ok_or_else(|| Error::IndexNotFound(self.collection.clone()))?;
        *self.dim.lock() = Some(info.dim);
        Ok(info)
    }

    /// Configured vector size, looked up once and then cached.
    pub async fn collection_dim(&self) -> Result<usize> {
        let cached = *self.dim.lock();
        if let Some(dim) = cached {
            return Ok(dim);
        }
        Ok(self.collection_info().await?.dim)
    }

    pub async fn count(&self) -> Result<u64> {
        self.store.count(&self.collection).await
    }

    /// Sequential batches of [`UPSERT_BATCH_SIZE`]; the first failing batch
    /// aborts the rest. Returns the number of points written.
    pub async fn upsert(&self, points: &[Point]) -> Result<usize> {
        if points.is_empty() {
            return Ok(0);
        }
        let dim = self.collection_dim().await?;
        if let Some(bad) = points.iter().find(|p| p.vector.len() != dim) {
            return Err(Error::DimensionMismatch { expected: dim, actual: bad.vector.len() });
        }
        let batches = points.len().div_ceil(UPSERT_BATCH_SIZE);
        let mut written = 0usize;
        for (i, batch) in points.chunks(UPSERT_BATCH_SIZE).enumerate() {
            self.store.upsert(&self.collection, batch).await?;
            written += batch.len();
            info!(
                collection = %self.collection,
                batch = i + 1,
                batches,
                written,
                total = points.len(),
                "upserted batch"
            );
        }
        Ok(written)
    }

    /// Top `k` by the collection's metric, scores rounded to 4 decimals.
    pub async fn search_points(&self, vector: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        let dim = self.collection_dim().await?;
        if vector.len() != dim {
            return Err(Error::DimensionMismatch { expected: dim, actual: vector.len() });
        }
        let hits = self.store.search(&self.collection, vector, k).await?;
        debug!(collection = %self.collection, hits = hits.len(), "remote search");
        Ok(hits.into_iter().map(to_result).collect())
    }
}

fn to_result(hit: ScoredPoint) -> SearchResult {
    let name = match hit.payload.as_ref().and_then(|p| p.get(NAME_FIELD)) {
        Some(Value::String(s)) => s.clone(),
        Some(other) if !other.is_null() => other.to_string(),
        _ => {
            warn!(id = hit.id, "point has no {NAME_FIELD} payload; using its id");
            hit.id.to_string()
        }
    };
    SearchResult { name, score: round4(hit.score) }
}

#[async_trait]
impl<S: VectorStore> SimilarityBackend for RemoteIndex<S> {
    fn kind(&self) -> BackendKind {
        BackendKind::Remote
    }

    fn dim(&self) -> Option<usize> {
        *self.dim.lock()
    }

    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        self.search_points(query, k).await
    }
}
