use async_trait::async_trait;

use recom_core::types::{Point, ScoredPoint};
use recom_core::Result;

/// Shape of an existing collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectionInfo {
    pub dim: usize,
    pub points_count: u64,
}

/// Operations the recommender needs from an ANN vector store.
///
/// Calls against a missing collection fail with `Error::IndexNotFound`,
/// except `collection_info` (returns `None`) and `delete_collection`
/// (returns `false`).
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn collection_info(&self, name: &str) -> Result<Option<CollectionInfo>>;

    /// Creates a cosine-distance collection of `dim`-sized vectors.
    async fn create_collection(&self, name: &str, dim: usize) -> Result<()>;

    /// `true` if something was deleted.
    async fn delete_collection(&self, name: &str) -> Result<bool>;

    /// Insert or overwrite by point id.
    async fn upsert(&self, name: &str, points: &[Point]) -> Result<()>;

    async fn count(&self, name: &str) -> Result<u64>;

    /// Up to `limit` points, best first, with payloads.
    async fn search(&self, name: &str, vector: &[f32], limit: usize) -> Result<Vec<ScoredPoint>>;
}
