use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::types::{BackendKind, SearchResult};

/// Maps text to fixed-dimension dense vectors.
///
/// Output is deterministic for a fixed model and input. Implementations are
/// shared across request handlers and must not require `&mut self`.
pub trait Embedder: Send + Sync {
    /// Stable identifier of the underlying model.
    fn model_id(&self) -> &str;
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])?
            .pop()
            .ok_or_else(|| Error::Encoding("embedder returned no vector".to_string()))
    }
}

/// Nearest-neighbour search over one populated catalog.
///
/// Both the in-process index and the remote adapter implement this, so the
/// serving façade never needs to know which one it talks to.
#[async_trait]
pub trait SimilarityBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Vector size the backend expects, when it is known up front.
    fn dim(&self) -> Option<usize>;

    /// Up to `k` results ordered by descending score.
    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>>;
}
