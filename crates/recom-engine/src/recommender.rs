use std::sync::Arc;

use tracing::{debug, info, warn};

use recom_core::config::Settings;
use recom_core::traits::{Embedder, SimilarityBackend};
use recom_core::types::{BackendKind, SearchResult};
use recom_core::{Error, Result};
use recom_embed::get_default_embedder;
use recom_local::{IndexOptions, LocalIndex};
use recom_remote::RemoteIndex;

/// Query text in, ranked product names out, whichever backend is configured.
///
/// Both handles are shared read-only across concurrent calls.
#[derive(Clone)]
pub struct Recommender {
    embedder: Arc<dyn Embedder>,
    backend: Arc<dyn SimilarityBackend>,
    limit: usize,
}

impl Recommender {
    pub fn new(embedder: Arc<dyn Embedder>, backend: Arc<dyn SimilarityBackend>, limit: usize) -> Result<Self> {
        if limit == 0 {
            return Err(Error::InvalidConfig("result limit must be at least 1".to_string()));
        }
        if let Some(dim) = backend.dim() {
            if dim != embedder.dim() {
                return Err(Error::InvalidConfig(format!(
                    "{} backend expects {dim}-dim vectors but model {} produces {}",
                    backend.kind(),
                    embedder.model_id(),
                    embedder.dim()
                )));
            }
        }
        Ok(Self { embedder, backend, limit })
    }

    /// Builds the embedder and the configured backend. A remote collection
    /// must already exist; a local snapshot must be present and aligned.
    pub async fn from_settings(settings: &Settings) -> Result<Self> {
        let embedder: Arc<dyn Embedder> = Arc::from(get_default_embedder(&settings.model)?);
        let backend: Arc<dyn SimilarityBackend> = match settings.backend {
            BackendKind::Local => {
                let options = IndexOptions {
                    skip_top_match: settings.ranking.skip_top_match,
                    window: settings.ranking.limit,
                };
                Arc::new(LocalIndex::open(
                    &settings.data.embeddings_path(),
                    &settings.data.products_path(),
                    options,
                )?)
            }
            BackendKind::Remote => {
                let index = RemoteIndex::connect(&settings.qdrant)?;
                let info = index.collection_info().await?;
                if info.points_count == 0 {
                    warn!(collection = index.collection(), "collection is empty; every query will return no results");
                }
                Arc::new(index)
            }
        };
        let recommender = Self::new(embedder, backend, settings.ranking.limit)?;
        info!(
            backend = %recommender.backend_kind(),
            model = recommender.embedder.model_id(),
            limit = recommender.limit,
            "recommender ready"
        );
        Ok(recommender)
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.backend.kind()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// At most `limit` results, best first. Blank queries yield an empty list.
    pub async fn recommend(&self, query: &str) -> Result<Vec<SearchResult>> {
        if query.trim().is_empty() {
            debug!("blank query");
            return Ok(Vec::new());
        }
        let embedder = Arc::clone(&self.embedder);
        let text = query.to_string();
        let vector = tokio::task::spawn_blocking(move || embedder.embed_text(&text))
            .await
            .map_err(|e| Error::Encoding(format!("encoder task failed: {e}")))??;
        let mut results = self.backend.search(&vector, self.limit).await?;
        results.truncate(self.limit);
        debug!(query, returned = results.len(), "recommend");
        Ok(results)
    }
}
