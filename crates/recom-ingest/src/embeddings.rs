use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use recom_core::catalog::Catalog;
use recom_core::traits::Embedder;
use recom_core::{Error, Result};
use recom_local::snapshot::{read_embeddings, write_embeddings};
use recom_local::EmbeddingSnapshot;

/// Texts per `embed_batch` call; bounds peak memory during ingestion.
pub const EMBED_BATCH_SIZE: usize = 64;

/// Vectors for a catalog and whether they came from disk.
#[derive(Debug, Clone)]
pub struct CatalogEmbeddings {
    pub snapshot: EmbeddingSnapshot,
    pub reused: bool,
}

fn progress_bar(len: usize) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} products ({percent}%) {msg}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}

/// Encodes `texts` in batches of [`EMBED_BATCH_SIZE`], one vector per text.
pub fn embed_catalog(embedder: &dyn Embedder, texts: &[String]) -> Result<Vec<Vec<f32>>> {
    let pb = progress_bar(texts.len());
    let mut out = Vec::with_capacity(texts.len());
    for batch in texts.chunks(EMBED_BATCH_SIZE) {
        let vectors = embedder.embed_batch(batch)?;
        if vectors.len() != batch.len() {
            return Err(Error::Encoding(format!(
                "embedder returned {} vectors for {} texts",
                vectors.len(),
                batch.len()
            )));
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != embedder.dim()) {
            return Err(Error::DimensionMismatch { expected: embedder.dim(), actual: bad.len() });
        }
        out.extend(vectors);
        pb.inc(batch.len() as u64);
    }
    pb.finish_with_message("embedded");
    info!(rows = out.len(), model = embedder.model_id(), "embedded catalog");
    Ok(out)
}

/// Reuses the snapshot at `path` when it was built by the same model for the
/// same product ids in the same order; otherwise re-encodes the catalog and
/// rewrites the snapshot.
pub fn load_or_embed(
    embedder: &dyn Embedder,
    catalog: &Catalog,
    path: &Path,
    reuse: bool,
) -> Result<CatalogEmbeddings> {
    let ids = catalog.product_ids();
    if reuse {
        match read_embeddings(path) {
            Ok(snapshot) if snapshot.is_aligned_with(embedder.model_id(), embedder.dim(), &ids) => {
                info!(path = %path.display(), rows = snapshot.rows(), "reusing embedding snapshot");
                return Ok(CatalogEmbeddings { snapshot, reused: true });
            }
            Ok(snapshot) => info!(
                path = %path.display(),
                snapshot_rows = snapshot.rows(),
                catalog_rows = catalog.len(),
                "embedding snapshot is stale, regenerating"
            ),
            Err(Error::IndexNotFound(_)) => {}
            Err(e) => warn!(error = %e, "ignoring unreadable embedding snapshot"),
        }
    }
    let snapshot = embed_snapshot(embedder, catalog)?;
    write_embeddings(path, &snapshot)?;
    Ok(CatalogEmbeddings { snapshot, reused: false })
}

/// Encodes the whole catalog into an in-memory snapshot without touching disk.
pub fn embed_snapshot(embedder: &dyn Embedder, catalog: &Catalog) -> Result<EmbeddingSnapshot> {
    let rows = embed_catalog(embedder, &catalog.embedding_inputs())?;
    EmbeddingSnapshot::from_rows(embedder.model_id(), embedder.dim(), catalog.product_ids(), &rows)
}
