use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::info;

use recom_core::catalog::Catalog;
use recom_core::config::DataSettings;
use recom_core::traits::Embedder;
use recom_core::types::Point;
use recom_core::{Error, Result};
use recom_local::snapshot::{remove_artifacts, write_embeddings, write_names};
use recom_local::NameTable;
use recom_remote::{RemoteIndex, VectorStore};

use crate::embeddings::{embed_snapshot, load_or_embed, CatalogEmbeddings};

/// How an ingestion run treats what is already stored.
///
/// - `Replace`: ids are catalog positions, so re-running overwrites in place
/// - `Drop`: delete everything first, then behave as `Replace`
/// - `Append`: ids start at the current point count; re-running duplicates rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestMode {
    Replace,
    Drop,
    Append,
}

impl fmt::Display for IngestMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestMode::Replace => write!(f, "replace"),
            IngestMode::Drop => write!(f, "drop"),
            IngestMode::Append => write!(f, "append"),
        }
    }
}

impl FromStr for IngestMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "replace" => Ok(IngestMode::Replace),
            "drop" => Ok(IngestMode::Drop),
            "append" => Ok(IngestMode::Append),
            other => Err(Error::Validation(format!(
                "unknown ingest mode `{other}` (expected replace, drop or append)"
            ))),
        }
    }
}

/// How point ids are derived for the remote collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdPolicy {
    /// `start + row position`; append offsets by the current count.
    #[default]
    Positional,
    /// Hash of `product_id`; every mode becomes idempotent.
    StableHash,
}

#[derive(Debug, Clone, Copy)]
pub struct IngestOptions {
    pub mode: IngestMode,
    pub id_policy: IdPolicy,
    /// Use an aligned embedding snapshot instead of re-encoding.
    pub reuse_embeddings: bool,
}

impl IngestOptions {
    pub fn new(mode: IngestMode) -> Self {
        Self { mode, id_policy: IdPolicy::Positional, reuse_embeddings: true }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestReport {
    pub mode: IngestMode,
    pub rows: usize,
    pub start_id: u64,
    pub points_written: usize,
    pub final_count: u64,
    pub embeddings_reused: bool,
}

/// File locations of the two local snapshot artifacts.
#[derive(Debug, Clone)]
pub struct LocalArtifacts {
    pub embeddings: PathBuf,
    pub names: PathBuf,
}

impl LocalArtifacts {
    pub fn from_settings(data: &DataSettings) -> Self {
        Self { embeddings: data.embeddings_path(), names: data.products_path() }
    }
}

/// First 8 bytes of the BLAKE3 digest of `product_id`, little-endian.
pub fn stable_point_id(product_id: &str) -> u64 {
    let hash = blake3::hash(product_id.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&hash.as_bytes()[..8]);
    u64::from_le_bytes(bytes)
}

/// Pairs catalog rows with their vectors. Payload is the full source row.
pub fn build_points(catalog: &Catalog, vectors: &[Vec<f32>], start_id: u64, policy: IdPolicy) -> Result<Vec<Point>> {
    if vectors.len() != catalog.len() {
        return Err(Error::Validation(format!(
            "{} vectors for {} catalog rows",
            vectors.len(),
            catalog.len()
        )));
    }
    Ok(catalog
        .products()
        .iter()
        .zip(vectors)
        .enumerate()
        .map(|(pos, (product, vector))| Point {
            id: match policy {
                IdPolicy::Positional => start_id + pos as u64,
                IdPolicy::StableHash => stable_point_id(&product.id),
            },
            vector: vector.clone(),
            payload: product.payload.clone(),
        })
        .collect())
}

/// Embeds `catalog` and writes it into the adapter's collection.
///
/// Embedding happens before any destructive step, so a model failure never
/// leaves a dropped collection behind. `embeddings`, when given, is the
/// snapshot file consulted (and refreshed) instead of always re-encoding.
pub async fn ingest_remote<S: VectorStore>(
    index: &RemoteIndex<S>,
    embedder: &dyn Embedder,
    catalog: &Catalog,
    embeddings: &Path,
    opts: IngestOptions,
) -> Result<IngestReport> {
    let CatalogEmbeddings { snapshot, reused } =
        load_or_embed(embedder, catalog, embeddings, opts.reuse_embeddings)?;
    let dim = embedder.dim();

    if opts.mode == IngestMode::Drop {
        index.drop_collection().await?;
    }
    index.create_collection(dim).await?;

    let start_id = match (opts.mode, opts.id_policy) {
        (IngestMode::Append, IdPolicy::Positional) => index.count().await?,
        _ => 0,
    };
    let points = build_points(catalog, &snapshot.to_rows(), start_id, opts.id_policy)?;
    let points_written = index.upsert(&points).await?;
    let final_count = index.count().await?;

    info!(
        collection = index.collection(),
        mode = %opts.mode,
        rows = catalog.len(),
        start_id,
        final_count,
        "remote ingestion finished"
    );
    Ok(IngestReport {
        mode: opts.mode,
        rows: catalog.len(),
        start_id,
        points_written,
        final_count,
        embeddings_reused: reused,
    })
}

/// Writes both local snapshot artifacts for `catalog`.
///
/// The local snapshot is only ever replaced wholesale, so `Append` is refused.
/// `Drop` encodes the catalog before deleting anything; a model failure leaves
/// the previous artifacts in place.
pub fn ingest_local(
    embedder: &dyn Embedder,
    catalog: &Catalog,
    artifacts: &LocalArtifacts,
    opts: IngestOptions,
) -> Result<IngestReport> {
    let names = NameTable::new(catalog.product_ids(), catalog.names())?;
    let CatalogEmbeddings { snapshot, reused } = match opts.mode {
        IngestMode::Append => {
            return Err(Error::Validation(
                "append is not supported for the local backend; use replace or drop".to_string(),
            ))
        }
        IngestMode::Drop => {
            let snapshot = embed_snapshot(embedder, catalog)?;
            remove_artifacts(&artifacts.embeddings, &artifacts.names)?;
            write_embeddings(&artifacts.embeddings, &snapshot)?;
            CatalogEmbeddings { snapshot, reused: false }
        }
        IngestMode::Replace => load_or_embed(embedder, catalog, &artifacts.embeddings, opts.reuse_embeddings)?,
    };
    write_names(&artifacts.names, &names)?;

    info!(mode = %opts.mode, rows = snapshot.rows(), reused, "local snapshot written");
    Ok(IngestReport {
        mode: opts.mode,
        rows: catalog.len(),
        start_id: 0,
        points_written: snapshot.rows(),
        final_count: snapshot.rows() as u64,
        embeddings_reused: reused,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modes_parse_case_insensitively() {
        assert_eq!("Replace".parse::<IngestMode>().unwrap(), IngestMode::Replace);
        assert_eq!(" drop ".parse::<IngestMode>().unwrap(), IngestMode::Drop);
        assert_eq!("append".parse::<IngestMode>().unwrap(), IngestMode::Append);
        assert!(matches!("upsert".parse::<IngestMode>(), Err(Error::Validation(_))));
    }

    #[test]
    fn stable_ids_depend_only_on_product_id() {
        assert_eq!(stable_point_id("sku-1"), stable_point_id("sku-1"));
        assert_ne!(stable_point_id("sku-1"), stable_point_id("sku-2"));
    }
}
