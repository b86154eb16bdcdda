//! The two on-disk artifacts behind the local backend.
//!
//! - vector artifact: a bincode [`EmbeddingSnapshot`] holding the row-major
//!   `N x d` matrix plus the product ids it was built from
//! - name artifact: a JSON [`NameTable`] of `N` product names plus the product
//!   ids they were written for, positionally aligned
//!
//! Both are replaced wholesale through a temp file and rename, never edited in
//! place. The shared product-id list is what ties the two together: equal
//! lengths alone do not prove they describe the same catalog.

use std::io::{ErrorKind, Write};
use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use recom_core::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingSnapshot {
    pub model: String,
    pub dim: usize,
    pub product_ids: Vec<String>,
    /// Row-major, `product_ids.len() * dim` floats.
    pub vectors: Vec<f32>,
    pub created_at_ms: i64,
}

impl EmbeddingSnapshot {
    /// Packs per-row vectors; every row must have length `dim`.
    pub fn from_rows(
        model: impl Into<String>,
        dim: usize,
        product_ids: Vec<String>,
        rows: &[Vec<f32>],
    ) -> Result<Self> {
        if rows.len() != product_ids.len() {
            return Err(Error::Validation(format!(
                "{} vectors for {} product ids",
                rows.len(),
                product_ids.len()
            )));
        }
        let mut vectors = Vec::with_capacity(rows.len() * dim);
        for row in rows {
            if row.len() != dim {
                return Err(Error::DimensionMismatch { expected: dim, actual: row.len() });
            }
            vectors.extend_from_slice(row);
        }
        Ok(Self {
            model: model.into(),
            dim,
            product_ids,
            vectors,
            created_at_ms: Utc::now().timestamp_millis(),
        })
    }

    pub fn rows(&self) -> usize {
        if self.dim == 0 { 0 } else { self.vectors.len() / self.dim }
    }

    pub fn row(&self, i: usize) -> &[f32] {
        &self.vectors[i * self.dim..(i + 1) * self.dim]
    }

    pub fn to_rows(&self) -> Vec<Vec<f32>> {
        (0..self.rows()).map(|i| self.row(i).to_vec()).collect()
    }

    /// True when the snapshot can stand in for a fresh encode of `product_ids`
    /// with the given model.
    pub fn is_aligned_with(&self, model: &str, dim: usize, product_ids: &[String]) -> bool {
        self.model == model && self.dim == dim && self.product_ids == product_ids
    }

    fn check(&self, path: &Path) -> Result<()> {
        if self.dim == 0 {
            if self.vectors.is_empty() && self.product_ids.is_empty() { return Ok(()); }
            return Err(Error::snapshot(path, "dimension is 0 but vectors are present"));
        }
        if self.vectors.len() % self.dim != 0 {
            return Err(Error::snapshot(
                path,
                format!("{} floats is not a multiple of dim {}", self.vectors.len(), self.dim),
            ));
        }
        if self.rows() != self.product_ids.len() {
            return Err(Error::snapshot(
                path,
                format!("{} rows but {} product ids", self.rows(), self.product_ids.len()),
            ));
        }
        Ok(())
    }
}

/// Display names in snapshot row order, with the product ids they belong to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NameTable {
    pub product_ids: Vec<String>,
    pub names: Vec<String>,
}

impl NameTable {
    pub fn new(product_ids: Vec<String>, names: Vec<String>) -> Result<Self> {
        if product_ids.len() != names.len() {
            return Err(Error::Validation(format!(
                "{} names for {} product ids",
                names.len(),
                product_ids.len()
            )));
        }
        Ok(Self { product_ids, names })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

pub fn write_embeddings(path: &Path, snapshot: &EmbeddingSnapshot) -> Result<()> {
    let bytes = bincode::serialize(snapshot)
        .map_err(|e| Error::snapshot(path, format!("serialize: {e}")))?;
    write_atomic(path, &bytes)?;
    info!(path = %path.display(), rows = snapshot.rows(), dim = snapshot.dim, "wrote embedding snapshot");
    Ok(())
}

pub fn read_embeddings(path: &Path) -> Result<EmbeddingSnapshot> {
    let bytes = read_artifact(path)?;
    let snapshot: EmbeddingSnapshot = bincode::deserialize(&bytes)
        .map_err(|e| Error::snapshot(path, format!("deserialize: {e}")))?;
    snapshot.check(path)?;
    debug!(path = %path.display(), rows = snapshot.rows(), "loaded embedding snapshot");
    Ok(snapshot)
}

pub fn write_names(path: &Path, table: &NameTable) -> Result<()> {
    let bytes = serde_json::to_vec(table)
        .map_err(|e| Error::snapshot(path, format!("serialize: {e}")))?;
    write_atomic(path, &bytes)?;
    info!(path = %path.display(), rows = table.len(), "wrote product names");
    Ok(())
}

pub fn read_names(path: &Path) -> Result<NameTable> {
    let bytes = read_artifact(path)?;
    let table: NameTable =
        serde_json::from_slice(&bytes).map_err(|e| Error::snapshot(path, format!("names: {e}")))?;
    if table.product_ids.len() != table.names.len() {
        return Err(Error::snapshot(
            path,
            format!("{} names for {} product ids", table.names.len(), table.product_ids.len()),
        ));
    }
    Ok(table)
}

/// Deletes both artifacts; absent files are not an error.
pub fn remove_artifacts(embeddings: &Path, names: &Path) -> Result<()> {
    for path in [embeddings, names] {
        match std::fs::remove_file(path) {
            Ok(()) => info!(path = %path.display(), "removed snapshot artifact"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

fn read_artifact(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => Error::IndexNotFound(path.display().to_string()),
        _ => Error::Io(e),
    })
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}
