use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use recom_core::similarity::{by_score_desc, cosine_with_norms, l2_norm};
use recom_core::traits::SimilarityBackend;
use recom_core::types::{BackendKind, SearchResult};
use recom_core::{Error, Result};

use crate::snapshot::{read_embeddings, read_names, EmbeddingSnapshot, NameTable};

/// Number of results returned after the skipped top match.
pub const DEFAULT_WINDOW: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexOptions {
    /// Drop rank 1 before taking the window. Catalog queries usually match
    /// their own row first; free-text queries lose a real result.
    pub skip_top_match: bool,
    pub window: usize,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self { skip_top_match: true, window: DEFAULT_WINDOW }
    }
}

/// Row-major vectors, their norms and the names they are served under.
#[derive(Debug)]
struct Matrix {
    names: Vec<String>,
    vectors: Vec<f32>,
    norms: Vec<f32>,
    dim: usize,
}

/// Brute-force cosine index over an immutable `N x d` matrix.
///
/// Clones share the matrix, so a clone can be moved onto a blocking thread
/// for each query.
#[derive(Debug, Clone)]
pub struct LocalIndex {
    matrix: Arc<Matrix>,
    options: IndexOptions,
}

impl LocalIndex {
    /// Loads both artifacts and refuses to serve unless they were written for
    /// the same products in the same order.
    pub fn open(embeddings: &Path, names: &Path, options: IndexOptions) -> Result<Self> {
        let snapshot = read_embeddings(embeddings)?;
        let table = read_names(names)?;
        if table.len() != snapshot.rows() {
            return Err(Error::snapshot(
                names,
                format!("{} names for {} vectors in {}", table.len(), snapshot.rows(), embeddings.display()),
            ));
        }
        if table.product_ids != snapshot.product_ids {
            return Err(Error::snapshot(
                names,
                format!("names were written for a different catalog than {}", embeddings.display()),
            ));
        }
        let NameTable { names: name_list, .. } = table;
        let index = Self::from_snapshot(snapshot, name_list, options)?;
        info!(rows = index.len(), dim = index.matrix.dim, skip_top_match = options.skip_top_match, "local index ready");
        Ok(index)
    }

    pub fn from_snapshot(snapshot: EmbeddingSnapshot, names: Vec<String>, options: IndexOptions) -> Result<Self> {
        if names.len() != snapshot.rows() {
            return Err(Error::Validation(format!(
                "{} names for {} vectors",
                names.len(),
                snapshot.rows()
            )));
        }
        let dim = snapshot.dim;
        let vectors = snapshot.vectors;
        let norms = if dim == 0 { Vec::new() } else { vectors.chunks_exact(dim).map(l2_norm).collect() };
        Ok(Self { matrix: Arc::new(Matrix { names, vectors, norms, dim }), options })
    }

    pub fn from_rows(names: Vec<String>, rows: &[Vec<f32>], options: IndexOptions) -> Result<Self> {
        let dim = rows.first().map_or(0, Vec::len);
        let ids = (0..rows.len()).map(|i| i.to_string()).collect();
        let snapshot = EmbeddingSnapshot::from_rows("", dim, ids, rows)?;
        Self::from_snapshot(snapshot, names, options)
    }

    pub fn len(&self) -> usize {
        self.matrix.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matrix.names.is_empty()
    }

    pub fn options(&self) -> IndexOptions {
        self.options
    }

    /// Every row scored against `query`, best first; ties keep catalog order.
    pub fn rank(&self, query: &[f32]) -> Result<Vec<SearchResult>> {
        let m = &self.matrix;
        if m.names.is_empty() { return Ok(Vec::new()); }
        if query.len() != m.dim {
            return Err(Error::DimensionMismatch { expected: m.dim, actual: query.len() });
        }
        let qn = l2_norm(query);
        let mut scored: Vec<(usize, f32)> = m
            .vectors
            .chunks_exact(m.dim)
            .zip(&m.norms)
            .map(|(row, &n)| cosine_with_norms(query, qn, row, n))
            .enumerate()
            .collect();
        scored.sort_by(|a, b| by_score_desc(a.1, b.1));
        Ok(scored
            .into_iter()
            .map(|(i, score)| SearchResult { name: m.names[i].clone(), score })
            .collect())
    }

    /// Ranked results after the optional top-match skip, at most `k`.
    pub fn top_k(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        let skip = usize::from(self.options.skip_top_match);
        let out: Vec<SearchResult> = self.rank(query)?.into_iter().skip(skip).take(k).collect();
        debug!(returned = out.len(), skip, "local search");
        Ok(out)
    }

    /// [`top_k`](Self::top_k) with the configured window.
    pub fn top(&self, query: &[f32]) -> Result<Vec<SearchResult>> {
        self.top_k(query, self.options.window)
    }
}

#[async_trait]
impl SimilarityBackend for LocalIndex {
    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }

    fn dim(&self) -> Option<usize> {
        if self.is_empty() { None } else { Some(self.matrix.dim) }
    }

    /// The full scan runs on the blocking pool, off the async workers.
    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        let index = self.clone();
        let query = query.to_vec();
        let k = k.min(self.options.window);
        tokio::task::spawn_blocking(move || index.top_k(&query, k))
            .await
            .map_err(|e| Error::Backend { status: 500, message: format!("local search task failed: {e}") })?
    }
}
