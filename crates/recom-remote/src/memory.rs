use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use parking_lot::RwLock;

use recom_core::similarity::{by_score_desc, cosine_similarity};
use recom_core::types::{Payload, Point, ScoredPoint};
use recom_core::{Error, Result};

use crate::store::{CollectionInfo, VectorStore};

struct Collection {
    dim: usize,
    points: BTreeMap<u64, (Vec<f32>, Payload)>,
}

/// In-process [`VectorStore`] with the same failure modes as a real service:
/// missing collections, fixed dimensions, id overwrite on upsert.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn missing(name: &str) -> Error {
    Error::IndexNotFound(name.to_string())
}

#[async_trait]
impl VectorStore for MemoryStore {
    async fn collection_info(&self, name: &str) -> Result<Option<CollectionInfo>> {
        Ok(self.collections.read().get(name).map(|c| CollectionInfo {
            dim: c.dim,
            points_count: c.points.len() as u64,
        }))
    }

    async fn create_collection(&self, name: &str, dim: usize) -> Result<()> {
        let mut guard = self.collections.write();
        if guard.contains_key(name) {
            return Err(Error::Backend { status: 409, message: format!("collection `{name}` already exists") });
        }
        guard.insert(name.to_string(), Collection { dim, points: BTreeMap::new() });
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<bool> {
        Ok(self.collections.write().remove(name).is_some())
    }

    async fn upsert(&self, name: &str, points: &[Point]) -> Result<()> {
        let mut guard = self.collections.write();
        let coll = guard.get_mut(name).ok_or_else(|| missing(name))?;
        if let Some(bad) = points.iter().find(|p| p.vector.len() != coll.dim) {
            return Err(Error::DimensionMismatch { expected: coll.dim, actual: bad.vector.len() });
        }
        for p in points {
            coll.points.insert(p.id, (p.vector.clone(), p.payload.clone()));
        }
        Ok(())
    }

    async fn count(&self, name: &str) -> Result<u64> {
        let guard = self.collections.read();
        let coll = guard.get(name).ok_or_else(|| missing(name))?;
        Ok(coll.points.len() as u64)
    }

    async fn search(&self, name: &str, vector: &[f32], limit: usize) -> Result<Vec<ScoredPoint>> {
        let guard = self.collections.read();
        let coll = guard.get(name).ok_or_else(|| missing(name))?;
        if vector.len() != coll.dim {
            return Err(Error::DimensionMismatch { expected: coll.dim, actual: vector.len() });
        }
        let mut hits: Vec<ScoredPoint> = coll
            .points
            .iter()
            .map(|(&id, (v, payload))| ScoredPoint {
                id,
                score: cosine_similarity(vector, v),
                payload: Some(payload.clone()),
            })
            .collect();
        hits.sort_by(|a, b| by_score_desc(a.score, b.score));
        hits.truncate(limit);
        Ok(hits)
    }
}
