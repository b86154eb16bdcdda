//! Domain types shared by the local and remote backends.

use serde::{Deserialize, Serialize};

/// Arbitrary per-product record carried alongside a stored vector.
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// Payload key holding the display name of a product.
pub const NAME_FIELD: &str = "product_name";

/// One catalog row.
///
/// - `id`: stable product identifier from the source table
/// - `name`/`description`: the two fields concatenated into the embedding input
/// - `payload`: every source column, including the three above
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub description: String,
    pub payload: Payload,
}

impl Product {
    /// Text fed to the embedder for this row.
    pub fn embedding_input(&self) -> String {
        format!("{} {}", self.name, self.description)
    }
}

/// A stored vector in a remote collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub id: u64,
    pub vector: Vec<f32>,
    pub payload: Payload,
}

/// A point returned by a store query, best first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPoint {
    pub id: u64,
    pub score: f32,
    #[serde(default)]
    pub payload: Option<Payload>,
}

/// The surface returned to callers of `recommend`. Higher score is better.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub name: String,
    pub score: f32,
}

/// Which backend answers queries.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Local,
    Remote,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Local => write!(f, "local"),
            BackendKind::Remote => write!(f, "remote"),
        }
    }
}
