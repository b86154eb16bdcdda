use std::path::PathBuf;

use thiserror::Error;

/// Failure classes surfaced by the recommender core.
///
/// Only the empty-query case is recovered internally (it yields an empty
/// result); every other variant propagates to the caller.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Encoding failed: {0}")]
    Encoding(String),

    #[error("Vector store unreachable: {0}")]
    Connection(String),

    #[error("Index not found: {0} (run ingestion first)")]
    IndexNotFound(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Vector store returned {status}: {message}")]
    Backend { status: u16, message: String },

    #[error("Invalid catalog: {0}")]
    Catalog(String),

    #[error("Corrupt snapshot {}: {reason}", path.display())]
    Snapshot { path: PathBuf, reason: String },

    #[error("Recommender unavailable: {0}")]
    NotReady(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn snapshot(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Snapshot { path: path.into(), reason: reason.into() }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
