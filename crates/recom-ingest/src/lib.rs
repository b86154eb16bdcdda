//! Offline catalog ingestion into the local snapshot or a remote collection.

pub mod embeddings;
pub mod pipeline;

pub use embeddings::{embed_catalog, embed_snapshot, load_or_embed, CatalogEmbeddings, EMBED_BATCH_SIZE};
pub use pipeline::{
    build_points, ingest_local, ingest_remote, stable_point_id, IdPolicy, IngestMode, IngestOptions,
    IngestReport, LocalArtifacts,
};
