//! In-process similarity search over a persisted catalog snapshot.

pub mod index;
pub mod snapshot;

pub use index::{IndexOptions, LocalIndex, DEFAULT_WINDOW};
pub use snapshot::{EmbeddingSnapshot, NameTable};
