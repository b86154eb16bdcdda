//! Remote ANN backend: a narrow store interface, a Qdrant REST client, an
//! in-process stand-in, and the adapter that owns one collection.

pub mod adapter;
pub mod memory;
pub mod qdrant;
pub mod store;

pub use adapter::{RemoteIndex, UPSERT_BATCH_SIZE};
pub use memory::MemoryStore;
pub use qdrant::QdrantStore;
pub use store::{CollectionInfo, VectorStore};
