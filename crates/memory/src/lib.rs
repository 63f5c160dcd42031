//! Shared memory for Agora agents.
//!
//! Backends hold documents; [`ContentStore`] adds ids, metadata, embeddings
//! and search on top; [`ContextAccessor`] gives each agent its scoped view.

pub mod accessor;
pub mod file_backend;
pub mod hash_embedder;
pub mod in_memory;
pub mod store;
pub mod vector;

pub use accessor::ContextAccessor;
pub use file_backend::FileBackend;
pub use hash_embedder::HashEmbedder;
pub use in_memory::InMemoryBackend;
pub use store::{ContentStore, StoreStats, build_from_config};
pub use vector::{cosine_similarity, rank_by_distance};
