//! Embedder trait: maps text to a fixed-length vector.
//!
//! An embedder may be unavailable or fail per call. Callers must treat a
//! failure as "no embedding", never as a fatal error.

use async_trait::async_trait;
use crate::error::MemoryError;

#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embedder name (e.g., "hash", "openai:text-embedding-3-small").
    fn name(&self) -> &str;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, MemoryError>;
}
