//! Remote embeddings through a provider's `/embeddings` endpoint.

use std::sync::Arc;
use async_trait::async_trait;
use agora_core::embedding::Embedder;
use agora_core::error::MemoryError;
use agora_core::provider::{EmbeddingRequest, Provider};
use tracing::debug;

/// Adapts a [`Provider`] into an [`Embedder`] for a fixed model.
pub struct ProviderEmbedder {
    provider: Arc<dyn Provider>,
    model: String,
    name: String,
}

impl ProviderEmbedder {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        let model = model.into();
        let name = format!("{}:{model}", provider.name());
        Self {
            provider,
            model,
            name,
        }
    }
}

#[async_trait]
impl Embedder for ProviderEmbedder {
    fn name(&self) -> &str {
        &self.name
    }

    async fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, MemoryError> {
        let response = self
            .provider
            .embed(EmbeddingRequest {
                model: self.model.clone(),
                inputs: vec![text.to_string()],
            })
            .await
            .map_err(|e| MemoryError::EmbeddingFailed(e.to_string()))?;

        let vector = response
            .embeddings
            .into_iter()
            .next()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| MemoryError::EmbeddingFailed("provider returned no embedding".into()))?;

        debug!(embedder = %self.name, dims = vector.len(), "Embedded text");
        Ok(vector)
    }
}
