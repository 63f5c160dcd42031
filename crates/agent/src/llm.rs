//! Thin wrapper over a [`Provider`] for single-shot prompts.

use std::sync::Arc;

use agora_config::AppConfig;
use agora_core::error::ProviderError;
use agora_core::provider::{Provider, ProviderRequest};
use tracing::debug;

/// One provider plus the generation settings every agent shares.
#[derive(Clone)]
pub struct ModelClient {
    provider: Arc<dyn Provider>,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
}

impl ModelClient {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.7,
            max_tokens: None,
        }
    }

    /// Use the model, temperature and token cap from configuration.
    pub fn from_config(provider: Arc<dyn Provider>, config: &AppConfig) -> Self {
        Self {
            provider,
            model: config.default_model.clone(),
            temperature: config.default_temperature,
            max_tokens: Some(config.default_max_tokens),
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Send one prompt, optionally preceded by a system message, and return the text.
    pub async fn generate(&self, prompt: &str, system: Option<&str>) -> Result<String, ProviderError> {
        let mut request = ProviderRequest::single(&self.model, prompt, system);
        request.temperature = self.temperature;
        request.max_tokens = self.max_tokens;

        debug!(
            provider = %self.provider.name(),
            model = %self.model,
            prompt_len = prompt.len(),
            "Generating"
        );

        let response = self.provider.complete(request).await?;
        Ok(response.message.content)
    }
}
