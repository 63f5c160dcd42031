//! Everything a research run needs, assembled once from configuration.

use std::sync::Arc;

use agora_agent::ModelClient;
use agora_config::{AppConfig, ConfigError, EmbeddingProviderKind};
use agora_core::Provider;
use agora_core::embedding::Embedder;
use agora_core::scrape::Scraper;
use agora_memory::ContentStore;
use agora_providers::ProviderEmbedder;
use agora_scraper::WebScraper;
use tracing::info;

/// Shared collaborators: one store, one model client, one scraper.
#[derive(Clone)]
pub struct Services {
    pub config: AppConfig,
    pub store: Arc<ContentStore>,
    pub model: ModelClient,
    pub scraper: Option<Arc<dyn Scraper>>,
}

impl Services {
    /// Build from configuration. Missing credentials are fatal here.
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        config.require_api_key()?;

        let router = agora_providers::build_from_config(config);
        let provider = router.default().ok_or_else(|| ConfigError::ValidationError(format!(
            "default provider '{}' is not registered",
            config.default_provider
        )))?;

        let remote: Option<Arc<dyn Embedder>> = match config.memory.embedding_provider {
            EmbeddingProviderKind::Provider => Some(Arc::new(ProviderEmbedder::new(
                provider.clone(),
                &config.memory.embedding_model,
            ))),
            _ => None,
        };
        let store = Arc::new(agora_memory::build_from_config(&config.memory, remote));
        let scraper: Arc<dyn Scraper> = Arc::new(WebScraper::new(&config.scraper));

        info!(
            provider = %provider.name(),
            model = %config.default_model,
            backend = %store.backend_name(),
            embeddings = store.embeddings_enabled(),
            "Services ready"
        );

        Ok(Self {
            model: ModelClient::from_config(provider, config),
            config: config.clone(),
            store,
            scraper: Some(scraper),
        })
    }
}
