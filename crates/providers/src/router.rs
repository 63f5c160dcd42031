//! Provider selection from configuration.
//!
//! Every configured `[providers.<name>]` section becomes an
//! OpenAI-compatible endpoint; the default provider is always present, falling
//! back to its well-known URL and the global key.

use std::collections::BTreeMap;
use std::sync::Arc;

use agora_config::AppConfig;
use agora_core::provider::Provider;
use tracing::debug;

use crate::openai_compat::OpenAiCompatProvider;

/// Well-known OpenAI-compatible endpoints, by provider name.
const KNOWN_ENDPOINTS: &[(&str, &str)] = &[
    ("openai", "https://api.openai.com/v1"),
    ("gemini", "https://generativelanguage.googleapis.com/v1beta/openai"),
    ("google", "https://generativelanguage.googleapis.com/v1beta/openai"),
    ("openrouter", "https://openrouter.ai/api/v1"),
    ("groq", "https://api.groq.com/openai/v1"),
    ("ollama", "http://localhost:11434/v1"),
    ("vllm", "http://localhost:8000/v1"),
    ("lmstudio", "http://localhost:1234/v1"),
];

fn known_endpoint(name: &str) -> Option<&'static str> {
    KNOWN_ENDPOINTS
        .iter()
        .find(|(known, _)| *known == name)
        .map(|(_, url)| *url)
}

/// The providers a process may talk to, with one marked as default.
pub struct ProviderRouter {
    providers: BTreeMap<String, Arc<dyn Provider>>,
    default_provider: String,
}

impl ProviderRouter {
    pub fn new(default_provider: impl Into<String>) -> Self {
        Self {
            providers: BTreeMap::new(),
            default_provider: default_provider.into(),
        }
    }

    pub fn register(&mut self, provider: Arc<dyn Provider>) {
        self.providers.insert(provider.name().to_string(), provider);
    }

    /// The provider agents talk to unless told otherwise.
    pub fn default(&self) -> Option<Arc<dyn Provider>> {
        self.get(&self.default_provider)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(name).cloned()
    }

    /// Registered provider names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.providers.keys().map(String::as_str).collect()
    }
}

/// Build the router described by `config`.
///
/// A provider without an `api_url` and without a well-known endpoint is
/// skipped with a debug log rather than pointed at a guessed host.
pub fn build_from_config(config: &AppConfig) -> ProviderRouter {
    let mut router = ProviderRouter::new(&config.default_provider);

    let default_section = (!config.providers.contains_key(&config.default_provider))
        .then(|| (config.default_provider.clone(), None));
    let sections = config
        .providers
        .iter()
        .map(|(name, section)| (name.clone(), section.api_url.clone()))
        .chain(default_section);

    for (name, api_url) in sections {
        let Some(base_url) = api_url.or_else(|| known_endpoint(&name).map(String::from)) else {
            debug!(provider = %name, "No endpoint known for provider, skipping");
            continue;
        };
        let api_key = config.api_key_for(&name).unwrap_or_default();
        router.register(Arc::new(OpenAiCompatProvider::new(&name, base_url, api_key)));
    }

    router
}
