//! Configuration loading, validation, and management for Agora.
//!
//! Loads configuration from `~/.agora/config.toml` (or an explicit path) with
//! environment variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.agora/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Default LLM provider
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Default model
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Default temperature
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,

    /// Default max tokens per LLM response
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: u32,

    /// Shared memory (content store) configuration
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Web scraper configuration
    #[serde(default)]
    pub scraper: ScraperConfig,

    /// Research pipeline configuration
    #[serde(default)]
    pub research: ResearchConfig,

    /// Gateway configuration
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

fn default_provider() -> String {
    "openai".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    2048
}

fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("default_temperature", &self.default_temperature)
            .field("default_max_tokens", &self.default_max_tokens)
            .field("memory", &self.memory)
            .field("scraper", &self.scraper)
            .field("research", &self.research)
            .field("gateway", &self.gateway)
            .field("providers", &self.providers)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .finish()
    }
}

/// Where documents are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryBackendKind {
    /// JSONL collection under `persist_dir`
    File,
    /// Process-lifetime only
    InMemory,
}

/// Which embedder feeds the content store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingProviderKind {
    /// No embeddings; search runs in keyword mode
    None,
    /// Local feature-hashing embedder
    Hash,
    /// The configured provider's `/embeddings` endpoint
    Provider,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default = "default_memory_backend")]
    pub backend: MemoryBackendKind,

    #[serde(default = "default_persist_dir")]
    pub persist_dir: PathBuf,

    #[serde(default = "default_collection_name")]
    pub collection_name: String,

    #[serde(default = "default_embedding_provider")]
    pub embedding_provider: EmbeddingProviderKind,

    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    #[serde(default = "default_hash_dimensions")]
    pub hash_dimensions: usize,

    /// Most-recent documents scanned by keyword search
    #[serde(default = "default_fallback_window")]
    pub fallback_window: usize,
}

fn default_memory_backend() -> MemoryBackendKind {
    MemoryBackendKind::File
}
fn default_persist_dir() -> PathBuf {
    PathBuf::from(".agora")
}
fn default_collection_name() -> String {
    "research_memory".into()
}
fn default_embedding_provider() -> EmbeddingProviderKind {
    EmbeddingProviderKind::Provider
}
fn default_embedding_model() -> String {
    "text-embedding-3-small".into()
}
fn default_hash_dimensions() -> usize {
    256
}
fn default_fallback_window() -> usize {
    100
}
fn default_true() -> bool {
    true
}

impl MemoryConfig {
    /// Path of the JSONL collection file.
    pub fn collection_path(&self) -> PathBuf {
        self.persist_dir.join(format!("{}.jsonl", self.collection_name))
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            backend: default_memory_backend(),
            persist_dir: default_persist_dir(),
            collection_name: default_collection_name(),
            embedding_provider: default_embedding_provider(),
            embedding_model: default_embedding_model(),
            hash_dimensions: default_hash_dimensions(),
            fallback_window: default_fallback_window(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    #[serde(default = "default_link_limit")]
    pub link_limit: usize,
}

fn default_request_timeout() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    3
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36".into()
}
fn default_link_limit() -> usize {
    10
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout(),
            max_retries: default_max_retries(),
            user_agent: default_user_agent(),
            link_limit: default_link_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchConfig {
    #[serde(default = "default_reports_dir")]
    pub reports_dir: PathBuf,

    /// Agents the critic reviews after each run
    #[serde(default = "default_critique_targets")]
    pub critique_targets: Vec<String>,

    /// Skip critique targets that wrote no findings
    #[serde(default = "default_true")]
    pub adaptive_critiques: bool,

    /// Findings listed in the report
    #[serde(default = "default_report_findings")]
    pub report_findings: usize,

    /// Decision log entries listed in the report
    #[serde(default = "default_report_decisions")]
    pub report_decisions: usize,
}

fn default_reports_dir() -> PathBuf {
    PathBuf::from("reports")
}
fn default_critique_targets() -> Vec<String> {
    ["Researcher", "Planner", "DataAlchemist", "Experimenter"]
        .into_iter()
        .map(String::from)
        .collect()
}
fn default_report_findings() -> usize {
    20
}
fn default_report_decisions() -> usize {
    30
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            reports_dir: default_reports_dir(),
            critique_targets: default_critique_targets(),
            adaptive_critiques: true,
            report_findings: default_report_findings(),
            report_decisions: default_report_decisions(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,
}

fn default_port() -> u16 {
    5000
}
fn default_host() -> String {
    "127.0.0.1".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
        }
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

/// Providers that run locally and need no credentials.
const KEYLESS_PROVIDERS: &[&str] = &["ollama", "lmstudio", "vllm"];

impl AppConfig {
    /// Load configuration from the default path (~/.agora/config.toml).
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(None)
    }

    /// Load configuration from `path` (or the default path), then apply
    /// environment overrides:
    /// - `AGORA_API_KEY` (highest priority), `OPENAI_API_KEY`, `GOOGLE_API_KEY`
    /// - `AGORA_PROVIDER`, `AGORA_MODEL`
    /// - `AGORA_PERSIST_DIR`, `AGORA_REPORTS_DIR`
    pub fn load_with(path: Option<&Path>) -> Result<Self, ConfigError> {
        let default_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(path.unwrap_or(&default_path))?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply environment-style overrides from `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.api_key.is_none() {
            self.api_key = lookup("AGORA_API_KEY")
                .or_else(|| lookup("OPENAI_API_KEY"))
                .or_else(|| lookup("GOOGLE_API_KEY"));
        }

        if let Some(provider) = lookup("AGORA_PROVIDER") {
            self.default_provider = provider;
        }
        if let Some(model) = lookup("AGORA_MODEL") {
            self.default_model = model;
        }
        if let Some(dir) = lookup("AGORA_PERSIST_DIR") {
            self.memory.persist_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("AGORA_REPORTS_DIR") {
            self.research.reports_dir = PathBuf::from(dir);
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".agora")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_temperature < 0.0 || self.default_temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "default_temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.memory.fallback_window == 0 {
            return Err(ConfigError::ValidationError(
                "memory.fallback_window must be > 0".into(),
            ));
        }

        if self.memory.hash_dimensions == 0 {
            return Err(ConfigError::ValidationError(
                "memory.hash_dimensions must be > 0".into(),
            ));
        }

        if self.memory.collection_name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "memory.collection_name must not be empty".into(),
            ));
        }

        if self.scraper.max_retries == 0 {
            return Err(ConfigError::ValidationError(
                "scraper.max_retries must be >= 1".into(),
            ));
        }

        Ok(())
    }

    /// API key for `provider`: the provider section's key, else the global one.
    pub fn api_key_for(&self, provider: &str) -> Option<&str> {
        self.providers
            .get(provider)
            .and_then(|p| p.api_key.as_deref())
            .or(self.api_key.as_deref())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key_for(&self.default_provider).is_some()
    }

    /// Missing credentials are fatal for anything that calls the model.
    pub fn require_api_key(&self) -> Result<(), ConfigError> {
        if self.has_api_key() || KEYLESS_PROVIDERS.contains(&self.default_provider.as_str()) {
            return Ok(());
        }
        Err(ConfigError::MissingApiKey {
            provider: self.default_provider.clone(),
        })
    }

    /// Generate a default config TOML string (for `config init`).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: default_model(),
            default_temperature: default_temperature(),
            default_max_tokens: default_max_tokens(),
            memory: MemoryConfig::default(),
            scraper: ScraperConfig::default(),
            research: ResearchConfig::default(),
            gateway: GatewayConfig::default(),
            providers: HashMap::new(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),

    #[error(
        "No API key configured for provider '{provider}'. Set AGORA_API_KEY, OPENAI_API_KEY or GOOGLE_API_KEY, or add api_key to config.toml"
    )]
    MissingApiKey { provider: String },
}
