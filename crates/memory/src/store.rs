//! The content store: the shared memory every agent reads and writes.
//!
//! Agents never reference each other; they only append documents here and
//! query them back by similarity or metadata.
//!
//! Search has two modes:
//! - **semantic**: the query is embedded and documents are ranked by cosine
//!   distance; un-embedded documents that contain the query top up the result.
//! - **keyword** (degraded): used when no embedder is configured or the query
//!   embedding fails. Scans the most recent `fallback_window` documents and
//!   keeps those containing the query (case-insensitive). Not ranked.
//!
//! Embedding failures never fail a read or a write.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use agora_config::{EmbeddingProviderKind, MemoryBackendKind, MemoryConfig};
use agora_core::embedding::Embedder;
use agora_core::error::MemoryError;
use agora_core::memory::{Document, DocumentBackend, DocumentType, Metadata, MetadataFilter};
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::file_backend::FileBackend;
use crate::hash_embedder::HashEmbedder;
use crate::in_memory::InMemoryBackend;
use crate::vector::rank_by_distance;

/// Process-wide write counter; keeps ids unique within the same instant.
static WRITE_SEQ: AtomicU64 = AtomicU64::new(0);

/// Author of every critique document.
pub const CRITIC: &str = "Critic";

pub struct ContentStore {
    backend: Arc<dyn DocumentBackend>,
    embedder: Option<Arc<dyn Embedder>>,
    fallback_window: usize,
}

/// Aggregate counts over the whole store.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StoreStats {
    pub total: usize,
    pub embedded: usize,
    pub by_agent: BTreeMap<String, usize>,
    pub by_type: BTreeMap<String, usize>,
}

impl ContentStore {
    pub fn new(backend: Arc<dyn DocumentBackend>) -> Self {
        Self {
            backend,
            embedder: None,
            fallback_window: 100,
        }
    }

    pub fn with_embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn with_fallback_window(mut self, window: usize) -> Self {
        self.fallback_window = window.max(1);
        self
    }

    /// An in-memory store with no embedder.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryBackend::new()))
    }

    pub fn embeddings_enabled(&self) -> bool {
        self.embedder.is_some()
    }

    pub fn embedder_name(&self) -> Option<&str> {
        self.embedder.as_deref().map(|e| e.name())
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    fn next_id(agent_name: &str, document_type: DocumentType) -> String {
        let seq = WRITE_SEQ.fetch_add(1, Ordering::Relaxed);
        format!(
            "{agent_name}_{}_{}_{seq}",
            document_type.as_str(),
            Utc::now().format("%Y%m%dT%H%M%S%.6f")
        )
    }

    async fn try_embed(&self, text: &str) -> Option<Vec<f32>> {
        let embedder = self.embedder.as_ref()?;
        match embedder.embed(text).await {
            Ok(vector) if !vector.is_empty() => Some(vector),
            Ok(_) => {
                warn!(embedder = embedder.name(), "Embedder returned an empty vector");
                None
            }
            Err(e) => {
                warn!(embedder = embedder.name(), error = %e, "Embedding failed, continuing without");
                None
            }
        }
    }

    /// Store a new document and return its id.
    ///
    /// Caller metadata is merged with `agent_name`, `document_type`,
    /// `timestamp` and `content_length`; the system keys win on conflict.
    pub async fn store(
        &self,
        content: &str,
        metadata: Metadata,
        agent_name: &str,
        document_type: DocumentType,
    ) -> Result<String, MemoryError> {
        let id = Self::next_id(agent_name, document_type);

        let mut full = metadata;
        full.insert("agent_name".into(), Value::from(agent_name));
        full.insert("document_type".into(), Value::from(document_type.as_str()));
        full.insert("timestamp".into(), Value::from(Utc::now().to_rfc3339()));
        full.insert("content_length".into(), Value::from(content.chars().count()));

        let embedding = self.try_embed(content).await;

        let document = Document {
            id: id.clone(),
            content: content.to_string(),
            embedding,
            metadata: full,
            distance: None,
        };

        self.backend.append(document).await?;
        debug!(doc_id = %id, agent = agent_name, doc_type = %document_type, "Stored document");
        Ok(id)
    }

    /// Find documents relevant to `query`, at most `limit`, each passing `filter`.
    pub async fn search_similar(
        &self,
        query: &str,
        limit: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<Document>, MemoryError> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        match self.try_embed(query).await {
            Some(query_embedding) => self.semantic_search(query, &query_embedding, limit, filter).await,
            None => self.keyword_search(query, limit, filter).await,
        }
    }

    async fn semantic_search(
        &self,
        query: &str,
        query_embedding: &[f32],
        limit: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<Document>, MemoryError> {
        let candidates: Vec<Document> = self
            .backend
            .list(None)
            .await?
            .into_iter()
            .filter(|doc| passes(filter, doc))
            .collect();

        let mut results = rank_by_distance(&candidates, query_embedding, limit);

        if results.len() < limit {
            let needle = query.to_lowercase();
            let top_up = candidates
                .iter()
                .rev()
                .filter(|doc| {
                    !doc.embedding
                        .as_ref()
                        .is_some_and(|e| e.len() == query_embedding.len())
                })
                .filter(|doc| doc.content.to_lowercase().contains(&needle))
                .take(limit - results.len())
                .cloned()
                .collect::<Vec<_>>();
            results.extend(top_up);
        }

        debug!(count = results.len(), mode = "semantic", "Search complete");
        Ok(results)
    }

    async fn keyword_search(
        &self,
        query: &str,
        limit: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<Document>, MemoryError> {
        let needle = query.to_lowercase();
        let results: Vec<Document> = self
            .backend
            .recent(self.fallback_window)
            .await?
            .into_iter()
            .filter(|doc| passes(filter, doc))
            .filter(|doc| doc.content.to_lowercase().contains(&needle))
            .take(limit)
            .collect();

        debug!(count = results.len(), mode = "keyword", "Search complete");
        Ok(results)
    }

    /// The `limit` newest documents passing `filter`, newest first.
    pub async fn recent(
        &self,
        limit: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<Document>, MemoryError> {
        let documents = self.backend.list(None).await?;
        Ok(documents
            .into_iter()
            .rev()
            .filter(|doc| passes(filter, doc))
            .take(limit)
            .collect())
    }

    /// Documents in insertion order, unranked.
    pub async fn get_all(&self, limit: Option<usize>) -> Result<Vec<Document>, MemoryError> {
        self.backend.list(limit).await
    }

    /// Documents of one type in insertion order.
    pub async fn get_by_type(&self, document_type: DocumentType) -> Result<Vec<Document>, MemoryError> {
        let filter = MetadataFilter::document_type(document_type);
        Ok(self
            .backend
            .list(None)
            .await?
            .into_iter()
            .filter(|doc| filter.matches(&doc.metadata))
            .collect())
    }

    /// Record a critique of `target_agent`, authored by the critic.
    pub async fn store_critique(
        &self,
        target_agent: &str,
        content: &str,
        critique_type: &str,
    ) -> Result<String, MemoryError> {
        let mut metadata = Metadata::new();
        metadata.insert("target_agent".into(), Value::from(target_agent));
        metadata.insert("critique_type".into(), Value::from(critique_type));
        self.store(content, metadata, CRITIC, DocumentType::Critique).await
    }

    /// Every critique targeting `agent_name`, in insertion order.
    pub async fn get_critiques_for(&self, agent_name: &str) -> Result<Vec<Document>, MemoryError> {
        let filter = MetadataFilter::document_type(DocumentType::Critique).with("target_agent", agent_name);
        Ok(self
            .backend
            .list(None)
            .await?
            .into_iter()
            .filter(|doc| filter.matches(&doc.metadata))
            .collect())
    }

    pub async fn count(&self) -> Result<usize, MemoryError> {
        self.backend.count().await
    }

    pub async fn stats(&self) -> Result<StoreStats, MemoryError> {
        let documents = self.backend.list(None).await?;
        let mut stats = StoreStats {
            total: documents.len(),
            ..StoreStats::default()
        };
        for doc in &documents {
            if doc.embedding.is_some() {
                stats.embedded += 1;
            }
            let agent = doc.agent_name().unwrap_or("unknown").to_string();
            *stats.by_agent.entry(agent).or_default() += 1;
            let doc_type = doc
                .metadata
                .get("document_type")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string();
            *stats.by_type.entry(doc_type).or_default() += 1;
        }
        Ok(stats)
    }
}

fn passes(filter: Option<&MetadataFilter>, doc: &Document) -> bool {
    filter.is_none_or(|f| f.matches(&doc.metadata))
}

/// Build a content store from configuration.
///
/// `remote` is the provider-backed embedder used when
/// `embedding_provider = "provider"`; without it the store runs in keyword mode.
pub fn build_from_config(config: &MemoryConfig, remote: Option<Arc<dyn Embedder>>) -> ContentStore {
    let backend: Arc<dyn DocumentBackend> = match config.backend {
        MemoryBackendKind::File => Arc::new(FileBackend::collection(
            &config.persist_dir,
            &config.collection_name,
        )),
        MemoryBackendKind::InMemory => Arc::new(InMemoryBackend::new()),
    };

    let embedder: Option<Arc<dyn Embedder>> = match config.embedding_provider {
        EmbeddingProviderKind::None => None,
        EmbeddingProviderKind::Hash => Some(Arc::new(HashEmbedder::new(config.hash_dimensions))),
        EmbeddingProviderKind::Provider => {
            if remote.is_none() {
                warn!("Provider embeddings requested but no provider available, using keyword search");
            }
            remote
        }
    };

    info!(
        backend = backend.name(),
        embedder = embedder.as_deref().map(|e| e.name()).unwrap_or("none"),
        "Content store ready"
    );

    let store = ContentStore::new(backend).with_fallback_window(config.fallback_window);
    match embedder {
        Some(embedder) => store.with_embedder(embedder),
        None => store,
    }
}
