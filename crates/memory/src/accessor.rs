//! Per-agent view over the content store.

use std::sync::Arc;

use agora_core::error::MemoryError;
use agora_core::memory::{Document, MetadataFilter};
use tracing::debug;

use crate::store::ContentStore;

/// Gives one agent a bounded, relevant slice of shared memory.
///
/// Context queries are deliberately not scoped to the owning agent: agents
/// read each other's findings through here.
#[derive(Clone)]
pub struct ContextAccessor {
    store: Arc<ContentStore>,
    agent_name: String,
}

impl ContextAccessor {
    pub fn new(store: Arc<ContentStore>, agent_name: impl Into<String>) -> Self {
        Self {
            store,
            agent_name: agent_name.into(),
        }
    }

    pub fn agent_name(&self) -> &str {
        &self.agent_name
    }

    pub fn store(&self) -> &Arc<ContentStore> {
        &self.store
    }

    /// What the store knows that is relevant to `query`, across all agents.
    pub async fn get_context(&self, query: &str, limit: usize) -> Result<Vec<Document>, MemoryError> {
        let docs = self.store.search_similar(query, limit, None).await?;
        debug!(agent = %self.agent_name, count = docs.len(), "Retrieved context");
        Ok(docs)
    }

    /// What `agent_name` previously wrote.
    ///
    /// Seeds a similarity search with the agent's name under an `agent_name`
    /// filter. When that finds nothing (keyword mode rarely matches the
    /// synthetic query) the agent's most recent documents are returned.
    pub async fn get_agent_history(
        &self,
        agent_name: &str,
        limit: usize,
    ) -> Result<Vec<Document>, MemoryError> {
        let filter = MetadataFilter::agent(agent_name);
        let query = format!("agent {agent_name} findings");
        let docs = self.store.search_similar(&query, limit, Some(&filter)).await?;
        if !docs.is_empty() {
            return Ok(docs);
        }
        self.store.recent(limit, Some(&filter)).await
    }

    /// This accessor's own agent history.
    pub async fn own_history(&self, limit: usize) -> Result<Vec<Document>, MemoryError> {
        self.get_agent_history(&self.agent_name, limit).await
    }

    pub async fn get_critiques(&self, agent_name: &str) -> Result<Vec<Document>, MemoryError> {
        self.store.get_critiques_for(agent_name).await
    }
}
