//! In-memory backend: useful for testing and ephemeral runs.

use async_trait::async_trait;
use agora_core::error::MemoryError;
use agora_core::memory::{Document, DocumentBackend};
use std::sync::Arc;
use tokio::sync::RwLock;

/// An in-memory backend that keeps documents in a Vec.
/// Nothing survives the process.
pub struct InMemoryBackend {
    documents: Arc<RwLock<Vec<Document>>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            documents: Arc::new(RwLock::new(Vec::new())),
        }
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentBackend for InMemoryBackend {
    fn name(&self) -> &str { "in_memory" }

    async fn append(&self, document: Document) -> Result<(), MemoryError> {
        self.documents.write().await.push(document);
        Ok(())
    }

    async fn list(&self, limit: Option<usize>) -> Result<Vec<Document>, MemoryError> {
        let documents = self.documents.read().await;
        let take = limit.unwrap_or(documents.len());
        Ok(documents.iter().take(take).cloned().collect())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<Document>, MemoryError> {
        let documents = self.documents.read().await;
        Ok(documents.iter().rev().take(limit).cloned().collect())
    }

    async fn count(&self) -> Result<usize, MemoryError> {
        Ok(self.documents.read().await.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str) -> Document {
        Document {
            id: id.into(),
            content: format!("content of {id}"),
            embedding: None,
            metadata: Default::default(),
            distance: None,
        }
    }

    #[tokio::test]
    async fn list_preserves_insertion_order() {
        let mem = InMemoryBackend::new();
        for id in ["a", "b", "c"] {
            mem.append(doc(id)).await.unwrap();
        }

        let all = mem.list(None).await.unwrap();
        let ids: Vec<_> = all.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);

        let first_two = mem.list(Some(2)).await.unwrap();
        assert_eq!(first_two.len(), 2);
        assert_eq!(first_two[0].id, "a");
    }

    #[tokio::test]
    async fn recent_is_newest_first() {
        let mem = InMemoryBackend::new();
        for id in ["a", "b", "c"] {
            mem.append(doc(id)).await.unwrap();
        }

        let recent = mem.recent(2).await.unwrap();
        let ids: Vec<_> = recent.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b"]);
        assert_eq!(mem.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn concurrent_appends_are_all_kept() {
        let mem = Arc::new(InMemoryBackend::new());
        let mut handles = Vec::new();
        for i in 0..20 {
            let mem = mem.clone();
            handles.push(tokio::spawn(async move {
                mem.append(doc(&format!("d{i}"))).await.unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(mem.count().await.unwrap(), 20);
    }
}
