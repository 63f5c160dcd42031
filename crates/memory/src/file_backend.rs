//! File-based document backend: a persistent JSON-lines collection.
//!
//! Each line of `<persist_dir>/<collection_name>.jsonl` is one JSON-encoded
//! [`Document`]. Documents are never rewritten: a store appends one line.

use async_trait::async_trait;
use agora_core::error::MemoryError;
use agora_core::memory::{Document, DocumentBackend};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// A file-backed collection using JSONL (one JSON object per line).
///
/// Documents are loaded into memory on creation; every append is written to
/// disk before it becomes visible to readers.
pub struct FileBackend {
    path: PathBuf,
    documents: Arc<RwLock<Vec<Document>>>,
}

impl FileBackend {
    /// Open (or lazily create) the collection at `path`.
    pub fn new(path: PathBuf) -> Self {
        let documents = Self::load_from_disk(&path);
        debug!(path = %path.display(), count = documents.len(), "File collection loaded");
        Self {
            path,
            documents: Arc::new(RwLock::new(documents)),
        }
    }

    /// Collection file for `name` under `persist_dir`.
    pub fn collection(persist_dir: &Path, name: &str) -> Self {
        Self::new(persist_dir.join(format!("{name}.jsonl")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_from_disk(path: &Path) -> Vec<Document> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => return Vec::new(), // File doesn't exist yet: start empty
        };

        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str::<Document>(line) {
                Ok(doc) => Some(doc),
                Err(e) => {
                    warn!(error = %e, "Skipping corrupted document line");
                    None
                }
            })
            .collect()
    }

    async fn append_line(&self, document: &Document) -> Result<(), MemoryError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                MemoryError::Storage(format!("Failed to create collection directory: {e}"))
            })?;
        }

        let mut line = serde_json::to_string(document).map_err(|e| {
            MemoryError::Storage(format!("Failed to serialize document: {e}"))
        })?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| MemoryError::Storage(format!("Failed to open collection file: {e}")))?;

        file.write_all(line.as_bytes())
            .await
            .map_err(|e| MemoryError::Storage(format!("Failed to write collection file: {e}")))?;
        file.flush()
            .await
            .map_err(|e| MemoryError::Storage(format!("Failed to flush collection file: {e}")))?;

        Ok(())
    }
}

#[async_trait]
impl DocumentBackend for FileBackend {
    fn name(&self) -> &str {
        "file"
    }

    async fn append(&self, document: Document) -> Result<(), MemoryError> {
        // Hold the write lock across the disk write so file order matches memory order.
        let mut documents = self.documents.write().await;
        self.append_line(&document).await?;
        documents.push(document);
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
