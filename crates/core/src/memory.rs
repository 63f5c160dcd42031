//! Shared-memory data model.
//!
//! A [`Document`] is the atomic unit every agent reads and writes. Documents
//! are immutable once appended to a [`DocumentBackend`]; an update is always a
//! new document with its own id.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use crate::error::MemoryError;

/// Open metadata map carried by every document.
pub type Metadata = serde_json::Map<String, Value>;

/// The kind of artifact a document holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Finding,
    DecisionLog,
    Critique,
    WorkflowStep,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Finding => "finding",
            Self::DecisionLog => "decision_log",
            Self::Critique => "critique",
            Self::WorkflowStep => "workflow_step",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "finding" => Some(Self::Finding),
            "decision_log" => Some(Self::DecisionLog),
            "critique" => Some(Self::Critique),
            "workflow_step" => Some(Self::WorkflowStep),
            _ => None,
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored unit of agent output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique id encoding agent, document type and write time
    pub id: String,

    /// Agent-produced text
    pub content: String,

    /// Embedding vector; absent when no embedder was available at write time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,

    /// Always contains `agent_name`, `document_type`, `timestamp`, `content_length`
    pub metadata: Metadata,

    /// Cosine distance to the query (set by semantic search only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f32>,
}

impl Document {
    fn meta_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }

    pub fn agent_name(&self) -> Option<&str> {
        self.meta_str("agent_name")
    }

    pub fn document_type(&self) -> Option<DocumentType> {
        self.meta_str("document_type").and_then(DocumentType::parse)
    }

    pub fn timestamp(&self) -> Option<&str> {
        self.meta_str("timestamp")
    }

    /// The critiqued agent, for critique documents.
    pub fn target_agent(&self) -> Option<&str> {
        self.meta_str("target_agent")
    }
}

/// Exact-match metadata filter. A document passes when every key in the
/// filter is present in its metadata with an equal value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataFilter(Metadata);

impl MetadataFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a required key/value pair.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn agent(name: &str) -> Self {
        Self::new().with("agent_name", name)
    }

    pub fn document_type(doc_type: DocumentType) -> Self {
        Self::new().with("document_type", doc_type.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn matches(&self, metadata: &Metadata) -> bool {
        self.0
            .iter()
            .all(|(key, expected)| metadata.get(key) == Some(expected))
    }
}

impl From<Metadata> for MetadataFilter {
    fn from(map: Metadata) -> Self {
        Self(map)
    }
}

/// Append-only document collection.
///
/// Implementations must tolerate concurrent readers and writers: each
/// `append` is a self-contained insert, never an update.
#[async_trait]
pub trait DocumentBackend: Send + Sync {
    /// Backend name (e.g., "in_memory", "file").
    fn name(&self) -> &str;

    /// Append a new document.
    async fn append(&self, document: Document) -> std::result::Result<(), MemoryError>;

    /// Documents in insertion order, at most `limit` when given.
    async fn list(&self, limit: Option<usize>) -> std::result::Result<Vec<Document>, MemoryError>;

    /// The `limit` most recently appended documents, newest first.
    async fn recent(&self, limit: usize) -> std::result::Result<Vec<Document>, MemoryError>;

    /// Total number of stored documents.
    async fn count(&self) -> std::result::Result<usize, MemoryError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc_with(metadata: Value) -> Document {
        Document {
            id: "Researcher_finding_1".into(),
            content: "CRISPR shows promise".into(),
            embedding: None,
            metadata: metadata.as_object().cloned().unwrap_or_default(),
            distance: None,
        }
    }

    #[test]
    fn document_type_roundtrips_through_str() {
        for t in [
            DocumentType::Finding,
            DocumentType::DecisionLog,
            DocumentType::Critique,
            DocumentType::WorkflowStep,
        ] {
            assert_eq!(DocumentType::parse(t.as_str()), Some(t));
        }
        assert_eq!(DocumentType::parse("note"), None);
    }

    #[test]
    fn document_type_serializes_snake_case() {
        let json = serde_json::to_string(&DocumentType::DecisionLog).unwrap();
        assert_eq!(json, "\"decision_log\"");
    }

    #[test]
    fn empty_filter_matches_everything() {
        let doc = doc_with(json!({"agent_name": "Planner"}));
        assert!(MetadataFilter::new().matches(&doc.metadata));
    }

    #[test]
    fn filter_requires_every_key() {
        let doc = doc_with(json!({
            "agent_name": "Critic",
            "document_type": "critique",
            "target_agent": "Planner"
        }));
        let hit = MetadataFilter::document_type(DocumentType::Critique).with("target_agent", "Planner");
        let miss = MetadataFilter::document_type(DocumentType::Critique).with("target_agent", "Researcher");
        let absent = MetadataFilter::new().with("task", "anything");
        assert!(hit.matches(&doc.metadata));
        assert!(!miss.matches(&doc.metadata));
        assert!(!absent.matches(&doc.metadata));
    }

    #[test]
    fn filter_compares_json_values_exactly() {
        let doc = doc_with(json!({"content_length": 20}));
        assert!(MetadataFilter::new().with("content_length", 20).matches(&doc.metadata));
        assert!(!MetadataFilter::new().with("content_length", "20").matches(&doc.metadata));
    }

    #[test]
    fn accessors_read_metadata() {
        let doc = doc_with(json!({
            "agent_name": "Critic",
            "document_type": "critique",
            "target_agent": "Planner",
            "timestamp": "2025-01-01T00:00:00Z"
        }));
        assert_eq!(doc.agent_name(), Some("Critic"));
        assert_eq!(doc.document_type(), Some(DocumentType::Critique));
        assert_eq!(doc.target_agent(), Some("Planner"));
        assert!(doc.timestamp().is_some());
    }

    #[test]
    fn distance_is_omitted_when_unset() {
        let doc = doc_with(json!({}));
        let json = serde_json::to_string(&doc).unwrap();
        assert!(!json.contains("distance"));
        assert!(!json.contains("embedding"));
    }
}
