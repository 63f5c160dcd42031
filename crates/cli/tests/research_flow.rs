//! End-to-end tests over the shared content store and a full research run
//! against a scripted model.

use std::sync::{Arc, Mutex};

use agora_agent::{ModelClient, ResearchPipeline, ResearchRequest};
use agora_config::{EmbeddingProviderKind, MemoryBackendKind, MemoryConfig, ResearchConfig};
use agora_core::error::ProviderError;
use agora_core::memory::{DocumentType, Metadata, MetadataFilter};
use agora_core::message::{Message, Role};
use agora_core::provider::{Provider, ProviderRequest, ProviderResponse};
use agora_memory::{ContentStore, ContextAccessor};

// ── Mock Provider ────────────────────────────────────────────────────────

/// Answers as whichever agent the system message names.
struct TeamProvider {
    calls: Mutex<Vec<String>>,
}

impl TeamProvider {
    fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
        }
    }

    fn agents_called(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn answer(agent: &str) -> &'static str {
        match agent {
            "Planner" => {
                r#"```json
{"research_questions": ["Which microbes fix the most nitrogen?"],
 "hypotheses": ["Cover crops raise microbial diversity"],
 "investigation_strategy": ["Survey field trials"],
 "data_requirements": ["Soil samples"],
 "success_criteria": ["Replicated results"]}
```"#
            }
            "Researcher" => {
                r#"{"search_queries": ["soil microbiome nitrogen"], "key_findings": ["Rhizobia dominate legume plots"], "recommendations": ["Sample deeper horizons"]}"#
            }
            "DataAlchemist" => r#"{"data_quality": "moderate", "insights": ["Few numeric tables"]}"#,
            "Experimenter" => {
                r#"```
{"experiments": [{"name": "Cover crop trial", "methodology": "Randomised plots", "expected_outcomes": ["Higher diversity"]}], "analysis_plan": "ANOVA"}
```"#
            }
            "Reviewer" => r#"{"quality_score": "high", "completeness": "partial", "recommendations": ["Add controls"]}"#,
            "Critic" => r#"{"strengths": ["Clear scope"], "weaknesses": ["Small sample"], "suggestions": ["Widen the survey"], "priority": "medium"}"#,
            _ => "I am not sure who I am.",
        }
    }
}

#[async_trait::async_trait]
impl Provider for TeamProvider {
    fn name(&self) -> &str {
        "team_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let agent = request
            .messages
            .iter()
            .find(|m| m.role == Role::System)
            .and_then(|m| m.content.strip_prefix("You are the "))
            .and_then(|rest| rest.split_whitespace().next())
            .unwrap_or("unknown")
            .to_string();
        let text = Self::answer(&agent);
        self.calls.lock().unwrap().push(agent);
        Ok(ProviderResponse {
            message: Message::assistant(text),
            usage: None,
            model: request.model,
        })
    }
}

fn file_memory(dir: &std::path::Path) -> MemoryConfig {
    MemoryConfig {
        backend: MemoryBackendKind::File,
        persist_dir: dir.to_path_buf(),
        embedding_provider: EmbeddingProviderKind::None,
        ..MemoryConfig::default()
    }
}

// ── Store scenarios ──────────────────────────────────────────────────────

#[tokio::test]
async fn stored_finding_appears_in_agent_history() {
    let store = Arc::new(ContentStore::in_memory());
    store
        .store("CRISPR shows promise", Metadata::new(), "Researcher", DocumentType::Finding)
        .await
        .unwrap();

    let accessor = ContextAccessor::new(store, "Reviewer");
    let history = accessor.get_agent_history("Researcher", 10).await.unwrap();
    assert!(history.iter().any(|d| d.content == "CRISPR shows promise"));
}

#[tokio::test]
async fn keyword_search_without_embeddings() {
    let store = ContentStore::in_memory();
    assert!(!store.embeddings_enabled());
    let alpha = store
        .store("alpha result", Metadata::new(), "Researcher", DocumentType::Finding)
        .await
        .unwrap();
    store
        .store("beta result", Metadata::new(), "Researcher", DocumentType::Finding)
        .await
        .unwrap();

    let results = store.search_similar("alpha", 5, None).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, alpha);
    assert_eq!(results[0].content, "alpha result");
}

#[tokio::test]
async fn critiques_are_linked_to_their_target() {
    let store = ContentStore::in_memory();
    store
        .store_critique("Planner", "needs more sources", "feedback")
        .await
        .unwrap();

    assert!(store.get_critiques_for("Researcher").await.unwrap().is_empty());
    let planner = store.get_critiques_for("Planner").await.unwrap();
    assert_eq!(planner.len(), 1);
    assert!(planner[0].content.contains("needs more sources"));
    assert_eq!(planner[0].agent_name(), Some("Critic"));
}

#[tokio::test]
async fn file_collection_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let config = file_memory(dir.path());

    let store = agora_memory::build_from_config(&config, None);
    store
        .store("Soil pH drives diversity", Metadata::new(), "Researcher", DocumentType::Finding)
        .await
        .unwrap();
    store.store_critique("Researcher", "cite the trial", "feedback").await.unwrap();
    drop(store);

    let reopened = agora_memory::build_from_config(&config, None);
    assert_eq!(reopened.count().await.unwrap(), 2);
    assert_eq!(reopened.get_critiques_for("Researcher").await.unwrap().len(), 1);
    let found = reopened.search_similar("ph drives", 5, None).await.unwrap();
    assert_eq!(found.len(), 1);
}

// ── Full pipeline ────────────────────────────────────────────────────────

#[tokio::test]
async fn full_research_run_writes_report() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(agora_memory::build_from_config(&file_memory(&dir.path().join("memory")), None));
    let provider = Arc::new(TeamProvider::new());
    let research = ResearchConfig {
        reports_dir: dir.path().join("reports"),
        ..ResearchConfig::default()
    };

    let pipeline = ResearchPipeline::new(
        store.clone(),
        ModelClient::new(provider.clone(), "mock-model"),
        None,
        research,
    );
    let report = pipeline
        .run(ResearchRequest {
            domain: Some("soil microbiome".into()),
            urls: Vec::new(),
        })
        .await
        .unwrap();

    // five specialists, then one critique per agent with findings
    let calls = provider.agents_called();
    assert_eq!(
        &calls[..5],
        ["Planner", "Researcher", "DataAlchemist", "Experimenter", "Reviewer"]
    );
    assert_eq!(calls[5..].iter().filter(|a| *a == "Critic").count(), 4);

    let path = report.path.expect("report written");
    assert!(path.starts_with(dir.path().join("reports")));
    let name = path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("research_report_soil_microbiome_"));
    assert!(name.ends_with(".md"));

    let markdown = std::fs::read_to_string(&path).unwrap();
    assert_eq!(markdown, report.markdown);
    assert!(markdown.contains("**Research Domain**: soil microbiome"));
    assert!(markdown.contains("Which microbes fix the most nitrogen?"));
    assert!(markdown.contains("### Cover crop trial"));
    assert!(markdown.contains("- **Quality Score**: high"));
    assert!(markdown.contains("Widen the survey"));

    for agent in ["Researcher", "Planner", "DataAlchemist", "Experimenter"] {
        let critiques = store.get_critiques_for(agent).await.unwrap();
        assert_eq!(critiques.len(), 1, "{agent}");
    }
    let decisions = store
        .recent(100, Some(&MetadataFilter::document_type(DocumentType::DecisionLog)))
        .await
        .unwrap();
    assert_eq!(decisions.len(), calls.len());
    assert_eq!(report.activity.values().sum::<usize>(), calls.len());
    assert_eq!(report.workflow.first().unwrap().step, "domain_selection");
    assert_eq!(report.workflow.last().unwrap().step, "report");
}
