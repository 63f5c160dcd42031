//! The agent invocation contract.
//!
//! Every specialist follows the same lifecycle:
//!
//! 1. **Retrieve** prior context through its [`ContextAccessor`]
//! 2. **Prompt** the model once with the task, the context and an output schema
//! 3. **Extract** a structured payload, or substitute the declared fallback
//! 4. **Persist** a readable finding and a decision-log entry
//! 5. **Return** `{agent, task, <payload>, reasoning}`
//!
//! [`Specialist`] carries what differs per agent (prompt, schema, fallback,
//! synthesis); [`SpecialistAgent`] runs the shared lifecycle around it.

use std::sync::Mutex;

use agora_core::error::{Error, Result};
use agora_core::memory::{Document, DocumentType, Metadata, MetadataFilter};
use agora_core::scrape::{ScrapeResult, Table};
use agora_memory::ContextAccessor;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::extract::{parse_structured, truncate_chars};
use crate::llm::ModelClient;

/// Characters kept per entry of a decision's context snapshot.
const SNAPSHOT_CHARS: usize = 100;
/// Entries kept in a decision's context snapshot.
const SNAPSHOT_ENTRIES: usize = 3;

/// Uniform capability every agent exposes to the pipeline and the gateway.
#[async_trait]
pub trait Agent: Send + Sync {
    fn name(&self) -> &str;

    fn role(&self) -> &str;

    /// Run one task. Model-output parse failures never surface here.
    async fn execute(&self, task: &str, context: &TaskContext) -> Result<AgentResult>;

    /// Decisions this agent instance has logged, oldest first.
    fn decision_log(&self) -> Vec<DecisionLogEntry>;
}

/// Inputs handed to an agent alongside its task.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,

    /// The planner's plan, for agents downstream of it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub research_plan: Option<Value>,

    /// Free-text data items for the data processor.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tables: Vec<Table>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_data: Option<Value>,

    /// Findings under review.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub findings: Vec<Document>,

    /// Whose work the critic is looking at.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_agent: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work: Option<Value>,

    /// Pages the researcher should scrape before prompting.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub urls: Vec<String>,
}

/// The result envelope: `{agent, task, <payload>, reasoning}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResult {
    pub agent: String,
    pub task: String,
    #[serde(flatten)]
    pub payload: serde_json::Map<String, Value>,
    pub reasoning: String,
}

/// One logged decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionLogEntry {
    pub timestamp: DateTime<Utc>,
    pub agent: String,
    pub decision: String,
    pub reasoning: String,
    pub context: Vec<String>,
}

/// Where a specialist's prior context comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum Retrieval {
    /// Similarity search across every agent's documents.
    Similar { query: String, limit: usize },
    /// The newest `limit` findings, newest first.
    RecentFindings { limit: usize },
}

/// A readable synthesis of a payload, ready to persist as a finding.
#[derive(Debug, Clone, Default)]
pub struct Finding {
    pub content: String,
    pub metadata: Metadata,
    /// When set, the content is also stored as a critique of this agent.
    pub critique_of: Option<String>,
}

/// What one specialist brings to the shared lifecycle.
#[async_trait]
pub trait Specialist: Send + Sync {
    /// What the model is asked to produce.
    type Parsed: DeserializeOwned + Send;
    /// The agent-specific payload in the result envelope.
    type Output: Serialize + Send + Sync;

    fn name(&self) -> &'static str;

    fn role(&self) -> &'static str;

    fn retrieval(&self, task: &str, context: &TaskContext) -> Retrieval;

    /// The retrieved documents this specialist actually uses.
    fn relevant<'a>(&self, retrieved: &'a [Document]) -> Vec<&'a Document> {
        retrieved.iter().collect()
    }

    /// Extra material gathered before prompting.
    async fn gather(&self, _task: &str, _context: &TaskContext) -> Vec<ScrapeResult> {
        Vec::new()
    }

    fn prompt(
        &self,
        task: &str,
        context: &TaskContext,
        relevant: &[&Document],
        gathered: &[ScrapeResult],
    ) -> String;

    /// Same shape as a parsed response, generic values.
    fn fallback(&self, task: &str, context: &TaskContext) -> Self::Parsed;

    fn build(
        &self,
        task: &str,
        context: &TaskContext,
        parsed: Self::Parsed,
        gathered: &[ScrapeResult],
    ) -> Self::Output;

    fn synthesize(&self, task: &str, context: &TaskContext, output: &Self::Output) -> Finding;

    fn decision(&self, task: &str, context: &TaskContext, output: &Self::Output) -> String;

    /// Inputs recorded with the decision, before truncation.
    fn context_snapshot(&self, _context: &TaskContext, relevant: &[&Document]) -> Vec<String> {
        relevant.iter().map(|doc| doc.content.clone()).collect()
    }
}

/// A specialist's typed result, before it is flattened into an envelope.
#[derive(Debug, Clone)]
pub struct Outcome<T> {
    pub agent: String,
    pub task: String,
    pub output: T,
    /// False when the fallback payload was used.
    pub parsed: bool,
    pub reasoning: String,
    pub finding_id: String,
}

impl<T: Serialize> Outcome<T> {
    pub fn into_result(self) -> Result<AgentResult> {
        let payload = match serde_json::to_value(&self.output)? {
            Value::Object(map) => map,
            other => {
                return Err(Error::Internal(format!(
                    "{} payload is not an object: {other}",
                    self.agent
                )));
            }
        };
        Ok(AgentResult {
            agent: self.agent,
            task: self.task,
            payload,
            reasoning: self.reasoning,
        })
    }
}

/// Runs the shared lifecycle around one [`Specialist`].
pub struct SpecialistAgent<S> {
    specialist: S,
    model: ModelClient,
    memory: ContextAccessor,
    decisions: Mutex<Vec<DecisionLogEntry>>,
}

impl<S: Specialist> SpecialistAgent<S> {
    pub fn new(specialist: S, model: ModelClient, memory: ContextAccessor) -> Self {
        Self {
            specialist,
            model,
            memory,
            decisions: Mutex::new(Vec::new()),
        }
    }

    pub fn specialist(&self) -> &S {
        &self.specialist
    }

    pub fn memory(&self) -> &ContextAccessor {
        &self.memory
    }

    fn system_message(&self) -> String {
        format!(
            "You are the {} agent in a multi-agent research team. Your role: {}. \
            Answer with the requested JSON only.",
            self.specialist.name(),
            self.specialist.role()
        )
    }

    async fn retrieve(&self, task: &str, context: &TaskContext) -> Result<Vec<Document>> {
        let docs = match self.specialist.retrieval(task, context) {
            Retrieval::Similar { query, limit } => self.memory.get_context(&query, limit).await?,
            Retrieval::RecentFindings { limit } => {
                let filter = MetadataFilter::document_type(DocumentType::Finding);
                self.memory.store().recent(limit, Some(&filter)).await?
            }
        };
        Ok(docs)
    }

    /// Run the lifecycle and keep the payload typed.
    pub async fn run(&self, task: &str, context: &TaskContext) -> Result<Outcome<S::Output>> {
        let name = self.specialist.name();
        info!(agent = name, task, "Executing task");

        let retrieved = self.retrieve(task, context).await?;
        let relevant = self.specialist.relevant(&retrieved);
        let gathered = self.specialist.gather(task, context).await;

        let prompt = self.specialist.prompt(task, context, &relevant, &gathered);
        let system = self.system_message();
        let raw = self.model.generate(&prompt, Some(&system)).await?;

        let structured = parse_structured(&raw, || self.specialist.fallback(task, context));
        let parsed = structured.is_structured();
        if !parsed {
            debug!(agent = name, "Model output had no usable JSON, using fallback payload");
        }

        let output = self
            .specialist
            .build(task, context, structured.into_inner(), &gathered);

        let finding = self.specialist.synthesize(task, context, &output);
        if let Some(target) = &finding.critique_of {
            self.memory
                .store()
                .store_critique(target, &finding.content, "feedback")
                .await?;
        }
        let finding_id = self.store_finding(&finding.content, finding.metadata).await?;

        let decision = self.specialist.decision(task, context, &output);
        let snapshot = self.specialist.context_snapshot(context, &relevant);
        self.log_decision(&decision, &raw, snapshot).await?;

        info!(agent = name, parsed, finding_id = %finding_id, "Task complete");

        Ok(Outcome {
            agent: name.to_string(),
            task: task.to_string(),
            output,
            parsed,
            reasoning: raw,
            finding_id,
        })
    }

    async fn store_finding(&self, content: &str, mut metadata: Metadata) -> Result<String> {
        metadata.insert("agent_role".into(), Value::from(self.specialist.role()));
        metadata
            .entry("finding_type")
            .or_insert_with(|| Value::from("general"));
        let id = self
            .memory
            .store()
            .store(content, metadata, self.specialist.name(), DocumentType::Finding)
            .await?;
        Ok(id)
    }

    async fn log_decision(
        &self,
        decision: &str,
        reasoning: &str,
        snapshot: Vec<String>,
    ) -> Result<String> {
        let context: Vec<String> = snapshot
            .iter()
            .take(SNAPSHOT_ENTRIES)
            .map(|entry| truncate_chars(entry, SNAPSHOT_CHARS).to_string())
            .collect();

        let entry = DecisionLogEntry {
            timestamp: Utc::now(),
            agent: self.specialist.name().to_string(),
            decision: decision.to_string(),
            reasoning: reasoning.to_string(),
            context,
        };

        let mut metadata = Metadata::new();
        metadata.insert("log_type".into(), Value::from("decision"));
        metadata.insert(
            "context".into(),
            Value::from(serde_json::to_string(&entry.context).unwrap_or_default()),
        );
        let content = format!("Decision: {decision}\nReasoning: {reasoning}");

        self.decisions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(entry);

        let id = self
            .memory
            .store()
            .store(&content, metadata, self.specialist.name(), DocumentType::DecisionLog)
            .await?;
        Ok(id)
    }
}

#[async_trait]
impl<S: Specialist> Agent for SpecialistAgent<S> {
    fn name(&self) -> &str {
        self.specialist.name()
    }

    fn role(&self) -> &str {
        self.specialist.role()
    }

    async fn execute(&self, task: &str, context: &TaskContext) -> Result<AgentResult> {
        self.run(task, context).await?.into_result()
    }

    fn decision_log(&self) -> Vec<DecisionLogEntry> {
        self.decisions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::lenient;
    use crate::test_helpers::{FailingProvider, ScriptedProvider};
    use agora_memory::ContentStore;
    use std::sync::Arc;

    /// Minimal specialist exercising every hook.
    struct Echo;

    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    struct EchoParsed {
        #[serde(deserialize_with = "lenient::list")]
        points: Vec<String>,
    }

    #[derive(Debug, Serialize)]
    struct EchoOutput {
        points: Vec<String>,
    }

    #[async_trait]
    impl Specialist for Echo {
        type Parsed = EchoParsed;
        type Output = EchoOutput;

        fn name(&self) -> &'static str {
            "Echo"
        }

        fn role(&self) -> &'static str {
            "Repeats points"
        }

        fn retrieval(&self, task: &str, _context: &TaskContext) -> Retrieval {
            Retrieval::Similar {
                query: task.to_string(),
                limit: 5,
            }
        }

        fn prompt(&self, task: &str, _: &TaskContext, relevant: &[&Document], _: &[ScrapeResult]) -> String {
            format!("Task: {task}\nContext items: {}", relevant.len())
        }

        fn fallback(&self, task: &str, _context: &TaskContext) -> EchoParsed {
            EchoParsed {
                points: vec![format!("fallback for {task}")],
            }
        }

        fn build(&self, _: &str, _: &TaskContext, parsed: EchoParsed, _: &[ScrapeResult]) -> EchoOutput {
            EchoOutput { points: parsed.points }
        }

        fn synthesize(&self, task: &str, _: &TaskContext, output: &EchoOutput) -> Finding {
            let mut metadata = Metadata::new();
            metadata.insert("task".into(), Value::from(task));
            Finding {
                content: format!("Points: {}", output.points.join(", ")),
                metadata,
                critique_of: None,
            }
        }

        fn decision(&self, task: &str, _: &TaskContext, _: &EchoOutput) -> String {
            format!("Echoed {task}")
        }
    }

    fn agent(store: Arc<ContentStore>, replies: Vec<&str>) -> SpecialistAgent<Echo> {
        let model = ModelClient::new(Arc::new(ScriptedProvider::new(replies)), "m");
        SpecialistAgent::new(Echo, model, ContextAccessor::new(store, "Echo"))
    }

    #[tokio::test]
    async fn structured_reply_flows_into_envelope() {
        let store = Arc::new(ContentStore::in_memory());
        let agent = agent(store.clone(), vec!["```json\n{\"points\": [\"a\", \"b\"]}\n```"]);

        let result = agent.execute("echo", &TaskContext::default()).await.unwrap();
        assert_eq!(result.agent, "Echo");
        assert_eq!(result.task, "echo");
        assert_eq!(result.payload["points"], serde_json::json!(["a", "b"]));
        assert!(result.reasoning.contains("```json"));
    }

    #[tokio::test]
    async fn fallback_keeps_the_same_keys() {
        let store = Arc::new(ContentStore::in_memory());
        let parsed = agent(store.clone(), vec!["{\"points\": [\"x\"]}"])
            .execute("t", &TaskContext::default())
            .await
            .unwrap();
        let fallback = agent(store, vec!["no json here"])
            .execute("t", &TaskContext::default())
            .await
            .unwrap();

        let keys = |r: &AgentResult| r.payload.keys().cloned().collect::<Vec<_>>();
        assert_eq!(keys(&parsed), keys(&fallback));
        assert_eq!(fallback.payload["points"], serde_json::json!(["fallback for t"]));
    }

    #[tokio::test]
    async fn persists_finding_and_decision() {
        let store = Arc::new(ContentStore::in_memory());
        let agent = agent(store.clone(), vec!["{\"points\": [\"p\"]}"]);
        let outcome = agent.run("remember", &TaskContext::default()).await.unwrap();
        assert!(outcome.parsed);

        let findings = store.get_by_type(DocumentType::Finding).await.unwrap();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].id, outcome.finding_id);
        assert_eq!(findings[0].content, "Points: p");
        assert_eq!(findings[0].metadata["agent_role"], "Repeats points");
        assert_eq!(findings[0].metadata["finding_type"], "general");
        assert_eq!(findings[0].metadata["task"], "remember");

        let decisions = store.get_by_type(DocumentType::DecisionLog).await.unwrap();
        assert_eq!(decisions.len(), 1);
        assert!(decisions[0].content.starts_with("Decision: Echoed remember\nReasoning: "));
        assert_eq!(decisions[0].metadata["log_type"], "decision");

        let log = agent.decision_log();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].agent, "Echo");
        assert_eq!(log[0].reasoning, "{\"points\": [\"p\"]}");
    }

    #[tokio::test]
    async fn snapshot_is_truncated() {
        let store = Arc::new(ContentStore::in_memory());
        for i in 0..5 {
            let content = format!("echo {i} {}", "x".repeat(300));
            store
                .store(&content, Metadata::new(), "Other", DocumentType::Finding)
                .await
                .unwrap();
        }

        let agent = agent(store, vec!["{}"]);
        agent.execute("echo", &TaskContext::default()).await.unwrap();

        let log = agent.decision_log();
        assert_eq!(log[0].context.len(), SNAPSHOT_ENTRIES);
        assert!(log[0].context.iter().all(|c| c.chars().count() == SNAPSHOT_CHARS));
    }

    #[tokio::test]
    async fn system_message_names_the_role() {
        let provider = Arc::new(ScriptedProvider::new(vec!["{}"]));
        let model = ModelClient::new(provider.clone(), "m");
        let store = Arc::new(ContentStore::in_memory());
        let agent = SpecialistAgent::new(Echo, model, ContextAccessor::new(store, "Echo"));
        agent.execute("t", &TaskContext::default()).await.unwrap();

        let system = provider.systems()[0].clone().unwrap();
        assert!(system.contains("Echo agent"));
        assert!(system.contains("Repeats points"));
    }

    #[tokio::test]
    async fn model_failure_propagates() {
        let model = ModelClient::new(Arc::new(FailingProvider), "m");
        let store = Arc::new(ContentStore::in_memory());
        let agent = SpecialistAgent::new(Echo, model, ContextAccessor::new(store.clone(), "Echo"));

        let err = agent.execute("t", &TaskContext::default()).await.unwrap_err();
        assert!(matches!(err, Error::Provider(_)));
        assert_eq!(store.count().await.unwrap(), 0);
    }
}
