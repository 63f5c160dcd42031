//! Critic: writes feedback addressed to another agent.
//!
//! Besides its own finding the critic files the feedback as a critique
//! document targeting that agent, which is how the target later finds it.

use agora_core::memory::Document;
use agora_core::scrape::ScrapeResult;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{bullets, context_lines, finding_metadata, put_json};
use crate::contract::{Finding, Retrieval, Specialist, TaskContext};
use crate::extract::{lenient, truncate_chars};

pub const NAME: &str = "Critic";

/// Target used when the context names none.
pub const GENERAL_TARGET: &str = "general";

/// Characters of the reviewed work shown to the model.
const WORK_PROMPT_CHARS: usize = 4000;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Critique {
    #[serde(deserialize_with = "lenient::list")]
    pub strengths: Vec<String>,
    #[serde(deserialize_with = "lenient::list")]
    pub weaknesses: Vec<String>,
    #[serde(deserialize_with = "lenient::list")]
    pub gaps: Vec<String>,
    #[serde(deserialize_with = "lenient::list")]
    pub suggestions: Vec<String>,
    #[serde(deserialize_with = "lenient::string")]
    pub priority: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CriticOutput {
    pub target_agent: String,
    pub critique: Critique,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Critic;

fn target(context: &TaskContext) -> &str {
    context.target_agent.as_deref().unwrap_or(GENERAL_TARGET)
}

fn work_text(context: &TaskContext) -> String {
    context
        .work
        .as_ref()
        .map(|w| serde_json::to_string_pretty(w).unwrap_or_default())
        .unwrap_or_default()
}

impl Specialist for Critic {
    type Parsed = Critique;
    type Output = CriticOutput;

    fn name(&self) -> &'static str {
        NAME
    }

    fn role(&self) -> &'static str {
        "Provides critical feedback, identifies weaknesses, and suggests improvements"
    }

    fn retrieval(&self, _task: &str, _context: &TaskContext) -> Retrieval {
        Retrieval::RecentFindings { limit: 20 }
    }

    fn prompt(&self, task: &str, context: &TaskContext, relevant: &[&Document], _: &[ScrapeResult]) -> String {
        let target = target(context);
        let own: Vec<&Document> = relevant
            .iter()
            .copied()
            .filter(|doc| doc.agent_name() == Some(target))
            .take(5)
            .collect();
        let work = work_text(context);
        let work = if work.is_empty() {
            "No work submitted.".to_string()
        } else {
            truncate_chars(&work, WORK_PROMPT_CHARS).to_string()
        };

        format!(
            "You are a Critic agent.\n\n\
            Task: {task}\n\
            Agent under review: {target}\n\n\
            Work under review:\n{work}\n\n\
            Recent findings by {target}:\n{}\n\n\
            Give constructive, specific criticism. Respond with JSON in a ```json block \
            with these keys:\n\
            - strengths: list\n\
            - weaknesses: list\n\
            - gaps: list of missing perspectives or data\n\
            - suggestions: list of concrete improvements\n\
            - priority: the single most important next action",
            context_lines(&own, 300)
        )
    }

    fn fallback(&self, _task: &str, _context: &TaskContext) -> Critique {
        Critique {
            strengths: vec![
                "Good research approach".into(),
                "Comprehensive data gathering".into(),
            ],
            weaknesses: vec![
                "Could use more analysis".into(),
                "Some gaps in coverage".into(),
            ],
            gaps: vec![
                "Missing some key perspectives".into(),
                "Could use more data".into(),
            ],
            suggestions: vec![
                "Deepen the analysis".into(),
                "Add more supporting evidence".into(),
                "Clarify methodology".into(),
            ],
            priority: "Focus on completing missing analyses".into(),
        }
    }

    fn build(&self, _: &str, context: &TaskContext, critique: Critique, _: &[ScrapeResult]) -> CriticOutput {
        CriticOutput {
            target_agent: target(context).to_string(),
            critique,
        }
    }

    fn synthesize(&self, task: &str, _context: &TaskContext, output: &CriticOutput) -> Finding {
        let critique = &output.critique;
        let content = format!(
            "Critical Feedback for {}\n\n\
            Strengths:\n{}\n\n\
            Weaknesses:\n{}\n\n\
            Gaps:\n{}\n\n\
            Suggestions:\n{}\n\n\
            Priority: {}",
            output.target_agent,
            bullets(&critique.strengths),
            bullets(&critique.weaknesses),
            bullets(&critique.gaps),
            bullets(&critique.suggestions),
            critique.priority,
        );

        let mut metadata = finding_metadata(task);
        metadata.insert("target_agent".into(), Value::from(output.target_agent.as_str()));
        metadata.insert("critique_type".into(), Value::from("feedback"));
        put_json(&mut metadata, "critique_data", critique);
        Finding {
            content,
            metadata,
            critique_of: Some(output.target_agent.clone()),
        }
    }

    fn decision(&self, _task: &str, _: &TaskContext, output: &CriticOutput) -> String {
        format!("Provided critique for {}", output.target_agent)
    }

    fn context_snapshot(&self, context: &TaskContext, _relevant: &[&Document]) -> Vec<String> {
        let work = work_text(context);
        if work.is_empty() { Vec::new() } else { vec![work] }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{Agent, SpecialistAgent};
    use crate::llm::ModelClient;
    use crate::test_helpers::ScriptedProvider;
    use agora_core::memory::{DocumentType, Metadata};
    use agora_memory::{ContentStore, ContextAccessor};
    use std::sync::Arc;

    fn critic(store: Arc<ContentStore>, reply: &str) -> (SpecialistAgent<Critic>, Arc<ScriptedProvider>) {
        let provider = Arc::new(ScriptedProvider::new(vec![reply]));
        (
            SpecialistAgent::new(
                Critic,
                ModelClient::new(provider.clone(), "m"),
                ContextAccessor::new(store, NAME),
            ),
            provider,
        )
    }

    #[tokio::test]
    async fn critique_reaches_the_target() {
        let store = Arc::new(ContentStore::in_memory());
        store
            .store("Plan: survey reefs", Metadata::new(), "Planner", DocumentType::Finding)
            .await
            .unwrap();
        let (agent, provider) = critic(
            store.clone(),
            r#"{"strengths": ["Clear"], "weaknesses": ["Thin sourcing"], "suggestions": ["Cite more"], "priority": "Sources"}"#,
        );

        let context = TaskContext {
            target_agent: Some("Planner".into()),
            work: Some(serde_json::json!({"plan": {"research_questions": ["Why?"]}})),
            ..TaskContext::default()
        };
        let outcome = agent.run("Critique the work of Planner", &context).await.unwrap();
        assert_eq!(outcome.output.target_agent, "Planner");

        let prompt = &provider.prompts()[0];
        assert!(prompt.contains("(Planner) Plan: survey reefs"));
        assert!(prompt.contains("research_questions"));

        let critiques = store.get_critiques_for("Planner").await.unwrap();
        assert_eq!(critiques.len(), 1);
        assert!(critiques[0].content.starts_with("Critical Feedback for Planner"));
        assert!(critiques[0].content.contains("- Thin sourcing"));
        assert_eq!(critiques[0].agent_name(), Some("Critic"));
        assert!(store.get_critiques_for("Researcher").await.unwrap().is_empty());

        let finding = store
            .get_by_type(DocumentType::Finding)
            .await
            .unwrap()
            .into_iter()
            .find(|d| d.agent_name() == Some("Critic"))
            .unwrap();
        assert_eq!(finding.metadata["target_agent"], "Planner");
        assert_eq!(finding.metadata["critique_data"]["priority"], "Sources");
    }

    #[tokio::test]
    async fn defaults_to_general_target() {
        let store = Arc::new(ContentStore::in_memory());
        let (agent, _) = critic(store.clone(), "Overall decent work.");

        let result = agent.execute("Critique everything", &TaskContext::default()).await.unwrap();
        assert_eq!(result.payload["target_agent"], GENERAL_TARGET);
        assert_eq!(
            result.payload["critique"]["priority"],
            "Focus on completing missing analyses"
        );
        assert_eq!(store.get_critiques_for(GENERAL_TARGET).await.unwrap().len(), 1);
        assert_eq!(agent.decision_log()[0].decision, "Provided critique for general");
    }
}
