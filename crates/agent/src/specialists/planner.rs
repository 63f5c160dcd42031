//! Planner: turns a topic into research questions, hypotheses and a strategy.

use agora_core::memory::Document;
use agora_core::scrape::ScrapeResult;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{bullets, context_lines, finding_metadata, put_json};
use crate::contract::{Finding, Retrieval, Specialist, TaskContext};
use crate::extract::lenient;

pub const NAME: &str = "Planner";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchPlan {
    #[serde(deserialize_with = "lenient::list")]
    pub research_questions: Vec<String>,
    #[serde(deserialize_with = "lenient::list")]
    pub hypotheses: Vec<String>,
    #[serde(deserialize_with = "lenient::list")]
    pub investigation_strategy: Vec<String>,
    #[serde(deserialize_with = "lenient::list")]
    pub data_requirements: Vec<String>,
    #[serde(deserialize_with = "lenient::list")]
    pub success_criteria: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlannerOutput {
    pub plan: ResearchPlan,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Planner;

impl Specialist for Planner {
    type Parsed = ResearchPlan;
    type Output = PlannerOutput;

    fn name(&self) -> &'static str {
        NAME
    }

    fn role(&self) -> &'static str {
        "Generates research questions, hypotheses, and investigation strategy"
    }

    fn retrieval(&self, task: &str, _context: &TaskContext) -> Retrieval {
        Retrieval::Similar {
            query: task.to_string(),
            limit: 10,
        }
    }

    // Only the researcher's material informs a plan.
    fn relevant<'a>(&self, retrieved: &'a [Document]) -> Vec<&'a Document> {
        retrieved
            .iter()
            .filter(|doc| doc.agent_name() == Some(super::researcher::NAME))
            .collect()
    }

    fn prompt(&self, task: &str, context: &TaskContext, relevant: &[&Document], _: &[ScrapeResult]) -> String {
        let domain = context.domain.as_deref().unwrap_or(task);
        format!(
            "You are a Research Planner agent.\n\n\
            Task: {task}\n\
            Research domain: {domain}\n\n\
            Relevant findings so far:\n{}\n\n\
            Create a research plan. Respond with JSON in a ```json block with these keys:\n\
            - research_questions: list of 3-5 specific, answerable questions\n\
            - hypotheses: list of 2-3 testable hypotheses\n\
            - investigation_strategy: ordered list of steps\n\
            - data_requirements: list of data or sources needed\n\
            - success_criteria: list of criteria for a complete investigation",
            context_lines(&relevant[..relevant.len().min(5)], 300)
        )
    }

    fn fallback(&self, task: &str, _context: &TaskContext) -> ResearchPlan {
        ResearchPlan {
            research_questions: vec![
                format!("What are the key aspects of {task}?"),
                format!("What are recent developments in {task}?"),
                format!("What are the main challenges in {task}?"),
            ],
            hypotheses: vec![
                format!("{task} has significant recent developments"),
                format!("{task} involves multiple interconnected factors"),
            ],
            investigation_strategy: vec![
                "Gather background information".into(),
                "Identify key sources".into(),
                "Analyze findings".into(),
                "Synthesize results".into(),
            ],
            data_requirements: vec![
                "Research papers and articles".into(),
                "Data tables and statistics".into(),
                "Expert opinions and analyses".into(),
            ],
            success_criteria: vec![
                "Comprehensive understanding of the topic".into(),
                "Clear answers to research questions".into(),
                "Well-documented findings".into(),
            ],
        }
    }

    fn build(&self, _: &str, _: &TaskContext, plan: ResearchPlan, _: &[ScrapeResult]) -> PlannerOutput {
        PlannerOutput { plan }
    }

    fn synthesize(&self, task: &str, _context: &TaskContext, output: &PlannerOutput) -> Finding {
        let plan = &output.plan;
        let content = format!(
            "Research Plan for: {task}\n\n\
            Research Questions:\n{}\n\n\
            Hypotheses:\n{}\n\n\
            Investigation Strategy:\n{}",
            bullets(&plan.research_questions),
            bullets(&plan.hypotheses),
            bullets(&plan.investigation_strategy),
        );
        let mut metadata = finding_metadata(task);
        put_json(&mut metadata, "plan_data", plan);
        metadata.insert("plan_type".into(), Value::from("research_plan"));
        Finding {
            content,
            metadata,
            critique_of: None,
        }
    }

    fn decision(&self, task: &str, _: &TaskContext, _: &PlannerOutput) -> String {
        format!("Created research plan for: {task}")
    }
}
