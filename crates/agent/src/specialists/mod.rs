//! The six research specialists.
//!
//! Each one is a small value type carrying its prompt template, output
//! schema and fallback; [`SpecialistAgent`](crate::SpecialistAgent) supplies
//! the lifecycle.

pub mod critic;
pub mod data_alchemist;
pub mod experimenter;
pub mod planner;
pub mod researcher;
pub mod reviewer;

pub use critic::{Critic, CriticOutput, Critique};
pub use data_alchemist::{Analysis, ColumnSummary, DataAlchemist, DataAlchemistOutput, DataSummary, ProcessedTable};
pub use experimenter::{
    ExperimentDesign, ExperimentResult, ExperimentSpec, Experimenter, ExperimenterOutput,
};
pub use planner::{Planner, PlannerOutput, ResearchPlan};
pub use researcher::{ResearchFindings, Researcher, ResearcherOutput, SearchPlan, Source};
pub use reviewer::{QualityMetrics, Review, Reviewer, ReviewerOutput};

use agora_core::memory::{Document, Metadata};
use serde::Serialize;
use serde_json::Value;

use crate::extract::truncate_chars;

/// `- item` lines, or `- (none)` for an empty list.
pub(crate) fn bullets(items: &[String]) -> String {
    if items.is_empty() {
        return "- (none)".to_string();
    }
    items
        .iter()
        .map(|item| format!("- {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Numbered context lines: `[n] (Agent) content…`.
pub(crate) fn context_lines(docs: &[&Document], max_chars: usize) -> String {
    if docs.is_empty() {
        return "No prior context available.".to_string();
    }
    docs.iter()
        .enumerate()
        .map(|(i, doc)| {
            format!(
                "[{}] ({}) {}",
                i + 1,
                doc.agent_name().unwrap_or("unknown"),
                truncate_chars(&doc.content, max_chars)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Finding metadata seeded with the task.
pub(crate) fn finding_metadata(task: &str) -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert("task".into(), Value::from(task));
    metadata
}

/// Store `value` under `key` as structured JSON.
pub(crate) fn put_json<T: Serialize>(metadata: &mut Metadata, key: &str, value: &T) {
    metadata.insert(
        key.to_string(),
        serde_json::to_value(value).unwrap_or(Value::Null),
    );
}
