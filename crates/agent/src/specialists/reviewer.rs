//! Reviewer: grades the accumulated findings.

use agora_core::memory::Document;
use agora_core::scrape::ScrapeResult;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{bullets, context_lines, finding_metadata, put_json};
use crate::contract::{Finding, Retrieval, Specialist, TaskContext};
use crate::extract::{lenient, truncate_chars};

pub const NAME: &str = "Reviewer";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Review {
    #[serde(deserialize_with = "lenient::string")]
    pub quality_score: String,
    #[serde(deserialize_with = "lenient::string")]
    pub completeness: String,
    #[serde(deserialize_with = "lenient::string")]
    pub accuracy: String,
    #[serde(deserialize_with = "lenient::string")]
    pub coherence: String,
    #[serde(deserialize_with = "lenient::list")]
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    pub findings_count: usize,
    pub reviewed_count: usize,
    pub quality_score: String,
    pub completeness: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewerOutput {
    pub review: Review,
    pub quality_metrics: QualityMetrics,
}

/// Reviews the findings in the store plus any handed over in the context.
#[derive(Debug, Clone, Copy, Default)]
pub struct Reviewer;

impl Specialist for Reviewer {
    type Parsed = Review;
    type Output = ReviewerOutput;

    fn name(&self) -> &'static str {
        NAME
    }

    fn role(&self) -> &'static str {
        "Reviews findings, ensures quality, and validates research outputs"
    }

    fn retrieval(&self, _task: &str, _context: &TaskContext) -> Retrieval {
        Retrieval::RecentFindings { limit: 50 }
    }

    fn prompt(&self, task: &str, context: &TaskContext, relevant: &[&Document], _: &[ScrapeResult]) -> String {
        let handed: Vec<&Document> = context.findings.iter().take(10).collect();
        let handed = if handed.is_empty() {
            String::new()
        } else {
            format!("\n\nFindings submitted for review:\n{}", context_lines(&handed, 300))
        };

        format!(
            "You are a Research Reviewer agent.\n\n\
            Task: {task}\n\n\
            Findings in shared memory ({} total):\n{}{handed}\n\n\
            Evaluate the research. Respond with JSON in a ```json block with these keys:\n\
            - quality_score: one of Excellent, Good, Fair, Poor\n\
            - completeness: assessment of coverage\n\
            - accuracy: assessment of correctness\n\
            - coherence: assessment of consistency across findings\n\
            - recommendations: list of improvements",
            relevant.len(),
            context_lines(&relevant[..relevant.len().min(10)], 300)
        )
    }

    fn fallback(&self, _task: &str, _context: &TaskContext) -> Review {
        Review {
            quality_score: "Good".into(),
            completeness: "Mostly complete".into(),
            accuracy: "Appears accurate".into(),
            coherence: "Findings are coherent".into(),
            recommendations: vec![
                "Continue research".into(),
                "Add more supporting evidence".into(),
                "Clarify some points".into(),
            ],
        }
    }

    fn build(&self, _: &str, context: &TaskContext, review: Review, _: &[ScrapeResult]) -> ReviewerOutput {
        ReviewerOutput {
            quality_metrics: QualityMetrics {
                findings_count: context.findings.len(),
                reviewed_count: context.findings.len().min(10),
                quality_score: review.quality_score.clone(),
                completeness: review.completeness.clone(),
            },
            review,
        }
    }

    fn synthesize(&self, task: &str, _context: &TaskContext, output: &ReviewerOutput) -> Finding {
        let review = &output.review;
        let content = format!(
            "Research Review Summary\n\
            Quality Score: {}\n\
            Completeness: {}\n\
            Accuracy: {}\n\
            Coherence: {}\n\
            Recommendations:\n{}",
            review.quality_score,
            review.completeness,
            review.accuracy,
            review.coherence,
            bullets(&review.recommendations),
        );

        let mut metadata = finding_metadata(task);
        metadata.insert("review_type".into(), Value::from("quality_review"));
        put_json(&mut metadata, "review_data", review);
        put_json(&mut metadata, "quality_metrics", &output.quality_metrics);
        Finding {
            content,
            metadata,
            critique_of: None,
        }
    }

    fn decision(&self, _task: &str, context: &TaskContext, _: &ReviewerOutput) -> String {
        format!("Reviewed {} findings", context.findings.len())
    }

    fn context_snapshot(&self, context: &TaskContext, relevant: &[&Document]) -> Vec<String> {
        context
            .findings
            .iter()
            .chain(relevant.iter().copied())
            .map(|doc| truncate_chars(&doc.content, 100).to_string())
            .collect()
    }
}
