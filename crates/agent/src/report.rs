//! Markdown report for a completed research run.

use std::collections::BTreeMap;

use agora_core::memory::Document;
use chrono::{DateTime, Utc};

use crate::contract::DecisionLogEntry;
use crate::extract::truncate_chars;
use crate::pipeline::WorkflowStep;
use crate::specialists::{
    CriticOutput, DataAlchemistOutput, ExperimenterOutput, ResearchPlan, ResearcherOutput,
    ReviewerOutput,
};

/// Characters of each finding and each decision's reasoning shown.
const EXCERPT_CHARS: usize = 500;

/// Everything one run produced, ready to render.
#[derive(Debug, Clone)]
pub struct ResearchRun {
    pub domain: String,
    pub generated_at: DateTime<Utc>,
    pub plan: ResearchPlan,
    pub research: ResearcherOutput,
    pub processing: DataAlchemistOutput,
    pub experiments: ExperimenterOutput,
    pub review: ReviewerOutput,
    pub critiques: Vec<CriticOutput>,
    /// Findings to list, already limited.
    pub findings: Vec<Document>,
    /// Decisions to list, already limited.
    pub decisions: Vec<DecisionLogEntry>,
    /// Findings written per agent during the run.
    pub activity: BTreeMap<String, usize>,
    pub workflow: Vec<WorkflowStep>,
}

/// `research_report_<domain>_<YYYYmmdd_HHMMSS>.md`, with the domain made path-safe.
pub fn report_filename(domain: &str, at: DateTime<Utc>) -> String {
    let slug: String = domain
        .trim()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    format!("research_report_{slug}_{}.md", at.format("%Y%m%d_%H%M%S"))
}

fn list(out: &mut String, items: &[String]) {
    if items.is_empty() {
        out.push_str("_None recorded._\n");
    }
    for item in items {
        out.push_str(&format!("- {item}\n"));
    }
}

fn numbered(out: &mut String, items: &[String]) {
    if items.is_empty() {
        out.push_str("_None recorded._\n");
    }
    for (i, item) in items.iter().enumerate() {
        out.push_str(&format!("{}. {item}\n", i + 1));
    }
}

pub fn render(run: &ResearchRun) -> String {
    let mut out = String::new();
    let review = &run.review.review;
    let sources = &run.research.findings.sources_found;

    out.push_str("# Autonomous Research Report\n\n");
    out.push_str(&format!(
        "**Generated**: {}\n\n",
        run.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    out.push_str(&format!("**Research Domain**: {}\n\n", run.domain));

    out.push_str("## Executive Summary\n\n");
    out.push_str(&format!(
        "This report presents an autonomous multi-agent investigation into **{}**. \
        The agents formulated {} research questions, consulted {} sources, \
        processed {} tables and designed {} experiments. \
        The reviewer rated overall quality as **{}**.\n\n",
        run.domain,
        run.plan.research_questions.len(),
        sources.len(),
        run.processing.processed_tables.len(),
        run.experiments.results.len(),
        if review.quality_score.is_empty() { "unrated" } else { review.quality_score.as_str() },
    ));

    out.push_str("## Research Questions\n\n");
    numbered(&mut out, &run.plan.research_questions);

    out.push_str("\n## Hypotheses\n\n");
    numbered(&mut out, &run.plan.hypotheses);

    out.push_str("\n## Methodology\n\n");
    out.push_str("### Investigation Strategy\n\n");
    numbered(&mut out, &run.plan.investigation_strategy);
    out.push_str("\n### Data Requirements\n\n");
    list(&mut out, &run.plan.data_requirements);

    out.push_str("\n## Key Findings\n\n");
    if run.findings.is_empty() {
        out.push_str("_No findings recorded._\n");
    }
    for (i, doc) in run.findings.iter().enumerate() {
        let content = truncate_chars(&doc.content, EXCERPT_CHARS);
        let ellipsis = if content.len() < doc.content.len() { "..." } else { "" };
        out.push_str(&format!(
            "### Finding {}\n\n{content}{ellipsis}\n\n*Source: {}*\n\n",
            i + 1,
            doc.agent_name().unwrap_or("unknown")
        ));
    }

    out.push_str("\n## Sources\n\n");
    if sources.is_empty() {
        out.push_str("_No external sources were retrieved._\n");
    }
    for source in sources {
        match &source.title {
            Some(title) => out.push_str(&format!("- [{title}]({})\n", source.url)),
            None => out.push_str(&format!("- <{}>\n", source.url)),
        }
    }

    out.push_str("\n## Experimental Results\n\n");
    if run.experiments.results.is_empty() {
        out.push_str("_No experiments were run._\n");
    }
    for result in &run.experiments.results {
        out.push_str(&format!("### {}\n\n", result.experiment_name));
        if !result.methodology.is_empty() {
            out.push_str(&format!("**Methodology**: {}\n\n", result.methodology));
        }
        out.push_str(&format!("{}\n\n", result.results.summary));
        list(&mut out, &result.results.key_findings);
        out.push_str(&format!(
            "\n**Sample size**: {} (confidence level {})\n\n{}\n\n",
            result.results.statistics.sample_size,
            result.results.statistics.confidence_level,
            result.interpretation
        ));
    }

    out.push_str("## Quality Assessment\n\n");
    out.push_str(&format!("- **Quality Score**: {}\n", review.quality_score));
    out.push_str(&format!("- **Completeness**: {}\n", review.completeness));
    out.push_str(&format!("- **Accuracy**: {}\n", review.accuracy));
    out.push_str(&format!("- **Coherence**: {}\n\n", review.coherence));
    out.push_str("### Recommendations\n\n");
    list(&mut out, &review.recommendations);

    out.push_str("\n## Critical Feedback\n\n");
    if run.critiques.is_empty() {
        out.push_str("_No critiques were requested._\n");
    }
    for critique in &run.critiques {
        out.push_str(&format!("### {}\n\n**Strengths**:\n", critique.target_agent));
        list(&mut out, &critique.critique.strengths);
        out.push_str("\n**Suggestions**:\n");
        list(&mut out, &critique.critique.suggestions);
        if !critique.critique.priority.is_empty() {
            out.push_str(&format!("\n**Priority**: {}\n", critique.critique.priority));
        }
        out.push('\n');
    }

    out.push_str("## Agent Activity\n\n");
    out.push_str("| Agent | Findings |\n|-------|----------|\n");
    for (agent, count) in &run.activity {
        out.push_str(&format!("| {agent} | {count} |\n"));
    }

    out.push_str("\n## Agent Decision Logs\n\n");
    if run.decisions.is_empty() {
        out.push_str("_No decisions logged._\n");
    }
    for entry in &run.decisions {
        let reasoning = truncate_chars(&entry.reasoning, EXCERPT_CHARS);
        let ellipsis = if reasoning.len() < entry.reasoning.len() { "..." } else { "" };
        out.push_str(&format!(
            "### {} ({})\n\n**Decision**: {}\n\n**Reasoning**: {reasoning}{ellipsis}\n\n",
            entry.agent,
            entry.timestamp.format("%H:%M:%S"),
            entry.decision
        ));
    }

    out.push_str("## Confidence Assessment\n\n");
    out.push_str(&format!(
        "Overall confidence: **{}**, based on {} findings reviewed. Completeness was judged \
        \"{}\".\n\n",
        review.quality_score, run.review.quality_metrics.findings_count, review.completeness
    ));
    if !run.research.findings.recommendations.is_empty() {
        out.push_str("Open directions:\n\n");
        list(&mut out, &run.research.findings.recommendations);
        out.push('\n');
    }

    out.push_str("## Workflow Summary\n\n");
    for (i, step) in run.workflow.iter().enumerate() {
        out.push_str(&format!(
            "{}. **{}** ({}): {}\n",
            i + 1,
            step.step,
            step.timestamp.format("%H:%M:%S"),
            step.description
        ));
    }

    out
}
