//! Researcher: scrapes the pages it was handed and distils key findings.

use std::sync::Arc;

use agora_core::memory::Document;
use agora_core::scrape::{ScrapeResult, Scraper, Table};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::{bullets, context_lines, finding_metadata, put_json};
use crate::contract::{Finding, Retrieval, Specialist, TaskContext};
use crate::extract::{lenient, truncate_chars};

pub const NAME: &str = "Researcher";

/// Characters of each scraped page shown to the model.
const PAGE_PROMPT_CHARS: usize = 1500;
/// Characters of each scraped page kept in the payload.
const EXCERPT_CHARS: usize = 300;

/// What the model is asked for.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ResearchBrief {
    #[serde(deserialize_with = "lenient::list")]
    pub search_queries: Vec<String>,
    #[serde(deserialize_with = "lenient::list")]
    pub source_types: Vec<String>,
    #[serde(deserialize_with = "lenient::list")]
    pub key_terms: Vec<String>,
    #[serde(deserialize_with = "lenient::list")]
    pub research_questions: Vec<String>,
    #[serde(deserialize_with = "lenient::list")]
    pub key_findings: Vec<String>,
    #[serde(deserialize_with = "lenient::list")]
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchPlan {
    pub search_queries: Vec<String>,
    pub source_types: Vec<String>,
    pub key_terms: Vec<String>,
    pub research_questions: Vec<String>,
}

/// A successfully scraped page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub excerpt: String,
    #[serde(default)]
    pub tables: Vec<Table>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResearchFindings {
    pub plan: SearchPlan,
    pub sources_found: Vec<Source>,
    pub key_findings: Vec<String>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResearcherOutput {
    pub plan: SearchPlan,
    pub findings: ResearchFindings,
}

impl ResearcherOutput {
    /// Every table found across the scraped sources.
    pub fn tables(&self) -> Vec<Table> {
        self.findings
            .sources_found
            .iter()
            .flat_map(|s| s.tables.iter().cloned())
            .collect()
    }
}

#[derive(Clone, Default)]
pub struct Researcher {
    scraper: Option<Arc<dyn Scraper>>,
}

impl Researcher {
    pub fn new(scraper: Option<Arc<dyn Scraper>>) -> Self {
        Self { scraper }
    }
}

fn sources(gathered: &[ScrapeResult]) -> Vec<Source> {
    gathered
        .iter()
        .filter_map(ScrapeResult::page)
        .map(|page| Source {
            url: page.url.clone(),
            title: page.metadata.get("title").cloned(),
            excerpt: truncate_chars(&page.text, EXCERPT_CHARS).to_string(),
            tables: page.tables.clone(),
        })
        .collect()
}

#[async_trait]
impl Specialist for Researcher {
    type Parsed = ResearchBrief;
    type Output = ResearcherOutput;

    fn name(&self) -> &'static str {
        NAME
    }

    fn role(&self) -> &'static str {
        "Conducts web searches and gathers scientific information from various sources"
    }

    fn retrieval(&self, task: &str, _context: &TaskContext) -> Retrieval {
        Retrieval::Similar {
            query: task.to_string(),
            limit: 5,
        }
    }

    async fn gather(&self, _task: &str, context: &TaskContext) -> Vec<ScrapeResult> {
        let Some(scraper) = &self.scraper else {
            if !context.urls.is_empty() {
                debug!(urls = context.urls.len(), "No scraper configured, skipping sources");
            }
            return Vec::new();
        };

        let mut results = Vec::with_capacity(context.urls.len());
        for url in &context.urls {
            let result = scraper.scrape(url).await;
            if let ScrapeResult::Failed { url, error } = &result {
                warn!(url = %url, error = %error, "Source unavailable");
            }
            results.push(result);
        }
        results
    }

    fn prompt(
        &self,
        task: &str,
        context: &TaskContext,
        relevant: &[&Document],
        gathered: &[ScrapeResult],
    ) -> String {
        let plan = context
            .research_plan
            .as_ref()
            .map(|p| serde_json::to_string_pretty(p).unwrap_or_default())
            .unwrap_or_else(|| "No plan provided.".to_string());

        let pages: Vec<String> = gathered
            .iter()
            .filter_map(ScrapeResult::page)
            .map(|page| {
                format!(
                    "Source: {} ({})\n{}",
                    page.metadata.get("title").map(String::as_str).unwrap_or("untitled"),
                    page.url,
                    truncate_chars(&page.text, PAGE_PROMPT_CHARS)
                )
            })
            .collect();
        let pages = if pages.is_empty() {
            "No pages were retrieved.".to_string()
        } else {
            pages.join("\n\n")
        };

        format!(
            "You are a Research agent.\n\n\
            Task: {task}\n\n\
            Research plan:\n{plan}\n\n\
            Prior context:\n{}\n\n\
            Retrieved sources:\n{pages}\n\n\
            Plan the search and summarise what the sources establish. Respond with JSON \
            in a ```json block with these keys:\n\
            - search_queries: list of queries worth running\n\
            - source_types: list of source types to consult\n\
            - key_terms: list of key terms\n\
            - research_questions: list of questions the search addresses\n\
            - key_findings: list of concrete findings, citing sources where possible\n\
            - recommendations: list of next steps",
            context_lines(relevant, 300)
        )
    }

    fn fallback(&self, task: &str, _context: &TaskContext) -> ResearchBrief {
        ResearchBrief {
            search_queries: vec![task.to_string()],
            source_types: vec![
                "research papers".into(),
                "articles".into(),
                "data repositories".into(),
            ],
            key_terms: task.split_whitespace().map(String::from).collect(),
            research_questions: vec![task.to_string()],
            key_findings: Vec::new(),
            recommendations: vec![
                format!("Collect primary sources on {task}"),
                "Cross-check findings against recent literature".into(),
            ],
        }
    }

    fn build(
        &self,
        _task: &str,
        _context: &TaskContext,
        brief: ResearchBrief,
        gathered: &[ScrapeResult],
    ) -> ResearcherOutput {
        let plan = SearchPlan {
            search_queries: brief.search_queries,
            source_types: brief.source_types,
            key_terms: brief.key_terms,
            research_questions: brief.research_questions,
        };
        let sources_found = sources(gathered);

        let mut key_findings = brief.key_findings;
        if key_findings.is_empty() {
            key_findings = sources_found
                .iter()
                .filter(|s| !s.excerpt.is_empty())
                .map(|s| {
                    format!(
                        "{}: {}",
                        s.title.as_deref().unwrap_or(&s.url),
                        truncate_chars(&s.excerpt, 200)
                    )
                })
                .collect();
        }

        ResearcherOutput {
            findings: ResearchFindings {
                plan: plan.clone(),
                sources_found,
                key_findings,
                recommendations: brief.recommendations,
            },
            plan,
        }
    }

    fn synthesize(&self, task: &str, _context: &TaskContext, output: &ResearcherOutput) -> Finding {
        let findings = &output.findings;
        let sources: Vec<String> = findings
            .sources_found
            .iter()
            .map(|s| match &s.title {
                Some(title) => format!("{title} ({})", s.url),
                None => s.url.clone(),
            })
            .collect();

        let content = format!(
            "Research Summary for: {task}\n\n\
            Sources Consulted: {}\n{}\n\n\
            Key Findings:\n{}\n\n\
            Recommendations:\n{}",
            sources.len(),
            bullets(&sources),
            bullets(&findings.key_findings),
            bullets(&findings.recommendations),
        );

        let mut metadata = finding_metadata(task);
        put_json(&mut metadata, "plan", &output.plan);
        metadata.insert("findings_type".into(), Value::from("research_summary"));
        metadata.insert("sources_count".into(), Value::from(sources.len()));
        Finding {
            content,
            metadata,
            critique_of: None,
        }
    }

    fn decision(&self, task: &str, _: &TaskContext, output: &ResearcherOutput) -> String {
        format!(
            "Gathered {} sources and {} key findings for: {task}",
            output.findings.sources_found.len(),
            output.findings.key_findings.len()
        )
    }
}
