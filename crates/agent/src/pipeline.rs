//! The research pipeline.
//!
//! A fixed, strictly sequential run:
//!
//! ```text
//! domain → plan → research → process → experiment → review → critique ×N
//!        → activity summary → report
//! ```
//!
//! Agents never talk to each other directly. Each step hands the previous
//! step's typed output forward in a [`TaskContext`] and everything else flows
//! through the shared [`ContentStore`].

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use agora_config::ResearchConfig;
use agora_core::error::{Error, Result};
use agora_core::memory::{DocumentType, Metadata, MetadataFilter};
use agora_core::scrape::Scraper;
use agora_memory::{ContentStore, ContextAccessor};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::cancel::CancelFlag;
use crate::contract::{Agent, DecisionLogEntry, SpecialistAgent, TaskContext};
use crate::llm::ModelClient;
use crate::report::{self, ResearchRun};
use crate::specialists::{
    Critic, CriticOutput, DataAlchemist, Experimenter, Planner, Researcher, Reviewer,
};

/// Author of pipeline-level documents.
pub const ORCHESTRATOR: &str = "Orchestrator";

/// One entry of a run's workflow log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowStep {
    pub step: String,
    pub description: String,
    pub timestamp: DateTime<Utc>,
}

/// What to research. Without a domain the model picks one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResearchRequest {
    #[serde(default)]
    pub domain: Option<String>,
    /// Pages for the researcher to scrape.
    #[serde(default)]
    pub urls: Vec<String>,
}

/// A finished run.
#[derive(Debug, Clone, Serialize)]
pub struct ResearchReport {
    pub domain: String,
    pub markdown: String,
    /// Where the report was written, if it was.
    pub path: Option<PathBuf>,
    pub workflow: Vec<WorkflowStep>,
    pub activity: BTreeMap<String, usize>,
}

/// Observer notified as each workflow step is logged.
pub type ProgressFn = Arc<dyn Fn(&WorkflowStep) + Send + Sync>;

pub struct ResearchPipeline {
    store: Arc<ContentStore>,
    model: ModelClient,
    config: ResearchConfig,
    planner: SpecialistAgent<Planner>,
    researcher: SpecialistAgent<Researcher>,
    data_alchemist: SpecialistAgent<DataAlchemist>,
    experimenter: SpecialistAgent<Experimenter>,
    reviewer: SpecialistAgent<Reviewer>,
    critic: SpecialistAgent<Critic>,
    cancel: CancelFlag,
    workflow: Mutex<Vec<WorkflowStep>>,
    progress: Option<ProgressFn>,
    write_report: bool,
}

impl ResearchPipeline {
    pub fn new(
        store: Arc<ContentStore>,
        model: ModelClient,
        scraper: Option<Arc<dyn Scraper>>,
        config: ResearchConfig,
    ) -> Self {
        let accessor = |name: &str| ContextAccessor::new(store.clone(), name);
        Self {
            planner: SpecialistAgent::new(Planner, model.clone(), accessor("Planner")),
            researcher: SpecialistAgent::new(
                Researcher::new(scraper),
                model.clone(),
                accessor("Researcher"),
            ),
            data_alchemist: SpecialistAgent::new(DataAlchemist, model.clone(), accessor("DataAlchemist")),
            experimenter: SpecialistAgent::new(Experimenter, model.clone(), accessor("Experimenter")),
            reviewer: SpecialistAgent::new(Reviewer, model.clone(), accessor("Reviewer")),
            critic: SpecialistAgent::new(Critic, model.clone(), accessor("Critic")),
            store,
            model,
            config,
            cancel: CancelFlag::new(),
            workflow: Mutex::new(Vec::new()),
            progress: None,
            write_report: true,
        }
    }

    /// Share an externally owned cancellation flag.
    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Render the report without writing it to `reports_dir`.
    pub fn without_report_file(mut self) -> Self {
        self.write_report = false;
        self
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub fn workflow(&self) -> Vec<WorkflowStep> {
        self.workflow.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Every agent, for callers that only need the uniform capability.
    pub fn agents(&self) -> Vec<&dyn Agent> {
        let agents: [&dyn Agent; 6] = [
            &self.planner,
            &self.researcher,
            &self.data_alchemist,
            &self.experimenter,
            &self.reviewer,
            &self.critic,
        ];
        agents.to_vec()
    }

    fn log_step(&self, step: &str, description: impl Into<String>) {
        let description = description.into();
        info!(step, %description, "Workflow step");
        let entry = WorkflowStep {
            step: step.to_string(),
            description,
            timestamp: Utc::now(),
        };
        if let Some(progress) = &self.progress {
            progress(&entry);
        }
        self.workflow
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(entry);
    }

    /// Ask the model for a research topic; first non-empty line, unquoted.
    pub async fn identify_domain(&self) -> Result<String> {
        let prompt = "Suggest one specific, current scientific research topic that would \
            benefit from an autonomous literature and data investigation. \
            Reply with the topic only, on a single line.";
        let raw = self.model.generate(prompt, None).await?;
        raw.lines()
            .map(|line| {
                line.trim()
                    .trim_start_matches(['#', '-', '*'])
                    .trim()
                    .trim_matches(['"', '\'', '*', '`'])
                    .trim()
            })
            .find(|line| !line.is_empty())
            .map(String::from)
            .ok_or_else(|| Error::Internal("model returned an empty research domain".into()))
    }

    /// Configured critique targets, optionally narrowed to agents with findings.
    pub async fn critique_targets(&self) -> Result<Vec<String>> {
        if !self.config.adaptive_critiques {
            return Ok(self.config.critique_targets.clone());
        }
        let authors: BTreeSet<String> = self
            .store
            .get_by_type(DocumentType::Finding)
            .await?
            .iter()
            .filter_map(|doc| doc.agent_name().map(String::from))
            .collect();
        Ok(self
            .config
            .critique_targets
            .iter()
            .filter(|target| authors.contains(target.as_str()))
            .cloned()
            .collect())
    }

    pub async fn run(&self, request: ResearchRequest) -> Result<ResearchReport> {
        self.cancel.check("domain_selection")?;
        let domain = match request.domain.as_deref().map(str::trim) {
            Some(domain) if !domain.is_empty() => domain.to_string(),
            _ => self.identify_domain().await?,
        };
        let mut metadata = Metadata::new();
        metadata.insert("step".into(), Value::from("domain_selection"));
        self.store
            .store(
                &format!("Research Domain Selected: {domain}"),
                metadata,
                ORCHESTRATOR,
                DocumentType::WorkflowStep,
            )
            .await?;
        self.log_step("domain_selection", format!("Selected research domain: {domain}"));

        // Findings written by this run, handed to the reviewer.
        let mut run_findings: BTreeSet<String> = BTreeSet::new();

        self.cancel.check("planning")?;
        let planned = self
            .planner
            .run(
                &format!("Create a comprehensive research plan for: {domain}"),
                &TaskContext {
                    domain: Some(domain.clone()),
                    ..TaskContext::default()
                },
            )
            .await?;
        run_findings.insert(planned.finding_id);
        let plan = planned.output.plan;
        self.log_step(
            "planning",
            format!("Created plan with {} research questions", plan.research_questions.len()),
        );
        let plan_value = serde_json::to_value(&plan)?;

        self.cancel.check("research")?;
        let research_outcome = self
            .researcher
            .run(
                &format!("Gather information about: {domain}"),
                &TaskContext {
                    domain: Some(domain.clone()),
                    research_plan: Some(plan_value.clone()),
                    urls: request.urls.clone(),
                    ..TaskContext::default()
                },
            )
            .await?;
        run_findings.insert(research_outcome.finding_id);
        let research = research_outcome.output;
        self.log_step(
            "research",
            format!(
                "Consulted {} sources, recorded {} key findings",
                research.findings.sources_found.len(),
                research.findings.key_findings.len()
            ),
        );

        self.cancel.check("data_processing")?;
        let processing_outcome = self
            .data_alchemist
            .run(
                &format!("Process data related to: {domain}"),
                &TaskContext {
                    domain: Some(domain.clone()),
                    data: research.findings.key_findings.clone(),
                    tables: research.tables(),
                    ..TaskContext::default()
                },
            )
            .await?;
        run_findings.insert(processing_outcome.finding_id);
        let processing = processing_outcome.output;
        self.log_step(
            "data_processing",
            format!(
                "Processed {} data items and {} tables",
                processing.data_summary.items_processed, processing.data_summary.tables_processed
            ),
        );

        self.cancel.check("experimentation")?;
        let experiments_outcome = self
            .experimenter
            .run(
                &format!("Design and run experiments for: {domain}"),
                &TaskContext {
                    domain: Some(domain.clone()),
                    research_plan: Some(plan_value.clone()),
                    processed_data: Some(serde_json::to_value(&processing)?),
                    ..TaskContext::default()
                },
            )
            .await?;
        run_findings.insert(experiments_outcome.finding_id);
        let experiments = experiments_outcome.output;
        self.log_step(
            "experimentation",
            format!("Ran {} experiments", experiments.results.len()),
        );

        self.cancel.check("review")?;
        let findings: Vec<_> = self
            .store
            .get_by_type(DocumentType::Finding)
            .await?
            .into_iter()
            .filter(|doc| run_findings.contains(&doc.id))
            .collect();
        let review = self
            .reviewer
            .run(
                &format!("Review all research findings for: {domain}"),
                &TaskContext {
                    domain: Some(domain.clone()),
                    findings,
                    ..TaskContext::default()
                },
            )
            .await?
            .output;
        self.log_step(
            "review",
            format!("Quality rated '{}'", review.review.quality_score),
        );

        let work = json!({
            "plan": plan,
            "research": research.findings,
            "processing": processing,
            "experiments": experiments,
        });
        let mut critiques: Vec<CriticOutput> = Vec::new();
        for target in self.critique_targets().await? {
            self.cancel.check("critique")?;
            let critique = self
                .critic
                .run(
                    &format!("Critique the work of {target}"),
                    &TaskContext {
                        domain: Some(domain.clone()),
                        target_agent: Some(target.clone()),
                        work: Some(work.clone()),
                        ..TaskContext::default()
                    },
                )
                .await?
                .output;
            critiques.push(critique);
        }
        self.log_step("critique", format!("Collected {} critiques", critiques.len()));

        self.cancel.check("activity_summary")?;
        let decisions = self.decisions();
        let mut activity: BTreeMap<String, usize> = BTreeMap::new();
        for entry in &decisions {
            *activity.entry(entry.agent.clone()).or_default() += 1;
        }
        self.log_step(
            "activity_summary",
            format!("{} agents wrote {} findings", activity.len(), decisions.len()),
        );

        self.cancel.check("report")?;
        let mut listed = self
            .store
            .recent(
                self.config.report_findings,
                Some(&MetadataFilter::document_type(DocumentType::Finding)),
            )
            .await?;
        listed.reverse();
        self.log_step("report", "Generated final report");

        let run = ResearchRun {
            domain: domain.clone(),
            generated_at: Utc::now(),
            plan,
            research,
            processing,
            experiments,
            review,
            critiques,
            findings: listed,
            decisions: decisions
                .into_iter()
                .take(self.config.report_decisions)
                .collect(),
            activity: activity.clone(),
            workflow: self.workflow(),
        };
        let markdown = report::render(&run);
        let path = if self.write_report {
            Some(self.write(&domain, run.generated_at, &markdown).await?)
        } else {
            None
        };

        info!(domain = %domain, path = ?path, "Research run complete");
        Ok(ResearchReport {
            domain,
            markdown,
            path,
            workflow: self.workflow(),
            activity,
        })
    }

    /// Decisions of every agent in this pipeline, oldest first.
    pub fn decisions(&self) -> Vec<DecisionLogEntry> {
        let mut all: Vec<DecisionLogEntry> = self
            .agents()
            .into_iter()
            .flat_map(|agent| agent.decision_log())
            .collect();
        all.sort_by_key(|entry| entry.timestamp);
        all
    }

    async fn write(&self, domain: &str, at: DateTime<Utc>, markdown: &str) -> Result<PathBuf> {
        let dir = &self.config.reports_dir;
        let path = dir.join(report::report_filename(domain, at));
        let written = match tokio::fs::create_dir_all(dir).await {
            Ok(()) => tokio::fs::write(&path, markdown).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            warn!(path = %path.display(), error = %e, "Could not write report");
            return Err(Error::Internal(format!(
                "failed to write report {}: {e}",
                path.display()
            )));
        }
        Ok(path)
    }
}
