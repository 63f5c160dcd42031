//! Research agents for Agora.
//!
//! Six specialists (planner, researcher, data processor, experimenter,
//! reviewer, critic) share one lifecycle, defined in [`contract`]: pull
//! context from the shared store, prompt the model once, extract a
//! structured payload or fall back to a fixed one, persist a finding and a
//! decision. [`ResearchPipeline`] runs them in a fixed order and renders the
//! Markdown report.

pub mod cancel;
pub mod contract;
pub mod extract;
pub mod llm;
pub mod pipeline;
pub mod report;
pub mod specialists;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use cancel::CancelFlag;
pub use contract::{
    Agent, AgentResult, DecisionLogEntry, Finding, Outcome, Retrieval, Specialist, SpecialistAgent,
    TaskContext,
};
pub use extract::{StructuredOutput, parse_structured};
pub use llm::ModelClient;
pub use pipeline::{ORCHESTRATOR, ProgressFn, ResearchPipeline, ResearchReport, ResearchRequest, WorkflowStep};
pub use report::{ResearchRun, render as render_report, report_filename};
pub use specialists::{Critic, DataAlchemist, Experimenter, Planner, Researcher, Reviewer};
