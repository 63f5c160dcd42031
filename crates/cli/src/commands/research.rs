//! `agora research`: one pipeline run from the terminal.

use std::path::Path;
use std::sync::Arc;

use agora_agent::{CancelFlag, ResearchPipeline, ResearchRequest, WorkflowStep};
use agora_gateway::services::Services;
use tracing::warn;

use super::load_config;

pub async fn run(
    config_path: Option<&Path>,
    domain: Option<String>,
    urls: Vec<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path)?;
    let services = Services::from_config(&config)?;

    println!("Agora research session");
    println!("   Domain: {}", domain.as_deref().unwrap_or("(model will choose)"));
    println!("   Model:  {}", services.model.model());
    println!("   Store:  {} (embeddings: {})", services.store.backend_name(), services.store.embeddings_enabled());
    println!();

    // Ctrl-C stops the run at the next step boundary.
    let cancel = CancelFlag::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current step");
            on_signal.cancel();
        }
    });

    let pipeline = ResearchPipeline::new(
        services.store,
        services.model,
        services.scraper,
        config.research,
    )
    .with_cancel_flag(cancel)
    .with_progress(Arc::new(|step: &WorkflowStep| {
        println!("  [{}] {}", step.step, step.description);
    }));

    let report = pipeline.run(ResearchRequest { domain, urls }).await?;

    println!();
    println!("Research complete: {}", report.domain);
    for (agent, count) in &report.activity {
        println!("   {agent:<14} {count} findings");
    }
    match &report.path {
        Some(path) => println!("   Report: {}", path.display()),
        None => println!("{}", report.markdown),
    }

    Ok(())
}
