//! `agora memory`: read-only views over the shared content store.

use std::path::Path;
use std::sync::Arc;

use agora_config::AppConfig;
use agora_core::memory::{Document, MetadataFilter};
use agora_gateway::services::Services;
use agora_memory::ContentStore;
use tracing::warn;

use super::load_config;

const PREVIEW_CHARS: usize = 100;

/// Open the configured store. Without model credentials the store still
/// opens, in keyword mode.
fn open_store(config: &AppConfig) -> Arc<ContentStore> {
    match Services::from_config(config) {
        Ok(services) => services.store,
        Err(e) => {
            warn!(error = %e, "Model unavailable, searching by keyword");
            Arc::new(agora_memory::build_from_config(&config.memory, None))
        }
    }
}

fn print_document(index: usize, doc: &Document) {
    let preview: String = doc.content.chars().take(PREVIEW_CHARS).collect();
    let ellipsis = if doc.content.chars().count() > PREVIEW_CHARS { "..." } else { "" };
    let distance = doc
        .distance
        .map(|d| format!(" [distance: {d:.3}]"))
        .unwrap_or_default();
    println!(
        "  {index:>2}. {} / {} ({}){distance}",
        doc.agent_name().unwrap_or("unknown"),
        doc.document_type().map(|t| t.as_str()).unwrap_or("unknown"),
        doc.timestamp().unwrap_or("-"),
    );
    println!("      {}{ellipsis}", preview.replace('\n', " "));
}

pub async fn search(
    config_path: Option<&Path>,
    query: &str,
    limit: usize,
    agent: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path)?;
    let store = open_store(&config);
    let filter = agent.map(MetadataFilter::agent);

    println!("Searching memory for: \"{query}\"");
    println!();

    let results = store.search_similar(query, limit, filter.as_ref()).await?;
    if results.is_empty() {
        println!("   No matching documents.");
    }
    for (i, doc) in results.iter().enumerate() {
        print_document(i + 1, doc);
    }

    Ok(())
}

pub async fn list(config_path: Option<&Path>, limit: usize) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path)?;
    let store = open_store(&config);

    let documents = store.recent(limit, None).await?;
    if documents.is_empty() {
        println!("   Memory is empty.");
    }
    for (i, doc) in documents.iter().enumerate() {
        print_document(i + 1, doc);
    }

    Ok(())
}

pub async fn critiques(config_path: Option<&Path>, agent: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path)?;
    let store = open_store(&config);

    let critiques = store.get_critiques_for(agent).await?;
    println!("Critiques of {agent}: {}", critiques.len());
    for (i, doc) in critiques.iter().enumerate() {
        print_document(i + 1, doc);
    }

    Ok(())
}

pub async fn stats(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(config_path)?;
    let store = open_store(&config);
    let stats = store.stats().await?;

    println!("Memory Statistics");
    println!("=================");
    println!("  Backend:    {}", store.backend_name());
    println!("  Location:   {}", config.memory.collection_path().display());
    println!("  Embeddings: {}", store.embedder_name().unwrap_or("disabled"));
    println!("  Documents:  {} ({} embedded)", stats.total, stats.embedded);

    if !stats.by_agent.is_empty() {
        println!();
        println!("  By agent:");
        for (agent, count) in &stats.by_agent {
            println!("    {agent:<14} {count}");
        }
        println!("  By type:");
        for (doc_type, count) in &stats.by_type {
            println!("    {doc_type:<14} {count}");
        }
    }

    Ok(())
}
