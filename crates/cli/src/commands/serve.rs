//! `agora serve`: start the HTTP API server.

use std::path::Path;

use super::load_config;

pub async fn run(config_path: Option<&Path>, port_override: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = load_config(config_path)?;

    if let Some(port) = port_override {
        config.gateway.port = port;
    }

    println!("Agora API");
    println!("   Listening: http://{}:{}", config.gateway.host, config.gateway.port);
    println!("   Model:     {} ({})", config.default_model, config.default_provider);
    println!("   Reports:   {}", config.research.reports_dir.display());

    agora_gateway::start(config).await?;

    Ok(())
}
