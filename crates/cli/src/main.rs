//! Agora CLI, the main entry point.
//!
//! Commands:
//! - `research`: run the full research pipeline once and write a report
//! - `serve`: start the HTTP API
//! - `memory`: inspect the shared content store
//! - `config`: show or initialise configuration

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "agora",
    about = "Agora, a multi-agent autonomous research team",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file to use instead of ~/.agora/config.toml
    #[arg(short, long, global = true, env = "AGORA_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a research session and write the Markdown report
    Research {
        /// Research domain; the model picks one when omitted
        #[arg(short, long)]
        domain: Option<String>,

        /// Page for the researcher to scrape (repeatable)
        #[arg(short, long = "url")]
        urls: Vec<String>,
    },

    /// Start the HTTP API server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Inspect the shared content store
    Memory {
        #[command(subcommand)]
        action: MemoryAction,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum MemoryAction {
    /// Search documents by meaning (or keyword without embeddings)
    Search {
        query: String,
        #[arg(short, long, default_value_t = 5)]
        limit: usize,
        /// Only documents written by this agent
        #[arg(short, long)]
        agent: Option<String>,
    },
    /// Most recent documents, newest first
    List {
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },
    /// Critiques targeting an agent
    Critiques { agent: String },
    /// Document counts by agent and type
    Stats,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration as TOML
    Show,
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is fine.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Research { domain, urls } => {
            commands::research::run(config_path, domain, urls).await?
        }
        Commands::Serve { port } => commands::serve::run(config_path, port).await?,
        Commands::Memory { action } => match action {
            MemoryAction::Search {
                query,
                limit,
                agent,
            } => commands::memory::search(config_path, &query, limit, agent.as_deref()).await?,
            MemoryAction::List { limit } => commands::memory::list(config_path, limit).await?,
            MemoryAction::Critiques { agent } => {
                commands::memory::critiques(config_path, &agent).await?
            }
            MemoryAction::Stats => commands::memory::stats(config_path).await?,
        },
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config_cmd::show(config_path)?,
            ConfigAction::Init { force } => commands::config_cmd::init(config_path, force)?,
        },
    }

    Ok(())
}
