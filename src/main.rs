use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use sequitur::config::SequiturConfig;

#[derive(Parser)]
#[command(name = "sequitur", version, about = "Causal event memory server")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the tool-protocol server (stdio, or SSE when a port is configured)
    Serve,
    /// Start the REST/JSON API server
    Api,
    /// Manage the embedding model
    Model {
        #[command(subcommand)]
        action: ModelAction,
    },
}

#[derive(Subcommand)]
enum ModelAction {
    /// Download the embedding model to ~/.sequitur/models/
    Download,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load config (for log level)
    let config = SequiturConfig::load()?;

    // Initialize tracing with the configured log level.
    // Log to stderr so stdout stays clean for tool-protocol JSON-RPC.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Serve => {
            sequitur::server::serve(config).await?;
        }
        Command::Api => {
            sequitur::api::run_api(config).await?;
        }
        Command::Model { action } => match action {
            ModelAction::Download => {
                sequitur::cli::model_download(&config.embedding).await?;
            }
        },
    }

    Ok(())
}
