//! Supportline CLI: the main entry point.
//!
//! Commands:
//! - `serve`   Start the HTTP API server
//! - `chat`    One-shot or interactive chat against an organization's documents
//! - `onboard` Write the default config file
//! - `doctor`  Diagnose configuration

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "supportline",
    about = "Supportline: retrieval-grounded customer support chat",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Chat with the support assistant
    Chat {
        /// Organization whose documents ground the answers
        #[arg(long = "org")]
        organization_id: String,

        /// Session key (a fresh one is generated when omitted)
        #[arg(long = "session")]
        session_id: Option<String>,

        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,

        /// Plain-text documents to ingest for the organization before chatting
        #[arg(long = "doc")]
        documents: Vec<PathBuf>,
    },

    /// Write the default configuration file
    Onboard,

    /// Diagnose configuration and credentials
    Doctor,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    if cli.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }

    match cli.command {
        Commands::Serve { port } => commands::serve::run(port).await?,
        Commands::Chat {
            organization_id,
            session_id,
            message,
            documents,
        } => commands::chat::run(organization_id, session_id, message, documents).await?,
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Doctor => commands::doctor::run().await?,
    }

    Ok(())
}
