//! ZooGent CLI: the main entry point.
//!
//! Commands:
//! - `ask`: Run one shopping request through the pipeline
//! - `chat`: Interactive mode with follow-up detection
//! - `onboard`: Write a default config file
//! - `doctor`: Diagnose configuration and connectivity

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "zoogent",
    about = "ZooGent — conversational shopping assistant",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask for product recommendations once
    Ask {
        /// What you are looking for
        text: String,

        /// The previous request, for follow-up refinement
        #[arg(short, long)]
        prior: Option<String>,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Interactive shopping chat
    Chat,

    /// Initialize configuration
    Onboard,

    /// Diagnose configuration and connectivity
    Doctor,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Ask { text, prior, json } => commands::ask::run(text, prior, json).await?,
        Commands::Chat => commands::chat::run().await?,
        Commands::Onboard => commands::onboard::run().await?,
        Commands::Doctor => commands::doctor::run().await?,
    }

    Ok(())
}
