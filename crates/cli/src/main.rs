//! Data Copilot CLI: the main entry point.
//!
//! Commands:
//! - `check`: Verify warehouse access and print table schemas
//! - `chat` : Interactive question answering over the dataset

use clap::{Parser, Subcommand};
use datacopilot_config::{AppConfig, CliOverrides};
use std::path::PathBuf;

mod commands;
mod logging;
mod ui;

#[derive(Parser)]
#[command(
    name = "datacopilot",
    about = "Data Copilot: ask questions about a BigQuery dataset",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log at info level and mirror logs to the console
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log at debug level, including intermediate step previews
    #[arg(long, global = true)]
    debug: bool,

    /// Settings file
    #[arg(long, global = true, env = "DATACOPILOT_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify connectivity and print table schemas
    Check {
        /// Billing project
        #[arg(long)]
        project: Option<String>,

        /// Dataset as `project.dataset`
        #[arg(long)]
        dataset: Option<String>,

        /// Comma-separated tables to describe
        #[arg(long, value_delimiter = ',', default_value = "orders,order_items,products,users")]
        tables: Vec<String>,
    },

    /// Start an interactive session
    Chat {
        /// Billing project
        #[arg(long)]
        project: Option<String>,

        /// Dataset as `project.dataset`
        #[arg(long)]
        dataset: Option<String>,

        /// LLM model identifier
        #[arg(long)]
        model: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Missing .env is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let (project, dataset, model) = match &cli.command {
        Commands::Check { project, dataset, .. } => (project.clone(), dataset.clone(), None),
        Commands::Chat {
            project,
            dataset,
            model,
        } => (project.clone(), dataset.clone(), model.clone()),
    };
    let overrides = CliOverrides {
        project,
        dataset,
        model,
        verbose: cli.verbose,
        debug: cli.debug,
    };

    let config = AppConfig::load(cli.config.as_deref())
        .and_then(|c| c.merge_cli(&overrides))
        .map_err(|e| format!("Failed to load settings: {e}"))?;

    logging::init(&config.logging, cli.verbose || cli.debug)?;
    tracing::debug!(?config, "Settings resolved");

    match cli.command {
        Commands::Check { tables, .. } => {
            let ok = commands::check::run(&config, &tables).await?;
            if !ok {
                std::process::exit(1);
            }
        }
        Commands::Chat { .. } => commands::chat::run(&config).await?,
    }

    Ok(())
}
