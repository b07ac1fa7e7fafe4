///
/// This module implements the CLI interface for coverage-sync: command parsing,
/// settings acquisition and wiring the concrete database source and Codacy
/// client into the core pipeline.
///
/// All aggregation, report building and failure policy live in
/// [`coverage-sync-core`]; this module is strictly glue.
///
/// [`coverage-sync-core`]: ../../coverage-sync-core/
use crate::database::PostgresSource;
use crate::load_config::{load_config, NoPrompt, Prompter, TerminalPrompter};
use crate::upload::CodacyClient;
use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use coverage_sync_core::synchronise::synchronise;
use std::path::PathBuf;

/// CLI for coverage-sync: replay stored coverage into Codacy.
#[derive(Parser)]
#[clap(
    name = "coverage-sync",
    version,
    about = "Publish stored per-commit coverage results to the Codacy coverage API"
)]
pub struct Cli {
    /// Omitted: run the synchronisation with default options.
    #[clap(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Read all stored coverage and publish one report per commit and language
    Sync(SyncArgs),
}

#[derive(Args, Debug, Default, Clone)]
pub struct SyncArgs {
    /// Optional YAML file with api_base_url, pause_secs and request_timeout_secs
    #[clap(long)]
    pub config: Option<PathBuf>,
    /// Fail instead of prompting for missing environment values
    #[clap(long)]
    pub no_prompt: bool,
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    // Emit a top-level 'trace_initialised' event at the very start
    tracing::info!("trace_initialised");

    let args = match cli.command {
        Some(Commands::Sync(args)) => args,
        None => {
            tracing::info!("No command given, running sync with defaults");
            SyncArgs::default()
        }
    };
    sync(args).await
}

async fn sync(args: SyncArgs) -> Result<()> {
    let prompter: Box<dyn Prompter> = if args.no_prompt {
        Box::new(NoPrompt)
    } else {
        Box::new(TerminalPrompter)
    };
    let settings = load_config(args.config.as_deref(), prompter.as_ref())?;
    let sync_config = settings.synchronise_config();
    sync_config.trace_loaded();

    let publisher = CodacyClient::new(&settings.api_base_url, settings.request_timeout)
        .map_err(|e| anyhow::anyhow!("Failed to construct Codacy client: {e}"))?;
    let source = PostgresSource::new(settings.database.clone());

    tracing::info!(command = "sync", "Starting synchronisation process");
    match synchronise(&sync_config, &source, &publisher).await {
        Ok(report) => {
            let summary = report.summary();
            tracing::info!(command = "sync", ?summary, "Synchronisation complete");
            println!("Synchronise complete.\nSummary:");
            println!("{:#?}", summary);
            Ok(())
        }
        Err(e) => {
            tracing::error!(command = "sync", error = %e, "Synchronisation failed");
            Err(anyhow::Error::new(e))
        }
    }
}
