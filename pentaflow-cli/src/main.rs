//! Pentaflow CLI -- run scan sessions and inspect stored results.

mod cli;
mod commands;
mod error;
mod logging;
mod output;
mod store;

use std::process::ExitCode;

use clap::Parser;

use pentaflow_core::config::PentaflowConfig;

use crate::cli::{Cli, Commands};
use crate::error::CliError;
use crate::output::OutputWriter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            let code = u8::try_from(e.exit_code()).unwrap_or(1);
            ExitCode::from(code)
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let writer = OutputWriter::new(cli.output);

    // `config` reports load errors itself, so a broken file only falls back for logging here
    let loaded = PentaflowConfig::load_or_default(&cli.config).await;
    let general = loaded
        .as_ref()
        .map(|c| c.general.clone())
        .unwrap_or_default();
    logging::init_tracing(&general, cli.log_level.as_deref())
        .map_err(|e| CliError::Config(e.to_string()))?;
    tracing::debug!(path = %cli.config.display(), "starting pentaflow");

    match cli.command {
        Commands::Config(args) => commands::config::execute(args, &cli.config, &writer).await,
        Commands::Scan(args) => commands::scan::execute(args, loaded?, &writer).await,
        Commands::Findings(args) => commands::findings::execute(args, &loaded?, &writer).await,
        Commands::Status(args) => commands::status::execute(args, &loaded?, &writer).await,
    }
}
