//! ZDAO - token-weighted governance with a timelocked executor.
//!
//! Every invocation opens the governor stored in the data directory,
//! applies one command and exits.

mod commands;
mod config;
mod output;
mod telemetry;

use clap::Parser;
use colored::Colorize;

use crate::config::NodeConfig;

fn main() {
    let cli = commands::Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("{}", format!("Error: {:#}", e).red());
        std::process::exit(1);
    }
}

fn run(cli: commands::Cli) -> anyhow::Result<()> {
    // `init --write-config` creates the file, so a missing one is not an error there
    let creating = matches!(cli.command, commands::Commands::Init { write_config: true });
    let mut config = match &cli.config {
        Some(path) if creating && !path.exists() => NodeConfig::default(),
        Some(path) => NodeConfig::from_file(path)?,
        None => NodeConfig::default(),
    };

    // Apply CLI overrides
    if let Some(data_dir) = &cli.data_dir {
        config.data_dir = data_dir.clone();
    }
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    if cli.json_logs {
        config.logging.json = true;
    }
    config.validate()?;

    telemetry::init_telemetry(&config.logging)?;
    tracing::debug!(data_dir = %config.data_dir.display(), "Configuration loaded");

    commands::execute(cli.command, &config, cli.config.as_ref())
}
