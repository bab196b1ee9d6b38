use std::process::ExitCode;

use anyhow::{anyhow, Context};
use clap::Parser;
use estimo_cli::Cli;
use estimo_core::config::{AppConfig, LogFormat};
use tracing::Level;

fn init_logging(config: &AppConfig) -> anyhow::Result<()> {
    let log_level = config
        .logging
        .level
        .parse::<Level>()
        .with_context(|| format!("invalid log level `{}`", config.logging.level))?;
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    let installed = match config.logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|error| anyhow!(error).context("failed to install tracing subscriber"))
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Commands report config errors themselves; logging just stays off.
    if let Ok(config) = AppConfig::load(cli.load_options()) {
        if let Err(error) = init_logging(&config) {
            eprintln!("logging disabled: {error:#}");
        }
    }

    estimo_cli::run(cli)
}
