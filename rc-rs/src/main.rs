use anyhow::{Context, Result};
use clap::Parser;
use rc_core::ConfigFile;
use std::io::IsTerminal;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod ui;

use crate::cli::Cli;
use crate::ui::{BasicUi, Ui};

/// Environment variable holding the log filter (e.g. `RC_LOG=debug`).
const LOG_ENV: &str = "RC_LOG";

fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_tracing();

    let config_file = match resolve_config_file(&cli) {
        Ok(file) => file,
        Err(err) => return fail(&mut BasicUi::stdio(), &err),
    };
    let config = match config_file
        .load()
        .with_context(|| format!("failed to load config from {}", config_file.path().display()))
    {
        Ok(config) => config,
        Err(err) => return fail(&mut BasicUi::stdio(), &err),
    };
    debug!(config = ?config, path = %config_file.path().display(), "configuration loaded");

    let mut ui = ui::for_config(&config);
    match commands::run(cli.command, &config_file, config, ui.as_mut()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => fail(ui.as_mut(), &err),
    }
}

fn fail(ui: &mut dyn Ui, err: &anyhow::Error) -> ExitCode {
    ui.error(&format!("{err:#}"));
    ExitCode::FAILURE
}

fn resolve_config_file(cli: &Cli) -> Result<ConfigFile> {
    let home = dirs::home_dir().context("failed to get home directory")?;
    Ok(match &cli.config_path {
        Some(path) => ConfigFile::new(path, home),
        None => ConfigFile::in_home(home),
    })
}

fn setup_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(std::io::stderr().is_terminal())
                .with_target(true),
        )
        .with(filter)
        .init();
}
