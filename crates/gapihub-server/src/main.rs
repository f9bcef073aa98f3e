//! gapihub entry point.

use std::process::ExitCode;

use clap::Parser;
use gapihub_core::{TracingConfig, init_tracing};
use tracing::Level;

use gapihub_server::cli::{Cli, Command, ConfigAction};
use gapihub_server::commands;
use gapihub_server::config::AppConfig;
use gapihub_server::error::ServerResult;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> ServerResult<()> {
    let config = match cli.config {
        Some(ref path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };

    let mut tracing_config = match cli.command {
        Command::Serve { .. } => {
            TracingConfig::server().with_format(config.server.log_format()?)
        }
        _ => TracingConfig::cli(),
    };
    if cli.debug {
        tracing_config = tracing_config.with_level(Level::DEBUG);
    }
    init_tracing(tracing_config)?;

    match cli.command {
        Command::Serve { host, port } => commands::serve::run(&config, host, port).await,
        Command::Auth { force } => commands::auth::run(&config, force).await,
        Command::Config { action } => match action {
            ConfigAction::Path => commands::config::path(),
            ConfigAction::Dump => commands::config::dump(&config),
        },
    }
}
