//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// gapihub - Gmail, Chat, Calendar and Docs behind one REST API
#[derive(Debug, Parser)]
#[command(name = "gapihub")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "GAPIHUB_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP gateway
    Serve {
        /// Address to bind (overrides [server] host)
        #[arg(long, env = "API_HOST")]
        host: Option<String>,

        /// Port to listen on (overrides [server] port)
        #[arg(long, env = "API_PORT")]
        port: Option<u16>,
    },

    /// Authorize access to the Google account and store the tokens
    Auth {
        /// Run the consent flow even if valid tokens exist
        #[arg(long, short)]
        force: bool,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Show configuration file path
    Path,

    /// Dump the effective configuration
    Dump,
}
