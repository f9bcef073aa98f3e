//! HTTP façade and command-line front end for gapihub.
//!
//! - [`api`] - axum router: `/` plus one `GET /api/*` route per fetcher
//! - [`config`] - `config.toml` loading and secret references
//! - [`error`] - [`ServerError`] for startup, [`ApiError`] for responses
//! - [`commands`] - `serve`, `auth` and `config` subcommands
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use gapihub_providers::HttpTransport;
//! use gapihub_providers::google::CredentialProvider;
//! use gapihub_server::{AppConfig, AppState, router};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load()?;
//!     let google = config.google.to_provider_config()?;
//!     let timeout = google.timeout;
//!     let credentials = Arc::new(CredentialProvider::new(google)?);
//!     credentials.initialize(false).await?;
//!
//!     let transport = HttpTransport::new(credentials, timeout, "gapihub")?;
//!     let app = router(AppState::new(Arc::new(transport)));
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:8000").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;

pub use api::{AppState, DateParams, router};
pub use cli::{Cli, Command, ConfigAction};
pub use config::{AppConfig, GoogleSettings, ServerSettings};
pub use error::{ApiError, ServerError, ServerResult};
