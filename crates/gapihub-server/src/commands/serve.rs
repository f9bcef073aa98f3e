//! `gapihub serve`: run the HTTP gateway until SIGINT/SIGTERM.

use std::sync::Arc;

use gapihub_providers::HttpTransport;
use gapihub_providers::google::CredentialProvider;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::api::{self, AppState};
use crate::config::{AppConfig, ServerSettings};
use crate::error::ServerResult;

/// Starts the gateway with `[server]` settings, CLI overrides applied.
///
/// Never opens a browser: without a usable token cache this fails and asks
/// for `gapihub auth`.
pub async fn run(config: &AppConfig, host: Option<String>, port: Option<u16>) -> ServerResult<()> {
    let settings = ServerSettings {
        host: host.unwrap_or_else(|| config.server.host.clone()),
        port: port.unwrap_or(config.server.port),
        ..config.server.clone()
    };

    let google = config.google.to_provider_config()?;
    let timeout = google.timeout;
    let user_agent = google.user_agent.clone();

    let credentials = Arc::new(CredentialProvider::new(google)?);
    let status = credentials.initialize(false).await?;
    info!(?status, "credentials loaded");

    let transport = HttpTransport::new(credentials, timeout, &user_agent)?;
    let app = api::router(AppState::new(Arc::new(transport)));

    let listener = TcpListener::bind(settings.bind_address()).await?;
    info!(address = %listener.local_addr()?, "listening");
    info!("date formats: YYYY-MM-DD or YYYY-MM-DDTHH:MM:SSZ");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let (mut sigterm, mut sigint) = match (
        signal(SignalKind::terminate()),
        signal(SignalKind::interrupt()),
    ) {
        (Ok(term), Ok(int)) => (term, int),
        (Err(e), _) | (_, Err(e)) => {
            warn!(error = %e, "failed to install signal handlers, falling back to Ctrl+C");
            ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
        _ = sigint.recv() => info!("received SIGINT, shutting down"),
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    ctrl_c().await;
}

async fn ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("received Ctrl+C, shutting down"),
        Err(e) => {
            warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    }
}
