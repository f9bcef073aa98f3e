//! `gapihub auth`: run the OAuth consent flow and store the tokens.

use gapihub_providers::ProviderErrorCode;
use gapihub_providers::google::{CredentialProvider, CredentialStatus};
use tracing::info;

use crate::config::AppConfig;
use crate::error::ServerResult;

/// Skips the browser flow when the token cache is already usable. With
/// `force`, the cached token is removed before consent is asked again.
pub async fn run(config: &AppConfig, force: bool) -> ServerResult<()> {
    let google = config.google.to_provider_config()?;
    let credentials = CredentialProvider::new(google)?;
    let token_path = credentials.config().token_path.clone();

    if force {
        // Drop the old token first so an abandoned consent flow cannot
        // leave it in use.
        credentials.forget()?;
    } else {
        match credentials.initialize(false).await {
            Ok(status) => {
                print_status(&status);
                println!("Tokens: {}", token_path.display());
                println!("Use --force to re-authenticate.");
                return Ok(());
            }
            Err(e) if e.code() == ProviderErrorCode::AuthenticationFailed => {}
            Err(e) => return Err(e.into()),
        }
    }

    println!("Starting Google authentication...");
    println!();
    println!("A browser window will open for you to authorize read-only access");
    println!("to Gmail, Chat, Calendar and Docs.");
    println!("If the browser doesn't open, copy the URL printed below.");
    println!();

    credentials.authenticate().await?;

    info!(path = %token_path.display(), "Google authentication successful");
    println!();
    println!("Authentication successful!");
    println!("Tokens saved to {}", token_path.display());
    println!();
    println!("Start the gateway with: gapihub serve");

    Ok(())
}

fn print_status(status: &CredentialStatus) {
    match status {
        CredentialStatus::Valid {
            expires_at: Some(at),
        } => println!("Already authenticated (access token valid until {at})."),
        CredentialStatus::Valid { expires_at: None } => println!("Already authenticated."),
        CredentialStatus::Expired { .. } => {
            println!("Already authenticated (access token will be refreshed on next use).")
        }
        CredentialStatus::Missing => println!("Not authenticated."),
    }
}
