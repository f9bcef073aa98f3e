//! Google OAuth for an installed application.
//!
//! The user supplies their own OAuth client (a Cloud Console
//! `credentials.json`). `gapihub auth` runs the PKCE loopback flow once and
//! caches the token; the server then loads it with
//! [`CredentialProvider::initialize`] and refreshes it as it expires.
//!
//! ```ignore
//! use gapihub_providers::google::{CredentialProvider, GoogleConfig, OAuthCredentials};
//!
//! let credentials = OAuthCredentials::from_file("credentials.json")?;
//! let provider = CredentialProvider::new(GoogleConfig::new(credentials))?;
//! provider.initialize(true).await?;
//! let token = provider.access_token().await?;
//! ```

mod config;
mod credentials;
mod oauth;
mod tokens;

pub use config::{DEFAULT_SCOPES, GoogleConfig, OAuthCredentials};
pub use credentials::{CredentialProvider, CredentialStatus};
pub use oauth::{OAuthClient, PkceFlow, RefreshedToken};
pub use tokens::{TokenInfo, TokenStorage};
