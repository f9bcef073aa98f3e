//! Access-token lifecycle shared by every API call.

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{ProviderError, ProviderResult};

use super::config::GoogleConfig;
use super::oauth::OAuthClient;
use super::tokens::TokenStorage;

/// What the token cache currently holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialStatus {
    /// No token, or a token missing one of the configured scopes.
    Missing,
    Valid { expires_at: Option<DateTime<Utc>> },
    Expired { refreshable: bool },
}

impl CredentialStatus {
    /// True when API calls can proceed without user interaction.
    pub fn is_usable(&self) -> bool {
        matches!(
            self,
            Self::Valid { .. } | Self::Expired { refreshable: true }
        )
    }
}

/// Loads, acquires, refreshes and persists the OAuth token.
///
/// Construct once, call [`initialize`](Self::initialize) at startup, then
/// share behind an `Arc`. [`access_token`](Self::access_token) refreshes
/// transparently and writes every new token back to disk.
pub struct CredentialProvider {
    config: GoogleConfig,
    storage: TokenStorage,
    oauth: OAuthClient,
    refresh_lock: Mutex<()>,
}

fn not_authenticated() -> ProviderError {
    ProviderError::authentication("not authenticated; run `gapihub auth`").with_provider("oauth")
}

impl CredentialProvider {
    /// Validates the configuration. Does no I/O.
    pub fn new(config: GoogleConfig) -> ProviderResult<Self> {
        config.validate().map_err(ProviderError::configuration)?;

        let storage = TokenStorage::new(&config.token_path);
        let oauth = OAuthClient::new(config.credentials.clone(), config.timeout)?;

        Ok(Self {
            config,
            storage,
            oauth,
            refresh_lock: Mutex::new(()),
        })
    }

    /// Loads the cached token, running the consent flow when `interactive`
    /// and no usable token exists.
    ///
    /// # Errors
    ///
    /// Non-interactive callers get `AuthenticationFailed` when consent is needed.
    pub async fn initialize(&self, interactive: bool) -> ProviderResult<CredentialStatus> {
        self.storage.load()?;

        let status = self.status();
        if status.is_usable() {
            debug!(?status, "using cached token");
            return Ok(status);
        }

        if !interactive {
            return Err(not_authenticated());
        }

        self.authenticate().await?;
        Ok(self.status())
    }

    /// Runs the consent flow unconditionally and persists the result.
    pub async fn authenticate(&self) -> ProviderResult<()> {
        info!(scopes = self.config.scopes.len(), "starting Google consent flow");
        let tokens = self
            .oauth
            .authorize(
                &self.config.scopes,
                self.config.loopback_port_range,
                self.config.open_browser,
            )
            .await
            .map_err(|e| e.with_provider("oauth"))?;
        self.storage.store(tokens)?;
        info!(path = %self.storage.path().display(), "stored Google token");
        Ok(())
    }

    /// A bearer token valid for at least another minute.
    pub async fn access_token(&self) -> ProviderResult<String> {
        let tokens = self.storage.get().ok_or_else(not_authenticated)?;
        if !tokens.is_expired() {
            return Ok(tokens.access_token);
        }

        let _guard = self.refresh_lock.lock().await;

        // Another request may have refreshed while we waited.
        let tokens = self.storage.get().ok_or_else(not_authenticated)?;
        if !tokens.is_expired() {
            return Ok(tokens.access_token);
        }

        let refresh_token = tokens.refresh_token.as_deref().ok_or_else(|| {
            ProviderError::authentication(
                "access token expired and no refresh token is stored; run `gapihub auth`",
            )
            .with_provider("oauth")
        })?;

        debug!("refreshing expired access token");
        let refreshed = self
            .oauth
            .refresh_token(refresh_token)
            .await
            .map_err(|e| e.with_provider("oauth"))?;

        let updated = tokens.refreshed(
            refreshed.access_token,
            refreshed.expires_in,
            refreshed.refresh_token,
        );
        let access_token = updated.access_token.clone();
        self.storage.store(updated)?;
        Ok(access_token)
    }

    pub fn status(&self) -> CredentialStatus {
        if self.storage.needs_consent(&self.config.scopes) {
            return CredentialStatus::Missing;
        }
        match self.storage.get() {
            None => CredentialStatus::Missing,
            Some(tokens) if tokens.is_expired() => CredentialStatus::Expired {
                refreshable: tokens.refresh_token.is_some(),
            },
            Some(tokens) => CredentialStatus::Valid {
                expires_at: tokens.expires_at,
            },
        }
    }

    /// Drops the cached token so the next `initialize` asks for consent.
    pub fn forget(&self) -> ProviderResult<()> {
        self.storage.clear()
    }

    pub fn config(&self) -> &GoogleConfig {
        &self.config
    }
}

impl std::fmt::Debug for CredentialProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialProvider")
            .field("token_path", &self.storage.path())
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}
