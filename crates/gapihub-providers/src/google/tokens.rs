//! On-disk OAuth token cache.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{ProviderError, ProviderResult};

/// Tokens are treated as expired this long before Google says they are.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// A persisted OAuth token set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    /// Scopes granted at consent time.
    #[serde(default)]
    pub scopes: Vec<String>,
    pub last_refresh: DateTime<Utc>,
}

fn expiry_from(expires_in_secs: Option<i64>) -> Option<DateTime<Utc>> {
    expires_in_secs
        .map(|secs| Utc::now() + Duration::seconds(secs) - Duration::seconds(EXPIRY_MARGIN_SECS))
}

impl TokenInfo {
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in_secs: Option<i64>,
        scopes: Vec<String>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
            expires_at: expiry_from(expires_in_secs),
            scopes,
            last_refresh: Utc::now(),
        }
    }

    /// Tokens without an expiry never expire.
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Utc::now() >= at)
    }

    pub fn has_scopes(&self, required: &[String]) -> bool {
        required.iter().all(|scope| self.scopes.contains(scope))
    }

    /// Applies a refresh response. Google may rotate the refresh token.
    pub fn refreshed(
        &self,
        access_token: impl Into<String>,
        expires_in_secs: Option<i64>,
        refresh_token: Option<String>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.or_else(|| self.refresh_token.clone()),
            expires_at: expiry_from(expires_in_secs),
            scopes: self.scopes.clone(),
            last_refresh: Utc::now(),
        }
    }
}

/// File-backed token cache with an in-memory copy.
#[derive(Debug)]
pub struct TokenStorage {
    path: PathBuf,
    tokens: RwLock<Option<TokenInfo>>,
}

impl TokenStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            tokens: RwLock::new(None),
        }
    }

    /// Reads the token file into memory.
    ///
    /// Returns `Ok(false)` when there is no token file yet.
    pub fn load(&self) -> ProviderResult<bool> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no token file");
            return Ok(false);
        }

        let content = fs::read_to_string(&self.path).map_err(|e| {
            ProviderError::configuration(format!(
                "failed to read token file {}: {e}",
                self.path.display()
            ))
            .with_source(e)
        })?;

        let tokens: TokenInfo = serde_json::from_str(&content).map_err(|e| {
            ProviderError::configuration(format!(
                "failed to parse token file {}: {e}",
                self.path.display()
            ))
        })?;

        info!(path = %self.path.display(), "loaded cached token");
        *self.tokens.write().unwrap_or_else(PoisonError::into_inner) = Some(tokens);
        Ok(true)
    }

    /// Replaces the cached tokens and writes them to disk.
    pub fn store(&self, tokens: TokenInfo) -> ProviderResult<()> {
        write_token_file(&self.path, &tokens)?;
        *self.tokens.write().unwrap_or_else(PoisonError::into_inner) = Some(tokens);
        Ok(())
    }

    pub fn get(&self) -> Option<TokenInfo> {
        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Forgets the cached tokens and removes the token file.
    pub fn clear(&self) -> ProviderResult<()> {
        *self.tokens.write().unwrap_or_else(PoisonError::into_inner) = None;
        if self.path.exists() {
            fs::remove_file(&self.path).map_err(|e| {
                ProviderError::configuration(format!("failed to remove token file: {e}"))
                    .with_source(e)
            })?;
            info!(path = %self.path.display(), "removed cached token");
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True when no tokens are cached or they lack one of `required`.
    pub fn needs_consent(&self, required: &[String]) -> bool {
        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_none_or(|t| !t.has_scopes(required))
    }
}

fn write_token_file(path: &Path, tokens: &TokenInfo) -> ProviderResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            ProviderError::configuration(format!("failed to create token directory: {e}"))
                .with_source(e)
        })?;
    }

    let content = serde_json::to_string_pretty(tokens)
        .map_err(|e| ProviderError::internal(format!("failed to serialize token: {e}")))?;

    // Write then rename so a crash never leaves a half-written token file.
    let temp_path = path.with_extension("json.tmp");
    let write_error = |e: std::io::Error| {
        ProviderError::configuration(format!("failed to write token file: {e}")).with_source(e)
    };
    let mut file = owner_only_file(&temp_path).map_err(write_error)?;
    file.write_all(content.as_bytes()).map_err(write_error)?;
    file.sync_all().map_err(write_error)?;
    drop(file);

    fs::rename(&temp_path, path).map_err(|e| {
        ProviderError::configuration(format!("failed to replace token file: {e}")).with_source(e)
    })?;

    debug!(path = %path.display(), "saved token");
    Ok(())
}

/// Opens `path` for writing, readable by the owner only.
///
/// A stale temp file keeps its old mode on open, so the mode is also set
/// explicitly.
#[cfg(unix)]
fn owner_only_file(path: &Path) -> std::io::Result<fs::File> {
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let file = fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    if let Err(e) = file.set_permissions(fs::Permissions::from_mode(0o600)) {
        warn!(path = %path.display(), error = %e, "failed to restrict token file permissions");
    }
    Ok(file)
}

#[cfg(not(unix))]
fn owner_only_file(path: &Path) -> std::io::Result<fs::File> {
    fs::File::create(path)
}
