//! Server configuration.
//!
//! Everything lives in one `config.toml`, by default at
//! `~/.config/gapihub/config.toml`. A missing file means all defaults.
//!
//! ```toml
//! [server]
//! host = "127.0.0.1"
//! port = 8000
//!
//! [google]
//! credentials_file = "credentials.json"
//! # or inline, optionally as a reference:
//! # client_id = "env::GOOGLE_CLIENT_ID"
//! # client_secret = "pass::google/gapihub"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use gapihub_core::TracingOutputFormat;
use gapihub_providers::google::{DEFAULT_SCOPES, GoogleConfig, OAuthCredentials};
use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

/// Top-level `config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerSettings,
    pub google: GoogleSettings,
}

/// `[server]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Address the HTTP listener binds to.
    pub host: String,

    pub port: u16,

    /// `pretty`, `compact` or `json`.
    pub log_format: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            log_format: "compact".to_string(),
        }
    }
}

impl ServerSettings {
    /// `host:port` for the listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn log_format(&self) -> ServerResult<TracingOutputFormat> {
        self.log_format.parse().map_err(ServerError::config)
    }
}

/// `[google]` section.
///
/// `client_id` and `client_secret` accept `env::VAR` and `pass::path`
/// references. When neither is set, `credentials_file` is read instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleSettings {
    /// Client-secret JSON downloaded from the Cloud Console.
    pub credentials_file: PathBuf,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,

    /// Token cache location; defaults to the data directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_path: Option<PathBuf>,

    pub scopes: Vec<String>,

    pub timeout_secs: u64,

    /// Inclusive port range tried for the OAuth loopback redirect.
    pub loopback_port_range: (u16, u16),

    pub open_browser: bool,
}

impl Default for GoogleSettings {
    fn default() -> Self {
        Self {
            credentials_file: PathBuf::from("credentials.json"),
            client_id: None,
            client_secret: None,
            token_path: None,
            scopes: DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
            timeout_secs: GoogleConfig::DEFAULT_TIMEOUT_SECS,
            loopback_port_range: (8080, 8090),
            open_browser: true,
        }
    }
}

impl GoogleSettings {
    /// Builds the provider configuration, resolving credentials first.
    pub fn to_provider_config(&self) -> ServerResult<GoogleConfig> {
        let mut config = GoogleConfig::new(self.resolve_credentials()?)
            .with_scopes(self.scopes.clone())
            .with_timeout(Duration::from_secs(self.timeout_secs))
            .with_loopback_port_range(self.loopback_port_range.0, self.loopback_port_range.1)
            .with_open_browser(self.open_browser);

        if let Some(path) = &self.token_path {
            config = config.with_token_path(path);
        }

        config.validate().map_err(ServerError::config)?;
        Ok(config)
    }

    /// Inline `client_id`/`client_secret` win over `credentials_file`.
    pub fn resolve_credentials(&self) -> ServerResult<OAuthCredentials> {
        match (&self.client_id, &self.client_secret) {
            (Some(id), Some(secret)) => {
                let id = resolve_secret(id)
                    .map_err(|e| ServerError::config(format!("client_id: {e}")))?;
                let secret = resolve_secret(secret)
                    .map_err(|e| ServerError::config(format!("client_secret: {e}")))?;
                Ok(OAuthCredentials::new(id, secret))
            }
            (Some(_), None) => Err(ServerError::config(
                "client_secret is missing from the [google] section",
            )),
            (None, Some(_)) => Err(ServerError::config(
                "client_id is missing from the [google] section",
            )),
            (None, None) => {
                if !self.credentials_file.exists() {
                    return Err(ServerError::config(format!(
                        "Google credentials not found: {} does not exist.\n  \
                         Download an OAuth client (Desktop app) from the Cloud Console, or add to {}:\n  \
                         [google]\n  \
                         client_id = \"YOUR_ID.apps.googleusercontent.com\"\n  \
                         client_secret = \"YOUR_SECRET\"",
                        self.credentials_file.display(),
                        AppConfig::default_path().display()
                    )));
                }
                Ok(OAuthCredentials::from_file(&self.credentials_file)?)
            }
        }
    }
}

/// A config value that may point at a secret stored elsewhere.
#[derive(Debug, PartialEq, Eq)]
enum SecretRef<'a> {
    Env(&'a str),
    Pass(&'a str),
    Plain(&'a str),
}

impl<'a> SecretRef<'a> {
    fn parse(value: &'a str) -> Self {
        if let Some(var) = value.strip_prefix("env::") {
            Self::Env(var)
        } else if let Some(path) = value.strip_prefix("pass::") {
            Self::Pass(path)
        } else {
            Self::Plain(value)
        }
    }
}

/// Expands `env::VAR` and `pass::path` references; other values pass through.
pub fn resolve_secret(value: &str) -> Result<String, String> {
    match SecretRef::parse(value) {
        SecretRef::Plain(value) => Ok(value.to_string()),
        SecretRef::Env(var) => {
            std::env::var(var).map_err(|_| format!("environment variable `{var}` is not set"))
        }
        SecretRef::Pass(path) => {
            let output = std::process::Command::new("pass")
                .args(["show", path])
                .output()
                .map_err(|e| format!("failed to run `pass show {path}`: {e}"))?;
            if !output.status.success() {
                return Err(format!(
                    "`pass show {path}` failed ({}): {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ));
            }
            String::from_utf8_lossy(&output.stdout)
                .lines()
                .next()
                .map(str::to_string)
                .ok_or_else(|| format!("`pass show {path}` produced no output"))
        }
    }
}

impl AppConfig {
    /// Loads the default config file, or defaults if it does not exist.
    pub fn load() -> ServerResult<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> ServerResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ServerError::config(format!("failed to read {}: {e}", path.display()))
        })?;
        toml::from_str(&content).map_err(|e| {
            ServerError::config(format!("failed to parse {}: {e}", path.display()))
        })
    }

    /// `$XDG_CONFIG_HOME/gapihub/config.toml`.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("gapihub")
            .join("config.toml")
    }

    pub fn to_toml(&self) -> ServerResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| ServerError::config(format!("failed to serialize config: {e}")))
    }
}
