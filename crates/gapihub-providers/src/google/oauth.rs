//! OAuth 2.0 authorization-code flow with PKCE over a loopback redirect.
//!
//! The consent step binds a local listener, sends the user to Google's
//! consent page and waits for the redirect carrying the authorization code.
//! The code is then exchanged (with the PKCE verifier) for an access and a
//! refresh token. Later access tokens come from [`OAuthClient::refresh_token`].

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng as _;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{ProviderError, ProviderResult};

use super::config::OAuthCredentials;
use super::tokens::TokenInfo;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

const CALLBACK_PATH: &str = "/callback";
const CALLBACK_TIMEOUT: Duration = Duration::from_secs(300);

/// Random bytes in the PKCE verifier, before base64url encoding.
const CODE_VERIFIER_LENGTH: usize = 32;

const SUCCESS_PAGE: &str = "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n\
    <html><body><h1>gapihub is authorized</h1>\
    <p>You can close this window.</p></body></html>";
const FAILURE_PAGE: &str = "HTTP/1.1 400 Bad Request\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n\
    <html><body><h1>Authorization failed</h1>\
    <p>Check the terminal for details.</p></body></html>";

/// Talks to Google's OAuth endpoints for one client.
#[derive(Debug)]
pub struct OAuthClient {
    credentials: OAuthCredentials,
    http_client: reqwest::Client,
}

/// Successful or failed token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// A refreshed access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshedToken {
    pub access_token: String,
    pub expires_in: Option<i64>,
    /// Present only when Google rotates the refresh token.
    pub refresh_token: Option<String>,
}

impl OAuthClient {
    pub fn new(credentials: OAuthCredentials, timeout: Duration) -> ProviderResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                ProviderError::configuration(format!("failed to create OAuth HTTP client: {e}"))
                    .with_source(e)
            })?;

        Ok(Self {
            credentials,
            http_client,
        })
    }

    /// Runs the interactive consent flow and returns a fresh token set.
    ///
    /// # Errors
    ///
    /// Fails when no loopback port in `port_range` is free, the user denies
    /// consent, the callback never arrives, or the code exchange is rejected.
    pub async fn authorize(
        &self,
        scopes: &[String],
        port_range: (u16, u16),
        open_browser: bool,
    ) -> ProviderResult<TokenInfo> {
        let pkce = PkceFlow::new();
        let (listener, port) = bind_loopback(port_range).await?;
        let redirect_uri = format!("http://127.0.0.1:{port}{CALLBACK_PATH}");
        let auth_url = pkce.auth_url(&self.credentials.client_id, &redirect_uri, scopes)?;

        debug!(%auth_url, "authorization URL");
        let opened = open_browser && open::that(auth_url.as_str()).is_ok();
        if !opened {
            if open_browser {
                warn!("failed to open a browser");
            }
            eprintln!("\nOpen this URL in your browser to authorize gapihub:\n\n{auth_url}\n");
        }

        let callback = tokio::time::timeout(CALLBACK_TIMEOUT, wait_for_callback(&listener))
            .await
            .map_err(|_| ProviderError::authentication("timed out waiting for OAuth consent"))??;

        if callback.state != pkce.state {
            return Err(ProviderError::authentication(
                "OAuth state mismatch in callback",
            ));
        }

        info!("received authorization code");
        self.exchange_code(&callback.code, &pkce.verifier, &redirect_uri, scopes)
            .await
    }

    /// Trades a refresh token for a new access token.
    pub async fn refresh_token(&self, refresh_token: &str) -> ProviderResult<RefreshedToken> {
        let response = self
            .post_token(&[
                ("client_id", self.credentials.client_id.as_str()),
                ("client_secret", self.credentials.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .await?;

        info!("refreshed access token");
        Ok(RefreshedToken {
            access_token: response.access_token,
            expires_in: response.expires_in,
            refresh_token: response.refresh_token,
        })
    }

    async fn exchange_code(
        &self,
        code: &str,
        verifier: &str,
        redirect_uri: &str,
        scopes: &[String],
    ) -> ProviderResult<TokenInfo> {
        let response = self
            .post_token(&[
                ("client_id", self.credentials.client_id.as_str()),
                ("client_secret", self.credentials.client_secret.as_str()),
                ("code", code),
                ("code_verifier", verifier),
                ("grant_type", "authorization_code"),
                ("redirect_uri", redirect_uri),
            ])
            .await?;

        Ok(TokenInfo::new(
            response.access_token,
            response.refresh_token,
            response.expires_in,
            scopes.to_vec(),
        ))
    }

    async fn post_token(&self, params: &[(&str, &str)]) -> ProviderResult<TokenResponse> {
        let response = self
            .http_client
            .post(GOOGLE_TOKEN_URL)
            .form(params)
            .send()
            .await
            .map_err(|e| {
                ProviderError::network(format!("token request failed: {e}")).with_source(e)
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            ProviderError::network(format!("failed to read token response: {e}")).with_source(e)
        })?;

        if !status.is_success() {
            return Err(token_error(status, &body));
        }

        serde_json::from_str(&body).map_err(|e| {
            ProviderError::invalid_response(format!("invalid token response: {e}")).with_source(e)
        })
    }
}

/// `invalid_grant` means the refresh token was revoked or expired.
fn token_error(status: reqwest::StatusCode, body: &str) -> ProviderError {
    match serde_json::from_str::<TokenErrorResponse>(body) {
        Ok(err) if err.error == "invalid_grant" => ProviderError::authentication(format!(
            "stored credentials were rejected ({}); run `gapihub auth --force`",
            err.error_description.as_deref().unwrap_or("invalid_grant")
        )),
        Ok(err) => ProviderError::authentication(format!(
            "token endpoint returned {status}: {}",
            err.error_description.unwrap_or(err.error)
        )),
        Err(_) => ProviderError::authentication(format!("token endpoint returned {status}: {body}")),
    }
}

async fn bind_loopback(port_range: (u16, u16)) -> ProviderResult<(TcpListener, u16)> {
    for port in port_range.0..=port_range.1 {
        if let Ok(listener) = TcpListener::bind(("127.0.0.1", port)).await {
            debug!(port, "bound OAuth loopback listener");
            return Ok((listener, port));
        }
    }
    Err(ProviderError::configuration(format!(
        "no free loopback port in range {}-{}",
        port_range.0, port_range.1
    )))
}

/// Query parameters Google appends to the redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Callback {
    code: String,
    state: String,
}

async fn wait_for_callback(listener: &TcpListener) -> ProviderResult<Callback> {
    loop {
        let (stream, peer) = listener.accept().await.map_err(|e| {
            ProviderError::internal(format!("failed to accept OAuth callback: {e}"))
        })?;
        debug!(%peer, "OAuth loopback connection");
        if let Some(result) = handle_connection(stream).await {
            return result;
        }
    }
}

/// Returns `None` for requests that are not the redirect (e.g. favicon).
async fn handle_connection(stream: TcpStream) -> Option<ProviderResult<Callback>> {
    let mut reader = BufReader::new(stream);
    let mut request_line = String::new();
    reader.read_line(&mut request_line).await.ok()?;

    let mut parts = request_line.split_whitespace();
    if parts.next() != Some("GET") {
        return None;
    }
    let result = parse_callback(parts.next()?)?;

    let page = if result.is_ok() {
        SUCCESS_PAGE
    } else {
        FAILURE_PAGE
    };
    let mut stream = reader.into_inner();
    let _ = stream.write_all(page.as_bytes()).await;
    let _ = stream.shutdown().await;

    Some(result)
}

fn parse_callback(target: &str) -> Option<ProviderResult<Callback>> {
    let url = Url::parse(&format!("http://127.0.0.1{target}")).ok()?;
    if url.path() != CALLBACK_PATH {
        return None;
    }

    let mut code = None;
    let mut state = None;
    let mut error = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            _ => {}
        }
    }

    if let Some(error) = error {
        return Some(Err(ProviderError::authentication(format!(
            "authorization denied: {error}"
        ))));
    }

    Some(match code {
        Some(code) => Ok(Callback {
            code,
            state: state.unwrap_or_default(),
        }),
        None => Err(ProviderError::authentication(
            "OAuth callback carried no authorization code",
        )),
    })
}

/// RFC 7636 verifier, challenge and CSRF state for one consent attempt.
#[derive(Debug)]
pub struct PkceFlow {
    pub verifier: String,
    pub challenge: String,
    pub state: String,
}

impl PkceFlow {
    pub fn new() -> Self {
        let verifier = random_token(CODE_VERIFIER_LENGTH);
        let challenge = URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()));
        Self {
            verifier,
            challenge,
            state: random_token(16),
        }
    }

    /// Google's consent URL, requesting offline access so a refresh token is issued.
    pub fn auth_url(
        &self,
        client_id: &str,
        redirect_uri: &str,
        scopes: &[String],
    ) -> ProviderResult<Url> {
        let scope = scopes.join(" ");
        Url::parse_with_params(
            GOOGLE_AUTH_URL,
            &[
                ("client_id", client_id),
                ("redirect_uri", redirect_uri),
                ("response_type", "code"),
                ("scope", scope.as_str()),
                ("code_challenge", self.challenge.as_str()),
                ("code_challenge_method", "S256"),
                ("state", self.state.as_str()),
                ("access_type", "offline"),
                ("prompt", "consent"),
            ],
        )
        .map_err(|e| ProviderError::internal(format!("failed to build consent URL: {e}")))
    }
}

impl Default for PkceFlow {
    fn default() -> Self {
        Self::new()
    }
}

fn random_token(len: usize) -> String {
    let mut rng = rand::rng();
    let bytes: Vec<u8> = (0..len).map(|_| rng.random()).collect();
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verifier_is_43_chars() {
        assert_eq!(PkceFlow::new().verifier.len(), 43);
    }

    #[test]
    fn challenge_is_sha256_of_verifier() {
        let flow = PkceFlow::new();
        let expected = URL_SAFE_NO_PAD.encode(Sha256::digest(flow.verifier.as_bytes()));
        assert_eq!(flow.challenge, expected);
    }

    #[test]
    fn flows_are_random() {
        let a = PkceFlow::new();
        let b = PkceFlow::new();
        assert_ne!(a.verifier, b.verifier);
        assert_ne!(a.state, b.state);
    }

    #[test]
    fn consent_url_carries_pkce_and_offline_access() {
        let flow = PkceFlow::new();
        let url = flow
            .auth_url(
                "hub.apps.googleusercontent.com",
                "http://127.0.0.1:8080/callback",
                &[
                    "https://www.googleapis.com/auth/gmail.readonly".to_string(),
                    "https://www.googleapis.com/auth/drive.readonly".to_string(),
                ],
            )
            .unwrap();

        assert!(url.as_str().starts_with(GOOGLE_AUTH_URL));
        let params: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(params["code_challenge"], flow.challenge);
        assert_eq!(params["code_challenge_method"], "S256");
        assert_eq!(params["state"], flow.state);
        assert_eq!(params["access_type"], "offline");
        assert_eq!(params["redirect_uri"], "http://127.0.0.1:8080/callback");
        assert_eq!(
            params["scope"],
            "https://www.googleapis.com/auth/gmail.readonly https://www.googleapis.com/auth/drive.readonly"
        );
    }

    #[test]
    fn parses_callback_code_and_state() {
        let result = parse_callback("/callback?state=s%2F1&code=4%2F0Ab&scope=x")
            .unwrap()
            .unwrap();
        assert_eq!(
            result,
            Callback {
                code: "4/0Ab".to_string(),
                state: "s/1".to_string(),
            }
        );
    }

    #[test]
    fn callback_error_is_denial() {
        let err = parse_callback("/callback?error=access_denied")
            .unwrap()
            .unwrap_err();
        assert!(err.message().contains("access_denied"));
    }

    #[test]
    fn callback_without_code_fails() {
        assert!(parse_callback("/callback?state=s").unwrap().is_err());
    }

    #[test]
    fn other_paths_are_ignored() {
        assert!(parse_callback("/favicon.ico").is_none());
    }

    #[test]
    fn invalid_grant_asks_for_reauth() {
        let err = token_error(
            reqwest::StatusCode::BAD_REQUEST,
            r#"{"error": "invalid_grant", "error_description": "Token has been expired or revoked."}"#,
        );
        assert!(err.message().contains("gapihub auth --force"));
        assert!(err.message().contains("revoked"));
    }

    #[tokio::test]
    async fn loopback_receives_redirect() {
        let (listener, port) = bind_loopback((38470, 38490)).await.unwrap();

        let browser = tokio::spawn(async move {
            let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
            stream
                .write_all(b"GET /favicon.ico HTTP/1.1\r\nHost: localhost\r\n\r\n")
                .await
                .unwrap();
            drop(stream);

            let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
            stream
                .write_all(b"GET /callback?code=abc&state=xyz HTTP/1.1\r\nHost: localhost\r\n\r\n")
                .await
                .unwrap();
            let mut reply = String::new();
            let mut reader = BufReader::new(stream);
            reader.read_line(&mut reply).await.unwrap();
            reply
        });

        let callback = wait_for_callback(&listener).await.unwrap();
        assert_eq!(callback.code, "abc");
        assert_eq!(callback.state, "xyz");
        assert!(browser.await.unwrap().starts_with("HTTP/1.1 200"));
    }
}
