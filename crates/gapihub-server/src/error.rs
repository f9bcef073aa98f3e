//! Server error types.
//!
//! [`ServerError`] covers startup and CLI failures and is reported on stderr
//! by the binary. [`ApiError`] is what HTTP handlers return; it renders as
//! `{"detail": "..."}` with a status chosen from the error kind.

use std::io;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use gapihub_core::{DateError, TracingError};
use gapihub_providers::{ProviderError, ProviderErrorCode};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur while starting or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// IO error (listener bind, config file, etc.).
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Credential or transport setup failed.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("failed to initialize logging: {0}")]
    Tracing(#[from] TracingError),

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl ServerError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

/// Error returned by the `/api/*` handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// `start_date` or `end_date` did not parse.
    #[error("{0}")]
    InvalidDate(#[from] DateError),

    #[error("{0}")]
    Provider(#[from] ProviderError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidDate(_) => StatusCode::BAD_REQUEST,
            Self::Provider(err) => status_for(err.code()),
        }
    }
}

/// Upstream failures other than auth and rate limiting become 502.
///
/// A `BadRequest` here is Google refusing a request the gateway built; bad
/// caller input is [`ApiError::InvalidDate`].
fn status_for(code: ProviderErrorCode) -> StatusCode {
    match code {
        ProviderErrorCode::AuthenticationFailed => StatusCode::UNAUTHORIZED,
        ProviderErrorCode::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        ProviderErrorCode::ConfigurationError | ProviderErrorCode::InternalError => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
        ProviderErrorCode::BadRequest
        | ProviderErrorCode::AuthorizationFailed
        | ProviderErrorCode::NetworkError
        | ProviderErrorCode::ServerError
        | ProviderErrorCode::InvalidResponse
        | ProviderErrorCode::NotFound => StatusCode::BAD_GATEWAY,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, %status, "request failed");
        } else {
            warn!(error = %self, %status, "request rejected");
        }
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_date_is_400() {
        let err = ApiError::from(DateError::Invalid {
            input: "tomorrow".to_string(),
        });
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(err.to_string().starts_with("Invalid date format: tomorrow"));
    }

    #[test]
    fn provider_codes_map_to_statuses() {
        let cases = [
            (ProviderError::authentication("expired"), 401),
            (ProviderError::rate_limited("slow down"), 429),
            (ProviderError::authorization("forbidden"), 502),
            (ProviderError::server("HTTP 503"), 502),
            (ProviderError::network("timeout"), 502),
            (ProviderError::invalid_response("not json"), 502),
            (ProviderError::not_found("no space"), 502),
            (ProviderError::configuration("no secret"), 500),
            (ProviderError::internal("oops"), 500),
            (ProviderError::bad_request("Invalid Value"), 502),
        ];
        for (err, expected) in cases {
            let code = err.code();
            assert_eq!(
                ApiError::from(err).status().as_u16(),
                expected,
                "status for {code}"
            );
        }
    }

    #[test]
    fn config_error_message() {
        let err = ServerError::config("missing client_id");
        assert_eq!(err.to_string(), "Configuration error: missing client_id");
    }
}
