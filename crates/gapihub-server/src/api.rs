//! HTTP routes.
//!
//! Every `/api/*` route is the same handler instantiated for a different
//! [`Fetcher`]: parse the optional date bounds, build the fetcher over the
//! shared transport, and return its records as a JSON array.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use gapihub_core::DateRange;
use gapihub_providers::{
    CalendarFetcher, ChatFetcher, DocsFetcher, Fetcher, GmailFetcher, GoogleTransport,
};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;
use tracing::debug;

use crate::error::ApiError;

/// Shared across requests; fetchers themselves are built per request.
#[derive(Clone)]
pub struct AppState {
    pub transport: Arc<dyn GoogleTransport>,
}

impl AppState {
    pub fn new(transport: Arc<dyn GoogleTransport>) -> Self {
        Self { transport }
    }
}

/// `?start_date=...&end_date=...`
#[derive(Debug, Default, Deserialize)]
pub struct DateParams {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// Build the axum [`Router`] for the gateway.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/api/gmail", get(fetch_records::<GmailFetcher>))
        .route("/api/chats", get(fetch_records::<ChatFetcher>))
        .route("/api/calendar", get(fetch_records::<CalendarFetcher>))
        .route("/api/docs", get(fetch_records::<DocsFetcher>))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn root() -> Json<Value> {
    Json(json!({
        "app": "Google API Hub",
        "status": "running",
        "endpoints": {
            "Gmail": ["/api/gmail"],
            "Chat": ["/api/chats"],
            "Calendar": ["/api/calendar"],
            "Documents": ["/api/docs"],
        },
        "date_formats": ["YYYY-MM-DD", "YYYY-MM-DDTHH:MM:SSZ"],
    }))
}

async fn fetch_records<F>(
    State(state): State<AppState>,
    Query(params): Query<DateParams>,
) -> Result<Json<Vec<F::Record>>, ApiError>
where
    F: Fetcher + 'static,
{
    let range = DateRange::parse(params.start_date.as_deref(), params.end_date.as_deref())?;
    let fetcher = F::from_transport(state.transport.clone());
    let records = fetcher.fetch(&range).await?;
    debug!(service = F::NAME, count = records.len(), "fetched records");
    Ok(Json(records))
}
