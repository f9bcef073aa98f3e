//! Google Workspace fetchers and OAuth plumbing.
//!
//! - [`Fetcher`] - date-range to records, one implementation per service
//! - [`GoogleTransport`] - authenticated JSON `GET`, backed by [`HttpTransport`]
//! - [`google::CredentialProvider`] - OAuth token load, consent, refresh
//! - [`ProviderError`] - error type shared by everything above
//!
//! # Architecture
//!
//! ```text
//!  ChatFetcher  GmailFetcher  CalendarFetcher  DocsFetcher
//!       │            │              │              │
//!       └────────────┴──────┬───────┴──────────────┘
//!                           ▼
//!                   dyn GoogleTransport
//!                           │
//!                           ▼
//!                     HttpTransport ──► CredentialProvider ──► TokenStorage
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use gapihub_providers::{ChatFetcher, HttpTransport};
//!
//! let transport = Arc::new(HttpTransport::new(credentials, timeout, "gapihub")?);
//! let chat = ChatFetcher::new(transport);
//! let records = chat.get_messages_by_date_range(Some("2024-02-19"), None, 100).await?;
//! ```

pub mod calendar;
pub mod chat;
pub mod docs;
pub mod error;
pub mod fetcher;
pub mod gmail;
pub mod google;
pub mod transport;

pub use calendar::CalendarFetcher;
pub use chat::{ChatFetcher, ChatSpace, MessageQuery, RawMessage};
pub use docs::DocsFetcher;
pub use error::{ProviderError, ProviderErrorCode, ProviderResult};
pub use fetcher::{Fetcher, MAX_RESULTS};
pub use gmail::GmailFetcher;
pub use transport::{BoxFuture, GoogleTransport, HttpTransport, Query, error_for_status};
