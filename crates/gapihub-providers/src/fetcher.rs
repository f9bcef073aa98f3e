//! The [`Fetcher`] trait shared by the four Google services.
//!
//! A fetcher turns an optional date range into a list of flat records. The
//! HTTP layer only sees this trait, so every endpoint is served by the same
//! handler.

use std::sync::Arc;

use gapihub_core::DateRange;
use serde::Serialize;

use crate::error::ProviderResult;
use crate::transport::{BoxFuture, GoogleTransport};

/// Results requested from every list call.
pub const MAX_RESULTS: usize = 100;

/// One Google service exposed as a date-filterable record list.
pub trait Fetcher: Send + Sync {
    /// The flat record this service produces.
    type Record: Serialize + Send + 'static;

    /// Short name used in logs and error tags ("gmail", "chat", ...).
    const NAME: &'static str;

    /// Builds a fetcher over a shared transport.
    fn from_transport(transport: Arc<dyn GoogleTransport>) -> Self
    where
        Self: Sized;

    /// Fetches records inside `range`, newest API page only.
    ///
    /// # Errors
    ///
    /// Any upstream failure is returned as a [`ProviderError`](crate::ProviderError)
    /// tagged with [`Self::NAME`].
    fn fetch<'a>(&'a self, range: &'a DateRange)
    -> BoxFuture<'a, ProviderResult<Vec<Self::Record>>>;
}
