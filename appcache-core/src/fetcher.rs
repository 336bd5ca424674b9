//! The `Fetcher` trait: an injected handle over live network `fetch`.
//!
//! Two request shapes matter to this engine: ordinary requests flowing
//! through the Rule Engine/Fallback Broker, and the Installer's conditioning
//! fetch, which always uses the same fixed options — credentials
//! included, redirect handled manually, referrer suppressed, `no-cors` mode —
//! plus the [`USE_FETCH_HEADER`] escape hatch. Rather than thread a generic
//! options struct through every call site, the conditioning shape gets its
//! own trait method so implementors (browser `fetch`, or an in-memory test
//! double) only need to special-case it once.

use async_trait::async_trait;
use std::collections::HashMap;
use url::Url;

use crate::error::Result;
use crate::response_cache::CachedResponse;

/// The header the Installer stamps on its own pre-caching fetches so the
/// Rule Engine's escape hatch can recognize and pass them through
/// unmodified, preventing the recursion hazard of the Installer re-entering itself.
///
/// Header *names* are case-insensitive on the wire; [`RequestView::header`]
/// looks this up case-insensitively rather than requiring exact-case
/// `X-Use-Fetch`.
pub const USE_FETCH_HEADER: &str = "x-use-fetch";

/// A minimal, browser-agnostic view of an outgoing or intercepted request.
#[derive(Debug, Clone)]
pub struct RequestView {
    /// HTTP method, upper-cased.
    pub method: String,
    /// Absolute request URL.
    pub url: Url,
    /// Request headers as received; use [`RequestView::header`] for
    /// case-insensitive lookups rather than indexing this directly.
    pub headers: HashMap<String, String>,
}

impl RequestView {
    /// A plain `GET` request for `url` with no headers.
    #[must_use]
    pub fn get(url: Url) -> Self {
        Self { method: "GET".to_string(), url, headers: HashMap::new() }
    }

    /// Case-insensitive header lookup.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// True if this request carries the `X-Use-Fetch: true` escape hatch.
    #[must_use]
    pub fn is_conditioning_fetch(&self) -> bool {
        self.header(USE_FETCH_HEADER).is_some_and(|v| v.eq_ignore_ascii_case("true"))
    }
}

/// Abstracts live network fetch.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Performs `request` exactly as given. A non-2xx response is still
    /// `Ok` — only a genuine network failure (DNS, connection refused,
    /// offline) is `Err` — a non-2xx response is not a rejection.
    async fn fetch(&self, request: &RequestView) -> Result<CachedResponse>;

    /// Performs the Installer's pre-caching/seeding fetch against `url`,
    /// with credentials included, manual redirect handling, a suppressed
    /// referrer, `no-cors` mode, and the [`USE_FETCH_HEADER`] header set —
    /// the fixed option set the Installer and Association Recorder both use.
    async fn fetch_conditioning(&self, url: &Url) -> Result<CachedResponse>;
}
