//! The `ResponseCacheStorage` trait: an injected handle over the named
//! response caches — one per manifest-version hash, each holding
//! `(Request → Response)` pairs populated by the [`crate::installer`].
//!
//! Cache entries are keyed by the absolute request URL alone. AppCache
//! resources are always plain `GET`s; a `(method, url)` composite key, as a
//! general-purpose HTTP cache would use, would add a dimension never
//! exercised here.

use async_trait::async_trait;
use std::collections::HashMap;
use url::Url;

use crate::error::Result;

/// A cached HTTP response, shaped closely enough to a real `fetch` response
/// to carry what the engine needs: status for the ok/404/410 predicates of
/// installation, headers for the `Cache-Control` predicate, and the body to serve
/// back on a cache hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedResponse {
    /// The final response URL (after any redirects the fetch followed).
    pub url: Url,
    /// HTTP status code.
    pub status: u16,
    /// Response headers, header name lowercased at insertion so lookups are
    /// case-insensitive the way real HTTP header names behave.
    pub headers: HashMap<String, String>,
    /// Response body bytes.
    pub body: Vec<u8>,
}

impl CachedResponse {
    /// Builds a response, lowercasing header names for case-insensitive lookup.
    #[must_use]
    pub fn new(url: Url, status: u16, headers: HashMap<String, String>, body: Vec<u8>) -> Self {
        let headers =
            headers.into_iter().map(|(k, v)| (k.to_ascii_lowercase(), v)).collect();
        Self { url, status, headers, body }
    }

    /// The "ok" predicate used during installation: 2xx status range.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// True for the 404/410 eviction-hint statuses used during installation.
    #[must_use]
    pub fn is_gone(&self) -> bool {
        self.status == 404 || self.status == 410
    }

    /// Whether `Cache-Control` carries the `no-store` directive.
    ///
    /// A naive substring search can spuriously match tokens like
    /// `no-store-foo`; this tokenizes on commas and trims whitespace instead.
    #[must_use]
    pub fn cache_control_no_store(&self) -> bool {
        self.headers
            .get("cache-control")
            .is_some_and(|value| value.split(',').any(|directive| directive.trim().eq_ignore_ascii_case("no-store")))
    }
}

/// Abstracts the named response caches (the browser's Cache Storage API).
#[async_trait]
pub trait ResponseCacheStorage: Send + Sync {
    /// Stores `response` under `url` in the cache named `cache_name`,
    /// creating the cache if it does not already exist.
    async fn put(&self, cache_name: &str, url: &Url, response: CachedResponse) -> Result<()>;

    /// Looks up `url` in the cache named `cache_name`.
    async fn get(&self, cache_name: &str, url: &Url) -> Result<Option<CachedResponse>>;

    /// Removes a single entry (the eviction-hint path taken during installation).
    async fn delete_entry(&self, cache_name: &str, url: &Url) -> Result<()>;

    /// Deletes an entire named cache, used by the GC sweeper once a version
    /// hash is no longer referenced by any live client.
    async fn delete_cache(&self, cache_name: &str) -> Result<()>;
}
