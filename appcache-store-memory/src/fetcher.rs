//! [`ReqwestFetcher`]: a real-network `Fetcher` for non-browser hosts.

use std::collections::HashMap;
use std::time::Duration;

use appcache_core::error::{AppCacheError, Result};
use appcache_core::fetcher::{Fetcher, RequestView, USE_FETCH_HEADER};
use appcache_core::response_cache::CachedResponse;
use async_trait::async_trait;
use url::Url;

/// A [`appcache_core::fetcher::Fetcher`] backed by a real `reqwest::Client`,
/// for embedding this shim in a non-browser Rust host.
///
/// the Installer's conditioning-fetch option set (credentials included,
/// `redirect-manual`, referrer suppressed, `no-cors`) is a browser `fetch()`
/// concept with no `reqwest` equivalent worth emulating outside a browser;
/// this fetcher follows redirects normally and only reproduces the one part
/// of that option set that crosses the trait boundary and matters to the
/// engine: the [`USE_FETCH_HEADER`] escape-hatch header.
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    /// Builds a fetcher with a bounded per-request timeout, matching the
    /// core spec's "the underlying fetch primitive supplies its own timeout
    /// behavior" rather than imposing one of the engine's own.
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AppCacheError::NetworkError(Box::new(e)))?;
        Ok(Self { client })
    }

    async fn do_fetch(&self, request: &RequestView) -> Result<CachedResponse> {
        let mut builder = self.client.request(
            request
                .method
                .parse()
                .map_err(|e: http::method::InvalidMethod| AppCacheError::NetworkError(Box::new(e)))?,
            request.url.clone(),
        );
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }

        let response = builder.send().await.map_err(|e| AppCacheError::NetworkError(Box::new(e)))?;
        let url = response.url().clone();
        let status = response.status().as_u16();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body =
            response.bytes().await.map_err(|e| AppCacheError::NetworkError(Box::new(e)))?.to_vec();
        Ok(CachedResponse::new(url, status, headers, body))
    }
}

#[async_trait]
impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, request: &RequestView) -> Result<CachedResponse> {
        self.do_fetch(request).await
    }

    async fn fetch_conditioning(&self, url: &Url) -> Result<CachedResponse> {
        let mut request = RequestView::get(url.clone());
        request.headers.insert(USE_FETCH_HEADER.to_string(), "true".to_string());
        self.do_fetch(&request).await
    }
}
