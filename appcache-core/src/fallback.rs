//! The Fallback Broker: given a `Decision::Fallback`, attempts the
//! live network first and only serves the cached fallback entry once that
//! attempt rejects or the caller has no network path at all.

use crate::error::{AppCacheError, Result};
use crate::fetcher::Fetcher;
use crate::response_cache::{CachedResponse, ResponseCacheStorage};
use crate::rule_engine::Decision;

/// Resolves a `Decision` into an actual response, honoring the Fallback
/// Broker's network-first, cache-on-rejection contract.
///
/// Only `Decision::Fallback` touches the network/cache race; the other
/// variants are handled by their own obvious translation and are included
/// here so callers have one place to go from `Decision` to `CachedResponse`.
pub async fn fetch_with_fallback(
    decision: Decision,
    cache: &dyn ResponseCacheStorage,
    fetcher: &dyn Fetcher,
) -> Result<CachedResponse> {
    match decision {
        Decision::Fetch(request) => fetcher.fetch(&request).await,
        Decision::Cached { cache_name, url } => cache
            .get(&cache_name, &url)
            .await?
            .ok_or_else(|| AppCacheError::Message(format!("expected cache entry for {url} in {cache_name}"))),
        Decision::Fallback { cache_name, fallback_url, request } => {
            // "Not on non-2xx status" — only a genuine network rejection
            // (DNS, connection refused, offline) triggers the fallback; a
            // non-2xx live response is still returned as-is.
            match fetcher.fetch(&request).await {
                Ok(response) => Ok(response),
                Err(error) => {
                    tracing::debug!(url = %request.url, %error, "live fetch failed, serving cached fallback");
                    cache.get(&cache_name, &fallback_url).await?.ok_or_else(|| {
                        AppCacheError::Message(format!(
                            "expected fallback entry for {fallback_url} in {cache_name}"
                        ))
                    })
                }
            }
        }
        Decision::NetworkErrorSentinel => Err(AppCacheError::Message(
            "no CACHE, FALLBACK, or NETWORK rule matched this request".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::RequestView;
    use crate::response_cache::ResponseCacheStorage as _;
    use crate::test_support::{FakeCacheStorage, FakeFetcher};
    use url::Url;

    #[tokio::test]
    async fn live_fetch_wins_when_network_reachable() {
        let cache = FakeCacheStorage::default();
        let fetcher = FakeFetcher::default();
        fetcher.set_ok("https://s/a", b"live".to_vec());
        cache
            .put(
                "hash1",
                &Url::parse("https://s/fallback").unwrap(),
                CachedResponse::new(Url::parse("https://s/fallback").unwrap(), 200, Default::default(), b"cached".to_vec()),
            )
            .await
            .unwrap();

        let decision = Decision::Fallback {
            cache_name: "hash1".to_string(),
            fallback_url: Url::parse("https://s/fallback").unwrap(),
            request: RequestView::get(Url::parse("https://s/a").unwrap()),
        };
        let response = fetch_with_fallback(decision, &cache, &fetcher).await.unwrap();
        assert_eq!(response.body, b"live".to_vec());
    }

    #[tokio::test]
    async fn cached_fallback_served_when_network_rejects() {
        let cache = FakeCacheStorage::default();
        let fetcher = FakeFetcher::default();
        // "https://s/a" left unprogrammed: fetch rejects.
        cache
            .put(
                "hash1",
                &Url::parse("https://s/fallback").unwrap(),
                CachedResponse::new(Url::parse("https://s/fallback").unwrap(), 200, Default::default(), b"cached".to_vec()),
            )
            .await
            .unwrap();

        let decision = Decision::Fallback {
            cache_name: "hash1".to_string(),
            fallback_url: Url::parse("https://s/fallback").unwrap(),
            request: RequestView::get(Url::parse("https://s/a").unwrap()),
        };
        let response = fetch_with_fallback(decision, &cache, &fetcher).await.unwrap();
        assert_eq!(response.body, b"cached".to_vec());
    }

    #[tokio::test]
    async fn non_2xx_live_response_is_not_treated_as_a_rejection() {
        let cache = FakeCacheStorage::default();
        let fetcher = FakeFetcher::default();
        fetcher.set_status("https://s/a", 500, b"server error".to_vec());
        cache
            .put(
                "hash1",
                &Url::parse("https://s/fallback").unwrap(),
                CachedResponse::new(Url::parse("https://s/fallback").unwrap(), 200, Default::default(), b"cached".to_vec()),
            )
            .await
            .unwrap();

        let decision = Decision::Fallback {
            cache_name: "hash1".to_string(),
            fallback_url: Url::parse("https://s/fallback").unwrap(),
            request: RequestView::get(Url::parse("https://s/a").unwrap()),
        };
        let response = fetch_with_fallback(decision, &cache, &fetcher).await.unwrap();
        assert_eq!(response.status, 500);
    }

    #[tokio::test]
    async fn sentinel_decision_errors() {
        let cache = FakeCacheStorage::default();
        let fetcher = FakeFetcher::default();
        let result = fetch_with_fallback(Decision::NetworkErrorSentinel, &cache, &fetcher).await;
        assert!(result.is_err());
    }
}
