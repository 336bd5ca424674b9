//! The Rule Engine: given a `FetchEvent`, selects a `Decision`
//! following the AppCache CACHE/FALLBACK/NETWORK matching order.
//!
//! Expressed as a linear sequence of awaited steps rather than a nested
//! promise-continuation chain — each branch is a plain early return.

use url::Url;

use crate::client::{self, ClientDirectory, FetchEventView};
use crate::error::Result;
use crate::fetcher::RequestView;
use crate::store::ManifestStore;

/// The outcome of applying the AppCache resolution algorithm to one request.
#[derive(Debug, Clone)]
pub enum Decision {
    /// Live `fetch(request)`, unchanged — the escape hatch, an explicit
    /// NETWORK match, the wildcard, or the no-binding/no-match fallthrough.
    Fetch(RequestView),
    /// A CACHE hit or `request.url === clientUrl`: serve the response stored
    /// under `url` in the per-version cache named `cache_name`.
    Cached {
        /// The per-version cache to read from (a manifest-version hash).
        cache_name: String,
        /// The URL to look up within that cache.
        url: Url,
    },
    /// A FALLBACK match: attempt a live fetch of `request` first, falling
    /// back to `fallback_url` in `cache_name` only if the fetch rejects.
    Fallback {
        /// The per-version cache to fall back into.
        cache_name: String,
        /// The FALLBACK-section target URL.
        fallback_url: Url,
        /// The original request, re-attempted live before falling back.
        request: RequestView,
    },
    /// CACHE, FALLBACK, and NETWORK all failed to match: the AppCache
    /// `Response.error()` offline-error sentinel.
    NetworkErrorSentinel,
}

/// Applies the AppCache resolution algorithm to `event`.
pub async fn resolve(
    event: &FetchEventView,
    store: &dyn ManifestStore,
    directory: &dyn ClientDirectory,
) -> Result<Decision> {
    if event.request.is_conditioning_fetch() {
        return Ok(Decision::Fetch(event.request.clone()));
    }

    let client_url = client::resolve_client_url(directory, event).await?;
    let binding = store.get_path_binding(&client_url).await?;

    match binding {
        Some(binding) => {
            if let Some(client_id) = &event.client_id {
                if store.get_client_id_hash(client_id).await?.is_none() {
                    store.put_client_id_hash(client_id, &binding.hash).await?;
                }
            }

            let history = store.get_history(&binding.manifest_url).await?;
            let Some(version) = history.find(&binding.hash) else {
                // The bound version was pruned by GC while the binding
                // persisted: fall through as if there
                // had been no binding at all.
                return resolve_cross_manifest(event, store).await;
            };

            let request_url = &event.request.url;
            if version.parsed.is_cached(request_url) || request_url == &client_url {
                return Ok(Decision::Cached {
                    cache_name: binding.hash.clone(),
                    url: request_url.clone(),
                });
            }

            if let Some((_, fallback_url)) = version.parsed.longest_fallback_prefix(request_url) {
                return Ok(Decision::Fallback {
                    cache_name: binding.hash.clone(),
                    fallback_url: fallback_url.clone(),
                    request: event.request.clone(),
                });
            }

            if version.parsed.allows_network(request_url) {
                return Ok(Decision::Fetch(event.request.clone()));
            }

            Ok(Decision::NetworkErrorSentinel)
        }
        None => resolve_cross_manifest(event, store).await,
    }
}

/// Case B: no manifest is bound to this client. Searches every
/// manifest's *current* version for the longest FALLBACK prefix matching the
/// request URL; the greatest-length match wins, last-enumerated wins ties.
async fn resolve_cross_manifest(
    event: &FetchEventView,
    store: &dyn ManifestStore,
) -> Result<Decision> {
    let histories = store.all_histories().await?;
    let request_url = &event.request.url;

    let mut winner: Option<(usize, String, Url)> = None;
    for (_, history) in &histories {
        let Some(version) = history.current() else { continue };
        if let Some((prefix, fallback_url)) = version.parsed.longest_fallback_prefix(request_url) {
            let len = prefix.len();
            if winner.as_ref().is_none_or(|(best_len, _, _)| len >= *best_len) {
                winner = Some((len, version.hash.clone(), fallback_url.clone()));
            }
        }
    }

    match winner {
        Some((_, hash, fallback_url)) => Ok(Decision::Fallback {
            cache_name: hash,
            fallback_url,
            request: event.request.clone(),
        }),
        None => Ok(Decision::Fetch(event.request.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::installer;
    use crate::response_cache::ResponseCacheStorage as _;
    use crate::test_support::{FakeCacheStorage, FakeClientDirectory, FakeFetcher, FakeStore};

    fn event(url: &str) -> FetchEventView {
        FetchEventView {
            request: RequestView::get(Url::parse(url).unwrap()),
            referrer: None,
            client_id: None,
        }
    }

    #[tokio::test]
    async fn escape_hatch_passes_through_unmodified() {
        let store = FakeStore::default();
        let directory = FakeClientDirectory::default();
        let mut event = event("https://s/a");
        event.request.headers.insert("X-Use-Fetch".to_string(), "true".to_string());

        let decision = resolve(&event, &store, &directory).await.unwrap();
        assert!(matches!(decision, Decision::Fetch(r) if r.url == event.request.url));
    }

    #[tokio::test]
    async fn cache_hit_resolves_to_cached_decision() {
        let store = FakeStore::default();
        let cache = FakeCacheStorage::default();
        let fetcher = FakeFetcher::default();
        let directory = FakeClientDirectory::default();
        let manifest_url = Url::parse("https://s/m").unwrap();
        fetcher.set_ok("https://s/a", b"A".to_vec());
        fetcher.set_ok("https://s/b", b"B".to_vec());
        let outcome =
            installer::install(&store, &cache, &fetcher, &manifest_url, "CACHE:\n/a\n/b\nNETWORK:\n*\n")
                .await
                .unwrap();
        let crate::installer::InstallOutcome::Installed { hash } = outcome else {
            panic!("expected Installed")
        };
        crate::association::record_association(
            &store,
            &cache,
            &fetcher,
            &Url::parse("https://s/p").unwrap(),
            &manifest_url,
            &hash,
        )
        .await
        .unwrap();

        let event = event("https://s/a");
        let decision = resolve(&event, &store, &directory).await.unwrap();
        match decision {
            Decision::Cached { cache_name, url } => {
                assert_eq!(cache_name, hash);
                assert_eq!(url, Url::parse("https://s/a").unwrap());
            }
            other => panic!("expected Cached, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn network_wildcard_resolves_to_fetch() {
        let store = FakeStore::default();
        let cache = FakeCacheStorage::default();
        let fetcher = FakeFetcher::default();
        let directory = FakeClientDirectory::default();
        let manifest_url = Url::parse("https://s/m").unwrap();
        fetcher.set_ok("https://s/online", b"ok".to_vec());
        let outcome = installer::install(
            &store,
            &cache,
            &fetcher,
            &manifest_url,
            "CACHE:\n/online\nFALLBACK:\n/api /offline.json\nNETWORK:\n*\n",
        )
        .await
        .unwrap();
        let crate::installer::InstallOutcome::Installed { hash } = outcome else {
            panic!("expected Installed")
        };
        crate::association::record_association(
            &store,
            &cache,
            &fetcher,
            &Url::parse("https://s/p").unwrap(),
            &manifest_url,
            &hash,
        )
        .await
        .unwrap();

        let event = event("https://s/unknown");
        let decision = resolve(&event, &store, &directory).await.unwrap();
        assert!(matches!(decision, Decision::Fetch(_)));
    }

    #[tokio::test]
    async fn no_match_resolves_to_sentinel() {
        let store = FakeStore::default();
        let cache = FakeCacheStorage::default();
        let fetcher = FakeFetcher::default();
        let directory = FakeClientDirectory::default();
        let manifest_url = Url::parse("https://s/m").unwrap();
        fetcher.set_ok("https://s/a", b"A".to_vec());
        let outcome = installer::install(
            &store,
            &cache,
            &fetcher,
            &manifest_url,
            "CACHE:\n/a\nNETWORK:\nexplicit-only\n",
        )
        .await
        .unwrap();
        let crate::installer::InstallOutcome::Installed { hash } = outcome else {
            panic!("expected Installed")
        };
        crate::association::record_association(
            &store,
            &cache,
            &fetcher,
            &Url::parse("https://s/p").unwrap(),
            &manifest_url,
            &hash,
        )
        .await
        .unwrap();

        let event = event("https://s/other");
        let decision = resolve(&event, &store, &directory).await.unwrap();
        assert!(matches!(decision, Decision::NetworkErrorSentinel));
    }

    #[tokio::test]
    async fn cross_manifest_fallback_picks_longest_prefix() {
        let store = FakeStore::default();
        let cache = FakeCacheStorage::default();
        let fetcher = FakeFetcher::default();
        let directory = FakeClientDirectory::default();
        fetcher.set_ok("https://s/x-fallback", b"shallow".to_vec());
        fetcher.set_ok("https://s/deep-fallback", b"deep".to_vec());

        installer::install(
            &store,
            &cache,
            &fetcher,
            &Url::parse("https://s/m1").unwrap(),
            "CACHE:\nFALLBACK:\n/x /x-fallback\nNETWORK:\n*\n",
        )
        .await
        .unwrap();
        let outcome2 = installer::install(
            &store,
            &cache,
            &fetcher,
            &Url::parse("https://s/m2").unwrap(),
            "CACHE:\nFALLBACK:\n/x/deeper /deep-fallback\nNETWORK:\n*\n",
        )
        .await
        .unwrap();
        let crate::installer::InstallOutcome::Installed { hash: hash2 } = outcome2 else {
            panic!("expected Installed")
        };

        // No PATH_TO_MANIFEST binding for this client: cross-manifest search.
        let event = event("https://s/x/deeper/q");
        let decision = resolve(&event, &store, &directory).await.unwrap();
        match decision {
            Decision::Fallback { cache_name, fallback_url, .. } => {
                assert_eq!(cache_name, hash2);
                assert_eq!(fallback_url, Url::parse("https://s/deep-fallback").unwrap());
            }
            other => panic!("expected Fallback, got {other:?}"),
        }
    }
}
