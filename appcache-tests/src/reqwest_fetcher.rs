//! The six end-to-end scenarios run against a real
//! `ReqwestFetcher` and a `wiremock::MockServer` rather than the in-process
//! `Fetcher` test double `appcache-core` uses for its own unit tests.

use anyhow::Result;
use appcache_core::fetcher::RequestView;
use appcache_core::response_cache::ResponseCacheStorage as _;
use appcache_core::rule_engine::Decision;
use appcache_core::store::ManifestStore as _;

use url::Url;

use crate::{unreachable_origin, Harness};

/// Scenario 1: fresh install, CACHE hit. A request matching a CACHE-listed
/// URL must resolve to the pre-cached response, not a live fetch.
#[tokio::test]
async fn fresh_install_cache_hit() -> Result<()> {
    let h = Harness::new().await?;
    h.serve("/a", "A").await;
    h.serve("/b", "B").await;
    h.serve("/p", "<html></html>").await;

    let hash = h.install("/m", "CACHE:\n/a\n/b\nNETWORK:\n*\n").await?;
    h.associate("/p", "/m", &hash).await?;

    let decision = h.resolve("/a").await?;
    let Decision::Cached { cache_name, url } = decision else {
        panic!("expected Cached decision, got {decision:?}")
    };
    assert_eq!(cache_name, hash);
    assert_eq!(url, h.url("/a"));

    let response = h.execute(decision).await?;
    assert_eq!(response.body, b"A".to_vec());
    Ok(())
}

/// Scenario 2: FALLBACK on offline. The FALLBACK prefix's live fetch target
/// is an address with nothing listening, so the Fallback Broker must serve
/// the pre-cached fallback value instead of propagating the connection
/// failure.
#[tokio::test]
async fn fallback_on_offline() -> Result<()> {
    let h = Harness::new().await?;
    h.serve("/online", "online").await;
    h.serve("/offline.json", "offline").await;
    h.serve("/p", "<html></html>").await;

    let dead_origin = unreachable_origin();
    let manifest = format!(
        "CACHE:\n/online\nFALLBACK:\n{dead_origin}/api /offline.json\nNETWORK:\n*\n"
    );
    let hash = h.install("/m", &manifest).await?;
    h.associate("/p", "/m", &hash).await?;

    let request_url = Url::parse(&format!("{dead_origin}/api/foo")).expect("valid url");
    let decision = h.resolve_request(RequestView::get(request_url)).await?;
    let Decision::Fallback { cache_name, fallback_url, .. } = decision else {
        panic!("expected Fallback decision, got {decision:?}")
    };
    assert_eq!(cache_name, hash);
    assert_eq!(fallback_url, h.url("/offline.json"));

    let response = h.execute(decision).await?;
    assert_eq!(response.body, b"offline".to_vec());
    Ok(())
}

/// Scenario 3: NETWORK wildcard. A request matching neither CACHE nor
/// FALLBACK, with `*` present in NETWORK, must resolve to a live fetch
/// rather than the offline-error sentinel.
#[tokio::test]
async fn network_wildcard_resolves_live() -> Result<()> {
    let h = Harness::new().await?;
    h.serve("/online", "online").await;
    h.serve("/offline.json", "offline").await;
    h.serve("/unknown", "live response").await;
    h.serve("/p", "<html></html>").await;

    let hash = h
        .install("/m", "CACHE:\n/online\nFALLBACK:\n/api /offline.json\nNETWORK:\n*\n")
        .await?;
    h.associate("/p", "/m", &hash).await?;

    let decision = h.resolve("/unknown").await?;
    let Decision::Fetch(_) = decision else { panic!("expected Fetch decision, got {decision:?}") };

    let response = h.execute(decision).await?;
    assert_eq!(response.body, b"live response".to_vec());
    Ok(())
}

/// Scenario 4: no match. With no `*` and no applicable FALLBACK, a request
/// outside CACHE/NETWORK must yield the `Response.error()` sentinel.
#[tokio::test]
async fn no_match_yields_sentinel() -> Result<()> {
    let h = Harness::new().await?;
    h.serve("/a", "A").await;
    h.serve("/p", "<html></html>").await;

    let hash = h.install("/m", "CACHE:\n/a\nNETWORK:\nexplicit-only\n").await?;
    h.associate("/p", "/m", &hash).await?;

    let decision = h.resolve("/other").await?;
    assert!(matches!(decision, Decision::NetworkErrorSentinel), "got {decision:?}");
    assert!(h.execute(decision).await.is_err());
    Ok(())
}

/// Scenario 5: cross-manifest fallback. A client with no `PATH_TO_MANIFEST`
/// binding must be served from whichever installed manifest's *current*
/// version has the longest matching FALLBACK prefix.
#[tokio::test]
async fn cross_manifest_fallback_picks_longest_prefix() -> Result<()> {
    let h = Harness::new().await?;
    h.serve("/x-fallback", "shallow").await;
    h.serve("/deep-fallback", "deep").await;

    h.install("/m1", "CACHE:\nFALLBACK:\n/x /x-fallback\nNETWORK:\n*\n").await?;
    let hash2 = h.install("/m2", "CACHE:\nFALLBACK:\n/x/deeper /deep-fallback\nNETWORK:\n*\n").await?;

    // No association recorded for this client: cross-manifest search.
    let decision = h.resolve("/x/deeper/q").await?;
    let Decision::Fallback { cache_name, fallback_url, .. } = decision else {
        panic!("expected Fallback decision, got {decision:?}")
    };
    assert_eq!(cache_name, hash2);
    assert_eq!(fallback_url, h.url("/deep-fallback"));

    let response = h.execute(decision).await?;
    assert_eq!(response.body, b"deep".to_vec());
    Ok(())
}

/// Scenario 6: GC retires old cache. Installing v2 after a clientId bound to
/// v1 has gone stale must delete v1's per-version cache and keep v2's.
#[tokio::test]
async fn gc_retires_superseded_version() -> Result<()> {
    let h = Harness::new().await?;
    h.serve("/a", "A").await;
    h.serve("/p", "<html></html>").await;

    let hash_v1 = h.install("/m", "CACHE:\n/a\nNETWORK:\n*\n").await?;
    h.associate("/p", "/m", &hash_v1).await?;
    h.directory.add("client-1", h.url("/p")).await;
    h.store.put_client_id_hash("client-1", &hash_v1).await?;

    let hash_v2 = h.install("/m", "CACHE:\n/a\nNETWORK:\nexplicit-only\n").await?;
    assert_ne!(hash_v1, hash_v2);

    // client-1 navigates away: no longer live.
    h.directory.remove("client-1").await;

    let swept = h.sweep().await?;
    assert_eq!(swept.len(), 1);
    assert_eq!(swept[0].hash, hash_v1);

    assert!(h.cache.get(&hash_v1, &h.url("/a")).await?.is_none());
    assert!(h.cache.get(&hash_v2, &h.url("/a")).await?.is_some());
    Ok(())
}
