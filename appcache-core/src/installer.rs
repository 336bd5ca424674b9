//! The Installer: parses a freshly fetched manifest, pre-caches its
//! CACHE and FALLBACK-value URLs into a fresh per-version cache, and appends
//! the new version to history — atomically from the application's point of
//! view (one `put_history` write commits the whole version).

use url::Url;

use crate::digest::hash_manifest_text;
use crate::error::{AppCacheError, Result};
use crate::fetcher::Fetcher;
use crate::model::ManifestVersion;
use crate::parser;
use crate::response_cache::ResponseCacheStorage;
use crate::store::ManifestStore;

/// What installing a manifest did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    /// The fetched text hashed to the already-current version; nothing changed.
    NoOp,
    /// A new version was parsed, pre-cached, and appended to history.
    Installed {
        /// The new version's content hash (and per-version cache name).
        hash: String,
    },
}

/// Installs `fresh_text` as a candidate new version of the manifest at
/// `manifest_url`, following the installation algorithm's five steps.
pub async fn install(
    store: &dyn ManifestStore,
    cache: &dyn ResponseCacheStorage,
    fetcher: &dyn Fetcher,
    manifest_url: &Url,
    fresh_text: &str,
) -> Result<InstallOutcome> {
    let hash = hash_manifest_text(fresh_text);
    let mut history = store.get_history(manifest_url).await?;

    if history.current().is_some_and(|current| current.hash == hash) {
        tracing::debug!(%manifest_url, %hash, "manifest text unchanged, skipping install");
        return Ok(InstallOutcome::NoOp);
    }

    let parsed = parser::parse(manifest_url, fresh_text).map_err(|reason| {
        AppCacheError::ParseFailed { url: manifest_url.to_string(), reason }
    })?;

    for url in parsed.precache_targets() {
        precache_one(cache, fetcher, &hash, url).await;
    }

    history.push(ManifestVersion { hash: hash.clone(), text: fresh_text.to_string(), parsed });
    store.put_history(manifest_url, history).await?;

    tracing::info!(%manifest_url, %hash, "installed new manifest version");
    Ok(InstallOutcome::Installed { hash })
}

/// Pre-caches a single URL, applying the eviction/store/leave-untouched
/// predicates applied during pre-caching. Never propagates a failure: "Individual URL
/// failures must never abort the installation of the remaining URLs."
async fn precache_one(
    cache: &dyn ResponseCacheStorage,
    fetcher: &dyn Fetcher,
    cache_name: &str,
    url: &Url,
) {
    let response = match fetcher.fetch_conditioning(url).await {
        Ok(response) => response,
        Err(error) => {
            tracing::debug!(%url, %cache_name, %error, "pre-cache fetch failed, leaving prior entry untouched");
            return;
        }
    };

    let write = if response.is_gone() || response.cache_control_no_store() {
        cache.delete_entry(cache_name, url).await
    } else if response.is_ok() {
        cache.put(cache_name, url, response).await
    } else {
        // 3xx/5xx: leave any existing entry untouched.
        Ok(())
    };

    if let Err(error) = write {
        tracing::warn!(%url, %cache_name, %error, "pre-cache store write failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response_cache::ResponseCacheStorage as _;
    use crate::test_support::{FakeCacheStorage, FakeFetcher, FakeStore};

    fn manifest_url() -> Url {
        Url::parse("https://s/m").unwrap()
    }

    #[tokio::test]
    async fn installs_new_version_and_precaches() {
        let store = FakeStore::default();
        let cache = FakeCacheStorage::default();
        let fetcher = FakeFetcher::default();
        fetcher.set_ok("https://s/a", b"A".to_vec());
        fetcher.set_ok("https://s/b", b"B".to_vec());

        let outcome =
            install(&store, &cache, &fetcher, &manifest_url(), "CACHE:\n/a\n/b\nNETWORK:\n*\n")
                .await
                .unwrap();
        let InstallOutcome::Installed { hash } = outcome else { panic!("expected Installed") };

        assert!(cache.get(&hash, &Url::parse("https://s/a").unwrap()).await.unwrap().is_some());
        assert!(cache.get(&hash, &Url::parse("https://s/b").unwrap()).await.unwrap().is_some());

        let history = store.get_history(&manifest_url()).await.unwrap();
        assert_eq!(history.versions.len(), 1);
    }

    #[tokio::test]
    async fn idempotent_on_unchanged_text() {
        let store = FakeStore::default();
        let cache = FakeCacheStorage::default();
        let fetcher = FakeFetcher::default();
        fetcher.set_ok("https://s/a", b"A".to_vec());
        let text = "CACHE:\n/a\nNETWORK:\n*\n";

        install(&store, &cache, &fetcher, &manifest_url(), text).await.unwrap();
        let second = install(&store, &cache, &fetcher, &manifest_url(), text).await.unwrap();

        assert_eq!(second, InstallOutcome::NoOp);
        let history = store.get_history(&manifest_url()).await.unwrap();
        assert_eq!(history.versions.len(), 1);
    }

    #[tokio::test]
    async fn distinct_texts_accumulate_history_in_order() {
        let store = FakeStore::default();
        let cache = FakeCacheStorage::default();
        let fetcher = FakeFetcher::default();
        fetcher.set_ok("https://s/a", b"A".to_vec());

        let mut hashes = Vec::new();
        for text in [
            "CACHE:\n/a\nNETWORK:\n*\n",
            "CACHE:\n/a\nNETWORK:\nexplicit-only\n",
            "CACHE:\n/a\nFALLBACK:\n/x /y\nNETWORK:\n*\n",
        ] {
            match install(&store, &cache, &fetcher, &manifest_url(), text).await.unwrap() {
                InstallOutcome::Installed { hash } => hashes.push(hash),
                InstallOutcome::NoOp => panic!("expected a new version"),
            }
        }

        let history = store.get_history(&manifest_url()).await.unwrap();
        assert_eq!(history.versions.len(), 3);
        assert_eq!(history.versions.iter().map(|v| v.hash.clone()).collect::<Vec<_>>(), hashes);
        assert_eq!(history.current().unwrap().hash, hashes[2]);
    }

    #[tokio::test]
    async fn individual_precache_failure_does_not_abort_install() {
        let store = FakeStore::default();
        let cache = FakeCacheStorage::default();
        let fetcher = FakeFetcher::default();
        fetcher.set_ok("https://s/a", b"A".to_vec());
        // "/b" left unconfigured: FakeFetcher rejects unknown URLs.

        let outcome =
            install(&store, &cache, &fetcher, &manifest_url(), "CACHE:\n/a\n/b\nNETWORK:\n*\n")
                .await
                .unwrap();
        let InstallOutcome::Installed { hash } = outcome else { panic!("expected Installed") };

        assert!(cache.get(&hash, &Url::parse("https://s/a").unwrap()).await.unwrap().is_some());
        assert!(cache.get(&hash, &Url::parse("https://s/b").unwrap()).await.unwrap().is_none());
        let history = store.get_history(&manifest_url()).await.unwrap();
        assert_eq!(history.versions.len(), 1);
    }
}
