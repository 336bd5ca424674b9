//! The GC Sweeper: reclaims per-version caches that no live client
//! still references, without ever touching the current version of any
//! manifest.

use url::Url;

use crate::client::ClientDirectory;
use crate::error::Result;
use crate::response_cache::ResponseCacheStorage;
use crate::store::ManifestStore;

/// One deleted per-version cache, reported for observability/testing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweptVersion {
    /// The manifest this retired version belonged to.
    pub manifest_url: Url,
    /// The retired version's hash (and per-version cache name).
    pub hash: String,
}

/// Runs one GC pass:
///
/// 1. Collect every hash still referenced by a live client (`CLIENT_ID_TO_HASH`
///    for ids [`ClientDirectory::active_client_ids`] still reports as live).
/// 2. For every manifest's history, a retired version (not current) whose
///    hash is not in that live set is unreferenced.
/// 3. Delete the unreferenced version's per-version cache and drop it from
///    history entirely — stale history entries left behind for a deleted
///    cache are of no use to either the Rule Engine or a future install.
/// 4. Never delete a manifest's current version, even if it happens to have
///    no live client bound to it yet (a fresh install with no navigations since).
pub async fn sweep(
    store: &dyn ManifestStore,
    cache: &dyn ResponseCacheStorage,
    directory: &dyn ClientDirectory,
) -> Result<Vec<SweptVersion>> {
    let live_ids: std::collections::HashSet<String> =
        directory.active_client_ids().await?.into_iter().collect();

    let mut live_hashes = std::collections::HashSet::new();
    for (client_id, hash) in store.all_client_id_hashes().await? {
        if live_ids.contains(&client_id) {
            live_hashes.insert(hash);
        } else {
            store.delete_client_id_hash(&client_id).await?;
        }
    }

    let mut swept = Vec::new();
    for (manifest_url, mut history) in store.all_histories().await? {
        let retired: Vec<String> = history
            .retired_hashes()
            .filter(|hash| !live_hashes.contains(*hash))
            .map(str::to_string)
            .collect();

        if retired.is_empty() {
            continue;
        }

        for hash in &retired {
            cache.delete_cache(hash).await?;
            tracing::info!(%manifest_url, %hash, "garbage collected retired manifest version");
        }

        history.versions.retain(|v| !retired.contains(&v.hash));
        store.put_history(&manifest_url, history).await?;

        swept.extend(retired.into_iter().map(|hash| SweptVersion { manifest_url: manifest_url.clone(), hash }));
    }

    Ok(swept)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::association;
    use crate::installer;
    use crate::response_cache::ResponseCacheStorage as _;
    use crate::test_support::{FakeCacheStorage, FakeClientDirectory, FakeFetcher, FakeStore};

    #[tokio::test]
    async fn retired_version_with_no_live_binding_is_collected() {
        let store = FakeStore::default();
        let cache = FakeCacheStorage::default();
        let fetcher = FakeFetcher::default();
        let directory = FakeClientDirectory::default();
        let manifest_url = Url::parse("https://s/m").unwrap();
        let document_url = Url::parse("https://s/p").unwrap();
        fetcher.set_ok("https://s/a", b"A".to_vec());
        fetcher.set_ok(document_url.as_str(), b"<html></html>".to_vec());

        let crate::installer::InstallOutcome::Installed { hash: hash_v1 } =
            installer::install(&store, &cache, &fetcher, &manifest_url, "CACHE:\n/a\nNETWORK:\n*\n")
                .await
                .unwrap()
        else {
            panic!("expected Installed")
        };
        association::record_association(&store, &cache, &fetcher, &document_url, &manifest_url, &hash_v1)
            .await
            .unwrap();
        directory.add("client-1", document_url.as_str());
        store.put_client_id_hash("client-1", &hash_v1).await.unwrap();

        let crate::installer::InstallOutcome::Installed { hash: hash_v2 } = installer::install(
            &store,
            &cache,
            &fetcher,
            &manifest_url,
            "CACHE:\n/a\nNETWORK:\nexplicit-only\n",
        )
        .await
        .unwrap()
        else {
            panic!("expected Installed")
        };

        // The client navigated away; it is no longer live.
        directory.remove("client-1");

        let swept = sweep(&store, &cache, &directory).await.unwrap();
        assert_eq!(swept, vec![SweptVersion { manifest_url: manifest_url.clone(), hash: hash_v1.clone() }]);

        assert!(cache.get(&hash_v1, &Url::parse("https://s/a").unwrap()).await.unwrap().is_none());
        let history = store.get_history(&manifest_url).await.unwrap();
        assert_eq!(history.versions.len(), 1);
        assert_eq!(history.current().unwrap().hash, hash_v2);
    }

    #[tokio::test]
    async fn version_bound_to_a_live_client_is_retained() {
        let store = FakeStore::default();
        let cache = FakeCacheStorage::default();
        let fetcher = FakeFetcher::default();
        let directory = FakeClientDirectory::default();
        let manifest_url = Url::parse("https://s/m").unwrap();
        let document_url = Url::parse("https://s/p").unwrap();
        fetcher.set_ok("https://s/a", b"A".to_vec());

        let crate::installer::InstallOutcome::Installed { hash: hash_v1 } =
            installer::install(&store, &cache, &fetcher, &manifest_url, "CACHE:\n/a\nNETWORK:\n*\n")
                .await
                .unwrap()
        else {
            panic!("expected Installed")
        };
        directory.add("client-1", document_url.as_str());
        store.put_client_id_hash("client-1", &hash_v1).await.unwrap();

        installer::install(&store, &cache, &fetcher, &manifest_url, "CACHE:\n/a\nNETWORK:\nexplicit-only\n")
            .await
            .unwrap();

        let swept = sweep(&store, &cache, &directory).await.unwrap();
        assert!(swept.is_empty());
        assert!(cache.get(&hash_v1, &Url::parse("https://s/a").unwrap()).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn current_version_never_collected_even_without_a_live_binding() {
        let store = FakeStore::default();
        let cache = FakeCacheStorage::default();
        let fetcher = FakeFetcher::default();
        let directory = FakeClientDirectory::default();
        let manifest_url = Url::parse("https://s/m").unwrap();
        fetcher.set_ok("https://s/a", b"A".to_vec());

        installer::install(&store, &cache, &fetcher, &manifest_url, "CACHE:\n/a\nNETWORK:\n*\n")
            .await
            .unwrap();

        let swept = sweep(&store, &cache, &directory).await.unwrap();
        assert!(swept.is_empty());
        let history = store.get_history(&manifest_url).await.unwrap();
        assert_eq!(history.versions.len(), 1);
    }
}
