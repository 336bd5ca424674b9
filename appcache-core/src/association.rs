//! The Association Recorder: records which manifest version the
//! current document committed to, and seeds the current document itself into
//! that version's per-version cache ("cache-as-you-go").

use url::Url;

use crate::error::Result;
use crate::fetcher::Fetcher;
use crate::model::ClientBinding;
use crate::response_cache::ResponseCacheStorage;
use crate::store::ManifestStore;

/// Records `PATH_TO_MANIFEST[document_url] = { manifest_url, hash }` and
/// seeds `document_url` into the per-version cache named `hash`, tolerant of
/// the seeding fetch failing.
pub async fn record_association(
    store: &dyn ManifestStore,
    cache: &dyn ResponseCacheStorage,
    fetcher: &dyn Fetcher,
    document_url: &Url,
    manifest_url: &Url,
    hash: &str,
) -> Result<()> {
    store
        .put_path_binding(
            document_url,
            ClientBinding { manifest_url: manifest_url.clone(), hash: hash.to_string() },
        )
        .await?;

    match fetcher.fetch_conditioning(document_url).await {
        Ok(response) if response.is_ok() => {
            if let Err(error) = cache.put(hash, document_url, response).await {
                tracing::warn!(%document_url, %hash, %error, "failed to seed document into per-version cache");
            }
        }
        Ok(response) => {
            tracing::debug!(%document_url, status = response.status, "document seeding fetch returned non-ok status");
        }
        Err(error) => {
            tracing::debug!(%document_url, %error, "document seeding fetch failed");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response_cache::ResponseCacheStorage as _;
    use crate::test_support::{FakeCacheStorage, FakeFetcher, FakeStore};

    #[tokio::test]
    async fn records_binding_and_seeds_document() {
        let store = FakeStore::default();
        let cache = FakeCacheStorage::default();
        let fetcher = FakeFetcher::default();
        let document_url = Url::parse("https://s/p").unwrap();
        let manifest_url = Url::parse("https://s/m").unwrap();
        fetcher.set_ok(document_url.as_str(), b"<html></html>".to_vec());

        record_association(&store, &cache, &fetcher, &document_url, &manifest_url, "abc123")
            .await
            .unwrap();

        let binding = store.get_path_binding(&document_url).await.unwrap().unwrap();
        assert_eq!(binding.manifest_url, manifest_url);
        assert_eq!(binding.hash, "abc123");
        assert!(cache.get("abc123", &document_url).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn binding_recorded_even_if_seeding_fetch_fails() {
        let store = FakeStore::default();
        let cache = FakeCacheStorage::default();
        let fetcher = FakeFetcher::default();
        let document_url = Url::parse("https://s/p").unwrap();
        let manifest_url = Url::parse("https://s/m").unwrap();
        // document_url left unprogrammed: fetch_conditioning rejects.

        record_association(&store, &cache, &fetcher, &document_url, &manifest_url, "abc123")
            .await
            .unwrap();

        assert!(store.get_path_binding(&document_url).await.unwrap().is_some());
        assert!(cache.get("abc123", &document_url).await.unwrap().is_none());
    }
}
