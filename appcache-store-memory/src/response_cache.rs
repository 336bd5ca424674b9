//! [`MemoryResponseCache`]: the in-process `ResponseCacheStorage`.

use std::collections::HashMap;

use appcache_core::error::Result;
use appcache_core::response_cache::{CachedResponse, ResponseCacheStorage};
use async_trait::async_trait;
use tokio::sync::RwLock;
use url::Url;

/// An in-memory response cache keyed by `(cache name, url)`, standing in for
/// the browser's named Cache Storage API.
#[derive(Debug, Default)]
pub struct MemoryResponseCache {
    entries: RwLock<HashMap<(String, String), CachedResponse>>,
}

impl MemoryResponseCache {
    /// An empty cache, with no named caches yet created.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResponseCacheStorage for MemoryResponseCache {
    async fn put(&self, cache_name: &str, url: &Url, response: CachedResponse) -> Result<()> {
        self.entries
            .write()
            .await
            .insert((cache_name.to_string(), url.to_string()), response);
        Ok(())
    }

    async fn get(&self, cache_name: &str, url: &Url) -> Result<Option<CachedResponse>> {
        Ok(self.entries.read().await.get(&(cache_name.to_string(), url.to_string())).cloned())
    }

    async fn delete_entry(&self, cache_name: &str, url: &Url) -> Result<()> {
        self.entries.write().await.remove(&(cache_name.to_string(), url.to_string()));
        Ok(())
    }

    async fn delete_cache(&self, cache_name: &str) -> Result<()> {
        self.entries.write().await.retain(|(name, _), _| name != cache_name);
        Ok(())
    }
}
