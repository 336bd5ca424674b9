//! [`MemoryClientDirectory`]: a settable `ClientDirectory` test/embedding
//! double standing in for the browser's `self.clients`.

use std::collections::HashMap;

use appcache_core::client::ClientDirectory;
use appcache_core::error::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;
use url::Url;

/// A directory of live clients, settable by callers — there is no real
/// `clients.matchAll()` outside a Service Worker, so any embedding host
/// (including `appcache-tests`) drives client lifecycle through
/// [`MemoryClientDirectory::add`] and [`MemoryClientDirectory::remove`]
/// directly to simulate navigations and tab closures.
#[derive(Debug, Default)]
pub struct MemoryClientDirectory {
    clients: RwLock<HashMap<String, Url>>,
}

impl MemoryClientDirectory {
    /// A directory with no live clients.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `client_id` as live at `url`, as if a tab had just navigated.
    pub async fn add(&self, client_id: &str, url: Url) {
        self.clients.write().await.insert(client_id.to_string(), url);
    }

    /// Removes `client_id`, as if its tab had been closed or navigated away
    /// from this worker's scope.
    pub async fn remove(&self, client_id: &str) {
        self.clients.write().await.remove(client_id);
    }
}

#[async_trait]
impl ClientDirectory for MemoryClientDirectory {
    async fn client_url(&self, client_id: &str) -> Result<Option<Url>> {
        Ok(self.clients.read().await.get(client_id).cloned())
    }

    async fn active_client_ids(&self) -> Result<Vec<String>> {
        Ok(self.clients.read().await.keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn add_and_remove_clients() {
        let directory = MemoryClientDirectory::new();
        let url = Url::parse("https://s/p").unwrap();
        directory.add("c1", url.clone()).await;

        assert_eq!(directory.client_url("c1").await.unwrap(), Some(url));
        assert_eq!(directory.active_client_ids().await.unwrap(), vec!["c1".to_string()]);

        directory.remove("c1").await;
        assert_eq!(directory.client_url("c1").await.unwrap(), None);
        assert!(directory.active_client_ids().await.unwrap().is_empty());
    }
}
