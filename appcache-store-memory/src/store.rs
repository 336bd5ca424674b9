//! [`MemoryManifestStore`]: the in-process `ManifestStore`.

use std::collections::HashMap;

use appcache_core::error::Result;
use appcache_core::model::{ClientBinding, ManifestHistory};
use appcache_core::store::ManifestStore;
use async_trait::async_trait;
use tokio::sync::RwLock;
use url::Url;

/// An in-memory `ManifestStore`, one `RwLock`-guarded map per persistent
/// store, so a write to `PATH_TO_MANIFEST` never blocks a
/// concurrent read of `MANIFEST_URL_TO_CONTENTS`.
#[derive(Debug, Default)]
pub struct MemoryManifestStore {
    histories: RwLock<HashMap<Url, ManifestHistory>>,
    path_bindings: RwLock<HashMap<Url, ClientBinding>>,
    client_ids: RwLock<HashMap<String, String>>,
}

impl MemoryManifestStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ManifestStore for MemoryManifestStore {
    async fn get_history(&self, manifest_url: &Url) -> Result<ManifestHistory> {
        Ok(self.histories.read().await.get(manifest_url).cloned().unwrap_or_default())
    }

    async fn put_history(&self, manifest_url: &Url, history: ManifestHistory) -> Result<()> {
        self.histories.write().await.insert(manifest_url.clone(), history);
        Ok(())
    }

    async fn all_histories(&self) -> Result<Vec<(Url, ManifestHistory)>> {
        Ok(self.histories.read().await.iter().map(|(u, h)| (u.clone(), h.clone())).collect())
    }

    async fn get_path_binding(&self, client_url: &Url) -> Result<Option<ClientBinding>> {
        Ok(self.path_bindings.read().await.get(client_url).cloned())
    }

    async fn put_path_binding(&self, client_url: &Url, binding: ClientBinding) -> Result<()> {
        self.path_bindings.write().await.insert(client_url.clone(), binding);
        Ok(())
    }

    async fn get_client_id_hash(&self, client_id: &str) -> Result<Option<String>> {
        Ok(self.client_ids.read().await.get(client_id).cloned())
    }

    async fn put_client_id_hash(&self, client_id: &str, hash: &str) -> Result<()> {
        self.client_ids.write().await.insert(client_id.to_string(), hash.to_string());
        Ok(())
    }

    async fn delete_client_id_hash(&self, client_id: &str) -> Result<()> {
        self.client_ids.write().await.remove(client_id);
        Ok(())
    }

    async fn all_client_id_hashes(&self) -> Result<Vec<(String, String)>> {
        Ok(self.client_ids.read().await.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
    }
}
