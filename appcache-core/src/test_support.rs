//! In-memory fakes shared by this crate's own unit tests. `appcache-store-memory`
//! is the production-grade equivalent of `FakeStore`/`FakeCacheStorage`/
//! `FakeFetcher`; these exist so `appcache-core`'s tests don't take a
//! dependency on a sibling crate.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use url::Url;

use crate::client::ClientDirectory;
use crate::error::Result;
use crate::fetcher::{Fetcher, RequestView};
use crate::model::{ClientBinding, ManifestHistory};
use crate::response_cache::{CachedResponse, ResponseCacheStorage};
use crate::store::ManifestStore;

#[derive(Default)]
pub struct FakeStore {
    histories: Mutex<Vec<(Url, ManifestHistory)>>,
    path_bindings: Mutex<HashMap<String, ClientBinding>>,
    client_ids: Mutex<HashMap<String, String>>,
}

#[async_trait]
impl ManifestStore for FakeStore {
    async fn get_history(&self, manifest_url: &Url) -> Result<ManifestHistory> {
        Ok(self
            .histories
            .lock()
            .unwrap()
            .iter()
            .find(|(u, _)| u == manifest_url)
            .map(|(_, h)| h.clone())
            .unwrap_or_default())
    }

    async fn put_history(&self, manifest_url: &Url, history: ManifestHistory) -> Result<()> {
        let mut histories = self.histories.lock().unwrap();
        if let Some(entry) = histories.iter_mut().find(|(u, _)| u == manifest_url) {
            entry.1 = history;
        } else {
            histories.push((manifest_url.clone(), history));
        }
        Ok(())
    }

    async fn all_histories(&self) -> Result<Vec<(Url, ManifestHistory)>> {
        Ok(self.histories.lock().unwrap().clone())
    }

    async fn get_path_binding(&self, client_url: &Url) -> Result<Option<ClientBinding>> {
        Ok(self.path_bindings.lock().unwrap().get(client_url.as_str()).cloned())
    }

    async fn put_path_binding(&self, client_url: &Url, binding: ClientBinding) -> Result<()> {
        self.path_bindings.lock().unwrap().insert(client_url.to_string(), binding);
        Ok(())
    }

    async fn get_client_id_hash(&self, client_id: &str) -> Result<Option<String>> {
        Ok(self.client_ids.lock().unwrap().get(client_id).cloned())
    }

    async fn put_client_id_hash(&self, client_id: &str, hash: &str) -> Result<()> {
        self.client_ids.lock().unwrap().insert(client_id.to_string(), hash.to_string());
        Ok(())
    }

    async fn delete_client_id_hash(&self, client_id: &str) -> Result<()> {
        self.client_ids.lock().unwrap().remove(client_id);
        Ok(())
    }

    async fn all_client_id_hashes(&self) -> Result<Vec<(String, String)>> {
        Ok(self.client_ids.lock().unwrap().iter().map(|(k, v)| (k.clone(), v.clone())).collect())
    }
}

#[derive(Default)]
pub struct FakeCacheStorage {
    entries: Mutex<HashMap<(String, String), CachedResponse>>,
}

#[async_trait]
impl ResponseCacheStorage for FakeCacheStorage {
    async fn put(&self, cache_name: &str, url: &Url, response: CachedResponse) -> Result<()> {
        self.entries
            .lock()
            .unwrap()
            .insert((cache_name.to_string(), url.to_string()), response);
        Ok(())
    }

    async fn get(&self, cache_name: &str, url: &Url) -> Result<Option<CachedResponse>> {
        Ok(self.entries.lock().unwrap().get(&(cache_name.to_string(), url.to_string())).cloned())
    }

    async fn delete_entry(&self, cache_name: &str, url: &Url) -> Result<()> {
        self.entries.lock().unwrap().remove(&(cache_name.to_string(), url.to_string()));
        Ok(())
    }

    async fn delete_cache(&self, cache_name: &str) -> Result<()> {
        self.entries.lock().unwrap().retain(|(name, _), _| name != cache_name);
        Ok(())
    }
}

/// A fetcher whose responses are pre-programmed by URL; unprogrammed URLs
/// reject (simulating offline/DNS failure), distinguishing the "rejection"
/// path from a programmed non-2xx response.
#[derive(Default)]
pub struct FakeFetcher {
    responses: Mutex<HashMap<String, CachedResponse>>,
}

impl FakeFetcher {
    pub fn set_ok(&self, url: &str, body: Vec<u8>) {
        self.set_status(url, 200, body);
    }

    pub fn set_status(&self, url: &str, status: u16, body: Vec<u8>) {
        let parsed = Url::parse(url).unwrap();
        self.responses.lock().unwrap().insert(
            url.to_string(),
            CachedResponse::new(parsed, status, HashMap::new(), body),
        );
    }

    pub fn set_response(&self, url: &str, response: CachedResponse) {
        self.responses.lock().unwrap().insert(url.to_string(), response);
    }
}

#[async_trait]
impl Fetcher for FakeFetcher {
    async fn fetch(&self, request: &RequestView) -> Result<CachedResponse> {
        self.responses
            .lock()
            .unwrap()
            .get(request.url.as_str())
            .cloned()
            .ok_or_else(|| crate::error::AppCacheError::NetworkError(Box::new(NetworkUnreachable)))
    }

    async fn fetch_conditioning(&self, url: &Url) -> Result<CachedResponse> {
        self.responses
            .lock()
            .unwrap()
            .get(url.as_str())
            .cloned()
            .ok_or_else(|| crate::error::AppCacheError::NetworkError(Box::new(NetworkUnreachable)))
    }
}

#[derive(Debug)]
struct NetworkUnreachable;

impl std::fmt::Display for NetworkUnreachable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("simulated network failure")
    }
}

impl std::error::Error for NetworkUnreachable {}

#[derive(Default)]
pub struct FakeClientDirectory {
    clients: Mutex<HashMap<String, Url>>,
}

impl FakeClientDirectory {
    pub fn add(&self, client_id: &str, url: &str) {
        self.clients.lock().unwrap().insert(client_id.to_string(), Url::parse(url).unwrap());
    }

    pub fn remove(&self, client_id: &str) {
        self.clients.lock().unwrap().remove(client_id);
    }
}

#[async_trait]
impl ClientDirectory for FakeClientDirectory {
    async fn client_url(&self, client_id: &str) -> Result<Option<Url>> {
        Ok(self.clients.lock().unwrap().get(client_id).cloned())
    }

    async fn active_client_ids(&self) -> Result<Vec<String>> {
        Ok(self.clients.lock().unwrap().keys().cloned().collect())
    }
}
