//! [`WorkerClientDirectory`]: the real `ClientDirectory`, backed by
//! `self.clients` inside the service worker.

use appcache_core::client::ClientDirectory;
use appcache_core::error::{AppCacheError, Result as CoreResult};
use async_trait::async_trait;
use js_sys::Array;
use send_wrapper::SendWrapper;
use url::Url;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{Client, Clients};

use crate::idb::JsValueError;

fn js_err(context: &str, error: JsValue) -> AppCacheError {
    AppCacheError::Message(JsValueError::new(context, error).to_string())
}

async fn send_bridge<T>(body: impl std::future::Future<Output = T>) -> T {
    SendWrapper::new(body).await
}

/// A `ClientDirectory` over the worker's `self.clients`.
#[derive(Debug, Clone)]
pub struct WorkerClientDirectory {
    clients: SendWrapper<Clients>,
}

impl WorkerClientDirectory {
    /// Wraps the worker's `clients` handle.
    #[must_use]
    pub fn new(clients: Clients) -> Self {
        Self { clients: SendWrapper::new(clients) }
    }
}

#[async_trait]
impl ClientDirectory for WorkerClientDirectory {
    async fn client_url(&self, client_id: &str) -> CoreResult<Option<Url>> {
        send_bridge(async move {
            let value = JsFuture::from(self.clients.get(client_id))
                .await
                .map_err(|e| js_err("clients.get", e))?;
            if value.is_undefined() || value.is_null() {
                return Ok(None);
            }
            let client: Client = value
                .dyn_into()
                .map_err(|_| AppCacheError::Message("clients.get did not yield a Client".to_string()))?;
            let url = client
                .url()
                .parse()
                .map_err(|_| AppCacheError::Message("Client.url() was not a valid URL".to_string()))?;
            Ok(Some(url))
        })
        .await
    }

    async fn active_client_ids(&self) -> CoreResult<Vec<String>> {
        send_bridge(async move {
            let value = JsFuture::from(self.clients.match_all())
                .await
                .map_err(|e| js_err("clients.matchAll", e))?;
            let array: Array = value
                .dyn_into()
                .map_err(|_| AppCacheError::Message("clients.matchAll did not yield an array".to_string()))?;
            let mut ids = Vec::with_capacity(array.length() as usize);
            for entry in array.iter() {
                let client: Client = entry
                    .dyn_into()
                    .map_err(|_| AppCacheError::Message("matchAll() entry was not a Client".to_string()))?;
                ids.push(client.id());
            }
            Ok(ids)
        })
        .await
    }
}
