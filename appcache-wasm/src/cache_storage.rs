//! [`CacheStorageResponseCache`]: the real `ResponseCacheStorage`, backed by
//! the browser's Cache Storage API (`self.caches` / `window.caches`).
//!
//! Each `cache_name` the engine passes in (a manifest version hash) maps
//! directly to a Cache Storage cache of the same name — no prefixing needed
//! since the hashes are already namespaced to this shim by construction.

use std::collections::HashMap;

use appcache_core::error::{AppCacheError, Result as CoreResult};
use appcache_core::response_cache::{CachedResponse, ResponseCacheStorage};
use async_trait::async_trait;
use js_sys::{Array, Uint8Array};
use send_wrapper::SendWrapper;
use url::Url;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{CacheStorage, Headers, Request, Response, ResponseInit};

use crate::idb::JsValueError;

fn js_err(context: &str, error: JsValue) -> AppCacheError {
    AppCacheError::ResponseCacheFailed(Box::new(JsValueError::new(context, error)))
}

async fn send_bridge<T>(body: impl std::future::Future<Output = T>) -> T {
    SendWrapper::new(body).await
}

/// A `ResponseCacheStorage` over the worker/window global's `caches` handle.
#[derive(Debug, Clone)]
pub struct CacheStorageResponseCache {
    caches: SendWrapper<CacheStorage>,
}

impl CacheStorageResponseCache {
    /// Wraps the global `CacheStorage` handle (`self.caches` in a worker,
    /// `window.caches` on a page).
    #[must_use]
    pub fn new(caches: CacheStorage) -> Self {
        Self { caches: SendWrapper::new(caches) }
    }

    async fn open(&self, cache_name: &str) -> CoreResult<web_sys::Cache> {
        let promise = self.caches.open(cache_name);
        let value = JsFuture::from(promise).await.map_err(|e| js_err("caches.open", e))?;
        value
            .dyn_into()
            .map_err(|_| AppCacheError::Message("caches.open did not yield a Cache".to_string()))
    }

    fn to_request(url: &Url) -> CoreResult<Request> {
        Request::new_with_str(url.as_str())
            .map_err(|e| js_err("new Request", e))
    }

    fn to_response(response: &CachedResponse) -> CoreResult<Response> {
        let headers = Headers::new().map_err(|e| js_err("new Headers", e))?;
        for (name, value) in &response.headers {
            headers.append(name, value).map_err(|e| js_err("Headers.append", e))?;
        }
        let body = Uint8Array::from(response.body.as_slice());
        let init = ResponseInit::new();
        init.set_status(response.status);
        init.set_headers(&headers);
        Response::new_with_opt_buffer_source_and_init(Some(&body), &init)
            .map_err(|e| js_err("new Response", e))
    }

    async fn from_response(url: Url, response: Response) -> CoreResult<CachedResponse> {
        let status = response.status();
        let headers_iter = js_sys::try_iter(&response.headers())
            .map_err(|e| js_err("Headers iterator", e))?
            .ok_or_else(|| AppCacheError::Message("Headers is not iterable".to_string()))?;
        let mut headers = HashMap::new();
        for entry in headers_iter {
            let entry = entry.map_err(|e| js_err("Headers entry", e))?;
            let pair: Array = entry.unchecked_into();
            let name = pair.get(0).as_string().unwrap_or_default();
            let value = pair.get(1).as_string().unwrap_or_default();
            headers.insert(name, value);
        }
        let buffer = JsFuture::from(
            response.array_buffer().map_err(|e| js_err("Response.arrayBuffer", e))?,
        )
        .await
        .map_err(|e| js_err("Response.arrayBuffer await", e))?;
        let body = Uint8Array::new(&buffer).to_vec();
        Ok(CachedResponse::new(url, status, headers, body))
    }
}

#[async_trait]
impl ResponseCacheStorage for CacheStorageResponseCache {
    async fn put(&self, cache_name: &str, url: &Url, response: CachedResponse) -> CoreResult<()> {
        send_bridge(async move {
            let cache = self.open(cache_name).await?;
            let request = Self::to_request(url)?;
            let js_response = Self::to_response(&response)?;
            JsFuture::from(cache.put_with_request(&request, &js_response))
                .await
                .map_err(|e| js_err("Cache.put", e))?;
            Ok(())
        })
        .await
    }

    async fn get(&self, cache_name: &str, url: &Url) -> CoreResult<Option<CachedResponse>> {
        send_bridge(async move {
            let cache = self.open(cache_name).await?;
            let request = Self::to_request(url)?;
            let value = JsFuture::from(cache.match_with_request(&request))
                .await
                .map_err(|e| js_err("Cache.match", e))?;
            if value.is_undefined() {
                return Ok(None);
            }
            let response: Response = value
                .dyn_into()
                .map_err(|_| AppCacheError::Message("Cache.match did not yield a Response".to_string()))?;
            Self::from_response(url.clone(), response).await.map(Some)
        })
        .await
    }

    async fn delete_entry(&self, cache_name: &str, url: &Url) -> CoreResult<()> {
        send_bridge(async move {
            let cache = self.open(cache_name).await?;
            let request = Self::to_request(url)?;
            JsFuture::from(cache.delete_with_request(&request))
                .await
                .map_err(|e| js_err("Cache.delete", e))?;
            Ok(())
        })
        .await
    }

    async fn delete_cache(&self, cache_name: &str) -> CoreResult<()> {
        send_bridge(async move {
            JsFuture::from(self.caches.delete(cache_name))
                .await
                .map_err(|e| js_err("caches.delete", e))?;
            Ok(())
        })
        .await
    }
}
