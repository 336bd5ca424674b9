//! The worker-side `#[wasm_bindgen]` entry point: wires the real IndexedDB,
//! Cache Storage, live-fetch and client-directory adapters into
//! `appcache_core::worker_agent::legacy_app_cache_behavior`, and reacts to
//! the intercepted `FetchEvent` the way a service worker's `fetch` listener
//! must — by calling `respondWith` with a promise, never by blocking.

use appcache_core::response_cache::CachedResponse;
use appcache_core::worker_agent::{self, WorkerResponse};
use js_sys::Uint8Array;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;
use web_sys::{FetchEvent, Headers, RequestMode, Response, ResponseInit, ServiceWorkerGlobalScope};

use crate::cache_storage::CacheStorageResponseCache;
use crate::clients::WorkerClientDirectory;
use crate::event_view;
use crate::fetch::ServiceWorkerFetcher;
use crate::idb::IdbManifestStore;

fn to_js_response(response: &CachedResponse) -> Result<Response, JsValue> {
    let headers = Headers::new()?;
    for (name, value) in &response.headers {
        headers.append(name, value)?;
    }
    let body = Uint8Array::from(response.body.as_slice());
    let init = ResponseInit::new();
    init.set_status(response.status);
    init.set_headers(&headers);
    Response::new_with_opt_buffer_source_and_init(Some(&body), &init)
}

/// Handles one intercepted `fetch` event, to be called from the worker's
/// `addEventListener("fetch", ...)` shim. Returns the `Promise` the caller
/// passes straight to `event.respondWith`.
///
/// Collaborator failures inside resolution are already converted to a live
/// fetch by [`worker_agent::legacy_app_cache_behavior`]; a
/// [`WorkerResponse::NetworkError`] is a deliberate AppCache offline-error
/// outcome, not a failure, and is mapped straight to the platform's own
/// `Response::error()` rather than retried. The only failure this function
/// itself can surface is a browser API call (opening the database, building
/// a `Response`) rejecting, logged here and converted to the platform's own
/// network-error response so `respondWith` never receives a rejected
/// promise.
#[wasm_bindgen(js_name = "legacyAppCacheBehavior")]
pub fn legacy_app_cache_behavior(event: FetchEvent, scope: ServiceWorkerGlobalScope) -> js_sys::Promise {
    future_to_promise(async move {
        let view = match event_view::view_of(&event) {
            Ok(view) => view,
            Err(error) => {
                tracing::error!(%error, "failed to build fetch event view");
                return Ok(JsValue::from(Response::error()));
            }
        };

        let db = match crate::idb::open_database().await {
            Ok(db) => db,
            Err(error) => {
                tracing::error!(%error, "failed to open appcache database");
                return Ok(JsValue::from(Response::error()));
            }
        };
        let store = IdbManifestStore::new(db);
        let caches = match scope.caches() {
            Ok(caches) => caches,
            Err(error) => {
                tracing::error!(error = ?error, "ServiceWorkerGlobalScope.caches is unavailable");
                return Ok(JsValue::from(Response::error()));
            }
        };
        let cache = CacheStorageResponseCache::new(caches);
        let fetcher = ServiceWorkerFetcher::new(scope.clone());
        let directory = WorkerClientDirectory::new(scope.clients());

        let is_navigation = event.request().mode() == RequestMode::Navigate;

        let outcome =
            worker_agent::legacy_app_cache_behavior(&view, &store, &cache, &fetcher, &directory).await;

        let worker_response = match outcome {
            Ok((response, _outcome)) => response,
            Err(error) => {
                tracing::error!(%error, "live fetch fallback itself failed");
                return Ok(JsValue::from(Response::error()));
            }
        };

        if is_navigation {
            schedule_gc_after_navigation(store, cache, directory);
        }

        match worker_response {
            WorkerResponse::Resolved(response) => to_js_response(&response).map(JsValue::from),
            WorkerResponse::NetworkError => Ok(JsValue::from(Response::error())),
        }
    })
}

/// Runs a GC pass in the background after a navigation-triggering fetch.
/// Scheduled via `spawn_local` so it never delays the response this event
/// is already about to deliver.
fn schedule_gc_after_navigation(
    store: IdbManifestStore,
    cache: CacheStorageResponseCache,
    directory: WorkerClientDirectory,
) {
    wasm_bindgen_futures::spawn_local(async move {
        match worker_agent::run_gc_after_navigation(&store, &cache, &directory).await {
            Ok(swept) if !swept.is_empty() => {
                tracing::debug!(count = swept.len(), "swept retired appcache versions");
            }
            Ok(_) => {}
            Err(error) => tracing::warn!(%error, "gc sweep failed"),
        }
    });
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use appcache_core::response_cache::CachedResponse;
    use url::Url;
    use wasm_bindgen_test::wasm_bindgen_test;

    use super::to_js_response;

    wasm_bindgen_test::wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn to_js_response_carries_status_headers_and_body() {
        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), "text/plain".to_string());
        let cached = CachedResponse::new(
            Url::parse("https://s/a").unwrap(),
            200,
            headers,
            b"hello".to_vec(),
        );

        let response = to_js_response(&cached).unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(response.headers().get("content-type").unwrap(), Some("text/plain".to_string()));
    }
}
