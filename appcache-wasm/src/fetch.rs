//! [`ServiceWorkerFetcher`] and [`PageFetcher`]: the real `Fetcher`
//! implementations, backed by `ServiceWorkerGlobalScope::fetch_with_request`
//! and `Window::fetch_with_request` respectively. Both sides of the shim
//! need a live-fetch handle with the same
//! conditioning-fetch option set, so the request-building and
//! response-parsing logic lives in free functions both structs share.

use std::collections::HashMap;

use appcache_core::error::{AppCacheError, Result as CoreResult};
use appcache_core::fetcher::{Fetcher, RequestView, USE_FETCH_HEADER};
use appcache_core::response_cache::CachedResponse;
use async_trait::async_trait;
use js_sys::{Array, Uint8Array};
use send_wrapper::SendWrapper;
use url::Url;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    Headers, Request, RequestCredentials, RequestInit, RequestMode, RequestRedirect, Response,
    ServiceWorkerGlobalScope, Window,
};

use crate::idb::JsValueError;

fn js_err(context: &str, error: JsValue) -> AppCacheError {
    AppCacheError::NetworkError(Box::new(JsValueError::new(context, error)))
}

async fn send_bridge<T>(body: impl std::future::Future<Output = T>) -> T {
    SendWrapper::new(body).await
}

fn build_request(
    method: &str,
    url: &Url,
    headers: &HashMap<String, String>,
    init: &RequestInit,
) -> CoreResult<Request> {
    init.set_method(method);
    let js_headers = Headers::new().map_err(|e| js_err("new Headers", e))?;
    for (name, value) in headers {
        js_headers.append(name, value).map_err(|e| js_err("Headers.append", e))?;
    }
    init.set_headers(&js_headers);
    Request::new_with_str_and_init(url.as_str(), init).map_err(|e| js_err("new Request", e))
}

fn conditioning_init() -> RequestInit {
    let init = RequestInit::new();
    init.set_credentials(RequestCredentials::Include);
    init.set_redirect(RequestRedirect::Manual);
    init.set_mode(RequestMode::NoCors);
    init.set_referrer("");
    init
}

fn conditioning_headers() -> HashMap<String, String> {
    let mut headers = HashMap::new();
    headers.insert(USE_FETCH_HEADER.to_string(), "true".to_string());
    headers
}

async fn response_from(url: Url, response: Response) -> CoreResult<CachedResponse> {
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
    let buffer =
        JsFuture::from(response.array_buffer().map_err(|e| js_err("Response.arrayBuffer", e))?)
            .await
            .map_err(|e| js_err("Response.arrayBuffer await", e))?;
    let body = Uint8Array::new(&buffer).to_vec();
    Ok(CachedResponse::new(url, status, headers, body))
}

fn response_url(request: &Request) -> CoreResult<Url> {
    request
        .url()
        .parse()
        .map_err(|_| AppCacheError::Message("Request.url() was not a valid URL".to_string()))
}

/// A `Fetcher` over the worker's own global scope, used by
/// [`crate::worker`].
#[derive(Debug, Clone)]
pub struct ServiceWorkerFetcher {
    scope: SendWrapper<ServiceWorkerGlobalScope>,
}

impl ServiceWorkerFetcher {
    /// Wraps the worker global scope handle.
    #[must_use]
    pub fn new(scope: ServiceWorkerGlobalScope) -> Self {
        Self { scope: SendWrapper::new(scope) }
    }

    async fn run(&self, request: &Request) -> CoreResult<CachedResponse> {
        let url = response_url(request)?;
        let response: Response = JsFuture::from(self.scope.fetch_with_request(request))
            .await
            .map_err(|e| js_err("fetch", e))?
            .dyn_into()
            .map_err(|_| AppCacheError::Message("fetch() did not yield a Response".to_string()))?;
        response_from(url, response).await
    }
}

#[async_trait]
impl Fetcher for ServiceWorkerFetcher {
    async fn fetch(&self, request: &RequestView) -> CoreResult<CachedResponse> {
        send_bridge(async move {
            let init = RequestInit::new();
            let js_request = build_request(&request.method, &request.url, &request.headers, &init)?;
            self.run(&js_request).await
        })
        .await
    }

    async fn fetch_conditioning(&self, url: &Url) -> CoreResult<CachedResponse> {
        send_bridge(async move {
            let init = conditioning_init();
            let js_request = build_request("GET", url, &conditioning_headers(), &init)?;
            self.run(&js_request).await
        })
        .await
    }
}

/// A `Fetcher` over the document's own `window`, used by [`crate::boot`] —
/// the Page Agent runs before any service worker controls the page, so it
/// cannot rely on `ServiceWorkerGlobalScope::fetch_with_request` and instead
/// calls `Window::fetch_with_request` directly.
#[derive(Debug, Clone)]
pub struct PageFetcher {
    window: SendWrapper<Window>,
}

impl PageFetcher {
    /// Wraps the document's `window` handle.
    #[must_use]
    pub fn new(window: Window) -> Self {
        Self { window: SendWrapper::new(window) }
    }

    async fn run(&self, request: &Request) -> CoreResult<CachedResponse> {
        let url = response_url(request)?;
        let response: Response = JsFuture::from(self.window.fetch_with_request(request))
            .await
            .map_err(|e| js_err("fetch", e))?
            .dyn_into()
            .map_err(|_| AppCacheError::Message("fetch() did not yield a Response".to_string()))?;
        response_from(url, response).await
    }
}

#[async_trait]
impl Fetcher for PageFetcher {
    async fn fetch(&self, request: &RequestView) -> CoreResult<CachedResponse> {
        send_bridge(async move {
            let init = RequestInit::new();
            let js_request = build_request(&request.method, &request.url, &request.headers, &init)?;
            self.run(&js_request).await
        })
        .await
    }

    async fn fetch_conditioning(&self, url: &Url) -> CoreResult<CachedResponse> {
        send_bridge(async move {
            let init = conditioning_init();
            let js_request = build_request("GET", url, &conditioning_headers(), &init)?;
            self.run(&js_request).await
        })
        .await
    }
}
