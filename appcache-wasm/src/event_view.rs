//! Converts a `web_sys::FetchEvent` (and its `web_sys::Request`) into the
//! browser-agnostic [`FetchEventView`]/[`RequestView`] the engine operates on.

use std::collections::HashMap;

use appcache_core::client::FetchEventView;
use appcache_core::error::{AppCacheError, Result as CoreResult};
use appcache_core::fetcher::RequestView;
use url::Url;
use wasm_bindgen::JsCast;
use web_sys::{FetchEvent, Request};

fn request_view(request: &Request) -> CoreResult<RequestView> {
    let url: Url = request
        .url()
        .parse()
        .map_err(|_| AppCacheError::Message("FetchEvent request URL was invalid".to_string()))?;

    let mut headers = HashMap::new();
    if let Ok(Some(iter)) = js_sys::try_iter(&request.headers()) {
        for entry in iter.flatten() {
            let pair: js_sys::Array = entry.unchecked_into();
            let name = pair.get(0).as_string().unwrap_or_default();
            let value = pair.get(1).as_string().unwrap_or_default();
            headers.insert(name, value);
        }
    }

    Ok(RequestView { method: request.method().to_ascii_uppercase(), url, headers })
}

/// Builds a [`FetchEventView`] from an intercepted `FetchEvent`.
pub fn view_of(event: &FetchEvent) -> CoreResult<FetchEventView> {
    let request = event.request();
    let request = request_view(&request)?;

    let referrer = {
        let raw = event.request().referrer();
        if raw.is_empty() { None } else { raw.parse().ok() }
    };

    let client_id = {
        let id = event.client_id();
        if id.is_empty() { None } else { Some(id) }
    };

    Ok(FetchEventView { request, referrer, client_id })
}
