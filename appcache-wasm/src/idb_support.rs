//! Small helpers for bridging `web_sys`'s event-based `IDBRequest` API to
//! `async`/`.await`, shared by [`crate::idb`]'s three store implementations.
//!
//! `web_sys::IdbRequest` signals completion via `onsuccess`/`onerror`
//! callbacks rather than returning a `Promise` directly; this module wraps
//! a request in a `js_sys::Promise` the same way the rest of the wasm
//! ecosystem's IndexedDB wrappers do, so call sites can `JsFuture::from(..)
//! .await` it like any other browser async operation.

use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::IdbRequest;

/// Awaits `request`, resolving to its `.result()` on success and rejecting
/// with its `.error()` on failure.
pub async fn await_request(request: IdbRequest) -> Result<JsValue, JsValue> {
    let promise = js_sys::Promise::new(&mut |resolve, reject| {
        let success_request = request.clone();
        let onsuccess = Closure::once(move |_event: web_sys::Event| {
            let _ = resolve.call1(
                &JsValue::UNDEFINED,
                &success_request.result().unwrap_or(JsValue::UNDEFINED),
            );
        });
        let error_request = request.clone();
        let onerror = Closure::once(move |_event: web_sys::Event| {
            let error = error_request
                .error()
                .ok()
                .flatten()
                .map(JsValue::from)
                .unwrap_or(JsValue::UNDEFINED);
            let _ = reject.call1(&JsValue::UNDEFINED, &error);
        });
        request.set_onsuccess(Some(onsuccess.as_ref().unchecked_ref()));
        request.set_onerror(Some(onerror.as_ref().unchecked_ref()));
        onsuccess.forget();
        onerror.forget();
    });
    JsFuture::from(promise).await
}

/// Deserializes a JSON-encoded record previously stored by [`put_json`],
/// tolerating `undefined`/`null` (IndexedDB's "no record for this key").
pub fn parse_optional_json<T: serde::de::DeserializeOwned>(
    value: JsValue,
) -> Result<Option<T>, JsValue> {
    if value.is_undefined() || value.is_null() {
        return Ok(None);
    }
    let text = value
        .as_string()
        .ok_or_else(|| JsValue::from_str("expected a JSON string record"))?;
    serde_json::from_str(&text)
        .map(Some)
        .map_err(|e| JsValue::from_str(&format!("failed to deserialize stored record: {e}")))
}

/// Serializes `value` to JSON for storage as a plain string record, matching
/// how the wasm store shuttles records through
/// `serde` rather than structured-clone-ing Rust types directly.
pub fn to_json_value<T: serde::Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_json::to_string(value)
        .map(|text| JsValue::from_str(&text))
        .map_err(|e| JsValue::from_str(&format!("failed to serialize record: {e}")))
}
