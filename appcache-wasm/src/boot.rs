//! The page-side `#[wasm_bindgen]` entry point: given the manifest
//! URL and worker script path the page boot snippet has already read off
//! the document's `manifest`/registrar attributes — reading those
//! attributes is the boot snippet's own job, kept out of this crate — opens
//! the persistent store, runs the Installer and Association Recorder, and
//! only then registers the service worker.

use appcache_core::error::{AppCacheError, Result as CoreResult};
use appcache_core::fetcher::Fetcher as _;
use appcache_core::page_agent;
use url::Url;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::{future_to_promise, JsFuture};
use web_sys::Window;

use crate::cache_storage::CacheStorageResponseCache;
use crate::fetch::PageFetcher;
use crate::idb::{self, IdbManifestStore};

/// Drives the Page Agent end to end: fetches `manifest_url`'s
/// current text, installs it as a new version if the content hash changed,
/// records this document's association with whatever version ends up
/// current, and finally registers `worker_script_url` as the controlling
/// service worker.
///
/// Returns a `Promise` that resolves once registration has been
/// *requested*: completion of registration is not required for the page to
/// continue, so neither a failed manifest check nor a failed registration
/// rejects this promise — both are logged and swallowed instead.
#[wasm_bindgen(js_name = "runPageAgent")]
pub fn run_page_agent(
    document_url: String,
    manifest_url: String,
    worker_script_url: String,
) -> js_sys::Promise {
    future_to_promise(async move {
        if let Err(error) = run(&document_url, &manifest_url, &worker_script_url).await {
            tracing::error!(%error, "page agent failed, leaving previous manifest version current");
        }
        Ok(JsValue::UNDEFINED)
    })
}

async fn run(document_url: &str, manifest_url: &str, worker_script_url: &str) -> CoreResult<()> {
    let document_url: Url = document_url.parse()?;
    let manifest_url: Url = manifest_url.parse()?;

    let window = web_sys::window()
        .ok_or_else(|| AppCacheError::Message("no global window".to_string()))?;

    let db = idb::open_database().await?;
    let store = IdbManifestStore::new(db);
    let cache = CacheStorageResponseCache::new(window.caches().map_err(|e| {
        AppCacheError::Message(format!("window.caches unavailable: {e:?}"))
    })?);
    let fetcher = PageFetcher::new(window.clone());

    // Fetched with the conditioning-fetch option set, same as every other
    // Installer-driven fetch, so an already-installed worker's escape hatch
    // lets this request through unmodified instead
    // of resolving it through the Rule Engine.
    let manifest_response = fetcher.fetch_conditioning(&manifest_url).await.map_err(|error| {
        AppCacheError::ManifestFetchFailed { url: manifest_url.to_string(), source: Box::new(error) }
    })?;
    let fresh_text = String::from_utf8(manifest_response.body).map_err(|error| {
        AppCacheError::Message(format!("manifest body at {manifest_url} was not utf-8: {error}"))
    })?;

    page_agent::on_document_load(&store, &cache, &fetcher, &document_url, &manifest_url, &fresh_text)
        .await?;

    register_service_worker(&window, worker_script_url).await;
    Ok(())
}

/// Registers `script_url`, named by the page boot snippet's configuration
/// attribute, as the controlling service worker. A rejected registration is
/// logged and swallowed, never surfaced to the caller.
async fn register_service_worker(window: &Window, script_url: &str) {
    let registration = JsFuture::from(window.navigator().service_worker().register(script_url)).await;
    if let Err(error) = registration {
        tracing::warn!(error = ?error, %script_url, "service worker registration failed");
    }
}
