//! [`IdbManifestStore`]: the real `ManifestStore`, backed by
//! `web_sys::IdbDatabase`.
//!
//! This module never memoizes a process-global handle itself —
//! [`open_database`] is called by whoever constructs an [`IdbManifestStore`]
//! (the page boot routine, the worker's fetch-event handler), and the
//! resulting `IdbDatabase` is held by that caller for as long as its own
//! lifecycle warrants.
//!
//! `appcache-core`'s traits require `Send + Sync` so `appcache-store-memory`
//! can share its implementors across `tokio` tasks. `wasm-bindgen` handles
//! (`IdbDatabase`, `IdbRequest`, ...) are plain `JsValue`s and are neither —
//! the wasm32 target is single-threaded regardless, so this crate satisfies
//! the bound with `send_wrapper::SendWrapper`, the standard escape hatch for
//! exactly this mismatch, rather than relaxing the trait for one target.

use appcache_core::error::{AppCacheError, Result as CoreResult};
use appcache_core::model::{ClientBinding, ManifestHistory};
use appcache_core::store::{
    ManifestStore, DATABASE_NAME, DATABASE_VERSION, STORE_CLIENT_ID_TO_HASH,
    STORE_MANIFEST_URL_TO_CONTENTS, STORE_PATH_TO_MANIFEST,
};
use async_trait::async_trait;
use send_wrapper::SendWrapper;
use url::Url;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{IdbDatabase, IdbObjectStore, IdbTransactionMode};

use crate::idb_support::{await_request, parse_optional_json, to_json_value};

fn js_err(context: &str, error: JsValue) -> AppCacheError {
    AppCacheError::StoreTransactionFailed(Box::new(JsValueError::new(context, error)))
}

/// A `JsValue` rejection reason, captured as a plain `std::error::Error` so
/// it can flow through [`AppCacheError`]'s boxed-error variants. Shared by
/// every wasm adapter module rather than redefined per file.
#[derive(Debug)]
pub(crate) struct JsValueError {
    context: String,
    message: String,
}

impl JsValueError {
    pub(crate) fn new(context: &str, error: JsValue) -> Self {
        Self { context: context.to_string(), message: format!("{error:?}") }
    }
}

impl std::fmt::Display for JsValueError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.context, self.message)
    }
}

impl std::error::Error for JsValueError {}

/// Opens (creating on first use) the fixed `appcache-shim` database, creating
/// the three object stores on the initial `onupgradeneeded` and leaving later
/// schema bumps to add further stores without disturbing these three.
pub async fn open_database() -> CoreResult<IdbDatabase> {
    let window = web_sys::window()
        .ok_or_else(|| AppCacheError::Message("no global window/worker scope".to_string()))?;
    let factory = window
        .indexed_db()
        .map_err(|e| js_err("indexedDB()", e))?
        .ok_or_else(|| AppCacheError::Message("indexedDB not available".to_string()))?;

    let open_request = factory
        .open_with_u32(DATABASE_NAME, DATABASE_VERSION)
        .map_err(|e| js_err("indexedDB.open", e))?;

    let upgrade_request = open_request.clone();
    let onupgradeneeded = Closure::once(move |_event: web_sys::IdbVersionChangeEvent| {
        if let Ok(result) = upgrade_request.result() {
            if let Ok(db) = result.dyn_into::<IdbDatabase>() {
                for store in
                    [STORE_MANIFEST_URL_TO_CONTENTS, STORE_PATH_TO_MANIFEST, STORE_CLIENT_ID_TO_HASH]
                {
                    if !db.object_store_names().contains(store) {
                        let _ = db.create_object_store(store);
                    }
                }
            }
        }
    });
    open_request.set_onupgradeneeded(Some(onupgradeneeded.as_ref().unchecked_ref()));
    onupgradeneeded.forget();

    let result = await_request(open_request.into())
        .await
        .map_err(|e| js_err("indexedDB.open await", e))?;
    result
        .dyn_into::<IdbDatabase>()
        .map_err(|_| AppCacheError::Message("indexedDB.open did not yield a database".to_string()))
}

/// A `ManifestStore` over an already-open `IdbDatabase`. Cheap to construct
/// per call: `IdbDatabase` is a lightweight JS object handle, not a
/// connection pool.
#[derive(Debug, Clone)]
pub struct IdbManifestStore {
    db: SendWrapper<IdbDatabase>,
}

impl IdbManifestStore {
    /// Wraps an already-open database handle.
    #[must_use]
    pub fn new(db: IdbDatabase) -> Self {
        Self { db: SendWrapper::new(db) }
    }

    fn object_store(&self, name: &str, mode: IdbTransactionMode) -> CoreResult<IdbObjectStore> {
        let tx =
            self.db.transaction_with_str_and_mode(name, mode).map_err(|e| js_err("transaction", e))?;
        tx.object_store(name).map_err(|e| js_err("object_store", e))
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        store: &str,
        key: &str,
    ) -> CoreResult<Option<T>> {
        let object_store = self.object_store(store, IdbTransactionMode::Readonly)?;
        let request = object_store.get(&JsValue::from_str(key)).map_err(|e| js_err("get", e))?;
        let value = await_request(request).await.map_err(|e| js_err("get await", e))?;
        parse_optional_json(value).map_err(|e| js_err("deserialize", e))
    }

    async fn put_json<T: serde::Serialize>(
        &self,
        store: &str,
        key: &str,
        value: &T,
    ) -> CoreResult<()> {
        let object_store = self.object_store(store, IdbTransactionMode::Readwrite)?;
        let encoded = to_json_value(value).map_err(|e| js_err("serialize", e))?;
        let request = object_store
            .put_with_key(&encoded, &JsValue::from_str(key))
            .map_err(|e| js_err("put", e))?;
        await_request(request).await.map_err(|e| js_err("put await", e))?;
        Ok(())
    }

    async fn delete_key(&self, store: &str, key: &str) -> CoreResult<()> {
        let object_store = self.object_store(store, IdbTransactionMode::Readwrite)?;
        let request = object_store.delete(&JsValue::from_str(key)).map_err(|e| js_err("delete", e))?;
        await_request(request).await.map_err(|e| js_err("delete await", e))?;
        Ok(())
    }

    async fn all_entries<T: serde::de::DeserializeOwned>(
        &self,
        store: &str,
    ) -> CoreResult<Vec<(String, T)>> {
        let object_store = self.object_store(store, IdbTransactionMode::Readonly)?;
        let keys_request = object_store.get_all_keys().map_err(|e| js_err("get_all_keys", e))?;
        let values_request = object_store.get_all().map_err(|e| js_err("get_all", e))?;
        let keys = await_request(keys_request).await.map_err(|e| js_err("get_all_keys await", e))?;
        let values = await_request(values_request).await.map_err(|e| js_err("get_all await", e))?;

        let keys: js_sys::Array =
            keys.dyn_into().map_err(|_| AppCacheError::Message("get_all_keys did not yield an array".to_string()))?;
        let values: js_sys::Array =
            values.dyn_into().map_err(|_| AppCacheError::Message("get_all did not yield an array".to_string()))?;

        let mut entries = Vec::with_capacity(keys.length() as usize);
        for i in 0..keys.length() {
            let key = keys
                .get(i)
                .as_string()
                .ok_or_else(|| AppCacheError::Message("non-string key in object store".to_string()))?;
            let value = parse_optional_json(values.get(i))
                .map_err(|e| js_err("deserialize", e))?
                .ok_or_else(|| AppCacheError::Message(format!("missing value for key {key}")))?;
            entries.push((key, value));
        }
        Ok(entries)
    }
}

/// Runs `body` (which freely touches `JsValue`/`web_sys` handles across
/// `.await` points) inside a [`SendWrapper`], so the `Send` future
/// `async_trait` demands is satisfied by the wrapper rather than by the
/// non-`Send` body itself. See the module docs for why this is sound on the
/// single-threaded wasm32 target.
async fn send_bridge<T>(body: impl std::future::Future<Output = T>) -> T {
    SendWrapper::new(body).await
}

#[async_trait]
impl ManifestStore for IdbManifestStore {
    async fn get_history(&self, manifest_url: &Url) -> CoreResult<ManifestHistory> {
        send_bridge(async {
            Ok(self
                .get_json(STORE_MANIFEST_URL_TO_CONTENTS, manifest_url.as_str())
                .await?
                .unwrap_or_default())
        })
        .await
    }

    async fn put_history(&self, manifest_url: &Url, history: ManifestHistory) -> CoreResult<()> {
        send_bridge(self.put_json(STORE_MANIFEST_URL_TO_CONTENTS, manifest_url.as_str(), &history))
            .await
    }

    async fn all_histories(&self) -> CoreResult<Vec<(Url, ManifestHistory)>> {
        send_bridge(async {
            let entries: Vec<(String, ManifestHistory)> =
                self.all_entries(STORE_MANIFEST_URL_TO_CONTENTS).await?;
            entries.into_iter().map(|(key, history)| Ok((Url::parse(&key)?, history))).collect()
        })
        .await
    }

    async fn get_path_binding(&self, client_url: &Url) -> CoreResult<Option<ClientBinding>> {
        send_bridge(self.get_json(STORE_PATH_TO_MANIFEST, client_url.as_str())).await
    }

    async fn put_path_binding(&self, client_url: &Url, binding: ClientBinding) -> CoreResult<()> {
        send_bridge(self.put_json(STORE_PATH_TO_MANIFEST, client_url.as_str(), &binding)).await
    }

    async fn get_client_id_hash(&self, client_id: &str) -> CoreResult<Option<String>> {
        send_bridge(self.get_json(STORE_CLIENT_ID_TO_HASH, client_id)).await
    }

    async fn put_client_id_hash(&self, client_id: &str, hash: &str) -> CoreResult<()> {
        send_bridge(self.put_json(STORE_CLIENT_ID_TO_HASH, client_id, &hash.to_string())).await
    }

    async fn delete_client_id_hash(&self, client_id: &str) -> CoreResult<()> {
        send_bridge(self.delete_key(STORE_CLIENT_ID_TO_HASH, client_id)).await
    }

    async fn all_client_id_hashes(&self) -> CoreResult<Vec<(String, String)>> {
        send_bridge(self.all_entries(STORE_CLIENT_ID_TO_HASH)).await
    }
}
