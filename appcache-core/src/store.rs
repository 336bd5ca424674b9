//! The `ManifestStore` trait: an injected handle over the three transactional
//! key-value stores (`MANIFEST_URL_TO_CONTENTS`, `PATH_TO_MANIFEST`,
//! `CLIENT_ID_TO_HASH`).
//!
//! Deliberately an injected handle passed through the call graph rather than
//! a process-global singleton, with lifecycle owned by whoever constructs
//! the implementor (worker start/stop for [`crate::worker_agent`], page load
//! for [`crate::page_agent`]).

use async_trait::async_trait;
use url::Url;

use crate::error::Result;
use crate::model::{ClientBinding, ManifestHistory};

/// Fixed identifiers for the persistent database. Name and store names are
/// fixed; the version starts at 1 and increases monotonically if the store
/// shape ever evolves.
pub const DATABASE_NAME: &str = "appcache-shim";
/// Current schema version. Bump alongside any store-shape change.
pub const DATABASE_VERSION: u32 = 1;
/// `MANIFEST_URL_TO_CONTENTS` store name.
pub const STORE_MANIFEST_URL_TO_CONTENTS: &str = "manifest_url_to_contents";
/// `PATH_TO_MANIFEST` store name.
pub const STORE_PATH_TO_MANIFEST: &str = "path_to_manifest";
/// `CLIENT_ID_TO_HASH` store name.
pub const STORE_CLIENT_ID_TO_HASH: &str = "client_id_to_hash";

/// Abstracts the three persistent, transactional key-value stores that back
/// the manifest lifecycle. Implementors must guarantee that a write to one
/// store commits independently of writes to the other two.
#[async_trait]
pub trait ManifestStore: Send + Sync {
    /// Reads the version history for `manifest_url`, or an empty history if
    /// none has been installed yet.
    async fn get_history(&self, manifest_url: &Url) -> Result<ManifestHistory>;

    /// Replaces the version history for `manifest_url` in one write.
    async fn put_history(&self, manifest_url: &Url, history: ManifestHistory) -> Result<()>;

    /// Every manifest URL's history, in the store's own enumeration order.
    ///
    /// This order is the "store enumeration order" the cross-manifest
    /// fallback search ties-break on — it is a documented,
    /// testable fact of the chosen `ManifestStore` implementation, not a
    /// browser guarantee this crate tries to emulate.
    async fn all_histories(&self) -> Result<Vec<(Url, ManifestHistory)>>;

    /// Reads the manifest binding recorded for a client URL (`PATH_TO_MANIFEST`).
    async fn get_path_binding(&self, client_url: &Url) -> Result<Option<ClientBinding>>;

    /// Records or overwrites the manifest binding for a client URL.
    async fn put_path_binding(&self, client_url: &Url, binding: ClientBinding) -> Result<()>;

    /// Reads the version hash pinned to a live `clientId` (`CLIENT_ID_TO_HASH`).
    async fn get_client_id_hash(&self, client_id: &str) -> Result<Option<String>>;

    /// Pins a `clientId` to a version hash the first time the worker serves it.
    async fn put_client_id_hash(&self, client_id: &str, hash: &str) -> Result<()>;

    /// Removes a `clientId` binding once the client is no longer live.
    async fn delete_client_id_hash(&self, client_id: &str) -> Result<()>;

    /// Every `(clientId, hash)` pair currently recorded.
    async fn all_client_id_hashes(&self) -> Result<Vec<(String, String)>>;
}
