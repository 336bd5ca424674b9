//! The Page Agent: the document-side entry point invoked when a page
//! declares a `manifest` attribute.
//!
//! Installer and Association Recorder run sequentially here, Installer
//! first: running them concurrently would let the Association Recorder
//! commit a `PATH_TO_MANIFEST` binding naming a hash the Installer's
//! `put_history` write hasn't landed yet, which the Rule Engine would then
//! fail to find (`history.find(&binding.hash)` returning `None`).

use url::Url;

use crate::association;
use crate::error::Result;
use crate::fetcher::Fetcher;
use crate::installer::{self, InstallOutcome};
use crate::response_cache::ResponseCacheStorage;
use crate::store::ManifestStore;

/// Installs `fresh_manifest_text` (if it names a new version) and records
/// this document's association with whatever version ends up current,
/// returning the version hash the document is now bound to.
pub async fn on_document_load(
    store: &dyn ManifestStore,
    cache: &dyn ResponseCacheStorage,
    fetcher: &dyn Fetcher,
    document_url: &Url,
    manifest_url: &Url,
    fresh_manifest_text: &str,
) -> Result<String> {
    let outcome =
        installer::install(store, cache, fetcher, manifest_url, fresh_manifest_text).await?;

    let hash = match outcome {
        InstallOutcome::Installed { hash } => hash,
        InstallOutcome::NoOp => {
            let history = store.get_history(manifest_url).await?;
            history
                .current()
                .map(|v| v.hash.clone())
                .ok_or_else(|| crate::error::AppCacheError::Message(format!(
                    "manifest {manifest_url} has no installed version to bind to"
                )))?
        }
    };

    association::record_association(store, cache, fetcher, document_url, manifest_url, &hash).await?;

    Ok(hash)
}
