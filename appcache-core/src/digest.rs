use sha2::{Digest, Sha256};

/// Computes the stable content digest of a manifest's raw text.
///
/// This is the single digest function every component agrees on (installer,
/// rule engine, GC sweeper): the result doubles as a [`crate::model::ManifestVersion::hash`]
/// and as the name of the per-version response cache holding that version's
/// pre-cached responses.
#[must_use]
pub fn hash_manifest_text(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}
