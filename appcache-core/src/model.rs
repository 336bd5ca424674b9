//! The persistent data model: parsed manifests, version history, and
//! the two binding records that tie clients to the version they committed to.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use url::Url;

/// The literal NETWORK-section token that bypasses the cache entirely.
pub const NETWORK_WILDCARD: &str = "*";

/// A single NETWORK-section entry: either the wildcard or an absolute URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetworkRule {
    /// The `*` token: every otherwise-unmatched request goes to the network.
    Wildcard,
    /// An absolute URL explicitly whitelisted for live network access.
    Url(Url),
}

impl NetworkRule {
    /// True if this rule is the `*` wildcard.
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        matches!(self, NetworkRule::Wildcard)
    }

    /// True if this rule names the given URL explicitly.
    #[must_use]
    pub fn matches(&self, url: &Url) -> bool {
        matches!(self, NetworkRule::Url(u) if u == url)
    }
}

/// The three sections of a parsed AppCache manifest, with all URLs resolved
/// absolute against the manifest URL.
///
/// `fallback` preserves manifest order: the longest-prefix rule used by both
/// the Rule Engine and the Fallback Broker breaks ties in favor of the last
/// entry encountered, so iteration order is
/// load-bearing and a `HashMap` would silently break that guarantee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ParsedManifest {
    /// URLs to pre-cache unconditionally.
    pub cache: Vec<Url>,
    /// Network whitelist entries, in manifest order.
    pub network: Vec<NetworkRule>,
    /// Fallback URL-prefix to fallback-URL mapping, in manifest order.
    pub fallback: IndexMap<String, Url>,
}

impl ParsedManifest {
    /// True if `url` is named verbatim in the CACHE section.
    #[must_use]
    pub fn is_cached(&self, url: &Url) -> bool {
        self.cache.iter().any(|u| u == url)
    }

    /// True if `url` is explicitly whitelisted, or the wildcard is present.
    #[must_use]
    pub fn allows_network(&self, url: &Url) -> bool {
        self.network.iter().any(|rule| rule.is_wildcard() || rule.matches(url))
    }

    /// The union of CACHE URLs and FALLBACK values, the set the installer
    /// pre-caches.
    pub fn precache_targets(&self) -> impl Iterator<Item = &Url> {
        self.cache.iter().chain(self.fallback.values())
    }

    /// Longest raw-string prefix match among `fallback`'s keys, last-wins on
    /// ties.
    #[must_use]
    pub fn longest_fallback_prefix(&self, url: &Url) -> Option<(&str, &Url)> {
        longest_prefix(self.fallback.iter().map(|(k, v)| (k.as_str(), v)), url.as_str())
    }
}

/// Finds the longest key in `candidates` that is a string-prefix of `target`,
/// with the last candidate of equal maximal length winning ties. This is the
/// single implementation both the in-manifest fallback lookup
/// and the cross-manifest search delegate to, so both share
/// the exact same tie-break behavior.
pub fn longest_prefix<'a, I, V>(candidates: I, target: &str) -> Option<(&'a str, V)>
where
    I: IntoIterator<Item = (&'a str, V)>,
{
    let mut best: Option<(&'a str, V)> = None;
    for (prefix, value) in candidates {
        if target.starts_with(prefix)
            && best.as_ref().map_or(true, |(b, _)| prefix.len() >= b.len())
        {
            best = Some((prefix, value));
        }
    }
    best
}

/// One installed version of a manifest: its content hash, the raw text that
/// hashed to it, and the parsed sections. The hash also names the per-version
/// response cache holding this version's pre-cached entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestVersion {
    /// Stable content digest of `text`; also the per-version cache name.
    pub hash: String,
    /// The raw manifest text as fetched.
    pub text: String,
    /// The parsed CACHE/NETWORK/FALLBACK sections.
    pub parsed: ParsedManifest,
}

/// The ordered version history for one manifest URL, oldest first. The last
/// element is the current version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ManifestHistory {
    /// Versions in arrival order; `versions.last()` is current.
    pub versions: Vec<ManifestVersion>,
}

impl ManifestHistory {
    /// The current (most recently installed) version, if any.
    #[must_use]
    pub fn current(&self) -> Option<&ManifestVersion> {
        self.versions.last()
    }

    /// Looks up a specific version by hash, regardless of whether it is
    /// current. Used when a stale `ClientBinding` names a hash that has
    /// since been superseded but not yet garbage-collected.
    #[must_use]
    pub fn find(&self, hash: &str) -> Option<&ManifestVersion> {
        self.versions.iter().find(|v| v.hash == hash)
    }

    /// Hashes of every version except the current one — candidates for GC
    /// once no live client still references them.
    pub fn retired_hashes(&self) -> impl Iterator<Item = &str> {
        let len = self.versions.len();
        self.versions.iter().take(len.saturating_sub(1)).map(|v| v.hash.as_str())
    }

    /// Appends a new version, enforcing the "no two adjacent entries share a
    /// hash" invariant by no-op'ing if `version.hash` equals the current hash.
    pub fn push(&mut self, version: ManifestVersion) {
        if self.current().map(|c| c.hash.as_str()) != Some(version.hash.as_str()) {
            self.versions.push(version);
        }
    }
}

/// A client URL's committed manifest binding: which manifest, and which
/// version hash, the client last loaded with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientBinding {
    /// The manifest URL the client declared via its `manifest` attribute.
    pub manifest_url: Url,
    /// The version hash current at the time the client loaded.
    pub hash: String,
}
