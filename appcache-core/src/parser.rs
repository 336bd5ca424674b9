//! The internal AppCache manifest text parser.
//!
//! The contract is narrow: three sections in, `ParsedManifest` out. No
//! published Rust crate implements that contract (it is a dead web
//! standard), so this module supplies a small from-scratch parser rather
//! than reaching for a dependency that does not exist.

use url::Url;

use crate::model::{NetworkRule, ParsedManifest, NETWORK_WILDCARD};

#[derive(Clone, Copy)]
enum Section {
    Cache,
    Network,
    Fallback,
}

impl Section {
    fn from_header(line: &str) -> Option<Self> {
        match line.to_ascii_uppercase().as_str() {
            "CACHE:" => Some(Section::Cache),
            "NETWORK:" => Some(Section::Network),
            "FALLBACK:" => Some(Section::Fallback),
            _ => None,
        }
    }
}

/// Parses `text` (the raw manifest body fetched from `manifest_url`) into its
/// three sections, resolving every URL absolute against `manifest_url`.
///
/// Lines are implicitly CACHE entries until the first section header is
/// seen, `#`-prefixed lines and the optional leading `CACHE MANIFEST` line
/// are comments, and blank lines are ignored — matching the classic AppCache
/// manifest grammar. `*` is illegal inside CACHE and as a FALLBACK prefix or
/// target; it is only meaningful inside NETWORK.
pub fn parse(manifest_url: &Url, text: &str) -> Result<ParsedManifest, String> {
    let mut manifest = ParsedManifest::default();
    let mut section = Section::Cache;

    for (index, raw_line) in text.lines().enumerate() {
        let lineno = index + 1;
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if line.eq_ignore_ascii_case("CACHE MANIFEST") {
            continue;
        }
        if let Some(next) = Section::from_header(line) {
            section = next;
            continue;
        }

        match section {
            Section::Cache => {
                if line == NETWORK_WILDCARD {
                    return Err(format!("line {lineno}: '*' is not valid inside CACHE"));
                }
                manifest.cache.push(resolve(manifest_url, line, lineno)?);
            }
            Section::Network => {
                if line == NETWORK_WILDCARD {
                    manifest.network.push(NetworkRule::Wildcard);
                } else {
                    manifest.network.push(NetworkRule::Url(resolve(manifest_url, line, lineno)?));
                }
            }
            Section::Fallback => {
                let mut parts = line.split_whitespace();
                let prefix = parts
                    .next()
                    .ok_or_else(|| format!("line {lineno}: missing FALLBACK prefix"))?;
                let target = parts
                    .next()
                    .ok_or_else(|| format!("line {lineno}: missing FALLBACK target"))?;
                if prefix == NETWORK_WILDCARD || target == NETWORK_WILDCARD {
                    return Err(format!("line {lineno}: '*' is not valid inside FALLBACK"));
                }
                let prefix_url = resolve(manifest_url, prefix, lineno)?;
                let target_url = resolve(manifest_url, target, lineno)?;
                manifest.fallback.insert(prefix_url.into(), target_url);
            }
        }
    }

    Ok(manifest)
}

fn resolve(base: &Url, raw: &str, lineno: usize) -> Result<Url, String> {
    base.join(raw).map_err(|e| format!("line {lineno}: invalid URL {raw:?}: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://s/m").unwrap()
    }

    #[test]
    fn parses_cache_and_network_wildcard() {
        let manifest = parse(&base(), "CACHE:\n/a\n/b\nNETWORK:\n*\n").unwrap();
        assert_eq!(manifest.cache.len(), 2);
        assert_eq!(manifest.cache[0], Url::parse("https://s/a").unwrap());
        assert!(manifest.network.iter().any(NetworkRule::is_wildcard));
    }

    #[test]
    fn parses_fallback_pairs() {
        let manifest =
            parse(&base(), "CACHE:\n/online\nFALLBACK:\n/api /offline.json\nNETWORK:\n*\n").unwrap();
        assert_eq!(
            manifest.fallback.get("https://s/api"),
            Some(&Url::parse("https://s/offline.json").unwrap())
        );
    }

    #[test]
    fn rejects_wildcard_in_cache() {
        assert!(parse(&base(), "CACHE:\n*\n").is_err());
    }

    #[test]
    fn rejects_wildcard_as_fallback_key() {
        assert!(parse(&base(), "FALLBACK:\n* /offline.json\n").is_err());
    }

    #[test]
    fn implicit_cache_section_and_comments() {
        let manifest = parse(&base(), "# a comment\nCACHE MANIFEST\n/implicit\n").unwrap();
        assert_eq!(manifest.cache, vec![Url::parse("https://s/implicit").unwrap()]);
    }
}
