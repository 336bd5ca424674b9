#![forbid(unsafe_code, future_incompatible)]
#![deny(
    missing_docs,
    missing_debug_implementations,
    nonstandard_style,
    unused_qualifications,
    unused_import_braces,
    unused_extern_crates,
    trivial_casts,
    trivial_numeric_casts
)]
#![cfg_attr(docsrs, feature(doc_cfg))]
//! The manifest lifecycle and fetch-resolution engine for a compatibility
//! shim that emulates the deprecated HTML Application Cache on top of a
//! Service Worker plus two persistent browser stores (Cache Storage and
//! IndexedDB).
//!
//! This crate names no browser API directly. It is built entirely against
//! three injected collaborator traits:
//!
//! - [`store::ManifestStore`] — the three IndexedDB-backed persistent
//!   stores (`MANIFEST_URL_TO_CONTENTS`, `PATH_TO_MANIFEST`,
//!   `CLIENT_ID_TO_HASH`).
//! - [`response_cache::ResponseCacheStorage`] — the named, per-version
//!   response caches (the Cache Storage API).
//! - [`fetcher::Fetcher`] — live network fetch, including the fixed-option
//!   conditioning fetch the [`installer`] and [`association`] modules use to
//!   pre-cache and seed entries.
//!
//! [`page_agent::on_document_load`] is the page-side entry point: it drives
//! the [`installer`] and [`association`] modules on every navigation where a
//! manifest is declared. [`worker_agent::legacy_app_cache_behavior`] is the
//! worker-side entry point: it drives the [`rule_engine`] and
//! [`fallback`] modules per intercepted fetch, and [`gc`] after navigation
//! settles. `appcache-store-memory` supplies an in-process implementation of
//! all three traits; `appcache-wasm` supplies the browser-backed one and
//! exposes both entry points to `wasm-bindgen` consumers.

pub mod association;
pub mod client;
pub mod digest;
pub mod error;
pub mod fallback;
pub mod fetcher;
pub mod gc;
pub mod installer;
pub mod model;
pub mod page_agent;
pub mod parser;
pub mod response_cache;
pub mod rule_engine;
pub mod store;
#[cfg(test)]
pub(crate) mod test_support;
pub mod worker_agent;

pub use error::{AppCacheError, Result};
