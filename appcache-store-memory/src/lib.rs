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
//! An in-process implementation of `appcache-core`'s three collaborator
//! traits, analogous to an in-memory HTTP cache manager: [`MemoryManifestStore`]
//! backs [`appcache_core::store::ManifestStore`], [`MemoryResponseCache`]
//! backs [`appcache_core::response_cache::ResponseCacheStorage`], and
//! [`ReqwestFetcher`] backs [`appcache_core::fetcher::Fetcher`].
//!
//! Writes to disjoint stores must never
//! serialize against each other — each of the three persistent stores
//! described in `appcache-core::store` gets its own `tokio::sync::RwLock`
//! rather than one lock guarding all three.
//!
//! This crate is the store used by `appcache-core`'s black-box integration
//! tests (`appcache-tests`) and is equally suitable for embedding the shim
//! in a non-browser host — anywhere a Rust process wants AppCache-style
//! resolution without a real Service Worker.

mod client_directory;
mod fetcher;
mod response_cache;
mod store;

pub use client_directory::MemoryClientDirectory;
pub use fetcher::ReqwestFetcher;
pub use response_cache::MemoryResponseCache;
pub use store::MemoryManifestStore;
