#![forbid(unsafe_code, future_incompatible)]
#![deny(
    nonstandard_style,
    unused_qualifications,
    unused_import_braces,
    unused_extern_crates,
    trivial_casts,
    trivial_numeric_casts
)]
#![cfg_attr(docsrs, feature(doc_cfg))]
//! A `wasm-bindgen` adapter implementing `appcache-core`'s three
//! collaborator traits against real browser APIs — IndexedDB ([`idb`]),
//! Cache Storage ([`cache_storage`]), and `fetch`/client enumeration
//! ([`fetch`], [`clients`]) — and exposing the two external interfaces:
//! [`boot::run_page_agent`] on the page side and
//! [`worker::legacy_app_cache_behavior`] on the service-worker side.
//!
//! Nothing here re-implements the manifest lifecycle or resolution
//! algorithm; every module is a thin translation between a `web_sys` handle
//! and one of `appcache_core`'s trait methods. [`event_view`] converts an
//! intercepted `web_sys::FetchEvent` into the browser-agnostic
//! `appcache_core::client::FetchEventView` the engine operates on.

use wasm_bindgen::prelude::wasm_bindgen;

pub mod boot;
pub mod cache_storage;
pub mod clients;
pub mod event_view;
pub mod fetch;
pub mod idb;
mod idb_support;
pub mod worker;

/// Installs a panic hook that forwards Rust panics to the browser console,
/// and a `tracing` subscriber that forwards structured log events there too.
/// Call once from the worker/page boot sequence before anything else in
/// this crate runs.
#[wasm_bindgen(js_name = "initAppCacheShim")]
pub fn init() {
    console_error_panic_hook::set_once();
    let _ = tracing_wasm::try_set_as_global_default();
}
