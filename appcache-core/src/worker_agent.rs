//! The worker-side entry point: wires the Rule Engine, the
//! Fallback Broker, and the GC Sweeper into the two events a service worker
//! actually receives — `fetch` and a point to run maintenance after
//! navigation settles.
//!
//! The top-level rule governs every function here: "an uncaught failure
//! anywhere in resolution must be logged and converted into a plain live
//! fetch of the original request, never an unhandled rejection surfacing to
//! the page." [`legacy_app_cache_behavior`] is the one place that rule is
//! enforced; everything upstream of it (Rule Engine, Fallback Broker) is
//! free to return a genuine `Err`.

use crate::client::{ClientDirectory, FetchEventView};
use crate::error::Result;
use crate::fetcher::Fetcher;
use crate::gc::{self, SweptVersion};
use crate::response_cache::{CachedResponse, ResponseCacheStorage};
use crate::rule_engine::{self, Decision};
use crate::{fallback, store::ManifestStore};

/// How a `fetch` event was ultimately served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// Resolution and execution both succeeded on the first attempt.
    Resolved,
    /// Resolution or execution failed and the event was served by a plain
    /// live fetch of the original request as a last resort.
    DegradedToLiveFetch,
}

/// What a `fetch` event is ultimately answered with.
///
/// Kept distinct from a plain `CachedResponse` so the AppCache-defined
/// offline-error sentinel (CACHE, FALLBACK, and NETWORK all failed to match)
/// can never be confused with — or silently retried as — a live fetch. Only
/// [`Fetcher`]/[`ResponseCacheStorage`]/[`ManifestStore`] failures degrade to
/// a live fetch; a deliberate `NetworkErrorSentinel` decision does not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerResponse {
    /// An actual response to serve: a cache hit, a fallback, or a live fetch.
    Resolved(CachedResponse),
    /// The `Response.error()` offline-error sentinel: no CACHE, FALLBACK, or
    /// NETWORK rule matched this request.
    NetworkError,
}

/// Applies the Rule Engine to `event`, with failures surfaced rather than
/// swallowed — callers that need the top-level swallow-and-degrade behavior
/// should use [`legacy_app_cache_behavior`] instead.
pub async fn resolve_or_fetch(
    event: &FetchEventView,
    store: &dyn ManifestStore,
    directory: &dyn ClientDirectory,
) -> Result<Decision> {
    rule_engine::resolve(event, store, directory).await
}

/// Executes an already-resolved `Decision`, with failures surfaced.
pub async fn execute(
    decision: Decision,
    cache: &dyn ResponseCacheStorage,
    fetcher: &dyn Fetcher,
) -> Result<CachedResponse> {
    fallback::fetch_with_fallback(decision, cache, fetcher).await
}

/// The full `fetch` event handler: resolve, execute, and on any failure from
/// either step, log it and degrade to a plain live fetch of the original
/// request. Only if that last-resort fetch itself fails does this function
/// return an `Err` — there is nothing left to serve.
///
/// `Decision::NetworkErrorSentinel` is handled before execution ever runs:
/// it is the AppCache algorithm's own terminal "offline error" outcome, not
/// a collaborator failure, so it is reported as [`WorkerResponse::NetworkError`]
/// and never falls through to a live `fetcher.fetch` retry.
pub async fn legacy_app_cache_behavior(
    event: &FetchEventView,
    store: &dyn ManifestStore,
    cache: &dyn ResponseCacheStorage,
    fetcher: &dyn Fetcher,
    directory: &dyn ClientDirectory,
) -> Result<(WorkerResponse, ExecutionOutcome)> {
    let decision = match resolve_or_fetch(event, store, directory).await {
        Ok(decision) => decision,
        Err(error) => {
            tracing::warn!(
                url = %event.request.url,
                %error,
                "appcache resolution failed, degrading to live fetch"
            );
            let response = fetcher.fetch(&event.request).await?;
            return Ok((WorkerResponse::Resolved(response), ExecutionOutcome::DegradedToLiveFetch));
        }
    };

    if matches!(decision, Decision::NetworkErrorSentinel) {
        return Ok((WorkerResponse::NetworkError, ExecutionOutcome::Resolved));
    }

    match execute(decision, cache, fetcher).await {
        Ok(response) => Ok((WorkerResponse::Resolved(response), ExecutionOutcome::Resolved)),
        Err(error) => {
            tracing::warn!(
                url = %event.request.url,
                %error,
                "appcache execution failed, degrading to live fetch"
            );
            let response = fetcher.fetch(&event.request).await?;
            Ok((WorkerResponse::Resolved(response), ExecutionOutcome::DegradedToLiveFetch))
        }
    }
}

/// Runs a GC pass, meant to be invoked after a navigation settles rather than
/// inline with every `fetch` event.
pub async fn run_gc_after_navigation(
    store: &dyn ManifestStore,
    cache: &dyn ResponseCacheStorage,
    directory: &dyn ClientDirectory,
) -> Result<Vec<SweptVersion>> {
    gc::sweep(store, cache, directory).await
}
