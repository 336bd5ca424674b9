//! The Client Resolver: maps a fetch event to the client URL
//! responsible for it, plus the `ClientDirectory` trait abstracting the
//! browser's client-enumeration API (`clients.matchAll()`, `clients.get(id)`).

use async_trait::async_trait;
use url::Url;

use crate::error::Result;
use crate::fetcher::RequestView;

/// Abstracts `self.clients` inside the service worker.
#[async_trait]
pub trait ClientDirectory: Send + Sync {
    /// Resolves a live client's URL by its opaque id, if that client is
    /// still controlled by this worker.
    async fn client_url(&self, client_id: &str) -> Result<Option<Url>>;

    /// The ids of every client currently live (`clients.matchAll()`),
    /// consulted by the GC sweeper.
    async fn active_client_ids(&self) -> Result<Vec<String>>;
}

/// A browser-agnostic view of an intercepted `FetchEvent`.
#[derive(Debug, Clone)]
pub struct FetchEventView {
    /// The intercepted request.
    pub request: RequestView,
    /// `request.referrer`, when the platform supplies one.
    pub referrer: Option<Url>,
    /// The event's `clientId`, when the platform supplies client-indexed
    /// enumeration and this fetch is associated with a live client.
    pub client_id: Option<String>,
}

/// Resolves the client URL responsible for `event`:
///
/// 1. If a `clientId` is present and resolves, use `client.url`.
/// 2. Else, if `request.referrer` is non-empty, use it.
/// 3. Else, treat `request.url` itself as the client (an otherwise-unknowable
///    navigation request).
pub async fn resolve_client_url(
    directory: &dyn ClientDirectory,
    event: &FetchEventView,
) -> Result<Url> {
    if let Some(client_id) = &event.client_id {
        if let Some(url) = directory.client_url(client_id).await? {
            return Ok(url);
        }
    }
    if let Some(referrer) = &event.referrer {
        return Ok(referrer.clone());
    }
    Ok(event.request.url.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeDirectory {
        urls: Mutex<HashMap<String, Url>>,
    }

    #[async_trait]
    impl ClientDirectory for FakeDirectory {
        async fn client_url(&self, client_id: &str) -> Result<Option<Url>> {
            Ok(self.urls.lock().unwrap().get(client_id).cloned())
        }

        async fn active_client_ids(&self) -> Result<Vec<String>> {
            Ok(self.urls.lock().unwrap().keys().cloned().collect())
        }
    }

    fn event(url: &str, referrer: Option<&str>, client_id: Option<&str>) -> FetchEventView {
        FetchEventView {
            request: RequestView::get(Url::parse(url).unwrap()),
            referrer: referrer.map(|r| Url::parse(r).unwrap()),
            client_id: client_id.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn prefers_resolved_client_id() {
        let directory = FakeDirectory::default();
        directory
            .urls
            .lock()
            .unwrap()
            .insert("c1".to_string(), Url::parse("https://s/page").unwrap());
        let event = event("https://s/a", Some("https://s/referrer"), Some("c1"));
        let resolved = resolve_client_url(&directory, &event).await.unwrap();
        assert_eq!(resolved, Url::parse("https://s/page").unwrap());
    }

    #[tokio::test]
    async fn falls_back_to_referrer() {
        let directory = FakeDirectory::default();
        let event = event("https://s/a", Some("https://s/referrer"), Some("unknown"));
        let resolved = resolve_client_url(&directory, &event).await.unwrap();
        assert_eq!(resolved, Url::parse("https://s/referrer").unwrap());
    }

    #[tokio::test]
    async fn falls_back_to_request_url() {
        let directory = FakeDirectory::default();
        let event = event("https://s/a", None, None);
        let resolved = resolve_client_url(&directory, &event).await.unwrap();
        assert_eq!(resolved, Url::parse("https://s/a").unwrap());
    }
}
