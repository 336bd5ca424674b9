//! Black-box integration tests for the manifest lifecycle and
//! fetch-resolution engine (`appcache-core`), run against
//! `appcache-store-memory`'s in-memory store/cache/client-directory and a
//! real `ReqwestFetcher` talking to a `wiremock::MockServer`.
//!
//! Every test here exercises the engine end to end through live HTTP,
//! rather than through the in-process `Fetcher` test doubles `appcache-core`
//! uses for its own unit tests — the same "spin up a `MockServer`, drive a
//! real HTTP client through it" shape this workspace's example pack uses for
//! its own backend-specific integration suites.

use anyhow::{bail, Result};
use appcache_core::client::FetchEventView;
use appcache_core::fetcher::RequestView;
use appcache_core::installer::{self, InstallOutcome};
use appcache_core::response_cache::CachedResponse;
use appcache_core::rule_engine::{self, Decision};
use appcache_core::{association, fallback, gc};
use appcache_store_memory::{
    MemoryClientDirectory, MemoryManifestStore, MemoryResponseCache, ReqwestFetcher,
};
use url::Url;
use wiremock::{Mock, MockServer, ResponseTemplate};

mod reqwest_fetcher;

/// Bundles the three in-memory collaborator implementations plus a
/// `ReqwestFetcher` pointed at a `wiremock::MockServer`: the fixture every
/// scenario test in this crate builds against.
pub struct Harness {
    pub store: MemoryManifestStore,
    pub cache: MemoryResponseCache,
    pub directory: MemoryClientDirectory,
    pub fetcher: ReqwestFetcher,
    pub server: MockServer,
}

impl Harness {
    /// Starts a fresh `MockServer` with empty stores.
    pub async fn new() -> Result<Self> {
        Ok(Self {
            store: MemoryManifestStore::new(),
            cache: MemoryResponseCache::new(),
            directory: MemoryClientDirectory::new(),
            fetcher: ReqwestFetcher::new()?,
            server: MockServer::start().await,
        })
    }

    /// Resolves `path` against this harness's mock server, e.g. `"/m"` →
    /// `http://127.0.0.1:PORT/m`.
    pub fn url(&self, path: &str) -> Url {
        Url::parse(&format!("{}{path}", self.server.uri())).expect("valid mock server url")
    }

    /// Mounts a `200 OK` response for `GET path_str` returning `body`.
    pub async fn serve(&self, path_str: &str, body: &str) {
        use wiremock::matchers::{method, path};
        Mock::given(method("GET"))
            .and(path(path_str))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&self.server)
            .await;
    }

    /// Installs `manifest_text` (URLs already absolute against this
    /// harness's server) as a new version of the manifest at `manifest_path`,
    /// failing the test if the text hashed to an already-current version.
    pub async fn install(&self, manifest_path: &str, manifest_text: &str) -> Result<String> {
        let manifest_url = self.url(manifest_path);
        match installer::install(&self.store, &self.cache, &self.fetcher, &manifest_url, manifest_text)
            .await?
        {
            InstallOutcome::Installed { hash } => Ok(hash),
            InstallOutcome::NoOp => bail!("expected a new manifest version, got NoOp"),
        }
    }

    /// Records `document_path`'s association with `manifest_path`'s `hash`.
    pub async fn associate(&self, document_path: &str, manifest_path: &str, hash: &str) -> Result<()> {
        let document_url = self.url(document_path);
        let manifest_url = self.url(manifest_path);
        association::record_association(
            &self.store,
            &self.cache,
            &self.fetcher,
            &document_url,
            &manifest_url,
            hash,
        )
        .await?;
        Ok(())
    }

    /// Runs the Rule Engine against a plain `GET request_path` fetch event
    /// with no referrer and no clientId, mirroring a same-origin navigation.
    pub async fn resolve(&self, request_path: &str) -> Result<Decision> {
        let event = FetchEventView {
            request: RequestView::get(self.url(request_path)),
            referrer: None,
            client_id: None,
        };
        Ok(rule_engine::resolve(&event, &self.store, &self.directory).await?)
    }

    /// Runs the Rule Engine against an arbitrary, already-built `RequestView`
    /// (used for requests whose URL is not on this harness's mock server).
    pub async fn resolve_request(&self, request: RequestView) -> Result<Decision> {
        let event = FetchEventView { request, referrer: None, client_id: None };
        Ok(rule_engine::resolve(&event, &self.store, &self.directory).await?)
    }

    /// Executes a `Decision` through the Fallback Broker.
    pub async fn execute(&self, decision: Decision) -> Result<CachedResponse> {
        Ok(fallback::fetch_with_fallback(decision, &self.cache, &self.fetcher).await?)
    }

    /// Runs one GC pass.
    pub async fn sweep(&self) -> Result<Vec<gc::SweptVersion>> {
        Ok(gc::sweep(&self.store, &self.cache, &self.directory).await?)
    }
}

/// Binds an ephemeral local port and immediately releases it, returning an
/// origin string (`"http://127.0.0.1:PORT"`) whose connections are
/// guaranteed refused — used to simulate the "network disabled" half of
/// the "offline" half of the FALLBACK scenario without relying on fetch timeouts. Callers
/// should build every URL under test from the same origin, since the
/// FALLBACK longest-prefix match is a raw string comparison.
pub fn unreachable_origin() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    let port = listener.local_addr().expect("local_addr").port();
    drop(listener);
    format!("http://127.0.0.1:{port}")
}
