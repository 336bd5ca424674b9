use thiserror::Error;

/// Generic boxed error for collaborator failures (store backends, response
/// caches, and the live fetch implementation all report through this).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A `Result` typedef to use with [`AppCacheError`].
pub type Result<T> = std::result::Result<T, AppCacheError>;

/// Error taxonomy for the manifest lifecycle and fetch-resolution engine.
///
/// Mirrors the taxonomy in the error handling design: manifest fetch
/// failures and per-URL pre-cache failures are swallowed by the callers of
/// this crate (the page/worker agents), never by the engine itself — the
/// engine always reports what happened and lets the caller decide whether
/// to log-and-continue or propagate.
#[derive(Debug, Error)]
pub enum AppCacheError {
    /// The manifest body could not be fetched. The previous current version
    /// remains installed; callers should log and no-op.
    #[error("failed to fetch manifest {url}: {source}")]
    ManifestFetchFailed {
        /// The manifest URL that failed to fetch.
        url: String,
        #[source]
        source: BoxError,
    },

    /// The manifest text failed to parse into CACHE/NETWORK/FALLBACK
    /// sections.
    #[error("failed to parse manifest at {url}: {reason}")]
    ParseFailed {
        /// The manifest URL whose text failed to parse.
        url: String,
        /// Human-readable parse failure reason.
        reason: String,
    },

    /// A read-write transaction against one of the three persistent stores
    /// failed. Fatal to the single operation, not to the agent.
    #[error("store transaction failed: {0}")]
    StoreTransactionFailed(#[source] BoxError),

    /// A response cache (open / match / put / delete) operation failed.
    #[error("response cache operation failed: {0}")]
    ResponseCacheFailed(#[source] BoxError),

    /// A live network fetch failed (DNS, connection refused, offline).
    /// Distinct from a non-2xx HTTP response, which is not an error.
    #[error("network request failed: {0}")]
    NetworkError(#[source] BoxError),

    /// A URL failed to parse or resolve against its base.
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A catch-all for invariant violations that indicate a bug in a
    /// collaborator rather than an environmental failure — e.g. a cache
    /// entry the Rule Engine expected to exist was missing at fetch time.
    #[error("{0}")]
    Message(String),
}
