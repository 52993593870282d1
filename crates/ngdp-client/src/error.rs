//! Error types for fetch and session operations.

use thiserror::Error;

/// Errors from [`crate::fetcher::Fetcher`] operations.
#[derive(Debug, Error)]
pub enum FetchError {
    /// I/O error reading or writing a local/cache file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Every CDN server in the list returned a non-200 response or failed.
    #[error("CDN exhausted: all {tried} server(s) failed for {resource}")]
    CdnExhausted {
        /// Number of servers tried.
        tried: usize,
        /// The resource path that was requested.
        resource: String,
    },

    /// No CDN server list has been configured or discovered.
    #[error("no CDN servers configured")]
    NoCdnServers,

    /// BLTE decode failed for a fetched payload.
    #[error("BLTE decode failed: {0}")]
    Blte(#[from] ngdp_formats::blte::BlteError),

    /// Underlying local storage lookup failed.
    #[error("local storage error: {0}")]
    Storage(#[from] ngdp_storage::StorageError),

    /// A `cdns` or `versions` text table was malformed.
    #[error("malformed CDN table: {0}")]
    MalformedCdnTable(String),
}

/// Result type for [`crate::fetcher::Fetcher`] operations.
pub type FetchResult<T> = Result<T, FetchError>;

/// Errors from [`crate::session::BuildSession`] operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A call was made before the session reached the required state.
    #[error("session not ready: {0} must be called before this operation")]
    NotReady(&'static str),

    /// A required `cdn-config`/`build-config` key was absent at load time.
    #[error("missing required config key: {0}")]
    MissingConfigKey(&'static str),

    /// Fetch of a configuration or content blob failed.
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// A fetched config blob failed to parse.
    #[error("config parse error: {0}")]
    ConfigParse(String),

    /// Encoding table parse/lookup error.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Root table parse/lookup error.
    #[error("root error: {0}")]
    Root(String),

    /// Archive/group index error.
    #[error("archive index error: {0}")]
    Archive(#[from] ngdp_formats::archive::ArchiveError),

    /// BLTE decode failed while resolving a direct archive-group lookup.
    #[error("BLTE decode failed: {0}")]
    Blte(#[from] ngdp_formats::blte::BlteError),

    /// The requested content key has no encoding table entry.
    #[error("content key not found in encoding table: {0}")]
    ContentKeyNotFound(String),

    /// The requested encoding key has no resolvable location.
    #[error("encoding key not found in any index: {0}")]
    EncodingKeyNotFound(String),

    /// The requested fileDataID has no root table entry.
    #[error("fileDataID not found in root table: {0}")]
    FileDataIdNotFound(u32),
}

/// Result type for [`crate::session::BuildSession`] operations.
pub type SessionResult<T> = Result<T, SessionError>;
