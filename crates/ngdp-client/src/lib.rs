//! Tiered CDN/cache/local-install fetch client and build session
//! orchestration for NGDP/CASC.
//!
//! [`fetcher::Fetcher`] resolves a content blob through a local CASC
//! install, a disk cache, and a list of CDN hosts, in that order.
//! [`session::BuildSession`] sits on top of it: given a build-config and
//! cdn-config hash pair, it loads the root and encoding tables they name
//! and resolves fileDataID/content-key/encoding-key lookups into decoded
//! file content.

pub mod config;
pub mod error;
pub mod fetcher;
pub mod session;

pub use config::SessionConfig;
pub use error::{FetchError, FetchResult, SessionError, SessionResult};
pub use fetcher::{BlobKind, CdnEntry, Fetcher};
pub use session::BuildSession;
