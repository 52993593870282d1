//! Session configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Configuration for a [`crate::session::BuildSession`]: where the local
/// CASC install lives (if any), where to keep the disk cache, which CDN
/// region to prefer, and how long to wait on a single CDN request.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Base directory of a local CASC installation. `None` means CDN-only.
    pub base_dir: Option<PathBuf>,
    /// Directory used for the tier-2 disk cache.
    pub cache_dir: PathBuf,
    /// Product directory component used in CDN/cache paths (e.g. `"wow"`).
    pub product_dir: String,
    /// CDN region used for `discover_cdns`, when no explicit host list is given.
    pub region: String,
    /// Per-request timeout for CDN fetches.
    pub request_timeout: Duration,
    /// Explicit CDN host list. When empty, `discover_cdns` populates it.
    pub cdn_hosts: Vec<String>,
}

impl SessionConfig {
    /// Start a config for `product_dir`, with a cache dir and CDN-only
    /// (no local install) by default.
    pub fn new(product_dir: impl Into<String>, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: None,
            cache_dir: cache_dir.into(),
            product_dir: product_dir.into(),
            region: "us".to_string(),
            request_timeout: Duration::from_secs(30),
            cdn_hosts: Vec::new(),
        }
    }

    /// Point the session at a local CASC installation directory.
    #[must_use]
    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(base_dir.into());
        self
    }

    /// Override the CDN region used by `discover_cdns`.
    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// Set a per-request CDN timeout.
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Supply an explicit CDN host list, bypassing `discover_cdns`.
    #[must_use]
    pub fn with_cdn_hosts(mut self, hosts: Vec<String>) -> Self {
        self.cdn_hosts = hosts;
        self
    }
}
