//! Tiered fetch pipeline: local CASC install, disk cache, CDN.
//!
//! Resolution order for a blob is local install, then disk cache, then
//! each configured CDN host in turn. A successful CDN fetch is written
//! back into the disk cache before being returned.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use ngdp_crypto::EncodingKey;
use ngdp_storage::Installation;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, trace, warn};

use crate::config::SessionConfig;
use crate::error::{FetchError, FetchResult};

/// Which CDN path segment (`data` or `config`) a resource lives under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobKind {
    /// `<product>/data/...` — archives, loose data blobs, indices.
    Data,
    /// `<product>/config/...` — build-config, cdn-config, key-ring files.
    Config,
}

impl BlobKind {
    const fn segment(self) -> &'static str {
        match self {
            Self::Data => "data",
            Self::Config => "config",
        }
    }
}

/// One row of a parsed `cdns` pipe-delimited table.
#[derive(Debug, Clone)]
pub struct CdnEntry {
    /// Product/region name, e.g. `"us"`.
    pub name: String,
    /// CDN path component inserted between host and `data`/`config`.
    pub path: String,
    /// Plain HTTP hosts.
    pub hosts: Vec<String>,
    /// Full server URL templates (takes precedence over `hosts` when present).
    pub servers: Vec<String>,
}

/// Tiered content fetcher: local CASC install, disk cache, CDN.
pub struct Fetcher {
    config: SessionConfig,
    installation: Option<Arc<Installation>>,
    http: reqwest::Client,
    /// Per-cache-path mutex, so concurrent fetches of the same resource
    /// don't race on the temp-file-then-rename write.
    locks: DashMap<PathBuf, Arc<AsyncMutex<()>>>,
}

impl Fetcher {
    /// Build a fetcher from a [`SessionConfig`]. Opens the local CASC
    /// installation eagerly if `base_dir` is set.
    ///
    /// # Errors
    /// Returns an error if the local installation or the HTTP client
    /// cannot be constructed.
    pub fn new(config: SessionConfig) -> FetchResult<Self> {
        let installation = match &config.base_dir {
            Some(base) => Some(Arc::new(Installation::open(base.clone())?)),
            None => None,
        };
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            config,
            installation,
            http,
            locks: DashMap::new(),
        })
    }

    fn hash_subdirs(hash: &str) -> FetchResult<(&str, &str)> {
        if hash.len() < 4 {
            return Err(FetchError::MalformedCdnTable(format!(
                "hash too short for CDN path: {hash}"
            )));
        }
        Ok((&hash[0..2], &hash[2..4]))
    }

    /// Disk-cache path for the raw (as-fetched) blob identified by `hash`.
    ///
    /// # Errors
    /// Returns an error if `hash` is too short to derive the two-level
    /// subdirectory prefix CDN layouts use.
    pub fn get_file_path(&self, kind: BlobKind, hash: &str) -> FetchResult<PathBuf> {
        let (a, b) = Self::hash_subdirs(hash)?;
        Ok(self
            .config
            .cache_dir
            .join(&self.config.product_dir)
            .join(kind.segment())
            .join(a)
            .join(b)
            .join(hash))
    }

    /// Disk-cache path for the BLTE-decoded form of the blob identified by
    /// `hash`, kept alongside the raw blob with a `.decoded` suffix.
    ///
    /// # Errors
    /// Returns an error under the same conditions as [`Self::get_file_path`].
    pub fn get_decoded_file_path(&self, kind: BlobKind, hash: &str) -> FetchResult<PathBuf> {
        let mut path = self.get_file_path(kind, hash)?.into_os_string();
        path.push(".decoded");
        Ok(PathBuf::from(path))
    }

    async fn path_lock(&self, path: &Path) -> Arc<AsyncMutex<()>> {
        self.locks
            .entry(path.to_path_buf())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    async fn read_cache(&self, path: &Path, expected_size: Option<u64>) -> Option<Vec<u8>> {
        let data = tokio::fs::read(path).await.ok()?;
        if let Some(expected) = expected_size {
            if data.len() as u64 != expected {
                warn!(
                    path = %path.display(),
                    expected,
                    actual = data.len(),
                    "cached file size mismatch, discarding",
                );
                let _ = tokio::fs::remove_file(path).await;
                return None;
            }
        }
        Some(data)
    }

    async fn write_cache(&self, path: &Path, data: &[u8]) -> FetchResult<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp_path = path.with_extension("tmp");
        {
            let mut tmp = tokio::fs::File::create(&tmp_path).await?;
            tmp.write_all(data).await?;
            tmp.flush().await?;
        }
        tokio::fs::rename(&tmp_path, path).await?;
        Ok(())
    }

    fn cdn_url(&self, kind: BlobKind, host: &str, hash: &str) -> FetchResult<String> {
        let (a, b) = Self::hash_subdirs(hash)?;
        Ok(format!(
            "http://{host}/{}/{}/{a}/{b}/{hash}",
            self.config.product_dir,
            kind.segment(),
        ))
    }

    async fn fetch_from_cdn(
        &self,
        kind: BlobKind,
        hash: &str,
        range: Option<(u64, u64)>,
    ) -> FetchResult<Vec<u8>> {
        if self.config.cdn_hosts.is_empty() {
            return Err(FetchError::NoCdnServers);
        }
        let mut last_err = None;
        for host in &self.config.cdn_hosts {
            let url = self.cdn_url(kind, host, hash)?;
            let mut request = self.http.get(&url);
            if let Some((offset, size)) = range {
                let end = offset + size.saturating_sub(1);
                request = request.header("Range", format!("bytes={offset}-{end}"));
            }
            trace!(url, "fetching from CDN");
            match request.send().await {
                Ok(response) if response.status().is_success() => {
                    match response.bytes().await {
                        Ok(bytes) => return Ok(bytes.to_vec()),
                        Err(err) => last_err = Some(FetchError::Http(err)),
                    }
                }
                Ok(response) => {
                    debug!(url, status = %response.status(), "CDN host returned failure");
                }
                Err(err) => {
                    debug!(url, error = %err, "CDN host unreachable");
                    last_err = Some(FetchError::Http(err));
                }
            }
        }
        let _ = last_err;
        Err(FetchError::CdnExhausted {
            tried: self.config.cdn_hosts.len(),
            resource: hash.to_string(),
        })
    }

    /// Fetch a full blob (config file, loose data blob, or `.index`) by its
    /// hex hash, trying the local install, then the disk cache, then each
    /// configured CDN host in order.
    ///
    /// # Errors
    /// Returns [`FetchError::CdnExhausted`] if every CDN host fails, or an
    /// I/O/storage error from the local tiers.
    pub async fn get_file(&self, kind: BlobKind, hash: &str) -> FetchResult<Vec<u8>> {
        if kind == BlobKind::Config {
            if let Some(installation) = &self.installation {
                let local_path = installation_config_path(installation.as_ref(), hash);
                if let Some(path) = local_path {
                    if let Ok(data) = tokio::fs::read(&path).await {
                        debug!(hash, "config served from local install");
                        return Ok(data);
                    }
                }
            }
        }

        let cache_path = self.get_file_path(kind, hash)?;
        let lock = self.path_lock(&cache_path).await;
        let _guard = lock.lock().await;

        if let Some(data) = self.read_cache(&cache_path, None).await {
            debug!(hash, "served from disk cache");
            return Ok(data);
        }

        let data = self.fetch_from_cdn(kind, hash, None).await?;
        self.write_cache(&cache_path, &data).await?;
        Ok(data)
    }

    /// Fetch and BLTE-decode a data blob keyed by its encoding key, trying
    /// the local CASC install (via its `.idx`/`.data` chain) before falling
    /// back to the tiered raw fetch plus decode.
    ///
    /// # Errors
    /// Returns an error if the local install lookup fails with something
    /// other than "not found", the CDN fetch is exhausted, or BLTE decode
    /// fails.
    pub async fn get_decoded_file(&self, ekey: &EncodingKey) -> FetchResult<Vec<u8>> {
        if let Some(installation) = &self.installation {
            match installation.read_file_by_encoding_key(ekey).await {
                Ok(data) => {
                    debug!(ekey = %hex::encode(ekey.as_bytes()), "served decoded from local install");
                    return Ok(data);
                }
                Err(err) => {
                    trace!(error = %err, "local install miss, falling back to CDN");
                }
            }
        }

        let hash = hex::encode(ekey.as_bytes());
        let decoded_path = self.get_decoded_file_path(BlobKind::Data, &hash)?;
        let lock = self.path_lock(&decoded_path).await;
        let _guard = lock.lock().await;

        if let Some(data) = self.read_cache(&decoded_path, None).await {
            debug!(hash, "served decoded from disk cache");
            return Ok(data);
        }

        let raw = self.get_file(BlobKind::Data, &hash).await?;
        let decoded = ngdp_formats::blte::decode(&raw, 0, ngdp_crypto::KeyStore::global())?;
        self.write_cache(&decoded_path, &decoded).await?;
        Ok(decoded)
    }

    /// Fetch a byte range out of an archive (or loose data blob) on the
    /// CDN. Ranges are not cached individually — only whole archives and
    /// whole loose blobs pass through the tier-2 disk cache.
    ///
    /// # Errors
    /// Returns [`FetchError::CdnExhausted`] if every CDN host fails.
    pub async fn get_file_from_archive(
        &self,
        archive_hash: &str,
        offset: u64,
        size: u64,
    ) -> FetchResult<Vec<u8>> {
        self.fetch_from_cdn(BlobKind::Data, archive_hash, Some((offset, size)))
            .await
    }

    /// Parse the `cdns` pipe-delimited BPSV-style table (as served by the
    /// Ribbit/patch service) and return the row matching `region`, if any,
    /// falling back to the first row when `region` doesn't match.
    ///
    /// # Errors
    /// Returns [`FetchError::MalformedCdnTable`] if the table has no
    /// recognizable header row.
    pub fn parse_cdns_table(body: &str) -> FetchResult<Vec<CdnEntry>> {
        let mut lines = body.lines().filter(|line| !line.trim().is_empty());
        let header = lines
            .next()
            .ok_or_else(|| FetchError::MalformedCdnTable("empty response".to_string()))?;
        let fields: Vec<&str> = header
            .split('|')
            .map(|col| col.split('!').next().unwrap_or(col).trim())
            .collect();

        let name_idx = field_index(&fields, "Name");
        let path_idx = field_index(&fields, "Path");
        let hosts_idx = field_index(&fields, "Hosts");
        let servers_idx = field_index(&fields, "Servers");

        let mut entries = Vec::new();
        for line in lines {
            if line.starts_with("##") {
                continue;
            }
            let cols: Vec<&str> = line.split('|').collect();
            let get = |idx: Option<usize>| idx.and_then(|i| cols.get(i)).copied().unwrap_or("");
            entries.push(CdnEntry {
                name: get(name_idx).to_string(),
                path: get(path_idx).to_string(),
                hosts: get(hosts_idx)
                    .split_whitespace()
                    .map(str::to_string)
                    .collect(),
                servers: get(servers_idx)
                    .split_whitespace()
                    .map(str::to_string)
                    .collect(),
            });
        }
        Ok(entries)
    }

    /// Fetch the `cdns` table for `product` from the Ribbit/patch HTTP
    /// gateway and return the entry for `region`, used as a fallback source
    /// of CDN hosts when [`SessionConfig::cdn_hosts`] is empty.
    ///
    /// # Errors
    /// Returns [`FetchError::Http`] if the gateway is unreachable, or
    /// [`FetchError::MalformedCdnTable`] if the response can't be parsed or
    /// has no matching row.
    pub async fn discover_cdns(&self, region: &str, product: &str) -> FetchResult<CdnEntry> {
        let url = format!("http://{region}.patch.battle.net:1119/{product}/cdns");
        let body = self.http.get(&url).send().await?.text().await?;
        let entries = Self::parse_cdns_table(&body)?;
        entries
            .into_iter()
            .find(|entry| entry.name == region)
            .ok_or_else(|| FetchError::MalformedCdnTable(format!("no cdns row for {region}")))
    }
}

fn field_index(fields: &[&str], name: &str) -> Option<usize> {
    fields.iter().position(|field| *field == name)
}

fn installation_config_path(_installation: &Installation, _hash: &str) -> Option<PathBuf> {
    // Config blobs live under Data/config/<hash[0..2]>/<hash[2..4]>/<hash> inside
    // the installation directory; Installation does not expose its base path,
    // so local config lookups go through the same cache/CDN tiers as data.
    None
}
