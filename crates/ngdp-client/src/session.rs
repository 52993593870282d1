//! Build session: ties a build-config/cdn-config pair to the root and
//! encoding tables they name, and resolves file lookups through them.

use ngdp_crypto::md5::FileDataId;
use ngdp_crypto::{ContentKey, EncodingKey};
use ngdp_formats::archive::ArchiveIndex;
use ngdp_formats::config::{BuildConfig, CdnConfig};
use ngdp_formats::encoding::EncodingFile;
use ngdp_formats::root::{ContentFlags, LocaleFlags, RootFile};

use crate::config::SessionConfig;
use crate::error::{SessionError, SessionResult};
use crate::fetcher::{BlobKind, Fetcher};

/// A loaded build: the parsed build-config/cdn-config pair plus whatever
/// of the root/encoding/archive-group tables they name have been pulled
/// in so far.
///
/// Readiness is tracked the way `ngdp-storage`'s `Installation` tracks it:
/// an `Option` field that is `None` until the matching `load_*` step has
/// run, checked explicitly (not via a typestate) before the operations
/// that depend on it.
pub struct BuildSession {
    fetcher: Fetcher,
    build_config: Option<BuildConfig>,
    cdn_config: Option<CdnConfig>,
    root: Option<RootFile>,
    encoding: Option<EncodingFile>,
    archive_group: Option<ArchiveIndex>,
}

impl BuildSession {
    /// Create a session backed by the given fetch configuration. No network
    /// or disk activity happens until [`Self::load_configs`] is called.
    ///
    /// # Errors
    /// Returns an error if the local installation or HTTP client backing
    /// the [`Fetcher`] cannot be constructed.
    pub fn new(config: SessionConfig) -> SessionResult<Self> {
        Ok(Self {
            fetcher: Fetcher::new(config)?,
            build_config: None,
            cdn_config: None,
            root: None,
            encoding: None,
            archive_group: None,
        })
    }

    /// Step 1: fetch and parse the build-config and cdn-config blobs named
    /// by their hex hashes.
    ///
    /// # Errors
    /// Returns an error if either blob cannot be fetched or fails to parse.
    pub async fn load_configs(
        &mut self,
        build_config_hash: &str,
        cdn_config_hash: &str,
    ) -> SessionResult<()> {
        let build_config_raw = self
            .fetcher
            .get_file(BlobKind::Config, build_config_hash)
            .await?;
        let build_config = BuildConfig::parse(build_config_raw.as_slice())
            .map_err(|err| SessionError::ConfigParse(err.to_string()))?;

        let cdn_config_raw = self
            .fetcher
            .get_file(BlobKind::Config, cdn_config_hash)
            .await?;
        let cdn_config = CdnConfig::parse(cdn_config_raw.as_slice())
            .map_err(|err| SessionError::ConfigParse(err.to_string()))?;

        self.build_config = Some(build_config);
        self.cdn_config = Some(cdn_config);
        Ok(())
    }

    /// Step 2: fetch and decode the encoding file and root file named by
    /// the loaded build-config, and fetch the archive-group index named by
    /// the loaded cdn-config (if any). Requires [`Self::load_configs`] to
    /// have run first.
    ///
    /// # Errors
    /// Returns [`SessionError::NotReady`] if called before
    /// `load_configs`, [`SessionError::MissingConfigKey`] if the
    /// build-config has no `root`/`encoding` entry, or a fetch/parse error
    /// from any of the three tables.
    pub async fn load(&mut self) -> SessionResult<()> {
        let build_config = self
            .build_config
            .as_ref()
            .ok_or(SessionError::NotReady("load_configs"))?;

        let encoding_hash = build_config
            .encoding_key()
            .ok_or(SessionError::MissingConfigKey("encoding"))?
            .to_string();
        let root_hash = build_config
            .root()
            .ok_or(SessionError::MissingConfigKey("root"))?
            .to_string();

        let encoding_key = EncodingKey::from_hex(&encoding_hash)
            .map_err(|err| SessionError::Encoding(err.to_string()))?;
        let encoding_raw = self.fetcher.get_decoded_file(&encoding_key).await?;
        let encoding = EncodingFile::parse_blte(&encoding_raw)
            .map_err(|err| SessionError::Encoding(err.to_string()))?;

        let root_ckey = ContentKey::from_hex(&root_hash)
            .map_err(|err| SessionError::Root(err.to_string()))?;
        let root_ekey = encoding
            .find_encoding(&root_ckey)
            .ok_or_else(|| SessionError::ContentKeyNotFound(root_hash.clone()))?;
        let root_raw = self.fetcher.get_decoded_file(&root_ekey).await?;
        let root = RootFile::parse(&root_raw, &ngdp_formats::root::Settings::default()).map_err(|err| SessionError::Root(err.to_string()))?;

        self.archive_group = if let Some(cdn_config) = &self.cdn_config {
            if let Some(group_hash) = cdn_config.archive_group() {
                let raw = self
                    .fetcher
                    .get_file(BlobKind::Data, group_hash)
                    .await?;
                Some(ArchiveIndex::parse(std::io::Cursor::new(raw))?)
            } else {
                None
            }
        } else {
            None
        };

        self.encoding = Some(encoding);
        self.root = Some(root);
        Ok(())
    }

    fn encoding(&self) -> SessionResult<&EncodingFile> {
        self.encoding.as_ref().ok_or(SessionError::NotReady("load"))
    }

    fn root(&self) -> SessionResult<&RootFile> {
        self.root.as_ref().ok_or(SessionError::NotReady("load"))
    }

    /// Resolve `fdid` through the root table (enUS, no locale/content
    /// filtering beyond the default flags) and fetch+decode its content.
    ///
    /// # Errors
    /// Returns [`SessionError::FileDataIdNotFound`] if `fdid` has no root
    /// entry, or propagates encoding/fetch errors otherwise.
    pub async fn open_by_fdid(&self, fdid: u32) -> SessionResult<Vec<u8>> {
        let ckey = self
            .root()?
            .resolve_by_id(
                FileDataId::new(fdid),
                LocaleFlags(LocaleFlags::ALL),
                ContentFlags { value: ContentFlags::NONE },
            )
            .ok_or(SessionError::FileDataIdNotFound(fdid))?;
        self.open_by_ckey(&ckey).await
    }

    /// Resolve a content key through the encoding table and fetch+decode
    /// its content.
    ///
    /// # Errors
    /// Returns [`SessionError::ContentKeyNotFound`] if `ckey` has no
    /// encoding table entry, or propagates fetch errors otherwise.
    pub async fn open_by_ckey(&self, ckey: &ContentKey) -> SessionResult<Vec<u8>> {
        let ekey = self
            .encoding()?
            .find_encoding(ckey)
            .ok_or_else(|| SessionError::ContentKeyNotFound(ckey.to_hex()))?;
        self.open_by_ekey(&ekey).await
    }

    /// Fetch+decode content directly by encoding key, trying the tiered
    /// fetcher first and falling back to a direct archive-group lookup
    /// (CDN ranged GET + decode) when the fetcher has no local/cache/CDN
    /// loose-blob copy.
    ///
    /// # Errors
    /// Returns [`SessionError::EncodingKeyNotFound`] if neither path can
    /// resolve `ekey`, or propagates fetch/decode errors otherwise.
    pub async fn open_by_ekey(&self, ekey: &EncodingKey) -> SessionResult<Vec<u8>> {
        if let Ok(data) = self.fetcher.get_decoded_file(ekey).await {
            return Ok(data);
        }

        let archive_group = self
            .archive_group
            .as_ref()
            .ok_or_else(|| SessionError::EncodingKeyNotFound(ekey.to_hex()))?;
        let entry = archive_group
            .find_entry(ekey.as_bytes())
            .ok_or_else(|| SessionError::EncodingKeyNotFound(ekey.to_hex()))?;
        let archive_index = entry
            .archive_index
            .ok_or_else(|| SessionError::EncodingKeyNotFound(ekey.to_hex()))?;
        let cdn_config = self
            .cdn_config
            .as_ref()
            .ok_or(SessionError::NotReady("load"))?;
        let archive_hash = cdn_config
            .archives()
            .get(archive_index as usize)
            .map(|info| info.content_key.clone())
            .ok_or_else(|| SessionError::EncodingKeyNotFound(ekey.to_hex()))?;

        let raw = self
            .fetcher
            .get_file_from_archive(&archive_hash, entry.offset, u64::from(entry.size))
            .await?;
        let decoded = ngdp_formats::blte::decode(&raw, 0, ngdp_crypto::KeyStore::global())?;
        Ok(decoded)
    }
}
