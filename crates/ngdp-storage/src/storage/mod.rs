//! Archive segment management and file access.
//!
//! This module handles the low-level storage layer:
//! - Archive segments with 480-byte headers
//! - Memory-mapped archive file access
//! - 30-byte local BLTE entry headers
//!
//! CASC organizes data into segments (up to 1023) that can be
//! individually frozen (read-only) or thawed (writable).

pub mod archive_file;
pub mod local_header;
pub mod segment;

pub use archive_file::ArchiveManager;
pub use local_header::LocalHeader;
pub use segment::{
    BUCKET_COUNT, DEFAULT_FILE_OFFSET_BITS, MAX_SEGMENTS, SEGMENT_HEADER_SIZE, SEGMENT_SIZE,
    SegmentHeader, SegmentInfo, SegmentState, bucket_hash, parse_data_filename, segment_data_path,
};

use crate::{Installation, Result, StorageConfig};
use std::path::PathBuf;

/// Entry point for a CASC storage root that may hold several named game
/// installations side by side (e.g. retail, PTR, classic), each under its
/// own subdirectory of [`StorageConfig::base_path`].
pub struct Storage {
    config: StorageConfig,
}

impl Storage {
    /// Create a storage handle rooted at `config.base_path`. Does not
    /// touch disk until [`Self::open_installation`] is called.
    ///
    /// # Errors
    /// Returns an error if `base_path` cannot be created.
    pub fn new(config: StorageConfig) -> Result<Self> {
        if !config.base_path.exists() {
            std::fs::create_dir_all(&config.base_path)?;
        }
        Ok(Self { config })
    }

    /// Open (creating if needed) the named installation under this
    /// storage root.
    ///
    /// # Errors
    /// Returns an error if the installation's directory structure cannot
    /// be created or its managers fail to initialize.
    pub fn open_installation(&self, name: &str) -> Result<Installation> {
        let path: PathBuf = self.config.base_path.join(name);
        Installation::open(path)
    }

    /// The configuration this storage was created with.
    pub const fn config(&self) -> &StorageConfig {
        &self.config
    }
}
