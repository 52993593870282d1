//! CDN Archive data file builder
//!
//! This module provides the `ArchiveBuilder` for creating CDN archive data files.
//! Archive data files contain sequential BLTE-encoded content blocks with no
//! header, footer, or padding between entries.
//!
//! # CDN Archive Format
//!
//! CDN archive data files are simple concatenations of BLTE blocks:
//!
//! ```text
//! [BLTE block 0][BLTE block 1][BLTE block 2]...
//! ```
//!
//! - No file header or footer
//! - No alignment or padding between blocks
//! - Each block is a complete BLTE file (magic + header + chunks)
//! - The corresponding `.index` file maps encoding keys to (offset, size) pairs
//!
//! # Example
//!
//! ```rust,no_run
//! use ngdp_formats::archive::{ArchiveBuilder, ArchiveIndexBuilder};
//! use ngdp_formats::blte::CompressionMode;
//! use std::fs::File;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Create archive data file
//! let mut archive_builder = ArchiveBuilder::new(File::create("archive")?);
//!
//! // Add content (will be BLTE-encoded)
//! let entry1 = archive_builder.add_content(b"Hello, World!", CompressionMode::None)?;
//! let entry2 = archive_builder.add_content(b"More content here", CompressionMode::ZLib)?;
//!
//! // Finalize archive and get entries
//! let (_, entries) = archive_builder.finish()?;
//!
//! // Build corresponding index file
//! let mut index_builder = ArchiveIndexBuilder::new();
//! for entry in &entries {
//!     index_builder.add_entry(entry.encoding_key.to_vec(), entry.size, entry.offset);
//! }
//! index_builder.build(File::create("archive.index")?)?;
//! # Ok(())
//! # }
//! ```

use std::io::{Seek, SeekFrom, Write};

use binrw::BinWrite;

use crate::archive::error::{ArchiveError, ArchiveResult};
use crate::blte::{BlteBuilder, BlteFile, CompressionMode};

/// Result of adding content to an archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Encoding key (MD5 hash of the BLTE-encoded data)
    pub encoding_key: [u8; 16],
    /// Offset within the archive where this entry starts
    pub offset: u64,
    /// Size of the BLTE-encoded data in bytes
    pub size: u32,
}

impl ArchiveEntry {
    /// Create a new archive entry
    pub fn new(encoding_key: [u8; 16], offset: u64, size: u32) -> Self {
        Self {
            encoding_key,
            offset,
            size,
        }
    }

    /// Get the encoding key as a hex string
    pub fn encoding_key_hex(&self) -> String {
        use std::fmt::Write;
        self.encoding_key.iter().fold(String::new(), |mut acc, b| {
            // Writing to String cannot fail, so we discard the result
            let _ = write!(acc, "{b:02x}");
            acc
        })
    }
}

/// Builder for CDN archive data files
///
/// Creates archive files by sequentially writing BLTE-encoded content blocks.
/// After building, use the returned entries with `ArchiveIndexBuilder` to create
/// the corresponding `.index` file.
pub struct ArchiveBuilder<W: Write + Seek> {
    /// Underlying writer
    writer: W,
    /// Current write position
    position: u64,
    /// Entries added to the archive
    entries: Vec<ArchiveEntry>,
}

impl<W: Write + Seek> ArchiveBuilder<W> {
    /// Create a new archive builder
    ///
    /// # Arguments
    /// * `writer` - The writer to output archive data to
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            position: 0,
            entries: Vec::new(),
        }
    }

    /// Create a new archive builder, appending to existing data
    ///
    /// # Arguments
    /// * `writer` - The writer to output archive data to
    /// * `start_offset` - The starting offset (for appending to existing archives)
    pub fn new_at_offset(mut writer: W, start_offset: u64) -> ArchiveResult<Self> {
        writer.seek(SeekFrom::Start(start_offset))?;
        Ok(Self {
            writer,
            position: start_offset,
            entries: Vec::new(),
        })
    }

    /// Add pre-built BLTE data (already serialized bytes)
    ///
    /// The encoding key is computed as the MD5 hash of the BLTE data.
    ///
    /// # Arguments
    /// * `blte_data` - Raw BLTE-encoded bytes
    ///
    /// # Returns
    /// The `ArchiveEntry` describing the added content
    pub fn add_blte_data(&mut self, blte_data: &[u8]) -> ArchiveResult<ArchiveEntry> {
        // Compute encoding key (MD5 of BLTE data)
        let hash = md5::compute(blte_data);
        let encoding_key: [u8; 16] = hash.into();

        // Record offset before writing
        let offset = self.position;

        // Write BLTE data
        self.writer.write_all(blte_data)?;

        // Update position
        let size = blte_data.len() as u32;
        self.position += u64::from(size);

        // Create entry
        let entry = ArchiveEntry::new(encoding_key, offset, size);
        self.entries.push(entry.clone());

        Ok(entry)
    }

    /// Add a `BlteFile` (will be serialized to bytes)
    ///
    /// # Arguments
    /// * `blte` - The BLTE file to add
    ///
    /// # Returns
    /// The `ArchiveEntry` describing the added content
    pub fn add_blte_file(&mut self, blte: &BlteFile) -> ArchiveResult<ArchiveEntry> {
        // Serialize BLTE to bytes
        let mut blte_data = Vec::new();
        blte.write_options(
            &mut std::io::Cursor::new(&mut blte_data),
            binrw::Endian::Big,
            (),
        )
        .map_err(|e| ArchiveError::InvalidFormat(format!("Failed to serialize BLTE: {e}")))?;

        self.add_blte_data(&blte_data)
    }

    /// Add raw content (will be BLTE-encoded with given compression)
    ///
    /// # Arguments
    /// * `data` - Raw content bytes to encode and add
    /// * `mode` - Compression mode to use
    ///
    /// # Returns
    /// The `ArchiveEntry` describing the added content
    pub fn add_content(
        &mut self,
        data: &[u8],
        mode: CompressionMode,
    ) -> ArchiveResult<ArchiveEntry> {
        // Build BLTE file
        let blte = BlteBuilder::new()
            .with_compression(mode)
            .add_data(data)
            .map_err(|e| ArchiveError::InvalidFormat(format!("Failed to create BLTE: {e}")))?
            .build()
            .map_err(|e| ArchiveError::InvalidFormat(format!("Failed to build BLTE: {e}")))?;

        self.add_blte_file(&blte)
    }

    /// Add raw content with default compression (None)
    ///
    /// # Arguments
    /// * `data` - Raw content bytes to encode and add
    ///
    /// # Returns
    /// The `ArchiveEntry` describing the added content
    pub fn add_content_uncompressed(&mut self, data: &[u8]) -> ArchiveResult<ArchiveEntry> {
        self.add_content(data, CompressionMode::None)
    }

    /// Add raw content with ZLib compression
    ///
    /// # Arguments
    /// * `data` - Raw content bytes to encode and add
    ///
    /// # Returns
    /// The `ArchiveEntry` describing the added content
    pub fn add_content_zlib(&mut self, data: &[u8]) -> ArchiveResult<ArchiveEntry> {
        self.add_content(data, CompressionMode::ZLib)
    }

    /// Finalize the archive and return entries for index building
    ///
    /// # Returns
    /// A tuple of (writer, entries) where entries can be used with `ArchiveIndexBuilder`
    pub fn finish(mut self) -> ArchiveResult<(W, Vec<ArchiveEntry>)> {
        self.writer.flush()?;
        Ok((self.writer, self.entries))
    }

    /// Get the current write position (total bytes written)
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Get entries added so far
    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    /// Get the number of entries added
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the builder is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get mutable access to the underlying writer
    ///
    /// Use with caution - writing directly may corrupt the archive
    pub fn writer_mut(&mut self) -> &mut W {
        &mut self.writer
    }
}

impl ArchiveBuilder<std::fs::File> {
    /// Create a new archive builder writing to a file
    ///
    /// # Arguments
    /// * `path` - Path to create the archive file at
    pub fn create<P: AsRef<std::path::Path>>(path: P) -> ArchiveResult<Self> {
        let file = std::fs::File::create(path)?;
        Ok(Self::new(file))
    }
}
