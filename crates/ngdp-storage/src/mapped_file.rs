//! Read-only memory-mapped file, shared across owners via `Arc`.
//!
//! Mirrors the teacher's `archive_file.rs` mmap usage, pulled out as its own
//! reusable primitive so a parsed view (index, archive, segment) can hold a
//! cloned `Arc<MappedFile>` instead of its own private `Mmap`.

use memmap2::Mmap;
use std::fs::File;
use std::path::Path;

/// A read-only memory mapping of a file on disk.
///
/// `Drop` unmaps; there is no explicit `close()`, matching how
/// `memmap2::Mmap` itself is used in `storage/archive_file.rs`.
pub struct MappedFile {
    mmap: Mmap,
}

impl MappedFile {
    /// Map `path` into memory for reading.
    ///
    /// # Errors
    /// Returns the underlying I/O error if the file cannot be opened or
    /// mapped.
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = File::open(path)?;
        #[allow(unsafe_code)]
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(Self { mmap })
    }

    /// Borrow the mapped bytes.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.mmap
    }

    /// Length of the mapped file in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    /// Whether the mapped file is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }
}
