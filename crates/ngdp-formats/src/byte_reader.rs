//! Bounds-checked cursor over a borrowed byte slice.
//!
//! Hand-rolled the way `archive/index.rs`'s footer/TOC parsing hand-rolls its
//! cursor arithmetic before handing contiguous records off to binrw-derived
//! entry types: most of this crate's formats are parsed with `binrw`, but a
//! few (the archive index footer, the CASC bucket index) are irregular
//! enough that a plain cursor reads more clearly.

use thiserror::Error;

/// Errors produced by [`ByteReader`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ByteReaderError {
    /// A read extended past the end of the underlying buffer.
    #[error("unexpected EOF at {pos}: requested {requested} bytes, buffer is {len}")]
    UnexpectedEof {
        /// Cursor position at the start of the failed read.
        pos: usize,
        /// Buffer length.
        len: usize,
        /// Number of bytes the read attempted to consume.
        requested: usize,
    },
    /// A NUL-terminated string read ran off the end of the buffer without
    /// finding a terminator.
    #[error("unterminated string starting at {pos}")]
    UnterminatedString {
        /// Cursor position where the string read started.
        pos: usize,
    },
    /// An absolute seek target was past the end of the buffer.
    #[error("seek to {target} out of bounds for buffer of length {len}")]
    SeekOutOfBounds {
        /// Requested absolute position.
        target: usize,
        /// Buffer length.
        len: usize,
    },
}

/// Result type for [`ByteReader`] operations.
pub type ByteReaderResult<T> = Result<T, ByteReaderError>;

/// A cursor over a borrowed `&[u8]` with bounds-checked sized reads.
///
/// Never silently truncates: any read past the declared length returns
/// [`ByteReaderError::UnexpectedEof`] rather than panicking or padding.
#[derive(Debug, Clone, Copy)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    /// Wrap a byte slice for cursor-based reading, starting at offset 0.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current cursor position.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Total length of the underlying buffer.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of bytes remaining after the cursor.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, n: usize) -> ByteReaderResult<&'a [u8]> {
        if self.remaining() < n {
            return Err(ByteReaderError::UnexpectedEof {
                pos: self.pos,
                len: self.data.len(),
                requested: n,
            });
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// Read a single byte.
    pub fn read_u8(&mut self) -> ByteReaderResult<u8> {
        Ok(self.take(1)?[0])
    }

    /// Read a big-endian `u16`.
    pub fn read_u16_be(&mut self) -> ByteReaderResult<u16> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    /// Read a little-endian `u16`.
    pub fn read_u16_le(&mut self) -> ByteReaderResult<u16> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    /// Read a big-endian 24-bit unsigned integer, widened to `u32`.
    pub fn read_u24_be(&mut self) -> ByteReaderResult<u32> {
        let b = self.take(3)?;
        Ok(u32::from_be_bytes([0, b[0], b[1], b[2]]))
    }

    /// Read a big-endian `u32`.
    pub fn read_u32_be(&mut self) -> ByteReaderResult<u32> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Read a little-endian `u32`.
    pub fn read_u32_le(&mut self) -> ByteReaderResult<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Read a big-endian 40-bit unsigned integer, widened to `u64`.
    pub fn read_u40_be(&mut self) -> ByteReaderResult<u64> {
        let b = self.take(5)?;
        Ok(u64::from_be_bytes([0, 0, 0, b[0], b[1], b[2], b[3], b[4]]))
    }

    /// Read a little-endian `u64`.
    pub fn read_u64_le(&mut self) -> ByteReaderResult<u64> {
        let b = self.take(8)?;
        Ok(u64::from_le_bytes(b.try_into().expect("checked length")))
    }

    /// Read a big-endian `i16`.
    pub fn read_i16_be(&mut self) -> ByteReaderResult<i16> {
        let b = self.take(2)?;
        Ok(i16::from_be_bytes([b[0], b[1]]))
    }

    /// Read a big-endian `i32`.
    pub fn read_i32_be(&mut self) -> ByteReaderResult<i32> {
        let b = self.take(4)?;
        Ok(i32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Read a fixed-size byte array.
    pub fn read_array<const N: usize>(&mut self) -> ByteReaderResult<[u8; N]> {
        let b = self.take(N)?;
        Ok(b.try_into().expect("checked length"))
    }

    /// Read a fixed count of raw bytes, returning a borrowed slice.
    pub fn read_bytes(&mut self, count: usize) -> ByteReaderResult<&'a [u8]> {
        self.take(count)
    }

    /// Read a NUL-terminated byte string (not including the terminator),
    /// advancing the cursor past the terminator.
    pub fn read_nul_string(&mut self) -> ByteReaderResult<&'a [u8]> {
        let start = self.pos;
        let rest = &self.data[self.pos..];
        match rest.iter().position(|&b| b == 0) {
            Some(end) => {
                self.pos += end + 1;
                Ok(&self.data[start..start + end])
            }
            None => Err(ByteReaderError::UnterminatedString { pos: start }),
        }
    }

    /// Seek to an absolute position.
    pub fn seek(&mut self, pos: usize) -> ByteReaderResult<()> {
        if pos > self.data.len() {
            return Err(ByteReaderError::SeekOutOfBounds {
                target: pos,
                len: self.data.len(),
            });
        }
        self.pos = pos;
        Ok(())
    }
}
