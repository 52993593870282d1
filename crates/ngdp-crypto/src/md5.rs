//! MD5-derived content/encoding key types.
//!
//! `CKey`/`EKey` are 16-byte opaque identifiers; many on-disk tables store
//! only a header-declared prefix of them (9 or 16 bytes). `matches_prefix`
//! is the one place every index/encoding lookup in this workspace goes
//! through, so the comparison is defined once here.

use binrw::{BinRead, BinWrite};
use md5::{Digest, Md5};
use std::fmt;

/// Content key (`CKey`): identifies decoded payload content.
#[derive(BinRead, BinWrite, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentKey([u8; 16]);

impl ContentKey {
    /// Build from raw bytes.
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Compute the MD5 content key of `data`.
    pub fn from_data(data: &[u8]) -> Self {
        Self(md5_bytes(data))
    }

    /// Parse from a hex string.
    pub fn from_hex(hex: &str) -> Result<Self, hex::FromHexError> {
        let mut bytes = [0u8; 16];
        hex::decode_to_slice(hex.trim(), &mut bytes)?;
        Ok(Self(bytes))
    }

    /// Raw 16 bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Lower-case hex encoding.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Whether this key's first `prefix_len` bytes equal `other`'s.
    pub fn matches_prefix(&self, other: &[u8], prefix_len: usize) -> bool {
        matches_prefix(&self.0, other, prefix_len)
    }
}

impl fmt::Display for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Encoding key (`EKey`): identifies an encoded (BLTE) blob.
#[derive(BinRead, BinWrite, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EncodingKey([u8; 16]);

impl EncodingKey {
    /// Build from raw bytes.
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Compute the MD5 encoding key of `data`.
    pub fn from_data(data: &[u8]) -> Self {
        Self(md5_bytes(data))
    }

    /// Parse from a hex string.
    pub fn from_hex(hex: &str) -> Result<Self, hex::FromHexError> {
        let mut bytes = [0u8; 16];
        hex::decode_to_slice(hex.trim(), &mut bytes)?;
        Ok(Self(bytes))
    }

    /// Raw 16 bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Lower-case hex encoding.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// First 9 bytes, used for CASC local-bucket selection.
    pub fn first_9(&self) -> [u8; 9] {
        let mut result = [0u8; 9];
        result.copy_from_slice(&self.0[..9]);
        result
    }

    /// Whether this key's first `prefix_len` bytes equal `other`'s.
    pub fn matches_prefix(&self, other: &[u8], prefix_len: usize) -> bool {
        matches_prefix(&self.0, other, prefix_len)
    }
}

impl fmt::Display for EncodingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

fn md5_bytes(data: &[u8]) -> [u8; 16] {
    let mut hasher = Md5::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&result);
    bytes
}

/// Compare the first `prefix_len` bytes of two 16-byte keys. Used by every
/// index/encoding binary search, which only ever has a header-declared
/// prefix length (9 or 16) to go on.
pub fn matches_prefix(key: &[u8; 16], candidate: &[u8], prefix_len: usize) -> bool {
    prefix_len <= 16 && candidate.len() >= prefix_len && key[..prefix_len] == candidate[..prefix_len]
}

/// `fileDataID`: a numeric identifier the game uses to refer to a file.
#[derive(BinRead, BinWrite, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[brw(little)]
pub struct FileDataId(pub u32);

impl FileDataId {
    /// Build from a raw id.
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// The raw id value.
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for FileDataId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for FileDataId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl From<FileDataId> for u32 {
    fn from(fdid: FileDataId) -> Self {
        fdid.0
    }
}
