//! TACT encryption key storage.
//!
//! Keys are identified by a 64-bit key name (a hash, opaque to this crate) and
//! decrypt BLTE `E`-mode chunks. Key *discovery* — finding keys in the wild —
//! is out of scope here; this store only holds what it is told.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::OnceLock;

use parking_lot::RwLock;

use crate::error::CryptoError;

/// A single TACT encryption key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TactKey {
    /// Key identifier (an opaque 64-bit hash of the key name).
    pub id: u64,
    /// 16-byte encryption key.
    pub key: [u8; 16],
}

impl TactKey {
    /// Build a key from its id and raw bytes.
    pub fn new(id: u64, key: [u8; 16]) -> Self {
        Self { id, key }
    }

    /// Parse a key from a hex-encoded 16-byte string.
    pub fn from_hex(id: u64, hex: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(hex.trim())
            .map_err(|e| CryptoError::InvalidKeyFormat(format!("invalid hex: {e}")))?;
        if bytes.len() != 16 {
            return Err(CryptoError::InvalidKeySize {
                expected: 16,
                actual: bytes.len(),
            });
        }
        let mut key = [0u8; 16];
        key.copy_from_slice(&bytes);
        Ok(Self::new(id, key))
    }
}

impl fmt::Display for TactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016X}: {}", self.id, hex::encode_upper(self.key))
    }
}

/// Process-wide store of TACT encryption keys, `u64 -> 16-byte key`.
///
/// Construct a local instance with [`KeyStore::empty`] for tests, or use
/// [`KeyStore::global`] for the lazily-initialized, process-wide singleton
/// that every `BuildSession` shares by default.
#[derive(Debug, Default)]
pub struct KeyStore {
    keys: RwLock<HashMap<u64, [u8; 16]>>,
}

static GLOBAL: OnceLock<KeyStore> = OnceLock::new();

impl KeyStore {
    /// An empty key store.
    pub fn empty() -> Self {
        Self {
            keys: RwLock::new(HashMap::new()),
        }
    }

    /// The process-wide key store. On first access, attempts a best-effort
    /// load of `WoW.txt` from the current working directory; a missing or
    /// unreadable file is not an error, it just leaves the store empty.
    pub fn global() -> &'static KeyStore {
        GLOBAL.get_or_init(|| {
            let store = Self::empty();
            let _ = store.load_file("WoW.txt");
            store
        })
    }

    /// Look up a key by id.
    pub fn try_get(&self, id: u64) -> Option<[u8; 16]> {
        self.keys.read().get(&id).copied()
    }

    /// Insert or overwrite a key.
    pub fn set(&self, id: u64, key: [u8; 16]) {
        self.keys.write().insert(id, key);
    }

    /// Number of keys currently held.
    pub fn len(&self) -> usize {
        self.keys.read().len()
    }

    /// Whether the store holds no keys.
    pub fn is_empty(&self) -> bool {
        self.keys.read().is_empty()
    }

    /// Load keys from a whitespace-delimited text file: each non-empty line
    /// is `<keyname-hex> <key-hex>`. Unknown/malformed lines are skipped.
    /// A missing file is *not* an error; returns the count of keys loaded.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<usize, CryptoError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(self.load_text(&content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(CryptoError::Io(e)),
        }
    }

    /// Parse keys out of whitespace-delimited text content.
    pub fn load_text(&self, content: &str) -> usize {
        let mut count = 0;
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let mut parts = line.split_whitespace();
            let (Some(id_str), Some(key_str)) = (parts.next(), parts.next()) else {
                continue;
            };
            let Ok(id) = u64::from_str_radix(id_str.trim_start_matches("0x"), 16) else {
                continue;
            };
            if let Ok(key) = TactKey::from_hex(id, key_str) {
                self.set(key.id, key.key);
                count += 1;
            }
        }
        count
    }
}
