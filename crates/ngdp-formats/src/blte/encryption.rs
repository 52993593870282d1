//! `E`-mode (encrypted) BLTE chunk handling.
//!
//! Layout: `[keyname_size u8 ==8][keyname u64 LE][iv_size u8 in 4..=16][iv][type u8][body]`.
//! A missing key is a soft miss: the chunk decodes to `decoded_size` zero
//! bytes rather than failing, matching what real clients do when they are
//! missing a TACT key.

use ngdp_crypto::KeyStore;
use ngdp_crypto::salsa20::decrypt_salsa20;

use super::chunk::CompressionMode;
use super::compression::decompress_chunk;
use super::error::{BlteError, BlteResult};

/// Encryption type byte recognized in the `E`-mode header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EncryptionType {
    /// `Salsa20` stream cipher (supported)
    Salsa20 = b'S',
    /// `ARC4` stream cipher (recognized, not implemented)
    Arc4 = b'A',
}

impl EncryptionType {
    /// Parse from byte.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b'S' => Some(Self::Salsa20),
            b'A' => Some(Self::Arc4),
            _ => None,
        }
    }

    /// Byte representation.
    pub fn as_byte(self) -> u8 {
        self as u8
    }
}

/// Parsed `E`-mode chunk header.
struct EncryptedHeader<'a> {
    key_name: u64,
    iv: &'a [u8],
    encryption_type: u8,
    body: &'a [u8],
}

fn parse_encrypted_header(data: &[u8]) -> BlteResult<EncryptedHeader<'_>> {
    let mut offset = 0usize;

    let key_name_size = *data
        .first()
        .ok_or_else(|| BlteError::InvalidHeader("encrypted chunk too short".to_string()))?;
    offset += 1;
    if key_name_size != 8 {
        return Err(BlteError::InvalidHeader(format!(
            "invalid key name size: {key_name_size} (expected 8)"
        )));
    }

    let key_name_bytes = data.get(offset..offset + 8).ok_or_else(|| {
        BlteError::InvalidHeader("encrypted chunk too short for key name".to_string())
    })?;
    let key_name = u64::from_le_bytes(key_name_bytes.try_into().expect("checked length"));
    offset += 8;

    let iv_size = *data.get(offset).ok_or_else(|| {
        BlteError::InvalidHeader("encrypted chunk too short for iv size".to_string())
    })?;
    offset += 1;
    if !(4..=16).contains(&iv_size) {
        return Err(BlteError::InvalidIvSize { actual: iv_size });
    }

    let iv = data
        .get(offset..offset + iv_size as usize)
        .ok_or_else(|| BlteError::InvalidHeader("encrypted chunk too short for iv".to_string()))?;
    offset += iv_size as usize;

    let encryption_type = *data.get(offset).ok_or_else(|| {
        BlteError::InvalidHeader("encrypted chunk too short for type byte".to_string())
    })?;
    offset += 1;

    let body = &data[offset..];

    Ok(EncryptedHeader {
        key_name,
        iv,
        encryption_type,
        body,
    })
}

/// Build an `E`-mode chunk body (key name + iv + type + ciphertext) for
/// `inner_payload`, which must already start with its own mode byte.
pub fn encrypt_chunk(
    inner_payload: &[u8],
    key_name: u64,
    key: &[u8; 16],
    iv: &[u8],
    chunk_index: usize,
) -> BlteResult<Vec<u8>> {
    if !(4..=16).contains(&iv.len()) {
        #[allow(clippy::cast_possible_truncation)]
        return Err(BlteError::InvalidIvSize {
            actual: iv.len() as u8,
        });
    }

    let ciphertext = decrypt_salsa20(inner_payload, key, iv, chunk_index)?;

    let mut result = Vec::with_capacity(10 + iv.len() + ciphertext.len());
    result.push(8);
    result.extend_from_slice(&key_name.to_le_bytes());
    #[allow(clippy::cast_possible_truncation)]
    result.push(iv.len() as u8);
    result.extend_from_slice(iv);
    result.push(EncryptionType::Salsa20.as_byte());
    result.extend_from_slice(&ciphertext);
    Ok(result)
}

/// Decrypt and fully resolve an `E`-mode chunk, recursing into the inner
/// mode byte it reveals. `decoded_size` is the chunk's declared output size,
/// used to synthesize a soft-miss result when the key is unknown.
pub fn decrypt_chunk(
    data: &[u8],
    key_store: &KeyStore,
    chunk_index: usize,
    decoded_size: usize,
) -> BlteResult<Vec<u8>> {
    let header = parse_encrypted_header(data)?;

    let Some(key) = key_store.try_get(header.key_name) else {
        return Ok(vec![0u8; decoded_size]);
    };

    let decrypted = match header.encryption_type {
        b'S' => decrypt_salsa20(header.body, &key, header.iv, chunk_index)?,
        b'A' => return Err(BlteError::NotSupported("ARC4 (encryption type 'A')")),
        other => {
            return Err(BlteError::InvalidHeader(format!(
                "unknown encryption type: 0x{other:02X}"
            )));
        }
    };

    let Some(&inner_mode_byte) = decrypted.first() else {
        return Ok(Vec::new());
    };
    let inner_mode = CompressionMode::from_byte(inner_mode_byte)
        .ok_or(BlteError::UnknownCompressionMode(inner_mode_byte))?;
    let inner_body = &decrypted[1..];

    match inner_mode {
        CompressionMode::Encrypted => Err(BlteError::NestedEncryption),
        CompressionMode::Frame => Err(BlteError::NotSupported("frame (recursive BLTE) mode")),
        _ => decompress_chunk(inner_body, inner_mode),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encrypted_payload(
        key_name: u64,
        iv: &[u8],
        enc_type: u8,
        body: &[u8],
    ) -> Vec<u8> {
        let mut out = Vec::new();
        out.push(8);
        out.extend_from_slice(&key_name.to_le_bytes());
        #[allow(clippy::cast_possible_truncation)]
        out.push(iv.len() as u8);
        out.extend_from_slice(iv);
        out.push(enc_type);
        out.extend_from_slice(body);
        out
    }

    #[test]
    fn missing_key_soft_misses_to_zeros() {
        let store = KeyStore::empty();
        let chunk = encrypted_payload(0xDEAD_BEEF, &[1, 2, 3, 4], b'S', &[0u8; 20]);
        let result = decrypt_chunk(&chunk, &store, 0, 16).unwrap();
        assert_eq!(result, vec![0u8; 16]);
    }

    #[test]
    fn salsa20_round_trip_through_inner_none_mode() {
        let store = KeyStore::empty();
        let key_name = 0x1234_5678_90AB_CDEF;
        let key = [0x11u8; 16];
        store.set(key_name, key);

        let iv = [0x01, 0x02, 0x03, 0x04];
        let mut inner = vec![CompressionMode::None.as_byte()];
        inner.extend_from_slice(b"hello world");
        let encrypted_body = decrypt_salsa20(&inner, &key, &iv, 0).unwrap();
        let chunk = encrypted_payload(key_name, &iv, b'S', &encrypted_body);

        let result = decrypt_chunk(&chunk, &store, 0, inner.len()).unwrap();
        assert_eq!(result, b"hello world");
    }

    #[test]
    fn arc4_type_is_not_supported() {
        let store = KeyStore::empty();
        store.set(1, [0u8; 16]);
        let chunk = encrypted_payload(1, &[1, 2, 3, 4], b'A', &[0u8; 8]);
        let result = decrypt_chunk(&chunk, &store, 0, 8);
        assert!(matches!(result, Err(BlteError::NotSupported(_))));
    }

    #[test]
    fn invalid_iv_size_rejected() {
        let store = KeyStore::empty();
        store.set(1, [0u8; 16]);
        let chunk = encrypted_payload(1, &[1, 2, 3], b'S', &[0u8; 8]);
        let result = decrypt_chunk(&chunk, &store, 0, 8);
        assert!(matches!(result, Err(BlteError::InvalidIvSize { actual: 3 })));
    }

    #[test]
    fn nested_encryption_rejected() {
        let store = KeyStore::empty();
        let key_name = 1u64;
        let key = [0x22u8; 16];
        store.set(key_name, key);

        let iv = [1, 2, 3, 4];
        let mut inner = vec![CompressionMode::Encrypted.as_byte()];
        inner.extend_from_slice(b"fake inner encrypted data");
        let encrypted_body = decrypt_salsa20(&inner, &key, &iv, 0).unwrap();
        let chunk = encrypted_payload(key_name, &iv, b'S', &encrypted_body);

        let result = decrypt_chunk(&chunk, &store, 0, inner.len());
        assert!(matches!(result, Err(BlteError::NestedEncryption)));
    }
}
