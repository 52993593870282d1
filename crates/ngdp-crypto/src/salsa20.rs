//! Salsa20 stream cipher as used by BLTE `E`-mode chunks.
//!
//! CASC's variant uses a 16-byte key extended to 32 bytes by duplication
//! (the `salsa20` crate's [`Salsa20`] only accepts 32-byte keys), an IV
//! between 4 and 16 bytes that is zero-padded out to 8, with its low 4 bytes
//! XORed with the little-endian chunk index, and a zero block counter.

use cipher::{KeyIvInit, StreamCipher};
use salsa20::Salsa20;

use crate::error::CryptoError;

/// Salsa20 cipher keyed and seeded for one BLTE chunk.
pub struct Salsa20Cipher {
    inner: Salsa20,
}

impl Salsa20Cipher {
    /// Build a cipher for `key`, `iv` (4-16 bytes), and the given chunk index.
    pub fn new(key: &[u8; 16], iv: &[u8], chunk_index: usize) -> Result<Self, CryptoError> {
        if !(4..=16).contains(&iv.len()) {
            return Err(CryptoError::InvalidIvSize {
                expected: 4,
                actual: iv.len(),
            });
        }

        let mut extended_key = [0u8; 32];
        extended_key[..16].copy_from_slice(key);
        extended_key[16..].copy_from_slice(key);

        let mut padded_iv = [0u8; 8];
        let take = iv.len().min(8);
        padded_iv[..take].copy_from_slice(&iv[..take]);

        #[allow(clippy::cast_possible_truncation)]
        let block_bytes = (chunk_index as u32).to_le_bytes();
        for i in 0..4 {
            padded_iv[i] ^= block_bytes[i];
        }

        let inner = Salsa20::new(&extended_key.into(), &padded_iv.into());
        Ok(Self { inner })
    }

    /// XOR `data` in place with the keystream (encrypt and decrypt are the same operation).
    pub fn apply_keystream(&mut self, data: &mut [u8]) {
        self.inner.apply_keystream(data);
    }
}

/// Decrypt (equivalently, encrypt) `data` with the CASC Salsa20 variant.
pub fn decrypt_salsa20(
    data: &[u8],
    key: &[u8; 16],
    iv: &[u8],
    chunk_index: usize,
) -> Result<Vec<u8>, CryptoError> {
    let mut cipher = Salsa20Cipher::new(key, iv, chunk_index)?;
    let mut output = data.to_vec();
    cipher.apply_keystream(&mut output);
    Ok(output)
}
