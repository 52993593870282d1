//! Cryptographic primitives for NGDP/CASC content-addressed storage.
//!
//! # Components
//!
//! - **Hashing**: MD5 for content/encoding keys, Jenkins96 (lookup3) for
//!   install-path lookup hashes.
//! - **Encryption**: Salsa20 stream cipher for BLTE `E`-mode chunks.
//! - **Key management**: TACT encryption key storage and lookup.
//!
//! # Examples
//!
//! ```
//! use ngdp_crypto::md5::ContentKey;
//!
//! let data = b"Hello, World!";
//! let content_key = ContentKey::from_data(data);
//! println!("Content key: {}", content_key);
//! ```
//!
//! ```
//! use ngdp_crypto::jenkins::Jenkins96;
//!
//! let hash = Jenkins96::hash(b"test data");
//! println!("Jenkins96: {}", hash);
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod jenkins;
pub mod keys;
pub mod md5;
pub mod salsa20;

pub use error::CryptoError;
pub use jenkins::{Jenkins96, hashlittle, hashlittle2};
pub use keys::{KeyStore, TactKey};
pub use md5::{ContentKey, EncodingKey, FileDataId};
pub use salsa20::{Salsa20Cipher, decrypt_salsa20};
