//! BLTE error types

use thiserror::Error;

/// BLTE-specific error type
#[derive(Debug, Error)]
pub enum BlteError {
    /// Invalid BLTE magic bytes
    #[error("invalid BLTE magic: expected [42 4C 54 45], got {0:02X?}")]
    InvalidMagic([u8; 4]),

    /// Invalid header format
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// Invalid chunk count
    #[error("invalid chunk count: {0}")]
    InvalidChunkCount(u32),

    /// Empty chunk encountered
    #[error("empty chunk (zero size)")]
    EmptyChunk,

    /// Invalid chunk size for builder
    #[error("invalid chunk size: {size} bytes (must be between {min} and {max} bytes)")]
    InvalidChunkSize {
        /// The invalid size that was provided
        size: usize,
        /// Minimum allowed size
        min: usize,
        /// Maximum allowed size
        max: usize,
    },

    /// Unknown compression mode
    #[error("unknown compression mode: 0x{0:02X}")]
    UnknownCompressionMode(u8),

    /// A recognized but unimplemented mode: BLTE `F`, or encryption type `A`
    #[error("not supported: {0}")]
    NotSupported(&'static str),

    /// Caller didn't supply `decoded_size_hint` for a single-chunk non-`N` file
    #[error("decoded_size_hint required for non-identity single-chunk BLTE")]
    BadHint,

    /// A single-chunk file used the `E` mode, which requires a chunk table
    #[error("single-chunk encrypted BLTE is not valid")]
    SingleChunkEncrypted,

    /// Nested `E`-mode chunk (encryption inside encryption)
    #[error("nested encryption is not valid")]
    NestedEncryption,

    /// Invalid IV size for an encrypted chunk
    #[error("invalid IV size: expected 4..=16, got {actual}")]
    InvalidIvSize {
        /// Actual IV size in bytes
        actual: u8,
    },

    /// Compression/decompression error
    #[error("compression error: {0}")]
    CompressionError(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Binary parsing error
    #[error("binary parsing error: {0}")]
    BinRw(#[from] binrw::Error),

    /// Cryptographic error
    #[error("crypto error: {0}")]
    Crypto(#[from] ngdp_crypto::CryptoError),
}

/// Result type for BLTE operations
pub type BlteResult<T> = Result<T, BlteError>;
