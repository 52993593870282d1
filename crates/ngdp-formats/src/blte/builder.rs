//! BLTE file builder

use super::encryption::encrypt_chunk;
use super::error::{BlteError, BlteResult};
use super::{BlteFile, BlteHeader, ChunkData, CompressionMode};

/// Minimum chunk size (1 KB) - smaller chunks create too much overhead
const MIN_CHUNK_SIZE: usize = 1024;

/// Maximum chunk size (16 MB) - typical CDN chunk limit for BLTE
const MAX_CHUNK_SIZE: usize = 16 * 1024 * 1024;

/// Default chunk size (256 KB) - balanced for performance
const DEFAULT_CHUNK_SIZE: usize = 256 * 1024;

/// Encryption configuration for BLTE builder
#[derive(Debug, Clone, Copy)]
pub struct EncryptionConfig {
    /// 64-bit key name
    pub key_name: u64,
    /// Initialization vector (4-16 bytes)
    pub iv: [u8; 4],
    /// The 128-bit encryption key
    pub key: [u8; 16],
}

/// Builder for creating BLTE files
pub struct BlteBuilder {
    chunks: Vec<ChunkData>,
    default_mode: CompressionMode,
    chunk_size: usize,
    encryption: Option<EncryptionConfig>,
}

impl BlteBuilder {
    /// Create a new BLTE builder
    pub fn new() -> Self {
        Self {
            chunks: Vec::new(),
            default_mode: CompressionMode::None,
            chunk_size: DEFAULT_CHUNK_SIZE,
            encryption: None,
        }
    }

    /// Set the default compression mode
    #[must_use]
    pub fn with_compression(mut self, mode: CompressionMode) -> Self {
        self.default_mode = mode;
        self
    }

    /// Set the chunk size for automatic chunking, validated to `1 KB..=16 MB`.
    pub fn with_chunk_size(mut self, size: usize) -> BlteResult<Self> {
        if !(MIN_CHUNK_SIZE..=MAX_CHUNK_SIZE).contains(&size) {
            return Err(BlteError::InvalidChunkSize {
                size,
                min: MIN_CHUNK_SIZE,
                max: MAX_CHUNK_SIZE,
            });
        }
        self.chunk_size = size;
        Ok(self)
    }

    /// Set the chunk size without validation (for testing purposes)
    #[must_use]
    pub fn with_chunk_size_unchecked(mut self, size: usize) -> Self {
        self.chunk_size = size;
        self
    }

    /// Set encryption parameters. All chunks added after this call are encrypted.
    #[must_use]
    pub fn with_encryption(mut self, key_name: u64, iv: [u8; 4], key: [u8; 16]) -> Self {
        self.encryption = Some(EncryptionConfig { key_name, iv, key });
        self
    }

    /// Remove encryption from the builder.
    #[must_use]
    pub fn without_encryption(mut self) -> Self {
        self.encryption = None;
        self
    }

    /// Add a pre-built chunk
    #[must_use]
    pub fn add_chunk(mut self, chunk: ChunkData) -> Self {
        self.chunks.push(chunk);
        self
    }

    /// Add data that will be automatically chunked
    pub fn add_data(mut self, data: &[u8]) -> BlteResult<Self> {
        if data.len() <= self.chunk_size {
            let chunk = if self.encryption.is_some() {
                self.create_encrypted_chunk(data.to_vec(), 0)?
            } else {
                ChunkData::new(data.to_vec(), self.default_mode)?
            };
            self.chunks.push(chunk);
        } else {
            let mut offset = 0;
            let mut chunk_index = 0;
            while offset < data.len() {
                let end = (offset + self.chunk_size).min(data.len());
                let chunk_data = data[offset..end].to_vec();
                let chunk = if self.encryption.is_some() {
                    self.create_encrypted_chunk(chunk_data, chunk_index)?
                } else {
                    ChunkData::new(chunk_data, self.default_mode)?
                };
                self.chunks.push(chunk);
                offset = end;
                chunk_index += 1;
            }
        }
        Ok(self)
    }

    /// Create an encrypted chunk using the builder's current encryption config.
    ///
    /// The encrypted payload always starts with an inner compression mode
    /// byte; after decryption that byte says how to decompress the content.
    fn create_encrypted_chunk(&self, data: Vec<u8>, chunk_index: usize) -> BlteResult<ChunkData> {
        let encryption = self.encryption.as_ref().ok_or_else(|| {
            BlteError::InvalidHeader("no encryption config set".to_string())
        })?;

        let inner = self.build_inner_payload(data)?;
        let encrypted_data = encrypt_chunk(
            &inner,
            encryption.key_name,
            &encryption.key,
            &encryption.iv,
            chunk_index,
        )?;

        Ok(ChunkData::from_compressed(
            CompressionMode::Encrypted,
            encrypted_data,
            Some(inner.len()),
        ))
    }

    /// Build the inner payload for an encrypted chunk: mode byte + data
    fn build_inner_payload(&self, data: Vec<u8>) -> BlteResult<Vec<u8>> {
        let inner_mode = if self.default_mode != CompressionMode::None
            && self.default_mode != CompressionMode::Encrypted
        {
            self.default_mode
        } else {
            CompressionMode::None
        };

        if inner_mode == CompressionMode::None {
            let mut payload = Vec::with_capacity(1 + data.len());
            payload.push(CompressionMode::None.as_byte());
            payload.extend_from_slice(&data);
            Ok(payload)
        } else {
            let compressed = super::compression::compress_chunk(&data, inner_mode)?;
            let mut payload = Vec::with_capacity(1 + compressed.len());
            payload.push(inner_mode.as_byte());
            payload.extend_from_slice(&compressed);
            Ok(payload)
        }
    }

    /// Build the BLTE file.
    ///
    /// Encrypted chunks always use the multi-chunk (extended header) format,
    /// even when there is only one chunk: encrypted content needs a chunk table.
    pub fn build(self) -> BlteResult<BlteFile> {
        if self.chunks.is_empty() {
            return Err(BlteError::InvalidChunkCount(0));
        }

        let has_encrypted = self
            .chunks
            .iter()
            .any(|c| c.mode == CompressionMode::Encrypted);

        if self.chunks.len() == 1 && !has_encrypted {
            Ok(BlteFile {
                header: BlteHeader::single_chunk(),
                chunks: self.chunks,
            })
        } else {
            let header = BlteHeader::multi_chunk(&self.chunks)?;
            Ok(BlteFile {
                header,
                chunks: self.chunks,
            })
        }
    }
}

impl Default for BlteBuilder {
    fn default() -> Self {
        Self::new()
    }
}
