//! BLTE per-chunk compression (modes `N` and `Z`)

use super::chunk::CompressionMode;
use super::error::{BlteError, BlteResult};
use flate2::Compression;
use flate2::read::{ZlibDecoder, ZlibEncoder};
use std::io::Read;

/// Maximum allowed decompression size (1 GB), guards against zlib bombs.
pub const MAX_DECOMPRESSION_SIZE: usize = 1024 * 1024 * 1024;

/// Compress data using the given mode. `Encrypted` and `Frame` are not valid
/// inputs here; encryption is handled separately in [`super::encryption`].
pub fn compress_chunk(data: &[u8], mode: CompressionMode) -> BlteResult<Vec<u8>> {
    match mode {
        CompressionMode::None => Ok(data.to_vec()),
        CompressionMode::ZLib => {
            let mut encoder = ZlibEncoder::new(data, Compression::default());
            let mut compressed = Vec::new();
            encoder.read_to_end(&mut compressed).map_err(|e| {
                BlteError::CompressionError(format!("ZLib compression failed: {e}"))
            })?;
            Ok(compressed)
        }
        CompressionMode::Frame => Err(BlteError::NotSupported("frame (recursive BLTE) mode")),
        CompressionMode::Encrypted => Err(BlteError::CompressionError(
            "encryption is handled separately, not through compress_chunk".to_string(),
        )),
    }
}

/// Decompress chunk data for mode `N` or `Z`; fails on `F` and `E`.
pub fn decompress_chunk(data: &[u8], mode: CompressionMode) -> BlteResult<Vec<u8>> {
    match mode {
        CompressionMode::None => Ok(data.to_vec()),
        CompressionMode::ZLib => {
            let mut decoder = ZlibDecoder::new(data);
            let mut decompressed = Vec::new();

            let mut buffer = [0u8; 8192];
            loop {
                let bytes_read = decoder.read(&mut buffer).map_err(|e| {
                    BlteError::CompressionError(format!("ZLib decompression failed: {e}"))
                })?;

                if bytes_read == 0 {
                    break;
                }

                if decompressed.len() + bytes_read > MAX_DECOMPRESSION_SIZE {
                    return Err(BlteError::CompressionError(format!(
                        "decompressed size exceeds limit of {MAX_DECOMPRESSION_SIZE} bytes"
                    )));
                }

                decompressed.extend_from_slice(&buffer[..bytes_read]);
            }

            Ok(decompressed)
        }
        CompressionMode::Frame => Err(BlteError::NotSupported("frame (recursive BLTE) mode")),
        CompressionMode::Encrypted => Err(BlteError::CompressionError(
            "encrypted chunks are handled separately, not through decompress_chunk".to_string(),
        )),
    }
}
