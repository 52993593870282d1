//! BLTE (Block Table Encoded) format implementation
//!
//! BLTE is NGDP's container format for compressed and optionally encrypted
//! content. A file is either a single chunk (no chunk table, mode inferred
//! from the first byte) or a multi-chunk file with a chunk table up front.

mod builder;
mod chunk;
mod compression;
mod encryption;
mod error;
mod header;

pub use builder::BlteBuilder;
pub use chunk::{ChunkData, CompressionMode};
pub use compression::{compress_chunk, decompress_chunk};
pub use encryption::{EncryptionType, decrypt_chunk, encrypt_chunk};
pub use error::{BlteError, BlteResult};
pub use header::{BlteHeader, ChunkInfo, HeaderFlags};

use binrw::io::{Read, Seek, SeekFrom, Write};
use binrw::{BinRead, BinResult, BinWrite};
use ngdp_crypto::KeyStore;

/// Complete BLTE file structure
#[derive(Debug, Clone)]
pub struct BlteFile {
    /// BLTE header
    pub header: BlteHeader,
    /// Chunk data
    pub chunks: Vec<ChunkData>,
}

impl BinRead for BlteFile {
    type Args<'a> = ();

    #[allow(clippy::cast_possible_truncation)]
    fn read_options<R: Read + Seek>(
        reader: &mut R,
        endian: binrw::Endian,
        _args: Self::Args<'_>,
    ) -> BinResult<Self> {
        let header = BlteHeader::read_options(reader, endian, ())?;
        let mut chunks = Vec::new();

        if header.is_single_chunk() {
            let start_pos = reader.stream_position()?;
            let end_pos = reader.seek(SeekFrom::End(0))?;
            reader.seek(SeekFrom::Start(start_pos))?;

            let chunk_size = (end_pos - start_pos) as usize;
            if chunk_size > 0 {
                let chunk = ChunkData::read_options(reader, endian, (chunk_size,))?;
                chunks.push(chunk);
            }
        } else if let Some(ref extended) = header.extended {
            for info in &extended.chunk_infos {
                let chunk =
                    ChunkData::read_options(reader, endian, (info.compressed_size as usize,))?;
                chunks.push(chunk);
            }
        }

        Ok(Self { header, chunks })
    }
}

impl BinWrite for BlteFile {
    type Args<'a> = ();

    fn write_options<W: Write + Seek>(
        &self,
        writer: &mut W,
        endian: binrw::Endian,
        _args: Self::Args<'_>,
    ) -> BinResult<()> {
        self.header.write_options(writer, endian, ())?;
        for chunk in &self.chunks {
            chunk.write_options(writer, endian, ())?;
        }
        Ok(())
    }
}

impl BlteFile {
    /// Create a new single-chunk BLTE file
    pub fn single_chunk(data: Vec<u8>, mode: CompressionMode) -> BlteResult<Self> {
        Ok(Self {
            header: BlteHeader::single_chunk(),
            chunks: vec![ChunkData::new(data, mode)?],
        })
    }

    /// Create a new multi-chunk BLTE file
    pub fn multi_chunk(chunks: Vec<ChunkData>) -> BlteResult<Self> {
        let header = BlteHeader::multi_chunk(&chunks)?;
        Ok(Self { header, chunks })
    }

    /// Decompress all chunks and return the complete data. Fails on any
    /// encrypted chunk; use [`Self::decompress_with_keys`] for those.
    pub fn decompress(&self) -> BlteResult<Vec<u8>> {
        let total_size = self.estimate_decompressed_size();
        let mut result = Vec::with_capacity(total_size);

        for (index, chunk) in self.chunks.iter().enumerate() {
            let decompressed = chunk.decompress(index)?;
            result.extend_from_slice(&decompressed);
        }
        Ok(result)
    }

    /// Decompress all chunks, decrypting any `E`-mode chunks with `key_store`.
    ///
    /// Encrypted BLTE files must use the extended (multi-chunk) header
    /// format; single-chunk encrypted files are rejected.
    pub fn decompress_with_keys(&self, key_store: &KeyStore) -> BlteResult<Vec<u8>> {
        if self.header.is_single_chunk()
            && self
                .chunks
                .first()
                .is_some_and(|c| c.mode == CompressionMode::Encrypted)
        {
            return Err(BlteError::SingleChunkEncrypted);
        }

        let total_size = self.estimate_decompressed_size();
        let mut result = Vec::with_capacity(total_size);

        for (index, chunk) in self.chunks.iter().enumerate() {
            let decompressed = if chunk.mode == CompressionMode::Encrypted {
                decrypt_chunk(&chunk.data, key_store, index, chunk.decompressed_size())?
            } else {
                chunk.decompress(index)?
            };
            result.extend_from_slice(&decompressed);
        }
        Ok(result)
    }

    fn estimate_decompressed_size(&self) -> usize {
        if let Some(ref extended) = self.header.extended {
            let total: u64 = extended
                .chunk_infos
                .iter()
                .map(|info| u64::from(info.decompressed_size))
                .sum();
            return usize::try_from(total).unwrap_or(usize::MAX);
        }

        self.chunks.iter().map(|c| c.decompressed_size()).sum()
    }

    /// Compress data with automatic chunking
    pub fn compress(data: &[u8], chunk_size: usize, mode: CompressionMode) -> BlteResult<Self> {
        if data.len() <= chunk_size {
            Self::single_chunk(data.to_vec(), mode)
        } else {
            let mut chunks = Vec::new();
            let mut offset = 0;

            while offset < data.len() {
                let end = (offset + chunk_size).min(data.len());
                let chunk_data = data[offset..end].to_vec();
                chunks.push(ChunkData::new(chunk_data, mode)?);
                offset = end;
            }

            Self::multi_chunk(chunks)
        }
    }
}

/// Decode a complete BLTE byte buffer in one call.
///
/// `decoded_size_hint` is only consulted for single-chunk files whose mode
/// isn't `N` (where the compressed size doesn't reveal the decoded size);
/// pass `0` when the caller doesn't know it.
pub fn decode(input: &[u8], decoded_size_hint: usize, key_store: &KeyStore) -> BlteResult<Vec<u8>> {
    use std::io::Cursor;

    let mut cursor = Cursor::new(input);
    let file = BlteFile::read_options(&mut cursor, binrw::Endian::Big, ())?;

    if file.header.is_single_chunk() {
        let Some(chunk) = file.chunks.first() else {
            return Ok(Vec::new());
        };
        if chunk.mode == CompressionMode::Encrypted {
            return Err(BlteError::SingleChunkEncrypted);
        }
        if chunk.mode != CompressionMode::None && decoded_size_hint == 0 {
            return Err(BlteError::BadHint);
        }
        return chunk.decompress(0);
    }

    file.decompress_with_keys(key_store)
}

impl crate::CascFormat for BlteFile {
    fn parse(data: &[u8]) -> Result<Self, Box<dyn std::error::Error>> {
        use std::io::Cursor;
        let mut cursor = Cursor::new(data);
        Self::read_options(&mut cursor, binrw::Endian::Big, ())
            .map_err(|e| Box::new(BlteError::BinRw(e)) as Box<dyn std::error::Error>)
    }

    fn build(&self) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
        use std::io::Cursor;
        let mut data = Vec::new();
        let mut cursor = Cursor::new(&mut data);
        self.write_options(&mut cursor, binrw::Endian::Big, ())
            .map_err(|e| Box::new(BlteError::BinRw(e)) as Box<dyn std::error::Error>)?;
        Ok(data)
    }
}
