//! Compression support for Unity bundle files
//!
//! Unity tags every compressed region (the bundle index and each data block)
//! with the low six bits of a flags word. The codecs here are stateless:
//! given the tag, the stored bytes and the declared uncompressed size they
//! return the decoded bytes or fail.

use crate::error::{BinaryError, Result};
use serde::Serialize;
use std::io::Cursor;

/// Compression types known to Unity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CompressionType {
    /// No compression
    None = 0,
    /// LZMA compression (size field stripped from the stream header)
    Lzma = 1,
    /// LZ4 block compression
    Lz4 = 2,
    /// LZ4HC (high compression); decodes exactly like LZ4
    Lz4Hc = 3,
    /// LZHAM compression (declared by Unity, never implemented here)
    Lzham = 4,
}

impl CompressionType {
    /// Create compression type from a flags word (low six bits)
    pub fn from_flags(flags: u32) -> Result<Self> {
        match flags & ArchiveFlags::COMPRESSION_TYPE_MASK {
            0 => Ok(CompressionType::None),
            1 => Ok(CompressionType::Lzma),
            2 => Ok(CompressionType::Lz4),
            3 => Ok(CompressionType::Lz4Hc),
            4 => Ok(CompressionType::Lzham),
            other => Err(BinaryError::unsupported_format(format!(
                "Unknown compression type: {}",
                other
            ))),
        }
    }

    /// Check if this compression type can be decoded
    pub fn is_supported(self) -> bool {
        !matches!(self, CompressionType::Lzham)
    }

    /// Get the name of the compression type
    pub fn name(self) -> &'static str {
        match self {
            CompressionType::None => "None",
            CompressionType::Lzma => "LZMA",
            CompressionType::Lz4 => "LZ4",
            CompressionType::Lz4Hc => "LZ4HC",
            CompressionType::Lzham => "LZHAM",
        }
    }
}

/// Flag bits found in UnityFS headers and block descriptors
pub struct ArchiveFlags;

impl ArchiveFlags {
    /// Compression type mask
    pub const COMPRESSION_TYPE_MASK: u32 = 0x3F;
    /// Metadata stored at the end of the file instead of after the header
    pub const EOF_METADATA: u32 = 0x80;
}

/// Decompress data based on compression type
///
/// `uncompressed_size` is the size declared by the container; the LZ4 and
/// LZMA paths must produce exactly that many bytes.
pub fn decompress(
    data: &[u8],
    compression: CompressionType,
    uncompressed_size: usize,
) -> Result<Vec<u8>> {
    match compression {
        CompressionType::None => Ok(data.to_vec()),
        CompressionType::Lz4 | CompressionType::Lz4Hc => decompress_lz4(data, uncompressed_size),
        CompressionType::Lzma => decompress_lzma(data, uncompressed_size),
        CompressionType::Lzham => Err(BinaryError::unsupported_format(
            "LZHAM compression is not supported",
        )),
    }
}

/// Decompress data tagged by a raw flags word
pub fn decompress_flags(data: &[u8], flags: u32, uncompressed_size: usize) -> Result<Vec<u8>> {
    decompress(data, CompressionType::from_flags(flags)?, uncompressed_size)
}

/// Decompress an LZ4 block into a buffer of exactly `uncompressed_size` bytes
fn decompress_lz4(data: &[u8], uncompressed_size: usize) -> Result<Vec<u8>> {
    let mut output = vec![0u8; uncompressed_size];
    let written = lz4_flex::block::decompress_into(data, &mut output)?;
    if written != uncompressed_size {
        return Err(BinaryError::decode(format!(
            "LZ4 size mismatch: expected {}, got {}",
            uncompressed_size, written
        )));
    }
    Ok(output)
}

/// Decompress Unity's header-stripped LZMA stream
///
/// Unity stores `props (1) | dict_size (4) | data`; a standard decoder wants
/// the 8-byte little-endian uncompressed size in between, so it is rebuilt
/// from the declared size before decoding.
fn decompress_lzma(data: &[u8], uncompressed_size: usize) -> Result<Vec<u8>> {
    const PROPERTIES_LEN: usize = 5;

    if data.len() < PROPERTIES_LEN {
        return Err(BinaryError::decode(format!(
            "LZMA stream too short for properties header: {} bytes",
            data.len()
        )));
    }

    let mut stream = Vec::with_capacity(data.len() + 8);
    stream.extend_from_slice(&data[..PROPERTIES_LEN]);
    stream.extend_from_slice(&(uncompressed_size as u64).to_le_bytes());
    stream.extend_from_slice(&data[PROPERTIES_LEN..]);

    let mut output = Vec::with_capacity(uncompressed_size);
    lzma_rs::lzma_decompress(&mut Cursor::new(&stream), &mut output)?;

    if output.len() != uncompressed_size {
        return Err(BinaryError::decode(format!(
            "LZMA size mismatch: expected {}, got {}",
            uncompressed_size,
            output.len()
        )));
    }
    Ok(output)
}

/// Decompress a standard LZMA stream that carries its own 13-byte header
///
/// Used for the legacy compressed bundle layout, whose body is a plain
/// `.lzma` stream.
pub fn decompress_lzma_stream(data: &[u8]) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    lzma_rs::lzma_decompress(&mut Cursor::new(data), &mut output)?;
    Ok(output)
}
