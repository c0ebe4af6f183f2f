//! Bundle data structures
//!
//! This module defines the descriptor records read from a bundle index and
//! the parsed [`Bundle`] itself.

use super::header::{BundleHeader, BundleSignature};
use crate::asset::Asset;
use crate::block_stream::BlockStream;
use crate::compression::CompressionType;
use crate::error::{BinaryError, Result};
use serde::Serialize;
use std::io::Cursor;
use std::sync::Arc;
use tracing::debug;

/// Descriptor of one independently compressed block in a UnityFS data region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ArchiveBlockInfo {
    /// Size after decompression
    pub uncompressed_size: u32,
    /// Size as stored in the file
    pub compressed_size: u32,
    /// Block flags; the low six bits select the codec
    pub flags: i16,
}

impl ArchiveBlockInfo {
    /// Create a new block descriptor
    pub fn new(uncompressed_size: u32, compressed_size: u32, flags: i16) -> Self {
        Self {
            uncompressed_size,
            compressed_size,
            flags,
        }
    }

    /// Flags widened to the word the codec selector expects
    pub fn flags_word(&self) -> u32 {
        u32::from(self.flags as u16)
    }

    /// Get the compression type of this block
    pub fn compression_type(&self) -> Result<CompressionType> {
        CompressionType::from_flags(self.flags_word())
    }

    /// Decompress this block's stored bytes
    ///
    /// Output that differs from the declared uncompressed size is a decode
    /// error, whatever the codec.
    pub fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        let decoded = crate::compression::decompress_flags(
            data,
            self.flags_word(),
            self.uncompressed_size as usize,
        )?;
        if decoded.len() != self.uncompressed_size as usize {
            return Err(BinaryError::decode(format!(
                "Block decoded to {} bytes, expected {}",
                decoded.len(),
                self.uncompressed_size
            )));
        }
        Ok(decoded)
    }
}

/// Node descriptor from a UnityFS index
///
/// `offset` is relative: the parser skips that many bytes forward before
/// reading the node's block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveNode {
    /// Relative offset
    pub offset: i64,
    /// Size of the node's payload
    pub size: i64,
    /// Status flags
    pub status: i32,
    /// Node name
    pub name: String,
}

impl ArchiveNode {
    /// Create a new node descriptor
    pub fn new(name: impl Into<String>, offset: i64, size: i64, status: i32) -> Self {
        Self {
            offset,
            size,
            status,
            name: name.into(),
        }
    }
}

/// A parsed Unity asset bundle
///
/// Owns the whole file buffer; every embedded [`Asset`] holds a shared
/// handle to the bytes it parses from.
#[derive(Debug)]
pub struct Bundle {
    /// Common and variant-specific header fields
    pub header: BundleHeader,
    /// Bundle name (legacy header name, or first node name for UnityFS)
    pub name: String,
    /// Block descriptors (UnityFS only)
    pub blocks: Vec<ArchiveBlockInfo>,
    /// Node descriptors (UnityFS only)
    pub nodes: Vec<ArchiveNode>,
    pub(crate) assets: Vec<Asset>,
    pub(crate) data: Arc<[u8]>,
    /// Offset of the first data block (UnityFS only)
    pub(crate) data_offset: u64,
}

impl Bundle {
    /// Get the bundle signature
    pub fn signature(&self) -> BundleSignature {
        self.header.signature
    }

    /// Get the raw file buffer
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Offset of the first data block in the file buffer
    pub fn data_offset(&self) -> u64 {
        self.data_offset
    }

    /// Whether the bundle body is stored compressed
    ///
    /// Legacy bundles are compressed as a whole (`UnityWeb`); UnityFS bundles
    /// are compressed if any block uses a codec.
    pub fn is_compressed(&self) -> bool {
        match self.header.signature {
            BundleSignature::Web => true,
            BundleSignature::Fs => self.blocks.iter().any(|block| {
                block.compression_type().unwrap_or(CompressionType::None) != CompressionType::None
            }),
            _ => false,
        }
    }

    /// Get all embedded assets
    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }

    /// Get mutable access to the embedded assets
    pub fn assets_mut(&mut self) -> &mut [Asset] {
        &mut self.assets
    }

    /// Get the number of embedded assets
    pub fn asset_count(&self) -> usize {
        self.assets.len()
    }

    /// Get an asset by index
    pub fn asset(&self, index: usize) -> Option<&Asset> {
        self.assets.get(index)
    }

    /// Find an asset by name
    pub fn find_asset(&self, name: &str) -> Option<&Asset> {
        self.assets.iter().find(|asset| asset.name() == name)
    }

    /// Load an asset's body (if not yet loaded) and return it
    pub fn resolve_asset(&mut self, index: usize) -> Result<&Asset> {
        let count = self.assets.len();
        let asset = self.assets.get_mut(index).ok_or_else(|| {
            BinaryError::structural(format!(
                "Asset index {} out of range ({} assets)",
                index, count
            ))
        })?;
        asset.load()?;
        Ok(asset)
    }

    /// Load every asset, stopping at the first failure
    pub fn resolve_all(&mut self) -> Result<()> {
        for asset in &mut self.assets {
            asset.load()?;
        }
        Ok(())
    }

    /// Open a block stream over the UnityFS data region
    pub fn data_stream(&self) -> Result<BlockStream<Cursor<Arc<[u8]>>>> {
        if self.header.signature != BundleSignature::Fs {
            return Err(BinaryError::unsupported_format(format!(
                "{} bundles have no block stream",
                self.header.signature
            )));
        }
        Ok(BlockStream::new(
            Cursor::new(Arc::clone(&self.data)),
            self.blocks.clone(),
            self.data_offset,
        ))
    }

    /// Read one node's byte range through the block stream
    pub fn read_node(&self, node: &ArchiveNode) -> Result<Vec<u8>> {
        let (offset, size) = match (u64::try_from(node.offset), usize::try_from(node.size)) {
            (Ok(offset), Ok(size)) => (offset, size),
            _ => {
                return Err(BinaryError::structural(format!(
                    "Node '{}' has negative offset or size",
                    node.name
                )));
            }
        };
        debug!(node = %node.name, offset, size, "Reading node through block stream");
        let mut stream = self.data_stream()?;
        stream.seek_to(offset)?;
        stream.read_bytes(size)
    }

    /// Find a node descriptor by name
    pub fn find_node(&self, name: &str) -> Option<&ArchiveNode> {
        self.nodes.iter().find(|node| node.name == name)
    }

    /// Total uncompressed size of the data region
    pub fn uncompressed_data_size(&self) -> u64 {
        self.blocks
            .iter()
            .map(|block| u64::from(block.uncompressed_size))
            .sum()
    }
}
