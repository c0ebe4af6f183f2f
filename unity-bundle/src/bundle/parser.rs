//! Bundle parser implementation
//!
//! Reads the common header, dispatches on the signature and builds one
//! unloaded [`Asset`] per embedded serialized file.

use super::header::{BundleHeader, BundleSignature, FsHeader, LegacyHeader};
use super::types::{ArchiveBlockInfo, ArchiveNode, Bundle};
use crate::asset::{Asset, RESOURCE_SUFFIX};
use crate::compression::{self, CompressionType};
use crate::error::{BinaryError, Result};
use crate::reader::{BinaryReader, ByteOrder};
use crate::typetree::CommonStrings;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Size of the reserved hash at the start of a UnityFS index
const INDEX_HASH_SIZE: u64 = 16;

/// Main bundle parser
///
/// Carries the common string table handed to every asset it creates.
#[derive(Debug, Clone)]
pub struct BundleParser {
    strings: Arc<CommonStrings>,
}

impl BundleParser {
    /// Parser using the embedded common string table
    pub fn new() -> Self {
        Self::with_strings(CommonStrings::embedded())
    }

    /// Parser using another common string table
    pub fn with_strings(strings: Arc<CommonStrings>) -> Self {
        Self { strings }
    }

    /// The common string table in use
    pub fn strings(&self) -> &Arc<CommonStrings> {
        &self.strings
    }

    /// Read and parse a bundle file
    #[instrument(skip(self, path), fields(path = %path.as_ref().display()))]
    pub fn parse_file<P: AsRef<Path>>(&self, path: P) -> Result<Bundle> {
        let data = std::fs::read(path.as_ref())?;
        self.parse(data)
    }

    /// Parse a bundle from its complete contents
    #[instrument(skip(self, data), fields(len = data.len()))]
    pub fn parse(&self, data: Vec<u8>) -> Result<Bundle> {
        let data: Arc<[u8]> = Arc::from(data);
        let mut reader = BinaryReader::new(&data, ByteOrder::Big);
        let mut header = BundleHeader::from_reader(&mut reader)?;
        debug!(
            signature = %header.signature,
            version = header.format_version,
            generator = %header.generator_version,
            "Read bundle header"
        );

        match header.signature {
            BundleSignature::Raw | BundleSignature::Web => {
                let legacy = LegacyHeader::from_reader(&mut reader, header.format_version)?;
                let (name, assets) = self.read_legacy(&mut reader, &data, &header, &legacy)?;
                let data_offset = u64::from(legacy.header_size);
                header.legacy = Some(legacy);
                Ok(Bundle {
                    header,
                    name,
                    blocks: Vec::new(),
                    nodes: Vec::new(),
                    assets,
                    data: Arc::clone(&data),
                    data_offset,
                })
            }
            BundleSignature::Fs => {
                let fs = FsHeader::from_reader(&mut reader)?;
                header.fs = Some(fs);
                self.read_fs(&mut reader, &data, header, fs)
            }
            BundleSignature::Archive => Err(BinaryError::unsupported_format(
                "UnityArchive bundles are not supported",
            )),
        }
    }

    fn read_legacy(
        &self,
        reader: &mut BinaryReader,
        data: &Arc<[u8]>,
        header: &BundleHeader,
        legacy: &LegacyHeader,
    ) -> Result<(String, Vec<Asset>)> {
        reader.set_position(u64::from(legacy.header_size))?;
        let name = legacy.name.clone();

        if header.signature == BundleSignature::Web {
            let count = reader.read_u32()?;
            let decompressed: Arc<[u8]> =
                Arc::from(compression::decompress_lzma_stream(reader.remaining_slice())?);
            debug!(
                count,
                decompressed = decompressed.len(),
                "Decompressed legacy bundle body"
            );
            let assets = (0..count)
                .map(|_| {
                    Asset::new(
                        String::new(),
                        header.signature,
                        Arc::clone(&decompressed),
                        0,
                        Arc::clone(&self.strings),
                    )
                })
                .collect();
            return Ok((name, assets));
        }

        let entry_start = reader.position();
        let entry_name = reader.read_cstring()?;
        let entry_offset = reader.read_u32()?;
        let _entry_size = reader.read_u32()?;

        // The entry offset counts from four bytes before the entry
        let mut base_offset = (entry_start + u64::from(entry_offset))
            .checked_sub(4)
            .ok_or_else(|| {
                BinaryError::structural(format!("Invalid entry offset {}", entry_offset))
            })?;
        if entry_name.ends_with(RESOURCE_SUFFIX) {
            base_offset = base_offset
                .checked_sub(entry_name.len() as u64)
                .ok_or_else(|| {
                    BinaryError::structural(format!("Invalid resource offset {}", entry_offset))
                })?;
        }
        debug!(entry = %entry_name, base_offset, "Read legacy entry");

        let asset = Asset::new(
            entry_name,
            header.signature,
            Arc::clone(data),
            base_offset,
            Arc::clone(&self.strings),
        );
        Ok((name, vec![asset]))
    }

    fn read_fs(
        &self,
        reader: &mut BinaryReader,
        data: &Arc<[u8]>,
        header: BundleHeader,
        fs: FsHeader,
    ) -> Result<Bundle> {
        if fs.has_eof_metadata() {
            return Err(BinaryError::unsupported_format(
                "Index stored at end of file is not supported",
            ));
        }

        let index_type = fs.compression_type()?;
        let stored = reader.read_bytes(fs.compressed_index_size as usize)?;
        let index = compression::decompress(&stored, index_type, fs.uncompressed_index_size as usize)?;
        let data_offset = reader.position();

        let mut index_reader = BinaryReader::new(&index, ByteOrder::Big);
        index_reader.skip(INDEX_HASH_SIZE)?;

        let block_count = read_count(&mut index_reader, "block")?;
        let mut blocks = Vec::with_capacity(block_count.min(index_reader.remaining()));
        for _ in 0..block_count {
            blocks.push(ArchiveBlockInfo {
                uncompressed_size: index_reader.read_u32()?,
                compressed_size: index_reader.read_u32()?,
                flags: index_reader.read_i16()?,
            });
        }

        let node_count = read_count(&mut index_reader, "node")?;
        let mut nodes = Vec::with_capacity(node_count.min(index_reader.remaining()));
        for _ in 0..node_count {
            nodes.push(ArchiveNode {
                offset: index_reader.read_i64()?,
                size: index_reader.read_i64()?,
                status: index_reader.read_i32()?,
                name: index_reader.read_cstring()?,
            });
        }

        debug!(
            index_codec = index_type.name(),
            blocks = blocks.len(),
            nodes = nodes.len(),
            "Read bundle index"
        );

        if nodes.is_empty() {
            return Err(BinaryError::structural("Bundle index lists no nodes"));
        }
        if nodes.len() > blocks.len() {
            return Err(BinaryError::structural(format!(
                "{} nodes but only {} blocks",
                nodes.len(),
                blocks.len()
            )));
        }

        let mut assets = Vec::with_capacity(nodes.len());
        for (node, block) in nodes.iter().zip(&blocks) {
            let skip = u64::try_from(node.offset).map_err(|_| {
                BinaryError::structural(format!(
                    "Node '{}' has negative offset {}",
                    node.name, node.offset
                ))
            })?;
            reader.skip(skip)?;
            let stored = reader.read_bytes(block.compressed_size as usize)?;
            let decoded = block.decompress(&stored)?;
            debug!(
                node = %node.name,
                codec = block
                    .compression_type()
                    .map(CompressionType::name)
                    .unwrap_or("unknown"),
                size = decoded.len(),
                "Decoded node block"
            );
            assets.push(Asset::new(
                node.name.clone(),
                header.signature,
                Arc::from(decoded),
                0,
                Arc::clone(&self.strings),
            ));
        }

        let name = nodes[0].name.clone();
        Ok(Bundle {
            header,
            name,
            blocks,
            nodes,
            assets,
            data: Arc::clone(data),
            data_offset,
        })
    }
}

impl Default for BundleParser {
    fn default() -> Self {
        Self::new()
    }
}

fn read_count(reader: &mut BinaryReader, what: &str) -> Result<usize> {
    let count = reader.read_i32()?;
    usize::try_from(count)
        .map_err(|_| BinaryError::structural(format!("Negative {} count: {}", what, count)))
}

impl Bundle {
    /// Parse a bundle from its complete contents
    pub fn from_bytes(data: Vec<u8>) -> Result<Bundle> {
        BundleParser::new().parse(data)
    }

    /// Read and parse a bundle file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Bundle> {
        BundleParser::new().parse_file(path)
    }
}
