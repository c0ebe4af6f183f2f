//! AssetBundle header parsing
//!
//! Every bundle starts with the same big-endian prefix: signature, format
//! version and two version strings. The signature decides which
//! variant-specific fields follow.

use crate::compression::{ArchiveFlags, CompressionType};
use crate::error::{BinaryError, Result};
use crate::reader::BinaryReader;
use crate::version::BundleField;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Bundle signature constants
pub mod signatures {
    pub const UNITY_RAW: &str = "UnityRaw";
    pub const UNITY_WEB: &str = "UnityWeb";
    pub const UNITY_FS: &str = "UnityFS";
    pub const UNITY_ARCHIVE: &str = "UnityArchive";
}

/// Legacy header size from which two extra size fields are present
pub const LEGACY_EXTENDED_HEADER_SIZE: u32 = 60;

/// Known bundle signatures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BundleSignature {
    /// Legacy uncompressed layout
    Raw,
    /// Legacy LZMA-compressed layout
    Web,
    /// Block-based layout
    Fs,
    /// Archive layout (recognized, not supported)
    Archive,
}

impl BundleSignature {
    /// Signature token as stored in the file
    pub fn as_str(self) -> &'static str {
        match self {
            BundleSignature::Raw => signatures::UNITY_RAW,
            BundleSignature::Web => signatures::UNITY_WEB,
            BundleSignature::Fs => signatures::UNITY_FS,
            BundleSignature::Archive => signatures::UNITY_ARCHIVE,
        }
    }

    /// Whether this is one of the two legacy layouts
    pub fn is_legacy(self) -> bool {
        matches!(self, BundleSignature::Raw | BundleSignature::Web)
    }
}

impl FromStr for BundleSignature {
    type Err = BinaryError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            signatures::UNITY_RAW => Ok(BundleSignature::Raw),
            signatures::UNITY_WEB => Ok(BundleSignature::Web),
            signatures::UNITY_FS => Ok(BundleSignature::Fs),
            signatures::UNITY_ARCHIVE => Ok(BundleSignature::Archive),
            other => Err(BinaryError::unsupported_format(format!(
                "Unknown bundle signature: {:?}",
                other
            ))),
        }
    }
}

impl fmt::Display for BundleSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fields shared by legacy uncompressed and compressed bundles
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LegacyHeader {
    pub file_size: u32,
    /// Offset of the first entry
    pub header_size: u32,
    pub file_count: u32,
    pub bundle_count: u32,
    pub bundle_size: Option<u32>,
    pub uncompressed_bundle_size: Option<u32>,
    pub compressed_file_size: Option<u32>,
    pub asset_header_size: Option<u32>,
    /// Bundle name
    pub name: String,
}

impl LegacyHeader {
    /// Parse the legacy fields following the common prefix
    pub fn from_reader(reader: &mut BinaryReader, version: i32) -> Result<Self> {
        let mut header = Self {
            file_size: reader.read_u32()?,
            header_size: reader.read_u32()?,
            file_count: reader.read_u32()?,
            bundle_count: reader.read_u32()?,
            ..Default::default()
        };

        if BundleField::BundleSize.present(version) {
            header.bundle_size = Some(reader.read_u32()?);
        }
        if BundleField::UncompressedBundleSize.present(version) {
            header.uncompressed_bundle_size = Some(reader.read_u32()?);
        }
        if header.header_size >= LEGACY_EXTENDED_HEADER_SIZE {
            header.compressed_file_size = Some(reader.read_u32()?);
            header.asset_header_size = Some(reader.read_u32()?);
        }

        let _reserved = reader.read_i32()?;
        let _reserved = reader.read_i8()?;
        header.name = reader.read_cstring()?;
        Ok(header)
    }
}

/// Fields of a block-based bundle header
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FsHeader {
    pub file_size: i64,
    /// Stored size of the index block
    pub compressed_index_size: u32,
    /// Size of the index block after decompression
    pub uncompressed_index_size: u32,
    /// Archive flags (index codec, metadata location)
    pub flags: u32,
}

impl FsHeader {
    /// Parse the block-based fields following the common prefix
    pub fn from_reader(reader: &mut BinaryReader) -> Result<Self> {
        Ok(Self {
            file_size: reader.read_i64()?,
            compressed_index_size: reader.read_u32()?,
            uncompressed_index_size: reader.read_u32()?,
            flags: reader.read_u32()?,
        })
    }

    /// Codec of the index block
    pub fn compression_type(&self) -> Result<CompressionType> {
        CompressionType::from_flags(self.flags)
    }

    /// Whether the index is stored at the end of the file
    pub fn has_eof_metadata(&self) -> bool {
        (self.flags & ArchiveFlags::EOF_METADATA) != 0
    }
}

/// AssetBundle header information
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BundleHeader {
    pub signature: BundleSignature,
    pub format_version: i32,
    /// Player version the bundle targets
    pub target_version: String,
    /// Unity version that built the bundle
    pub generator_version: String,
    /// Present for `UnityRaw` and `UnityWeb`
    pub legacy: Option<LegacyHeader>,
    /// Present for `UnityFS`
    pub fs: Option<FsHeader>,
}

impl BundleHeader {
    /// Parse the common prefix
    ///
    /// Variant fields are left empty; the parser fills them in after
    /// dispatching on the signature.
    pub fn from_reader(reader: &mut BinaryReader) -> Result<Self> {
        let signature: BundleSignature = reader.read_cstring()?.parse()?;
        let format_version = reader.read_i32()?;
        let target_version = reader.read_cstring()?;
        let generator_version = reader.read_cstring()?;

        Ok(Self {
            signature,
            format_version,
            target_version,
            generator_version,
            legacy: None,
            fs: None,
        })
    }
}
