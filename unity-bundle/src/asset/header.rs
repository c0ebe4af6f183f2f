//! Serialized file header parsing
//!
//! The first sixteen bytes of every embedded serialized file are big-endian.
//! From format 9 on, a selector follows that switches the byte order for
//! everything after it.

use crate::error::Result;
use crate::reader::{BinaryReader, ByteOrder};
use crate::version::AssetField;
use serde::Serialize;

/// Header of an embedded serialized file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AssetHeader {
    /// Size of the metadata section
    pub metadata_size: u32,
    /// Total file size
    pub file_size: u32,
    /// File format version
    pub format: u32,
    /// Offset to the object data section
    pub data_offset: u32,
    /// Byte order of everything after the header
    pub byte_order: ByteOrder,
}

impl AssetHeader {
    /// Parse the header and switch `reader` to the file's byte order
    pub fn from_reader(reader: &mut BinaryReader) -> Result<Self> {
        let metadata_size = reader.read_u32()?;
        let file_size = reader.read_u32()?;
        let format = reader.read_u32()?;
        let data_offset = reader.read_u32()?;

        let byte_order = if AssetField::EndianSelector.present(format) {
            match reader.read_u32()? {
                0 => ByteOrder::Little,
                _ => ByteOrder::Big,
            }
        } else {
            reader.byte_order()
        };
        reader.set_byte_order(byte_order);

        Ok(Self {
            metadata_size,
            file_size,
            format,
            data_offset,
            byte_order,
        })
    }

    /// Size of the header itself
    pub fn header_size(&self) -> u32 {
        if AssetField::EndianSelector.present(self.format) {
            20
        } else {
            16
        }
    }
}
