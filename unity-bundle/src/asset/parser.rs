//! Serialized file body parser
//!
//! Reads, in order: header, type metadata, object directory, adds table,
//! dependency table and the trailing empty string. Which fields exist and
//! how wide they are depends on the format number (see [`crate::version`]).

use super::header::AssetHeader;
use super::types::{AssetRef, ObjectInfo, read_object_id};
use crate::error::{BinaryError, Result};
use crate::reader::{BinaryReader, ByteOrder};
use crate::typetree::{CommonStrings, TypeMetadata, TypeTreeParser};
use crate::version::{AssetField, object_id_width};
use indexmap::IndexMap;
use indexmap::map::Entry;
use tracing::{debug, trace};

/// Everything read from one serialized file, ready to commit to an asset
#[derive(Debug, Clone)]
pub struct AssetBody {
    pub header: AssetHeader,
    pub long_object_ids: bool,
    pub metadata: TypeMetadata,
    pub objects: IndexMap<i64, ObjectInfo>,
    pub adds: IndexMap<i64, i32>,
    pub externals: Vec<AssetRef>,
}

/// Serialized file parser
pub struct AssetParser<'s> {
    strings: &'s CommonStrings,
}

impl<'s> AssetParser<'s> {
    /// Create a parser resolving interned type-tree names through `strings`
    pub fn new(strings: &'s CommonStrings) -> Self {
        Self { strings }
    }

    /// Parse the serialized file starting at `base_offset` in `data`
    pub fn parse(&self, data: &[u8], base_offset: u64) -> Result<AssetBody> {
        let mut reader = BinaryReader::new(data, ByteOrder::Big);
        reader.set_position(base_offset)?;

        let header = AssetHeader::from_reader(&mut reader)?;
        let format = header.format;
        debug!(
            format,
            byte_order = ?header.byte_order,
            data_offset = header.data_offset,
            "Read asset header"
        );

        let metadata = TypeTreeParser::new(self.strings).read_metadata(&mut reader, format)?;

        let long_object_ids = if AssetField::LongObjectIdFlag.present(format) {
            reader.read_u32()? != 0
        } else {
            false
        };
        let id_width = object_id_width(format, long_object_ids);

        let objects = Self::read_objects(&mut reader, format, id_width, &metadata)?;

        let mut adds = IndexMap::new();
        if AssetField::AddsTable.present(format) {
            let count = reader.read_u32()?;
            for _ in 0..count {
                if AssetField::EntryAlignment.present(format) {
                    reader.align()?;
                }
                let id = read_object_id(&mut reader, id_width)?;
                let value = reader.read_i32()?;
                adds.insert(id, value);
            }
        }

        let mut externals = Vec::new();
        if AssetField::Dependencies.present(format) {
            let count = reader.read_u32()?;
            for _ in 0..count {
                externals.push(AssetRef::from_reader(&mut reader)?);
            }
        }

        let trailing = reader.read_cstring()?;
        if !trailing.is_empty() {
            return Err(BinaryError::structural(format!(
                "Trailing string not empty: {:?}",
                trailing
            )));
        }

        Ok(AssetBody {
            header,
            long_object_ids,
            metadata,
            objects,
            adds,
            externals,
        })
    }

    fn read_objects(
        reader: &mut BinaryReader,
        format: u32,
        id_width: usize,
        metadata: &TypeMetadata,
    ) -> Result<IndexMap<i64, ObjectInfo>> {
        let count = reader.read_u32()?;
        let mut objects = IndexMap::new();
        for _ in 0..count {
            if AssetField::EntryAlignment.present(format) {
                reader.align()?;
            }
            let object = ObjectInfo::from_reader(reader, format, id_width, metadata)?;
            trace!(%object, "Read object entry");
            match objects.entry(object.path_id) {
                Entry::Occupied(_) => {
                    return Err(BinaryError::structural(format!(
                        "Duplicate path id {}",
                        object.path_id
                    )));
                }
                Entry::Vacant(slot) => {
                    slot.insert(object);
                }
            }
        }
        Ok(objects)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Little-endian format 9 file with no types and the given objects
    fn format9(objects: &[(i32, u32)], trailing: &[u8]) -> Vec<u8> {
        let mut data = Vec::new();
        for v in [0u32, 0, 9, 0] {
            data.extend_from_slice(&v.to_be_bytes());
        }
        data.extend_from_slice(&0u32.to_be_bytes()); // little endian
        data.extend_from_slice(b"4.7.2\0");
        data.extend_from_slice(&5u32.to_le_bytes());
        data.extend_from_slice(&0u32.to_le_bytes()); // no types
        data.extend_from_slice(&0u32.to_le_bytes()); // short ids
        data.extend_from_slice(&(objects.len() as u32).to_le_bytes());
        for (path_id, offset) in objects {
            data.extend_from_slice(&path_id.to_le_bytes());
            data.extend_from_slice(&offset.to_le_bytes());
            data.extend_from_slice(&8u32.to_le_bytes());
            data.extend_from_slice(&1i32.to_le_bytes());
            data.extend_from_slice(&1i16.to_le_bytes());
            data.extend_from_slice(&0i16.to_le_bytes());
        }
        data.extend_from_slice(&0u32.to_le_bytes()); // no externals
        data.extend_from_slice(trailing);
        data
    }

    #[test]
    fn test_parse_format9() {
        let data = format9(&[(1, 0), (2, 8)], b"\0");
        let strings = CommonStrings::embedded();
        let body = AssetParser::new(&strings).parse(&data, 0).unwrap();
        assert_eq!(body.header.format, 9);
        assert_eq!(body.header.byte_order, ByteOrder::Little);
        assert_eq!(body.objects.keys().copied().collect::<Vec<_>>(), vec![1, 2]);
        assert!(body.adds.is_empty());
        assert!(body.externals.is_empty());
    }

    #[test]
    fn test_parse_with_base_offset() {
        let mut data = b"PREFIX".to_vec();
        data.extend_from_slice(&format9(&[(5, 0)], b"\0"));
        let strings = CommonStrings::embedded();
        let body = AssetParser::new(&strings).parse(&data, 6).unwrap();
        assert!(body.objects.contains_key(&5));
    }

    #[test]
    fn test_duplicate_path_id() {
        let data = format9(&[(3, 0), (3, 8)], b"\0");
        let strings = CommonStrings::embedded();
        let err = AssetParser::new(&strings).parse(&data, 0).unwrap_err();
        assert!(matches!(err, BinaryError::Structural(_)));
    }

    #[test]
    fn test_trailing_string_must_be_empty() {
        let data = format9(&[(1, 0)], b"junk\0");
        let strings = CommonStrings::embedded();
        let err = AssetParser::new(&strings).parse(&data, 0).unwrap_err();
        assert!(matches!(err, BinaryError::Structural(_)));
    }

    #[test]
    fn test_missing_trailing_string() {
        let data = format9(&[(1, 0)], b"");
        let strings = CommonStrings::embedded();
        let err = AssetParser::new(&strings).parse(&data, 0).unwrap_err();
        assert!(err.is_end_of_stream());
    }
}
