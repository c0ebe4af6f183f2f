//! Asset type definitions
//!
//! This module defines the per-object and per-dependency records of a
//! serialized file, and the lazily loaded [`Asset`] that owns them.

use super::header::AssetHeader;
use super::parser::{AssetBody, AssetParser};
use crate::bundle::BundleSignature;
use crate::error::{BinaryError, Result};
use crate::reader::{BinaryReader, ByteOrder};
use crate::typetree::{CommonStrings, TypeMetadata, TypeTree, TypeTreeNode};
use crate::version::AssetField;
use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Suffix of raw resource payloads that carry no object directory
pub const RESOURCE_SUFFIX: &str = ".resource";

/// Object directory entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ObjectInfo {
    /// Path ID of the object (unique within the asset)
    pub path_id: i64,
    /// Offset of object data, relative to the asset's data section
    pub data_offset: u32,
    /// Size of object data
    pub size: u32,
    /// Type id; keys the asset's type trees
    pub type_id: i32,
    /// Class id
    pub class_id: i16,
}

impl ObjectInfo {
    /// Parse one directory entry
    ///
    /// `id_width` is 4 or 8; from format 17 the entry stores an index into
    /// `metadata.class_ids` instead of explicit ids.
    pub fn from_reader(
        reader: &mut BinaryReader,
        format: u32,
        id_width: usize,
        metadata: &TypeMetadata,
    ) -> Result<Self> {
        let path_id = read_object_id(reader, id_width)?;
        let data_offset = reader.read_u32()?;
        let size = reader.read_u32()?;

        let (type_id, class_id) = if AssetField::TypeIndex.present(format) {
            let type_index = reader.read_i32()?;
            let class_id = metadata.class_id_at(type_index).ok_or_else(|| {
                BinaryError::structural(format!(
                    "Type index {} out of range ({} types)",
                    type_index,
                    metadata.class_ids.len()
                ))
            })?;
            (class_id, class_id as i16)
        } else {
            (reader.read_i32()?, reader.read_i16()?)
        };

        if AssetField::DestroyedPadding.present(format) {
            let _destroyed = reader.read_i16()?;
        } else if AssetField::StrippedPadding.present(format) {
            let _script_type_index = reader.read_i16()?;
            if AssetField::StrippedByte.present(format) {
                let _stripped = reader.read_u8()?;
            }
        }

        Ok(Self {
            path_id,
            data_offset,
            size,
            type_id,
            class_id,
        })
    }

    /// End of the object's data, relative to the data section
    pub fn data_end(&self) -> u64 {
        u64::from(self.data_offset) + u64::from(self.size)
    }
}

impl fmt::Display for ObjectInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Type: {}, Path: {}, Class: {}, Size: {}",
            self.type_id, self.path_id, self.class_id, self.size
        )
    }
}

/// Read a signed object id of the given width
pub(crate) fn read_object_id(reader: &mut BinaryReader, width: usize) -> Result<i64> {
    if width == 8 {
        reader.read_i64()
    } else {
        Ok(i64::from(reader.read_i32()?))
    }
}

/// Reference to another serialized file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetRef {
    /// Path of the referenced asset
    pub asset_path: String,
    /// GUID of the referenced file
    #[serde(serialize_with = "serialize_guid")]
    pub guid: [u8; 16],
    /// Type of the reference
    pub ref_type: i32,
    /// Path to the referenced file
    pub file_path: String,
}

impl AssetRef {
    /// Parse an AssetRef; the layout is the same in every format
    pub fn from_reader(reader: &mut BinaryReader) -> Result<Self> {
        Ok(Self {
            asset_path: reader.read_cstring()?,
            guid: reader.read_array::<16>()?,
            ref_type: reader.read_i32()?,
            file_path: reader.read_cstring()?,
        })
    }

    /// Get GUID as string
    pub fn guid_string(&self) -> String {
        self.guid.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

fn serialize_guid<S>(guid: &[u8; 16], serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    let hex: String = guid.iter().map(|b| format!("{:02x}", b)).collect();
    serializer.serialize_str(&hex)
}

/// One embedded serialized file
///
/// Created when the bundle is parsed; the body (type metadata, object
/// directory, adds and dependency tables) is read on the first [`load`].
/// Loading is all-or-nothing and happens at most once.
///
/// [`load`]: Asset::load
#[derive(Debug)]
pub struct Asset {
    name: String,
    signature: BundleSignature,
    data: Arc<[u8]>,
    base_offset: u64,
    strings: Arc<CommonStrings>,
    loaded: bool,
    header: Option<AssetHeader>,
    long_object_ids: bool,
    metadata: TypeMetadata,
    objects: IndexMap<i64, ObjectInfo>,
    adds: IndexMap<i64, i32>,
    externals: Vec<AssetRef>,
}

impl Asset {
    /// Create an unloaded asset over `data`, starting at `base_offset`
    pub fn new(
        name: impl Into<String>,
        signature: BundleSignature,
        data: Arc<[u8]>,
        base_offset: u64,
        strings: Arc<CommonStrings>,
    ) -> Self {
        Self {
            name: name.into(),
            signature,
            data,
            base_offset,
            strings,
            loaded: false,
            header: None,
            long_object_ids: false,
            metadata: TypeMetadata::default(),
            objects: IndexMap::new(),
            adds: IndexMap::new(),
            externals: Vec::new(),
        }
    }

    /// Asset name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Signature of the bundle this asset came from
    pub fn bundle_signature(&self) -> BundleSignature {
        self.signature
    }

    /// Offset of the asset's first byte in its buffer
    pub fn base_offset(&self) -> u64 {
        self.base_offset
    }

    /// Bytes of the asset, from its first byte to the end of its buffer
    pub fn bytes(&self) -> &[u8] {
        let start = (self.base_offset as usize).min(self.data.len());
        &self.data[start..]
    }

    /// Whether this is a raw resource payload
    pub fn is_resource(&self) -> bool {
        self.name.ends_with(RESOURCE_SUFFIX)
    }

    /// Whether the body has been loaded
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Parse the body if it has not been loaded yet
    ///
    /// A second call is a no-op. On failure nothing is committed and the
    /// asset stays unloaded.
    #[instrument(skip(self), fields(asset = %self.name))]
    pub fn load(&mut self) -> Result<()> {
        if self.loaded {
            return Ok(());
        }
        if self.is_resource() {
            debug!("Resource payload, nothing to parse");
            self.loaded = true;
            return Ok(());
        }

        let body = AssetParser::new(&self.strings).parse(&self.data, self.base_offset)?;
        self.commit(body);
        Ok(())
    }

    fn commit(&mut self, body: AssetBody) {
        self.header = Some(body.header);
        self.long_object_ids = body.long_object_ids;
        self.metadata = body.metadata;
        self.objects = body.objects;
        self.adds = body.adds;
        self.externals = body.externals;
        self.loaded = true;

        let unresolved = self.unresolved_class_ids();
        if !unresolved.is_empty() {
            warn!(
                asset = %self.name,
                ?unresolved,
                "Objects reference classes without a type tree"
            );
        }
        debug!(
            objects = self.objects.len(),
            adds = self.adds.len(),
            externals = self.externals.len(),
            "Asset loaded"
        );
    }

    /// Header, once loaded
    pub fn header(&self) -> Option<&AssetHeader> {
        self.header.as_ref()
    }

    /// Format version, once loaded
    pub fn format(&self) -> Option<u32> {
        self.header.map(|header| header.format)
    }

    /// Byte order of the body, once loaded
    pub fn byte_order(&self) -> Option<ByteOrder> {
        self.header.map(|header| header.byte_order)
    }

    /// Whether the long-object-id flag was set
    pub fn long_object_ids(&self) -> bool {
        self.long_object_ids
    }

    /// Type metadata
    pub fn metadata(&self) -> &TypeMetadata {
        &self.metadata
    }

    /// Object directory in on-stream order
    pub fn objects(&self) -> &IndexMap<i64, ObjectInfo> {
        &self.objects
    }

    /// Adds table
    pub fn adds(&self) -> &IndexMap<i64, i32> {
        &self.adds
    }

    /// Dependency references in on-stream order
    pub fn externals(&self) -> &[AssetRef] {
        &self.externals
    }

    /// Find an object by path id
    pub fn find_object(&self, path_id: i64) -> Option<&ObjectInfo> {
        self.objects.get(&path_id)
    }

    /// All objects of one class, in on-stream order
    pub fn objects_of_class(&self, class_id: i32) -> impl Iterator<Item = &ObjectInfo> {
        self.objects
            .values()
            .filter(move |object| i32::from(object.class_id) == class_id)
    }

    /// Type tree of a class
    pub fn type_tree(&self, class_id: i32) -> Option<&TypeTree> {
        self.metadata.type_tree(class_id)
    }

    /// Type tree describing an object; `None` means explicitly unresolved
    pub fn type_tree_for(&self, object: &ObjectInfo) -> Option<&TypeTree> {
        self.metadata.type_tree(object.type_id)
    }

    /// Root node of the type tree describing an object
    pub fn root_node_for(&self, object: &ObjectInfo) -> Option<&TypeTreeNode> {
        self.type_tree_for(object).and_then(TypeTree::root)
    }

    /// Type ids referenced by objects that have no type tree
    pub fn unresolved_class_ids(&self) -> Vec<i32> {
        let mut ids: Vec<i32> = self
            .objects
            .values()
            .map(|object| object.type_id)
            .filter(|type_id| !self.metadata.type_trees.contains_key(type_id))
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// Raw bytes of one object
    pub fn object_data(&self, object: &ObjectInfo) -> Result<&[u8]> {
        let header = self.header.as_ref().ok_or_else(|| {
            BinaryError::structural(format!("Asset '{}' is not loaded", self.name))
        })?;
        let start = self.base_offset + u64::from(header.data_offset) + u64::from(object.data_offset);
        let end = start + u64::from(object.size);
        let len = self.data.len() as u64;
        if end > len {
            return Err(BinaryError::end_of_stream(
                object.size as usize,
                len.saturating_sub(start) as usize,
            ));
        }
        Ok(&self.data[start as usize..end as usize])
    }
}
