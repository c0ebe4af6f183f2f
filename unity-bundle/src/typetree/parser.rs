//! TypeTree parser implementation
//!
//! Two encodings exist. Older serialized files store each node recursively
//! with inline names. Newer ones store a flat array of fixed-size records
//! annotated with depth, plus a string buffer; the hierarchy is rebuilt with
//! a stack of open ancestors.

use super::strings::CommonStrings;
use super::types::{ALIGN_FLAG, TypeMetadata, TypeTree, TypeTreeNode};
use crate::error::{BinaryError, Result};
use crate::reader::BinaryReader;
use crate::version::AssetField;
use tracing::debug;

/// Size of one flattened node record
pub const FLAT_NODE_SIZE: usize = 24;

/// Class id of MonoBehaviour, whose script types get synthetic ids
const MONO_BEHAVIOUR_CLASS_ID: i32 = 114;

/// Deepest nesting accepted in the recursive layout, the same bound the
/// one-byte depth of the flat layout imposes
pub const MAX_OLD_TREE_DEPTH: usize = 256;

/// Bit marking an offset into the common string table
const COMMON_STRING_FLAG: i32 = i32::MIN;

/// TypeTree parser
///
/// Holds the common string table used to resolve interned names.
pub struct TypeTreeParser<'s> {
    strings: &'s CommonStrings,
}

/// Node under construction: children are arena indices
struct Slot {
    node: TypeTreeNode,
    depth: i32,
    children: Vec<usize>,
}

const ROOT: usize = 0;

impl<'s> TypeTreeParser<'s> {
    /// Create a parser resolving interned names through `strings`
    pub fn new(strings: &'s CommonStrings) -> Self {
        Self { strings }
    }

    /// Read the type metadata block of a serialized file
    pub fn read_metadata(&self, reader: &mut BinaryReader, format: u32) -> Result<TypeMetadata> {
        let mut metadata = TypeMetadata {
            generator_version: reader.read_cstring()?,
            target_platform: reader.read_u32()?,
            ..Default::default()
        };

        if AssetField::BlobTypeMetadata.present(format) {
            metadata.has_type_trees = reader.read_bool()?;
            let count = reader.read_i32()?;
            if count < 0 {
                return Err(BinaryError::structural(format!(
                    "Negative type count: {}",
                    count
                )));
            }

            for _ in 0..count {
                let mut class_id = reader.read_i32()?;
                if AssetField::TypeIndex.present(format) {
                    let _stripped = reader.read_u8()?;
                    let script_id = reader.read_i16()?;
                    if class_id == MONO_BEHAVIOUR_CLASS_ID {
                        class_id = if script_id >= 0 {
                            -2 - i32::from(script_id)
                        } else {
                            -1
                        };
                    }
                }

                let hash_len = if class_id < 0 { 32 } else { 16 };
                let hash = reader.read_bytes(hash_len)?;
                metadata.class_ids.push(class_id);
                metadata.hashes.insert(class_id, hash);

                if metadata.has_type_trees {
                    let tree = self.read_blob_tree(reader)?;
                    metadata.type_trees.insert(class_id, tree);
                }
            }
        } else {
            let count = reader.read_u32()?;
            for _ in 0..count {
                let class_id = reader.read_i32()?;
                let tree = Self::read_old_tree(reader)?;
                metadata.class_ids.push(class_id);
                metadata.type_trees.insert(class_id, tree);
            }
        }

        debug!(
            format,
            generator = %metadata.generator_version,
            types = metadata.class_ids.len(),
            trees = metadata.type_trees.len(),
            "Read type metadata"
        );
        Ok(metadata)
    }

    /// Read a type tree stored as a flat node array and string buffer
    pub fn read_blob_tree(&self, reader: &mut BinaryReader) -> Result<TypeTree> {
        let node_count = reader.read_u32()? as usize;
        let buffer_len = reader.read_u32()? as usize;
        let node_bytes_len = node_count
            .checked_mul(FLAT_NODE_SIZE)
            .ok_or_else(|| BinaryError::end_of_stream(usize::MAX, reader.remaining()))?;
        let node_bytes = reader.read_bytes(node_bytes_len)?;
        let buffer = reader.read_bytes(buffer_len)?;

        let mut records = BinaryReader::new(&node_bytes, reader.byte_order());
        let mut slots = vec![Slot {
            node: TypeTreeNode::default(),
            depth: -1,
            children: Vec::new(),
        }];
        let mut stack = vec![ROOT];
        let mut previous_depth = -1;

        for _ in 0..node_count {
            let version = records.read_i16()?;
            let depth = i32::from(records.read_u8()?);
            let is_array = records.read_i8()? != 0;
            let type_offset = records.read_i32()?;
            let name_offset = records.read_i32()?;
            let byte_size = records.read_i32()?;
            let index = records.read_u32()?;
            let flags = records.read_i32()?;

            let node = TypeTreeNode {
                type_name: self.resolve_string(&buffer, type_offset),
                name: self.resolve_string(&buffer, name_offset),
                byte_size,
                index,
                is_array,
                version: i32::from(version),
                flags,
                children: Vec::new(),
            };

            // Strictly deeper nodes open under the previous node; anything
            // else first closes every open node at the same depth or deeper.
            if depth <= previous_depth {
                while let Some(&top) = stack.last() {
                    if slots[top].depth < depth {
                        break;
                    }
                    stack.pop();
                }
            }
            let parent = stack.last().copied().unwrap_or(ROOT);
            let slot = slots.len();
            slots.push(Slot {
                node,
                depth,
                children: Vec::new(),
            });
            slots[parent].children.push(slot);
            stack.push(slot);
            previous_depth = depth;

            if flags & ALIGN_FLAG != 0 {
                records.align()?;
            }
        }

        let root = assemble(&mut slots, ROOT);
        Ok(TypeTree {
            nodes: root.children,
        })
    }

    /// Read a type tree stored as recursive nodes with inline names
    ///
    /// Nesting deeper than [`MAX_OLD_TREE_DEPTH`] is a structural error.
    pub fn read_old_tree(reader: &mut BinaryReader) -> Result<TypeTree> {
        Ok(TypeTree {
            nodes: vec![Self::read_old_node(reader, 0)?],
        })
    }

    fn read_old_node(reader: &mut BinaryReader, depth: usize) -> Result<TypeTreeNode> {
        if depth >= MAX_OLD_TREE_DEPTH {
            return Err(BinaryError::structural(format!(
                "Type tree nested deeper than {} levels",
                MAX_OLD_TREE_DEPTH
            )));
        }

        let mut node = TypeTreeNode {
            type_name: reader.read_cstring()?,
            name: reader.read_cstring()?,
            byte_size: reader.read_i32()?,
            index: reader.read_i32()? as u32,
            is_array: reader.read_i32()? != 0,
            version: reader.read_i32()?,
            flags: reader.read_i32()?,
            children: Vec::new(),
        };

        let child_count = reader.read_i32()?;
        if child_count < 0 {
            return Err(BinaryError::structural(format!(
                "Negative child count {} in node {}",
                child_count, node.name
            )));
        }
        for _ in 0..child_count {
            node.children.push(Self::read_old_node(reader, depth + 1)?);
        }
        Ok(node)
    }

    /// Resolve a node name offset
    ///
    /// Negative offsets address the common table after masking the sign bit;
    /// in-range offsets address the local buffer; anything else is empty.
    pub fn resolve_string(&self, buffer: &[u8], offset: i32) -> String {
        if offset < 0 {
            let offset = (offset & !COMMON_STRING_FLAG) as usize;
            return self.strings.get(offset).unwrap_or_default().to_string();
        }

        let start = offset as usize;
        if start >= buffer.len() {
            return String::new();
        }
        let rest = &buffer[start..];
        let end = rest.iter().position(|&b| b == 0).unwrap_or(rest.len());
        String::from_utf8_lossy(&rest[..end]).into_owned()
    }
}

/// Turn the arena into owned nodes, keeping child order
fn assemble(slots: &mut [Slot], index: usize) -> TypeTreeNode {
    let children = std::mem::take(&mut slots[index].children);
    let mut node = std::mem::take(&mut slots[index].node);
    node.children = children
        .into_iter()
        .map(|child| assemble(slots, child))
        .collect();
    node
}
