//! TypeTree data structures
//!
//! A type tree describes the binary field layout of one class's serialized
//! instances. Each node exclusively owns its children.

use indexmap::IndexMap;
use serde::Serialize;

/// Meta flag bit asking for 4-byte alignment after the field
pub const ALIGN_FLAG: i32 = 0x4000;

/// A node in a Unity TypeTree
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TypeTreeNode {
    /// Type name (e.g., "int", "string", "GameObject")
    pub type_name: String,
    /// Field name (e.g., "m_Name", "m_IsActive")
    pub name: String,
    /// Size in bytes (-1 for variable size)
    pub byte_size: i32,
    /// Declared index in the flattened tree
    pub index: u32,
    /// Whether the field is an array
    pub is_array: bool,
    /// Version of this type
    pub version: i32,
    /// Meta flags (alignment, etc.)
    pub flags: i32,
    /// Child nodes
    pub children: Vec<TypeTreeNode>,
}

impl TypeTreeNode {
    /// Create a new node with basic information
    pub fn with_info(type_name: impl Into<String>, name: impl Into<String>, byte_size: i32) -> Self {
        Self {
            type_name: type_name.into(),
            name: name.into(),
            byte_size,
            ..Default::default()
        }
    }

    /// Check if this node asks for alignment after its value
    pub fn is_aligned(&self) -> bool {
        (self.flags & ALIGN_FLAG) != 0
    }

    /// Find a child node by name
    pub fn find_child(&self, name: &str) -> Option<&TypeTreeNode> {
        self.children.iter().find(|child| child.name == name)
    }

    /// Get all child names
    pub fn child_names(&self) -> Vec<&str> {
        self.children.iter().map(|child| child.name.as_str()).collect()
    }

    /// Check if this node has children
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Number of nodes in this subtree, including this one
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(TypeTreeNode::subtree_len).sum::<usize>()
    }

    /// Visit this node and its descendants depth-first, parent first
    pub fn walk<'a>(&'a self, depth: usize, visit: &mut impl FnMut(usize, &'a TypeTreeNode)) {
        visit(depth, self);
        for child in &self.children {
            child.walk(depth + 1, visit);
        }
    }
}

/// Complete TypeTree for one class
///
/// `nodes` holds the top-level nodes: the recursively read root for the
/// old layout, the depth-0 nodes for the flattened layout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TypeTree {
    /// Top-level nodes
    pub nodes: Vec<TypeTreeNode>,
}

impl TypeTree {
    /// Create a new empty TypeTree
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if the TypeTree is empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Get the first top-level node
    pub fn root(&self) -> Option<&TypeTreeNode> {
        self.nodes.first()
    }

    /// Find a top-level node by name
    pub fn find_node(&self, name: &str) -> Option<&TypeTreeNode> {
        self.nodes.iter().find(|node| node.name == name)
    }

    /// Total number of nodes in the tree
    pub fn total_nodes(&self) -> usize {
        self.nodes.iter().map(TypeTreeNode::subtree_len).sum()
    }

    /// Visit every node depth-first with its depth
    pub fn walk<'a>(&'a self, mut visit: impl FnMut(usize, &'a TypeTreeNode)) {
        for node in &self.nodes {
            node.walk(0, &mut visit);
        }
    }
}

/// Type metadata of one serialized file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TypeMetadata {
    /// Unity version that wrote the file
    pub generator_version: String,
    /// Target platform id
    pub target_platform: u32,
    /// Whether the flattened layout carried type trees
    pub has_type_trees: bool,
    /// Class ids in declaration order; object type indices point into this
    pub class_ids: Vec<i32>,
    /// Type hash per class id
    #[serde(serialize_with = "serialize_hashes")]
    pub hashes: IndexMap<i32, Vec<u8>>,
    /// Type tree per class id
    pub type_trees: IndexMap<i32, TypeTree>,
}

impl TypeMetadata {
    /// Get the type tree of a class
    pub fn type_tree(&self, class_id: i32) -> Option<&TypeTree> {
        self.type_trees.get(&class_id)
    }

    /// Get the type hash of a class
    pub fn hash(&self, class_id: i32) -> Option<&[u8]> {
        self.hashes.get(&class_id).map(Vec::as_slice)
    }

    /// Resolve an object type index to its class id
    pub fn class_id_at(&self, type_index: i32) -> Option<i32> {
        usize::try_from(type_index)
            .ok()
            .and_then(|index| self.class_ids.get(index).copied())
    }
}

fn serialize_hashes<S>(hashes: &IndexMap<i32, Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    use serde::ser::SerializeMap;
    let mut map = serializer.serialize_map(Some(hashes.len()))?;
    for (class_id, hash) in hashes {
        let hex: String = hash.iter().map(|b| format!("{:02x}", b)).collect();
        map.serialize_entry(class_id, &hex)?;
    }
    map.end()
}
