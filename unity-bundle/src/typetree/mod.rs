//! Unity TypeTree processing module
//!
//! - `types` - TypeTree, TypeTreeNode and per-file TypeMetadata
//! - `parser` - reading both on-disk encodings
//! - `strings` - the common string table for interned names
//!
//! # Examples
//!
//! ```rust,no_run
//! use unity_bundle::reader::{BinaryReader, ByteOrder};
//! use unity_bundle::typetree::{CommonStrings, TypeTreeParser};
//!
//! # let data: Vec<u8> = Vec::new();
//! let strings = CommonStrings::embedded();
//! let parser = TypeTreeParser::new(&strings);
//! let mut reader = BinaryReader::new(&data, ByteOrder::Little);
//! let metadata = parser.read_metadata(&mut reader, 17)?;
//! for class_id in &metadata.class_ids {
//!     println!("{} -> {:?}", class_id, metadata.type_tree(*class_id).map(|t| t.total_nodes()));
//! }
//! # Ok::<(), unity_bundle::error::BinaryError>(())
//! ```

pub mod parser;
pub mod strings;
pub mod types;

pub use parser::{FLAT_NODE_SIZE, TypeTreeParser};
pub use strings::CommonStrings;
pub use types::{ALIGN_FLAG, TypeMetadata, TypeTree, TypeTreeNode};
