//! Embedded serialized files
//!
//! - `header` - the fixed header and byte-order selector
//! - `types` - ObjectInfo, AssetRef and the lazily loaded Asset
//! - `parser` - the body parser
//!
//! # Examples
//!
//! ```rust,no_run
//! use unity_bundle::Bundle;
//!
//! let mut bundle = Bundle::from_file("example.unity3d")?;
//! let asset = bundle.resolve_asset(0)?;
//! for (path_id, object) in asset.objects() {
//!     let tree = asset.type_tree_for(object);
//!     println!("{} -> class {} ({} fields)", path_id, object.class_id,
//!         tree.map(|t| t.total_nodes()).unwrap_or(0));
//! }
//! # Ok::<(), unity_bundle::error::BinaryError>(())
//! ```

pub mod header;
pub mod parser;
pub mod types;

pub use header::AssetHeader;
pub use parser::{AssetBody, AssetParser};
pub use types::{Asset, AssetRef, ObjectInfo, RESOURCE_SUFFIX};
