//! Unity AssetBundle Parser
//!
//! This crate parses Unity asset-bundle containers and the serialized files
//! embedded in them:
//! - Legacy `UnityRaw` and `UnityWeb` bundles
//! - Block-based `UnityFS` bundles (LZMA, LZ4 and LZ4HC blocks)
//! - Serialized file headers, object directories and dependency tables
//! - Type trees in both the recursive and the flat string-interned layout
//!
//! Field values of individual objects are not decoded; [`engine`] only
//! sketches the shapes a downstream deserializer fills in.
//!
//! # Example
//!
//! ```rust,no_run
//! use unity_bundle::{Bundle, engine};
//!
//! let mut bundle = Bundle::from_file("example.unity3d")?;
//! println!("Bundle: {} ({})", bundle.name, bundle.signature());
//!
//! for index in 0..bundle.asset_count() {
//!     let asset = bundle.resolve_asset(index)?;
//!     println!("Asset: {}", asset.name());
//!     for object in asset.objects().values() {
//!         let class = engine::class_name(object.type_id).unwrap_or("<unknown>");
//!         println!("  {} {} ({} bytes)", object.path_id, class, object.size);
//!     }
//! }
//! # Ok::<(), unity_bundle::BinaryError>(())
//! ```

pub mod asset;
pub mod block_stream;
pub mod bundle;
pub mod compression;
pub mod engine;
pub mod error;
pub mod reader;
pub mod typetree;
pub mod version;

pub use asset::{Asset, AssetHeader, AssetRef, ObjectInfo};
pub use block_stream::BlockStream;
pub use bundle::{ArchiveBlockInfo, ArchiveNode, Bundle, BundleHeader, BundleParser, BundleSignature};
pub use compression::CompressionType;
pub use error::{BinaryError, Result};
pub use reader::{BinaryReader, ByteOrder};
pub use typetree::{CommonStrings, TypeMetadata, TypeTree, TypeTreeNode};
