//! Unity AssetBundle container parsing
//!
//! # Architecture
//!
//! - `header` - common prefix plus the legacy and UnityFS header fields
//! - `types` - block and node descriptors and the parsed [`Bundle`]
//! - `parser` - signature dispatch and per-layout readers
//!
//! Parsing a bundle only materializes the container: every embedded
//! serialized file becomes an unloaded [`Asset`](crate::asset::Asset)
//! whose body is read on first use.
//!
//! # Examples
//!
//! ```rust,no_run
//! use unity_bundle::bundle::Bundle;
//!
//! let mut bundle = Bundle::from_file("example.unity3d")?;
//! println!("{} ({}), {} assets", bundle.name, bundle.signature(), bundle.asset_count());
//! bundle.resolve_all()?;
//! # Ok::<(), unity_bundle::error::BinaryError>(())
//! ```

pub mod header;
pub mod parser;
pub mod types;

pub use header::{BundleHeader, BundleSignature, FsHeader, LegacyHeader, signatures};
pub use parser::BundleParser;
pub use types::{ArchiveBlockInfo, ArchiveNode, Bundle};

use crate::error::Result;
use std::path::Path;

/// Minimum size of any bundle header
const MIN_HEADER_SIZE: usize = 20;

/// Names of the embedded files of a bundle
///
/// UnityFS bundles list their nodes; legacy bundles list their assets.
pub fn list_bundle_contents<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let bundle = Bundle::from_file(path)?;
    if !bundle.nodes.is_empty() {
        return Ok(bundle.nodes.iter().map(|node| node.name.clone()).collect());
    }
    Ok(bundle
        .assets()
        .iter()
        .map(|asset| asset.name().to_string())
        .collect())
}

/// Check whether `data` starts with a supported bundle signature
pub fn is_valid_bundle(data: &[u8]) -> bool {
    if data.len() < MIN_HEADER_SIZE {
        return false;
    }
    let end = data.iter().position(|&b| b == 0).unwrap_or(data.len());
    matches!(
        std::str::from_utf8(&data[..end]).map(str::parse::<BundleSignature>),
        Ok(Ok(BundleSignature::Raw | BundleSignature::Web | BundleSignature::Fs))
    )
}

/// Signatures this crate can parse
pub fn supported_formats() -> Vec<&'static str> {
    vec![
        signatures::UNITY_FS,
        signatures::UNITY_WEB,
        signatures::UNITY_RAW,
    ]
}
