//! Interned type-tree strings
//!
//! Flattened type trees name their nodes through offsets. A negative offset
//! points into a fixed table of common names shared by every serialized
//! file, which ships with the crate as `resources/strings.dat`.

use crate::error::Result;
use once_cell::sync::Lazy;
use std::path::Path;
use std::sync::Arc;

static EMBEDDED_BYTES: &[u8] = include_bytes!("../../resources/strings.dat");

static EMBEDDED: Lazy<Arc<CommonStrings>> =
    Lazy::new(|| Arc::new(CommonStrings::from_bytes(EMBEDDED_BYTES.to_vec())));

/// Read-only table of null-terminated strings addressed by byte offset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommonStrings {
    data: Vec<u8>,
}

impl CommonStrings {
    /// The table built into the crate, initialized once per process
    pub fn embedded() -> Arc<CommonStrings> {
        Arc::clone(&EMBEDDED)
    }

    /// Wrap raw table bytes
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Load a table from disk
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::from_bytes(std::fs::read(path)?))
    }

    /// Get the string starting at `offset`
    ///
    /// Returns `None` when the offset lies outside the table. A missing
    /// terminator ends the string at the end of the table.
    pub fn get(&self, offset: usize) -> Option<&str> {
        let rest = self.data.get(offset..)?;
        let end = rest.iter().position(|&b| b == 0).unwrap_or(rest.len());
        std::str::from_utf8(&rest[..end]).ok()
    }

    /// Size of the table in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Iterate over `(offset, string)` pairs in table order
    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> + '_ {
        let mut offset = 0;
        self.data.split(|&b| b == 0).filter_map(move |raw| {
            let start = offset;
            offset += raw.len() + 1;
            if raw.is_empty() {
                return None;
            }
            std::str::from_utf8(raw).ok().map(|s| (start, s))
        })
    }
}

impl Default for CommonStrings {
    fn default() -> Self {
        CommonStrings::clone(&EMBEDDED)
    }
}
