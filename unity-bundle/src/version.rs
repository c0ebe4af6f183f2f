//! Format-version gates
//!
//! Serialized files and legacy bundle headers grow fields as their format
//! number increases. Every such field is listed here with the inclusive
//! range of format numbers in which it exists; parsers ask
//! [`AssetField::present`] instead of comparing numbers inline.

use std::ops::RangeInclusive;

/// A version-gated field of a serialized file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetField {
    /// u32 endianness selector after the header
    EndianSelector,
    /// u32 flag choosing 8-byte object ids
    LongObjectIdFlag,
    /// Object ids are always 8 bytes
    AlwaysLongObjectIds,
    /// 4-byte alignment before each object and adds entry
    EntryAlignment,
    /// Adds table after the object directory
    AddsTable,
    /// Dependency table
    Dependencies,
    /// Flattened type trees with string buffers
    BlobTypeMetadata,
    /// Script type id in type metadata, type index in object entries
    TypeIndex,
    /// i16 padding after each object entry
    DestroyedPadding,
    /// i16 padding after each object entry (newer layout)
    StrippedPadding,
    /// Extra byte after the stripped padding
    StrippedByte,
}

impl AssetField {
    /// Every gated field, for table-driven checks
    pub const ALL: [AssetField; 11] = [
        AssetField::EndianSelector,
        AssetField::LongObjectIdFlag,
        AssetField::AlwaysLongObjectIds,
        AssetField::EntryAlignment,
        AssetField::AddsTable,
        AssetField::Dependencies,
        AssetField::BlobTypeMetadata,
        AssetField::TypeIndex,
        AssetField::DestroyedPadding,
        AssetField::StrippedPadding,
        AssetField::StrippedByte,
    ];

    /// Format numbers in which the field exists
    pub fn range(self) -> RangeInclusive<u32> {
        match self {
            AssetField::EndianSelector => 9..=u32::MAX,
            AssetField::LongObjectIdFlag => 7..=13,
            AssetField::AlwaysLongObjectIds => 14..=u32::MAX,
            AssetField::EntryAlignment => 14..=u32::MAX,
            AssetField::AddsTable => 11..=u32::MAX,
            AssetField::Dependencies => 6..=u32::MAX,
            AssetField::BlobTypeMetadata => 13..=u32::MAX,
            AssetField::TypeIndex => 17..=u32::MAX,
            AssetField::DestroyedPadding => 0..=10,
            AssetField::StrippedPadding => 11..=16,
            AssetField::StrippedByte => 15..=16,
        }
    }

    /// Whether the field exists in the given format
    pub fn present(self, format: u32) -> bool {
        self.range().contains(&format)
    }
}

/// Width of object ids for a format, given the per-asset long-id flag
///
/// Formats before 7 always use 4 bytes, 14 and later always 8; in between the
/// flag decides.
pub fn object_id_width(format: u32, long_ids: bool) -> usize {
    if AssetField::AlwaysLongObjectIds.present(format) {
        8
    } else if AssetField::LongObjectIdFlag.present(format) && long_ids {
        8
    } else {
        4
    }
}

/// A version-gated field of a legacy bundle header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BundleField {
    /// u32 bundle size
    BundleSize,
    /// u32 uncompressed bundle size
    UncompressedBundleSize,
}

impl BundleField {
    /// Format versions in which the field exists
    pub fn range(self) -> RangeInclusive<i32> {
        match self {
            BundleField::BundleSize => 2..=i32::MAX,
            BundleField::UncompressedBundleSize => 3..=i32::MAX,
        }
    }

    /// Whether the field exists in the given bundle format version
    pub fn present(self, version: i32) -> bool {
        self.range().contains(&version)
    }
}
