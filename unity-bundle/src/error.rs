//! Error types for Unity bundle parsing

use thiserror::Error;

/// Result type for Unity bundle operations
pub type Result<T> = std::result::Result<T, BinaryError>;

/// Errors that can occur while parsing a bundle, an embedded asset or a type tree.
///
/// Every parse call is fail-fast: the first error aborts the call and is
/// returned to the immediate caller. Nothing is retried.
#[derive(Error, Debug)]
pub enum BinaryError {
    /// Underlying file access failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Unknown signature, archive variant, unknown codec tag or an
    /// unimplemented header flag
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The data is readable but violates a structural rule of the format
    #[error("Structural error: {0}")]
    Structural(String),

    /// A read needed more bytes than remain in the source
    #[error("Unexpected end of stream: expected {expected} bytes, {actual} available")]
    EndOfStream { expected: usize, actual: usize },

    /// A seek targeted a position outside the source
    #[error("Seek out of range: position {position}, length {len}")]
    SeekOutOfRange { position: u64, len: u64 },

    /// A codec failed to decode its input
    #[error("Decode error: {0}")]
    Decode(String),
}

impl BinaryError {
    /// Create a new unsupported format error
    pub fn unsupported_format<S: Into<String>>(msg: S) -> Self {
        Self::UnsupportedFormat(msg.into())
    }

    /// Create a new structural error
    pub fn structural<S: Into<String>>(msg: S) -> Self {
        Self::Structural(msg.into())
    }

    /// Create a new end-of-stream error
    pub fn end_of_stream(expected: usize, actual: usize) -> Self {
        Self::EndOfStream { expected, actual }
    }

    /// Create a new seek-out-of-range error
    pub fn seek_out_of_range(position: u64, len: u64) -> Self {
        Self::SeekOutOfRange { position, len }
    }

    /// Create a new decode error
    pub fn decode<S: Into<String>>(msg: S) -> Self {
        Self::Decode(msg.into())
    }

    /// Whether this error was caused by running out of input
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, Self::EndOfStream { .. })
    }
}

impl From<lz4_flex::block::DecompressError> for BinaryError {
    fn from(err: lz4_flex::block::DecompressError) -> Self {
        Self::decode(format!("LZ4 block decompression failed: {}", err))
    }
}

impl From<lzma_rs::error::Error> for BinaryError {
    fn from(err: lzma_rs::error::Error) -> Self {
        Self::decode(format!("LZMA decompression failed: {}", err))
    }
}
