//! Seekable virtual stream over independently compressed blocks
//!
//! A UnityFS data region is a sequence of blocks, each compressed on its own.
//! [`BlockStream`] presents them as one uncompressed byte stream while keeping
//! at most one decoded block resident, so memory stays bounded by the largest
//! block rather than the whole region.

use crate::bundle::ArchiveBlockInfo;
use crate::error::{BinaryError, Result};
use std::io::{self, Read, Seek, SeekFrom};
use tracing::trace;

/// The single decoded block currently held by a stream
#[derive(Debug)]
///
/// `data` always holds exactly the block's declared uncompressed size.
struct ResidentBlock {
    index: usize,
    start: u64,
    end: u64,
    data: Vec<u8>,
}

impl ResidentBlock {
    fn contains(&self, position: u64) -> bool {
        position >= self.start && position < self.end
    }
}

/// Virtual uncompressed stream over a block sequence
///
/// `source` holds the compressed bytes; block `i` starts at
/// `base_offset + sum(compressed_size[..i])`. Not meant to be shared between
/// logical readers: every cache miss replaces the resident block.
#[derive(Debug)]
pub struct BlockStream<R> {
    source: R,
    blocks: Vec<ArchiveBlockInfo>,
    virtual_size: u64,
    base_offset: u64,
    position: u64,
    resident: Option<ResidentBlock>,
}

impl<R: Read + Seek> BlockStream<R> {
    /// Create a stream; nothing is decoded until the first read or seek
    pub fn new(source: R, blocks: Vec<ArchiveBlockInfo>, base_offset: u64) -> Self {
        let virtual_size = blocks
            .iter()
            .map(|block| u64::from(block.uncompressed_size))
            .sum();
        Self {
            source,
            blocks,
            virtual_size,
            base_offset,
            position: 0,
            resident: None,
        }
    }

    /// Total uncompressed size (sum of every block's uncompressed size)
    pub fn virtual_size(&self) -> u64 {
        self.virtual_size
    }

    /// Current virtual position
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Bytes left between the position and the end of the stream
    pub fn remaining(&self) -> u64 {
        self.virtual_size.saturating_sub(self.position)
    }

    /// Index of the block currently decoded, if any
    pub fn resident_block(&self) -> Option<usize> {
        self.resident.as_ref().map(|block| block.index)
    }

    /// Block descriptors backing this stream
    pub fn blocks(&self) -> &[ArchiveBlockInfo] {
        &self.blocks
    }

    /// Move to a virtual position and make its block resident
    ///
    /// A position past the end is accepted; the resident block is dropped
    /// and reads report end of stream.
    pub fn seek_to(&mut self, position: u64) -> Result<()> {
        self.position = position;
        self.resolve()
    }

    /// Read exactly `count` bytes from the current position
    pub fn read_bytes(&mut self, count: usize) -> Result<Vec<u8>> {
        let remaining = self.remaining();
        if (count as u64) > remaining {
            return Err(BinaryError::end_of_stream(count, remaining as usize));
        }
        let mut buffer = vec![0u8; count];
        let read = self.read_into(&mut buffer)?;
        if read != count {
            return Err(BinaryError::end_of_stream(count, read));
        }
        Ok(buffer)
    }

    /// Consume the stream and return the underlying source
    pub fn into_inner(self) -> R {
        self.source
    }

    fn read_into(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            self.resolve()?;
            let Some(block) = &self.resident else {
                break;
            };
            let offset = (self.position - block.start) as usize;
            let available = block.data.get(offset..).unwrap_or_default();
            let count = available.len().min(buf.len() - filled);
            if count == 0 {
                break;
            }
            buf[filled..filled + count].copy_from_slice(&available[..count]);
            filled += count;
            self.position += count as u64;
        }
        Ok(filled)
    }

    /// Ensure the resident block covers the current position
    fn resolve(&mut self) -> Result<()> {
        if let Some(block) = &self.resident {
            if block.contains(self.position) {
                return Ok(());
            }
        }

        // Drop the stale block before decoding so a failure leaves nothing behind
        self.resident = None;

        let mut uncompressed_offset = 0u64;
        let mut compressed_offset = 0u64;
        for (index, block) in self.blocks.iter().enumerate() {
            let size = u64::from(block.uncompressed_size);
            if self.position >= uncompressed_offset && self.position < uncompressed_offset + size {
                let block = *block;
                let data = self.decode_block(index, &block, compressed_offset)?;
                self.resident = Some(ResidentBlock {
                    index,
                    start: uncompressed_offset,
                    end: uncompressed_offset + size,
                    data,
                });
                return Ok(());
            }
            uncompressed_offset += size;
            compressed_offset += u64::from(block.compressed_size);
        }

        Ok(())
    }

    fn decode_block(
        &mut self,
        index: usize,
        block: &ArchiveBlockInfo,
        compressed_offset: u64,
    ) -> Result<Vec<u8>> {
        let start = self.base_offset + compressed_offset;
        let size = block.compressed_size as usize;
        trace!(
            index,
            start,
            compressed = size,
            uncompressed = block.uncompressed_size,
            "Decoding block"
        );

        self.source.seek(SeekFrom::Start(start))?;
        let mut compressed = Vec::with_capacity(size);
        (&mut self.source)
            .take(size as u64)
            .read_to_end(&mut compressed)?;
        if compressed.len() != size {
            return Err(BinaryError::end_of_stream(size, compressed.len()));
        }

        // Rejects output whose length differs from the declared size
        block.decompress(&compressed)
    }
}

fn into_io_error(err: BinaryError) -> io::Error {
    match err {
        BinaryError::Io(err) => err,
        BinaryError::EndOfStream { .. } => io::Error::new(io::ErrorKind::UnexpectedEof, err),
        other => io::Error::new(io::ErrorKind::InvalidData, other),
    }
}

impl<R: Read + Seek> Read for BlockStream<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read_into(buf).map_err(into_io_error)
    }
}

impl<R: Read + Seek> Seek for BlockStream<R> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::End(delta) => self.virtual_size.checked_add_signed(delta),
            SeekFrom::Current(delta) => self.position.checked_add_signed(delta),
        };
        let target = target.ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek to a negative or overflowing position",
            )
        })?;
        self.seek_to(target).map_err(into_io_error)?;
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const PREFIX: &[u8] = b"HEADER--";

    fn payload(len: usize, seed: u8) -> Vec<u8> {
        (0..len).map(|i| (i as u8).wrapping_mul(7) ^ seed).collect()
    }

    /// Three blocks: LZ4, stored, LZ4HC
    fn fixture() -> (Vec<u8>, Vec<ArchiveBlockInfo>, Vec<u8>) {
        let parts = [payload(100, 1), payload(37, 2), payload(64, 3)];
        let mut file = PREFIX.to_vec();
        let mut blocks = Vec::new();

        let first = lz4_flex::block::compress(&parts[0]);
        blocks.push(ArchiveBlockInfo::new(100, first.len() as u32, 2));
        file.extend_from_slice(&first);

        blocks.push(ArchiveBlockInfo::new(37, 37, 0));
        file.extend_from_slice(&parts[1]);

        let third = lz4_flex::block::compress(&parts[2]);
        blocks.push(ArchiveBlockInfo::new(64, third.len() as u32, 3));
        file.extend_from_slice(&third);

        (file, blocks, parts.concat())
    }

    fn open() -> (BlockStream<Cursor<Vec<u8>>>, Vec<u8>) {
        let (file, blocks, expected) = fixture();
        (
            BlockStream::new(Cursor::new(file), blocks, PREFIX.len() as u64),
            expected,
        )
    }

    #[test]
    fn test_virtual_size_is_sum_of_blocks() {
        let (stream, expected) = open();
        assert_eq!(stream.virtual_size(), 201);
        assert_eq!(stream.virtual_size(), expected.len() as u64);
        assert_eq!(stream.resident_block(), None);
    }

    #[test]
    fn test_read_across_block_boundaries() {
        let (mut stream, expected) = open();
        stream.seek_to(90).unwrap();
        assert_eq!(stream.resident_block(), Some(0));

        let bytes = stream.read_bytes(60).unwrap();
        assert_eq!(bytes, &expected[90..150]);
        assert_eq!(stream.position(), 150);
        assert_eq!(stream.resident_block(), Some(2));
    }

    #[test]
    fn test_read_whole_stream() {
        let (mut stream, expected) = open();
        let mut all = Vec::new();
        stream.read_to_end(&mut all).unwrap();
        assert_eq!(all, expected);
    }

    #[test]
    fn test_seek_within_resident_block() {
        let (mut stream, expected) = open();
        stream.seek_to(105).unwrap();
        assert_eq!(stream.resident_block(), Some(1));
        stream.seek_to(136).unwrap();
        assert_eq!(stream.resident_block(), Some(1));
        assert_eq!(stream.read_bytes(1).unwrap(), &expected[136..137]);

        // Half-open range: the next byte belongs to the following block
        assert_eq!(stream.resident_block(), Some(1));
        stream.seek_to(137).unwrap();
        assert_eq!(stream.resident_block(), Some(2));
    }

    #[test]
    fn test_seek_past_end() {
        let (mut stream, _) = open();
        stream.seek_to(10).unwrap();
        assert_eq!(stream.resident_block(), Some(0));

        stream.seek_to(500).unwrap();
        assert_eq!(stream.resident_block(), None);
        assert!(stream.read_bytes(1).unwrap_err().is_end_of_stream());

        let mut buf = [0u8; 4];
        assert_eq!(stream.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_read_bytes_short() {
        let (mut stream, _) = open();
        stream.seek_to(190).unwrap();
        let err = stream.read_bytes(20).unwrap_err();
        assert!(matches!(
            err,
            BinaryError::EndOfStream {
                expected: 20,
                actual: 11
            }
        ));
    }

    #[test]
    fn test_io_seek_variants() {
        let (mut stream, expected) = open();
        assert_eq!(stream.seek(SeekFrom::End(-1)).unwrap(), 200);
        assert_eq!(stream.read_bytes(1).unwrap(), &expected[200..]);
        assert_eq!(stream.seek(SeekFrom::Current(-101)).unwrap(), 100);
        assert_eq!(stream.read_bytes(2).unwrap(), &expected[100..102]);
        assert!(stream.seek(SeekFrom::Current(-1000)).is_err());
    }

    #[test]
    fn test_decode_failure_leaves_no_resident_block() {
        let (mut file, mut blocks, _) = fixture();
        // Corrupt the third block and lie about its size
        let third_start = PREFIX.len() + blocks[0].compressed_size as usize + 37;
        file[third_start] = 0xF0;
        blocks[2].uncompressed_size = 4096;

        let mut stream = BlockStream::new(Cursor::new(file), blocks, PREFIX.len() as u64);
        stream.seek_to(5).unwrap();
        assert_eq!(stream.resident_block(), Some(0));

        let err = stream.seek_to(150).unwrap_err();
        assert!(matches!(err, BinaryError::Decode(_)));
        assert_eq!(stream.resident_block(), None);
    }

    #[test]
    fn test_stored_block_shorter_than_declared() {
        let blocks = vec![ArchiveBlockInfo::new(20, 10, 0)];
        let mut stream = BlockStream::new(Cursor::new(vec![7u8; 10]), blocks, 0);

        let err = stream.seek_to(15).unwrap_err();
        assert!(matches!(err, BinaryError::Decode(_)));
        assert_eq!(stream.resident_block(), None);

        stream.seek_to(0).unwrap_err();
        let err = stream.read_bytes(20).unwrap_err();
        assert!(matches!(err, BinaryError::Decode(_)));
    }

    #[test]
    fn test_stored_block_longer_than_declared() {
        let blocks = vec![
            ArchiveBlockInfo::new(4, 8, 0),
            ArchiveBlockInfo::new(4, 4, 0),
        ];
        let mut stream = BlockStream::new(Cursor::new(b"AAAAXXXXBBBB".to_vec()), blocks, 0);
        assert_eq!(stream.virtual_size(), 8);

        let err = stream.read_bytes(8).unwrap_err();
        assert!(matches!(err, BinaryError::Decode(_)));
        assert_eq!(stream.resident_block(), None);

        // The well-formed second block still reads on its own
        stream.seek_to(4).unwrap();
        assert_eq!(stream.read_bytes(4).unwrap(), b"BBBB");
    }

    #[test]
    fn test_truncated_source() {
        let (mut file, blocks, _) = fixture();
        file.truncate(file.len() - 3);
        let mut stream = BlockStream::new(Cursor::new(file), blocks, PREFIX.len() as u64);
        assert!(stream.seek_to(190).unwrap_err().is_end_of_stream());
    }
}
