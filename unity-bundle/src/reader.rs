//! Binary data reader for Unity files

use crate::error::{BinaryError, Result};
use byteorder::{BigEndian, LittleEndian, ReadBytesExt};
use serde::Serialize;
use std::io::{Cursor, Read};

/// Byte order for reading binary data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum ByteOrder {
    /// Big endian (bundle headers, legacy serialized files)
    #[default]
    Big,
    /// Little endian (most serialized files since Unity 5)
    Little,
}

/// Positional binary cursor with switchable endianness
///
/// All reads are bounds-checked up front; a short read never consumes
/// anything and fails with [`BinaryError::EndOfStream`].
pub struct BinaryReader<'a> {
    cursor: Cursor<&'a [u8]>,
    byte_order: ByteOrder,
}

impl<'a> BinaryReader<'a> {
    /// Create a new binary reader from byte slice
    pub fn new(data: &'a [u8], byte_order: ByteOrder) -> Self {
        Self {
            cursor: Cursor::new(data),
            byte_order,
        }
    }

    /// Get current position in the stream
    pub fn position(&self) -> u64 {
        self.cursor.position()
    }

    /// Seek to an absolute position
    ///
    /// Positioning exactly at the end is allowed; anything past it is not.
    pub fn set_position(&mut self, pos: u64) -> Result<()> {
        let len = self.len() as u64;
        if pos > len {
            return Err(BinaryError::seek_out_of_range(pos, len));
        }
        self.cursor.set_position(pos);
        Ok(())
    }

    /// Seek forward relative to the current position
    pub fn skip(&mut self, offset: u64) -> Result<u64> {
        let target = self
            .position()
            .checked_add(offset)
            .ok_or_else(|| BinaryError::seek_out_of_range(u64::MAX, self.len() as u64))?;
        self.set_position(target)?;
        Ok(target)
    }

    /// Get the total length of the data
    pub fn len(&self) -> usize {
        self.cursor.get_ref().len()
    }

    /// Check if the reader is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get remaining bytes from current position
    pub fn remaining(&self) -> usize {
        self.len().saturating_sub(self.position() as usize)
    }

    /// Check if we have at least `count` bytes remaining
    pub fn has_bytes(&self, count: usize) -> bool {
        self.remaining() >= count
    }

    fn ensure(&self, count: usize) -> Result<()> {
        if !self.has_bytes(count) {
            return Err(BinaryError::end_of_stream(count, self.remaining()));
        }
        Ok(())
    }

    /// Align to the next 4-byte boundary, measured from the start of the data
    pub fn align(&mut self) -> Result<()> {
        self.align_to(4)
    }

    /// Align to the specified byte boundary
    pub fn align_to(&mut self, alignment: u64) -> Result<()> {
        let pos = self.position();
        let aligned = (pos + alignment - 1) & !(alignment - 1);
        if aligned != pos {
            self.set_position(aligned)?;
        }
        Ok(())
    }

    /// Read a single byte
    pub fn read_u8(&mut self) -> Result<u8> {
        self.ensure(1)?;
        Ok(self.cursor.read_u8()?)
    }

    /// Read a boolean (as u8, 0 = false, non-zero = true)
    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    /// Read a signed 8-bit integer
    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_u8()? as i8)
    }

    /// Read an unsigned 16-bit integer
    pub fn read_u16(&mut self) -> Result<u16> {
        self.ensure(2)?;
        match self.byte_order {
            ByteOrder::Big => Ok(self.cursor.read_u16::<BigEndian>()?),
            ByteOrder::Little => Ok(self.cursor.read_u16::<LittleEndian>()?),
        }
    }

    /// Read a signed 16-bit integer
    pub fn read_i16(&mut self) -> Result<i16> {
        self.ensure(2)?;
        match self.byte_order {
            ByteOrder::Big => Ok(self.cursor.read_i16::<BigEndian>()?),
            ByteOrder::Little => Ok(self.cursor.read_i16::<LittleEndian>()?),
        }
    }

    /// Read an unsigned 32-bit integer
    pub fn read_u32(&mut self) -> Result<u32> {
        self.ensure(4)?;
        match self.byte_order {
            ByteOrder::Big => Ok(self.cursor.read_u32::<BigEndian>()?),
            ByteOrder::Little => Ok(self.cursor.read_u32::<LittleEndian>()?),
        }
    }

    /// Read a signed 32-bit integer
    pub fn read_i32(&mut self) -> Result<i32> {
        self.ensure(4)?;
        match self.byte_order {
            ByteOrder::Big => Ok(self.cursor.read_i32::<BigEndian>()?),
            ByteOrder::Little => Ok(self.cursor.read_i32::<LittleEndian>()?),
        }
    }

    /// Read an unsigned 64-bit integer
    pub fn read_u64(&mut self) -> Result<u64> {
        self.ensure(8)?;
        match self.byte_order {
            ByteOrder::Big => Ok(self.cursor.read_u64::<BigEndian>()?),
            ByteOrder::Little => Ok(self.cursor.read_u64::<LittleEndian>()?),
        }
    }

    /// Read a signed 64-bit integer
    pub fn read_i64(&mut self) -> Result<i64> {
        self.ensure(8)?;
        match self.byte_order {
            ByteOrder::Big => Ok(self.cursor.read_i64::<BigEndian>()?),
            ByteOrder::Little => Ok(self.cursor.read_i64::<LittleEndian>()?),
        }
    }

    /// Read a fixed number of bytes
    pub fn read_bytes(&mut self, count: usize) -> Result<Vec<u8>> {
        self.ensure(count)?;
        let mut buffer = vec![0u8; count];
        self.cursor.read_exact(&mut buffer)?;
        Ok(buffer)
    }

    /// Read exactly `N` bytes into an array
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        self.ensure(N)?;
        let mut buffer = [0u8; N];
        self.cursor.read_exact(&mut buffer)?;
        Ok(buffer)
    }

    /// Read a null-terminated string
    pub fn read_cstring(&mut self) -> Result<String> {
        let rest = self.remaining_slice();
        let end = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| BinaryError::end_of_stream(rest.len() + 1, rest.len()))?;
        let string = decode_utf8(&rest[..end])?;
        self.cursor.set_position(self.position() + end as u64 + 1);
        Ok(string)
    }

    /// Read a 7-bit-continuation variable-length unsigned integer
    ///
    /// Groups are stored least-significant first; the high bit of each byte
    /// marks that another byte follows.
    pub fn read_varint(&mut self) -> Result<u64> {
        let mut value = 0u64;
        let mut shift = 0u32;
        loop {
            let byte = self.read_u8()?;
            if shift >= 64 {
                return Err(BinaryError::decode("varint exceeds 64 bits"));
            }
            value |= u64::from(byte & 0x7F) << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
            shift += 7;
        }
    }

    /// Read a string prefixed by its varint-encoded byte length
    pub fn read_varint_string(&mut self) -> Result<String> {
        let length = self.read_varint()?;
        let length = usize::try_from(length)
            .map_err(|_| BinaryError::end_of_stream(usize::MAX, self.remaining()))?;
        let bytes = self.read_bytes(length)?;
        decode_utf8(&bytes)
    }

    /// Get the current byte order
    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    /// Set the byte order for every subsequent multi-byte read
    pub fn set_byte_order(&mut self, byte_order: ByteOrder) {
        self.byte_order = byte_order;
    }

    /// Get a slice of the remaining data
    pub fn remaining_slice(&self) -> &'a [u8] {
        let data: &'a [u8] = *self.cursor.get_ref();
        let pos = (self.position() as usize).min(data.len());
        &data[pos..]
    }
}

fn decode_utf8(bytes: &[u8]) -> Result<String> {
    String::from_utf8(bytes.to_vec())
        .map_err(|e| BinaryError::decode(format!("Invalid UTF-8 string: {}", e)))
}
