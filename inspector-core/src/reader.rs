//! Binary cursor used by the bundle and asset readers
//!
//! Endianness is a plain mutable field on the reader, never thread-local or
//! implicit state, so a caller can save/restore it around a sub-parse.

use crate::error::{AnalyzerError, Result};
use byteorder::{BigEndian, LittleEndian, ReadBytesExt};
use std::io::{Cursor, Read, Seek, SeekFrom};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ByteOrder {
    Big,
    #[default]
    Little,
}

pub struct BinaryReader<'a> {
    cursor: Cursor<&'a [u8]>,
    byte_order: ByteOrder,
}

impl<'a> BinaryReader<'a> {
    pub fn new(data: &'a [u8], byte_order: ByteOrder) -> Self {
        Self {
            cursor: Cursor::new(data),
            byte_order,
        }
    }

    pub fn position(&self) -> u64 {
        self.cursor.position()
    }

    pub fn set_position(&mut self, pos: u64) {
        self.cursor.set_position(pos);
    }

    pub fn seek(&mut self, offset: i64) -> Result<u64> {
        Ok(self.cursor.seek(SeekFrom::Current(offset))?)
    }

    pub fn len(&self) -> usize {
        self.cursor.get_ref().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn remaining(&self) -> usize {
        self.len().saturating_sub(self.position() as usize)
    }

    pub fn has_bytes(&self, count: usize) -> bool {
        self.remaining() >= count
    }

    /// Align to the next 4-byte boundary.
    pub fn align(&mut self) {
        self.align_to(4)
    }

    /// Identity when already aligned, else advances to the next multiple of `n`.
    pub fn align_to(&mut self, alignment: u64) {
        let pos = self.position();
        let aligned = (pos + alignment - 1) & !(alignment - 1);
        if aligned != pos {
            self.set_position(aligned);
        }
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        if !self.has_bytes(1) {
            return Err(AnalyzerError::short_read(1, self.remaining()));
        }
        Ok(self.cursor.read_u8()?)
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_u8()? as i8)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        if !self.has_bytes(2) {
            return Err(AnalyzerError::short_read(2, self.remaining()));
        }
        match self.byte_order {
            ByteOrder::Big => Ok(self.cursor.read_u16::<BigEndian>()?),
            ByteOrder::Little => Ok(self.cursor.read_u16::<LittleEndian>()?),
        }
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        if !self.has_bytes(2) {
            return Err(AnalyzerError::short_read(2, self.remaining()));
        }
        match self.byte_order {
            ByteOrder::Big => Ok(self.cursor.read_i16::<BigEndian>()?),
            ByteOrder::Little => Ok(self.cursor.read_i16::<LittleEndian>()?),
        }
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        if !self.has_bytes(4) {
            return Err(AnalyzerError::short_read(4, self.remaining()));
        }
        match self.byte_order {
            ByteOrder::Big => Ok(self.cursor.read_u32::<BigEndian>()?),
            ByteOrder::Little => Ok(self.cursor.read_u32::<LittleEndian>()?),
        }
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        if !self.has_bytes(4) {
            return Err(AnalyzerError::short_read(4, self.remaining()));
        }
        match self.byte_order {
            ByteOrder::Big => Ok(self.cursor.read_i32::<BigEndian>()?),
            ByteOrder::Little => Ok(self.cursor.read_i32::<LittleEndian>()?),
        }
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        if !self.has_bytes(8) {
            return Err(AnalyzerError::short_read(8, self.remaining()));
        }
        match self.byte_order {
            ByteOrder::Big => Ok(self.cursor.read_u64::<BigEndian>()?),
            ByteOrder::Little => Ok(self.cursor.read_u64::<LittleEndian>()?),
        }
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        if !self.has_bytes(8) {
            return Err(AnalyzerError::short_read(8, self.remaining()));
        }
        match self.byte_order {
            ByteOrder::Big => Ok(self.cursor.read_i64::<BigEndian>()?),
            ByteOrder::Little => Ok(self.cursor.read_i64::<LittleEndian>()?),
        }
    }

    pub fn read_bytes(&mut self, count: usize) -> Result<Vec<u8>> {
        if !self.has_bytes(count) {
            return Err(AnalyzerError::short_read(count, self.remaining()));
        }
        let mut buffer = vec![0u8; count];
        self.cursor.read_exact(&mut buffer)?;
        Ok(buffer)
    }

    pub fn read_remaining(&mut self) -> &[u8] {
        let pos = self.cursor.position() as usize;
        &self.cursor.get_ref()[pos..]
    }

    /// Null-terminated string, used for bundle signatures and paths.
    pub fn read_cstring(&mut self) -> Result<String> {
        let mut bytes = Vec::new();
        loop {
            let byte = self.read_u8()?;
            if byte == 0 {
                break;
            }
            bytes.push(byte);
        }
        Ok(String::from_utf8(bytes)?)
    }

    /// Length-prefixed (u32) string, the engine's default string encoding.
    pub fn read_string(&mut self) -> Result<String> {
        let length = self.read_u32()? as usize;
        if length > 1024 * 1024 {
            return Err(AnalyzerError::malformed_asset(format!(
                "implausible string length {length}"
            )));
        }
        let bytes = self.read_bytes(length)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Length-prefixed string followed by 4-byte alignment.
    pub fn read_aligned_string(&mut self) -> Result<String> {
        let string = self.read_string()?;
        self.align();
        Ok(string)
    }

    /// Length-prefixed string rejected outright if longer than `max_len`,
    /// used for the script/object name fields that carry an explicit bound.
    pub fn read_bounded_string(&mut self, max_len: usize) -> Result<String> {
        let length = self.read_u32()? as usize;
        if length > max_len {
            return Err(AnalyzerError::malformed_asset(format!(
                "string length {length} exceeds bound {max_len}"
            )));
        }
        let bytes = self.read_bytes(length)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Bounded length-prefixed string followed by 4-byte alignment.
    pub fn read_bounded_aligned_string(&mut self, max_len: usize) -> Result<String> {
        let string = self.read_bounded_string(max_len)?;
        self.align();
        Ok(string)
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    pub fn set_byte_order(&mut self, byte_order: ByteOrder) {
        self.byte_order = byte_order;
    }

    pub fn remaining_slice(&self) -> &'a [u8] {
        let pos = self.position() as usize;
        &self.cursor.get_ref()[pos..]
    }

    pub fn sub_reader(&self, offset: usize, length: usize) -> Result<BinaryReader<'a>> {
        let data = self.cursor.get_ref();
        if offset + length > data.len() {
            return Err(AnalyzerError::short_read(offset + length, data.len()));
        }
        Ok(BinaryReader::new(&data[offset..offset + length], self.byte_order))
    }
}
