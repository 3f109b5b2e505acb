//! Serialized-asset-file header.
//!
//! The first four fields are always read big-endian. From the version>=9
//! endian byte onward, every subsequent read (including the version>=22
//! extended header) respects whichever byte order that flag selects; the
//! spec treats the v>=22 re-read as a complete replacement of the first
//! four values, not an augmentation (see DESIGN.md).

use crate::error::Result;
use crate::reader::{BinaryReader, ByteOrder};

#[derive(Debug, Clone)]
pub struct AssetHeader {
    pub metadata_size: u32,
    pub file_size: i64,
    pub version: i32,
    pub data_offset: i64,
    /// True for big-endian. Unset (false) only ever applies for version>=9;
    /// earlier versions are always treated as big-endian per spec §3.
    pub big_endian: bool,
    pub unity_version: String,
    pub target_platform: i32,
}

impl AssetHeader {
    /// `reader` must be positioned at the start of the file with byte order
    /// `ByteOrder::Big`; on return its byte order has been switched to
    /// whatever this header's endian flag selects, ready for the type table.
    pub fn from_reader(reader: &mut BinaryReader) -> Result<Self> {
        let mut metadata_size = reader.read_u32()?;
        let mut file_size = reader.read_i32()? as i64;
        let version = reader.read_i32()?;
        let mut data_offset = reader.read_i32()? as i64;

        let mut big_endian = true;
        if version >= 9 {
            big_endian = reader.read_u8()? != 0;
            reader.read_bytes(3)?;
            reader.set_byte_order(if big_endian { ByteOrder::Big } else { ByteOrder::Little });
        }

        if version >= 22 {
            metadata_size = reader.read_u32()?;
            file_size = reader.read_i64()?;
            data_offset = reader.read_i64()?;
            reader.read_bytes(8)?;
        }

        let mut unity_version = String::new();
        let mut target_platform = 0;
        if version >= 7 {
            unity_version = reader.read_cstring()?;
            target_platform = reader.read_i32()?;
        }

        Ok(Self {
            metadata_size,
            file_size,
            version,
            data_offset,
            big_endian,
            unity_version,
            target_platform,
        })
    }

    pub fn byte_order(&self) -> ByteOrder {
        if self.big_endian { ByteOrder::Big } else { ByteOrder::Little }
    }

    pub fn has_type_table(&self) -> bool {
        self.version >= 13
    }

    pub fn resolves_class_id_from_types(&self) -> bool {
        self.version >= 16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_v17_header(little: bool) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&100u32.to_be_bytes());
        buf.extend_from_slice(&1000i32.to_be_bytes());
        buf.extend_from_slice(&17i32.to_be_bytes());
        buf.extend_from_slice(&120i32.to_be_bytes());
        buf.push(if little { 0 } else { 1 });
        buf.extend_from_slice(&[0, 0, 0]);
        // from here on, respects endian flag
        let push_i32 = |buf: &mut Vec<u8>, v: i32| {
            if little { buf.extend_from_slice(&v.to_le_bytes()) } else { buf.extend_from_slice(&v.to_be_bytes()) }
        };
        buf.extend_from_slice(b"2021.3.14f1\0");
        push_i32(&mut buf, 13); // target platform (Android)
        buf
    }

    #[test]
    fn pre_v9_is_always_big_endian() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&10u32.to_be_bytes());
        buf.extend_from_slice(&100i32.to_be_bytes());
        buf.extend_from_slice(&6i32.to_be_bytes());
        buf.extend_from_slice(&20i32.to_be_bytes());
        buf.extend_from_slice(b"5.x.x\0");
        buf.extend_from_slice(&1i32.to_be_bytes());
        let mut reader = BinaryReader::new(&buf, ByteOrder::Big);
        let header = AssetHeader::from_reader(&mut reader).unwrap();
        assert!(header.big_endian);
        assert_eq!(header.version, 6);
        assert_eq!(header.unity_version, "5.x.x");
    }

    #[test]
    fn v22_extended_header_replaces_initial_fields() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&1u32.to_be_bytes()); // placeholder metadata_size
        buf.extend_from_slice(&1i32.to_be_bytes()); // placeholder file_size
        buf.extend_from_slice(&22i32.to_be_bytes());
        buf.extend_from_slice(&1i32.to_be_bytes()); // placeholder data_offset
        buf.push(0); // little-endian
        buf.extend_from_slice(&[0, 0, 0]);
        buf.extend_from_slice(&500u32.to_le_bytes());
        buf.extend_from_slice(&99999i64.to_le_bytes());
        buf.extend_from_slice(&600i64.to_le_bytes());
        buf.extend_from_slice(&[0u8; 8]);
        buf.extend_from_slice(b"2022.3.14f1\0");
        buf.extend_from_slice(&13i32.to_le_bytes());

        let mut reader = BinaryReader::new(&buf, ByteOrder::Big);
        let header = AssetHeader::from_reader(&mut reader).unwrap();
        assert_eq!(header.metadata_size, 500);
        assert_eq!(header.file_size, 99999);
        assert_eq!(header.data_offset, 600);
        assert_eq!(header.unity_version, "2022.3.14f1");
        assert_eq!(header.byte_order(), ByteOrder::Little);
    }

    #[test]
    fn endian_flag_governs_fields_after_it() {
        let little_buf = build_v17_header(true);
        let mut reader = BinaryReader::new(&little_buf, ByteOrder::Big);
        let header = AssetHeader::from_reader(&mut reader).unwrap();
        assert_eq!(header.target_platform, 13);
        assert_eq!(header.byte_order(), ByteOrder::Little);
    }
}
