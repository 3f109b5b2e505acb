//! Bundle Reader: parses the `UnityFs` container format.

pub mod header;
pub mod types;

use crate::compression::{self, CompressionType};
use crate::error::{AnalyzerError, Result};
use crate::reader::{BinaryReader, ByteOrder};
use header::BundleHeader;
use types::{BundleNode, StorageBlock};

/// One storage block's raw (still-compressed) byte range within the input data.
struct BlockSlice {
    block: StorageBlock,
    compressed_start: usize,
    compressed_end: usize,
}

pub struct Bundle<'a> {
    pub header: BundleHeader,
    pub nodes: Vec<BundleNode>,
    data: &'a [u8],
    blocks: Vec<BlockSlice>,
}

impl<'a> Bundle<'a> {
    /// Parses the header, block-info directory (wherever it lives), and
    /// node directory. Returns `Ok(None)` when the signature does not
    /// match, so the caller can move on without treating it as an error.
    #[tracing::instrument(skip(data))]
    pub fn parse(data: &'a [u8]) -> Result<Option<Self>> {
        let mut reader = BinaryReader::new(data, ByteOrder::Big);
        let header = match BundleHeader::from_reader(&mut reader)? {
            Some(h) => h,
            None => return Ok(None),
        };

        let header_end = reader.position() as usize;

        let block_info_bytes = if header.block_info_at_end() {
            let start = data.len().saturating_sub(header.compressed_block_info_size as usize);
            data.get(start..).ok_or_else(|| {
                AnalyzerError::bad_bundle_header("block-info-at-end range out of bounds")
            })?
        } else {
            let start = if header.aligns_blocks() { align_up(header_end, 16) } else { header_end };
            let end = start + header.compressed_block_info_size as usize;
            data.get(start..end).ok_or_else(|| {
                AnalyzerError::bad_bundle_header("block-info range out of bounds")
            })?
        };

        let compression = CompressionType::from_code(header.block_info_compression_code());
        let block_info = compression::decompress(
            block_info_bytes,
            compression,
            header.uncompressed_block_info_size as usize,
        )?;

        let (blocks, nodes) = parse_block_info_payload(&block_info)?;

        let data_start = if header.block_info_at_end() {
            header_end
        } else {
            let info_start = if header.aligns_blocks() { align_up(header_end, 16) } else { header_end };
            info_start + header.compressed_block_info_size as usize
        };
        let data_start = if header.aligns_blocks() { align_up(data_start, 16) } else { data_start };

        let mut block_slices = Vec::with_capacity(blocks.len());
        let mut cursor = data_start;
        for block in blocks {
            let end = cursor + block.compressed_size as usize;
            block_slices.push(BlockSlice { block, compressed_start: cursor, compressed_end: end });
            cursor = end;
        }

        Ok(Some(Self { header, nodes, data, blocks: block_slices }))
    }

    /// Materializes one node's bytes, decompressing only the storage blocks
    /// that cover its uncompressed-offset range.
    #[tracing::instrument(skip(self))]
    pub fn materialize(&self, node: &BundleNode) -> Result<Vec<u8>> {
        let start = node.offset;
        let end = node.end_offset();
        let mut out = Vec::with_capacity((end - start).max(0) as usize);

        let mut uncompressed_cursor: i64 = 0;
        for slice in &self.blocks {
            let block_start = uncompressed_cursor;
            let block_end = block_start + slice.block.uncompressed_size as i64;
            uncompressed_cursor = block_end;

            if block_end <= start || block_start >= end {
                continue;
            }

            let raw = self.data.get(slice.compressed_start..slice.compressed_end).ok_or_else(|| {
                AnalyzerError::malformed_asset("storage block out of bounds")
            })?;
            let compression = CompressionType::from_code(slice.block.flags as u32);
            let decompressed = compression::decompress(
                raw,
                compression,
                slice.block.uncompressed_size as usize,
            )?;

            let want_start = start.max(block_start) - block_start;
            let want_end = end.min(block_end) - block_start;
            let want_start = want_start as usize;
            let want_end = (want_end as usize).min(decompressed.len());
            if want_start < want_end {
                out.extend_from_slice(&decompressed[want_start..want_end]);
            }

            if uncompressed_cursor >= end {
                break;
            }
        }

        Ok(out)
    }
}

fn align_up(pos: usize, alignment: usize) -> usize {
    (pos + alignment - 1) & !(alignment - 1)
}

fn parse_block_info_payload(payload: &[u8]) -> Result<(Vec<StorageBlock>, Vec<BundleNode>)> {
    let mut reader = BinaryReader::new(payload, ByteOrder::Big);
    reader.read_bytes(16)?; // stable hash identifier, unused

    let block_count = reader.read_i32()?;
    if block_count < 0 {
        return Err(AnalyzerError::malformed_asset("negative block count"));
    }
    let mut blocks = Vec::with_capacity(block_count as usize);
    for _ in 0..block_count {
        blocks.push(StorageBlock {
            uncompressed_size: reader.read_u32()?,
            compressed_size: reader.read_u32()?,
            flags: reader.read_u16()?,
        });
    }

    let node_count = reader.read_i32()?;
    if node_count < 0 {
        return Err(AnalyzerError::malformed_asset("negative node count"));
    }
    let mut nodes = Vec::with_capacity(node_count as usize);
    for _ in 0..node_count {
        let offset = reader.read_i64()?;
        let size = reader.read_i64()?;
        let flags = reader.read_i32()?;
        let path = reader.read_cstring()?;
        nodes.push(BundleNode { offset, size, flags, path });
    }

    Ok((blocks, nodes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_single_block_bundle(node_payload: &[u8]) -> Vec<u8> {
        let mut block_info = Vec::new();
        block_info.extend_from_slice(&[0u8; 16]);
        block_info.extend_from_slice(&1i32.to_be_bytes());
        block_info.extend_from_slice(&(node_payload.len() as u32).to_be_bytes());
        block_info.extend_from_slice(&(node_payload.len() as u32).to_be_bytes());
        block_info.extend_from_slice(&0u16.to_be_bytes()); // none compression
        block_info.extend_from_slice(&1i32.to_be_bytes());
        block_info.extend_from_slice(&0i64.to_be_bytes());
        block_info.extend_from_slice(&(node_payload.len() as i64).to_be_bytes());
        block_info.extend_from_slice(&0i32.to_be_bytes());
        block_info.extend_from_slice(b"CAB-test\0");

        let mut out = Vec::new();
        out.extend_from_slice(b"UnityFS\0");
        out.extend_from_slice(&6i32.to_be_bytes());
        out.extend_from_slice(b"5.x.x\0");
        out.extend_from_slice(b"2021.3.14f1\0");
        let compressed_info_size = block_info.len() as i32;
        out.extend_from_slice(&0i64.to_be_bytes()); // total size, unused by parser
        out.extend_from_slice(&compressed_info_size.to_be_bytes());
        out.extend_from_slice(&compressed_info_size.to_be_bytes());
        out.extend_from_slice(&0i32.to_be_bytes()); // flags: not at end, none compression, version<7 so no align
        out.extend_from_slice(&block_info);
        out.extend_from_slice(node_payload);
        out
    }

    #[test]
    fn single_node_roundtrips_exact_bytes() {
        let payload = b"hello bundle node";
        let data = build_single_block_bundle(payload);
        let bundle = Bundle::parse(&data).unwrap().unwrap();
        assert_eq!(bundle.nodes.len(), 1);
        let materialized = bundle.materialize(&bundle.nodes[0]).unwrap();
        assert_eq!(materialized, payload);
    }

    fn build_two_block_bundle(block0: &[u8], block1: &[u8], node_offset: i64, node_size: i64) -> Vec<u8> {
        let mut block_info = Vec::new();
        block_info.extend_from_slice(&[0u8; 16]);
        block_info.extend_from_slice(&2i32.to_be_bytes());
        block_info.extend_from_slice(&(block0.len() as u32).to_be_bytes());
        block_info.extend_from_slice(&(block0.len() as u32).to_be_bytes());
        block_info.extend_from_slice(&0u16.to_be_bytes()); // none compression
        block_info.extend_from_slice(&(block1.len() as u32).to_be_bytes());
        block_info.extend_from_slice(&(block1.len() as u32).to_be_bytes());
        block_info.extend_from_slice(&0u16.to_be_bytes()); // none compression
        block_info.extend_from_slice(&1i32.to_be_bytes());
        block_info.extend_from_slice(&node_offset.to_be_bytes());
        block_info.extend_from_slice(&node_size.to_be_bytes());
        block_info.extend_from_slice(&0i32.to_be_bytes());
        block_info.extend_from_slice(b"CAB-test\0");

        let mut out = Vec::new();
        out.extend_from_slice(b"UnityFS\0");
        out.extend_from_slice(&6i32.to_be_bytes());
        out.extend_from_slice(b"5.x.x\0");
        out.extend_from_slice(b"2021.3.14f1\0");
        let compressed_info_size = block_info.len() as i32;
        out.extend_from_slice(&0i64.to_be_bytes()); // total size, unused by parser
        out.extend_from_slice(&compressed_info_size.to_be_bytes());
        out.extend_from_slice(&compressed_info_size.to_be_bytes());
        out.extend_from_slice(&0i32.to_be_bytes());
        out.extend_from_slice(&block_info);
        out.extend_from_slice(block0);
        out.extend_from_slice(block1);
        out
    }

    #[test]
    fn node_spanning_two_storage_blocks_materializes_exact_concatenation() {
        let block0 = b"AAAAAAAAAA"; // 10 bytes
        let block1 = b"BBBBBBBBBB"; // 10 bytes
        // Node starts 3 bytes before the block0/block1 boundary and runs 3 bytes into block1.
        let data = build_two_block_bundle(block0, block1, 7, 6);
        let bundle = Bundle::parse(&data).unwrap().unwrap();
        assert_eq!(bundle.nodes.len(), 1);
        let materialized = bundle.materialize(&bundle.nodes[0]).unwrap();
        assert_eq!(materialized, b"AAABBB");
    }

    #[test]
    fn non_unityfs_bundle_returns_none() {
        let mut data = Vec::new();
        data.extend_from_slice(b"UnityRaw\0");
        assert!(Bundle::parse(&data).unwrap().is_none());
    }
}
