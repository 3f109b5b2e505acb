//! Block compression codes used by bundle block-info and storage blocks.
//!
//! Only none/LZ4/LZ4HC are decoded; any other code is recognized and
//! politely declined rather than carried as dead-code support, since LZMA
//! and friends are out of scope.

use crate::error::{AnalyzerError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionType {
    None,
    Lz4,
    Lz4Hc,
    Unsupported(u32),
}

impl CompressionType {
    /// Low 6 bits of the bundle flags field, or a raw StorageBlock flags field.
    pub fn from_code(code: u32) -> Self {
        match code & 0x3F {
            0 => Self::None,
            2 => Self::Lz4,
            3 => Self::Lz4Hc,
            other => Self::Unsupported(other),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Lz4 => "lz4",
            Self::Lz4Hc => "lz4hc",
            Self::Unsupported(_) => "unsupported",
        }
    }
}

/// Decompresses `data` against a declared uncompressed size, accepting a
/// decoded length that is shorter or longer than declared (logged), and
/// retrying once with a larger buffer on failure.
pub fn decompress(data: &[u8], compression: CompressionType, uncompressed_size: usize) -> Result<Vec<u8>> {
    match compression {
        CompressionType::None => Ok(data.to_vec()),
        CompressionType::Lz4 | CompressionType::Lz4Hc => decompress_lz4(data, uncompressed_size),
        CompressionType::Unsupported(code) => {
            tracing::warn!(code, "unsupported block compression, skipping block");
            Err(AnalyzerError::unsupported_compression(format!(
                "compression code {code}"
            )))
        }
    }
}

fn decompress_lz4(data: &[u8], uncompressed_size: usize) -> Result<Vec<u8>> {
    match lz4_flex::block::decompress(data, uncompressed_size) {
        Ok(out) => Ok(finish(out, uncompressed_size)),
        Err(first_err) => {
            let padded = uncompressed_size + 128;
            match lz4_flex::block::decompress(data, padded) {
                Ok(out) if !out.is_empty() => Ok(finish(out, uncompressed_size)),
                _ => {
                    tracing::warn!(error = %first_err, "lz4 decode failed after retry");
                    Err(AnalyzerError::decode_failure(format!(
                        "lz4 decompression failed: {first_err}"
                    )))
                }
            }
        }
    }
}

fn finish(out: Vec<u8>, declared: usize) -> Vec<u8> {
    if out.len() != declared {
        tracing::debug!(declared, actual = out.len(), "lz4 output length differs from declared size");
    }
    out
}
