//! Freeze / thaw
//!
//! Converts a SparseBitArray to and from its flat, optionally compressed form.

use bytes::{Buf, BufMut, BytesMut};

use crate::bitarray::{SparseBitArray, Timestamp};
use crate::error::{BitboxError, Result};

use super::HEADER_SIZE;

/// Upper bound on how many times smaller compressed output can be than its input
const MAX_COMPRESSION_RATIO: u64 = 256;

/// How a frozen payload is compressed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    /// Raw form stored verbatim
    None,

    /// LZ4 block format, written by this release
    Lz4,

    /// LZF, found only in version 0 files
    Lzf,
}

/// A frozen array, ready to be written to disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializedForm {
    /// Codec applied to `payload`
    pub compression: Compression,

    /// Length of the raw (header + window) form
    pub uncompressed_size: u64,

    /// Compressed bytes, or the raw form verbatim
    pub payload: Vec<u8>,
}

impl SerializedForm {
    /// Whether `payload` needs decompressing before it can be parsed
    pub fn is_compressed(&self) -> bool {
        self.compression != Compression::None
    }
}

/// Freeze an array, compressing when that makes it strictly smaller
pub fn freeze(array: &SparseBitArray) -> SerializedForm {
    let raw = raw_form(array);
    let compressed = lz4_flex::block::compress(&raw);

    if compressed.len() < raw.len() {
        SerializedForm {
            compression: Compression::Lz4,
            uncompressed_size: raw.len() as u64,
            payload: compressed,
        }
    } else {
        // Tiny windows usually expand under compression.
        SerializedForm {
            compression: Compression::None,
            uncompressed_size: raw.len() as u64,
            payload: raw,
        }
    }
}

/// Freeze an array without attempting compression
pub fn freeze_uncompressed(array: &SparseBitArray) -> SerializedForm {
    let raw = raw_form(array);
    SerializedForm {
        compression: Compression::None,
        uncompressed_size: raw.len() as u64,
        payload: raw,
    }
}

/// Thaw a frozen array back into memory under `key`
///
/// The thawed array is stamped with `now` as its last access.
pub fn thaw(key: &str, frozen: &SerializedForm, now: Timestamp) -> Result<SparseBitArray> {
    let decompressed;
    let raw: &[u8] = match frozen.compression {
        Compression::None => {
            if frozen.payload.len() as u64 != frozen.uncompressed_size {
                return Err(BitboxError::Corruption(format!(
                    "{}: raw payload is {} bytes, header says {}",
                    key,
                    frozen.payload.len(),
                    frozen.uncompressed_size
                )));
            }
            &frozen.payload
        }
        compression => {
            check_declared_size(key, frozen)?;
            let size = frozen.uncompressed_size as usize;

            decompressed = match compression {
                Compression::Lzf => lzf::decompress(&frozen.payload, size).map_err(|e| {
                    BitboxError::Corruption(format!("{}: LZF decompression failed: {:?}", key, e))
                })?,
                _ => lz4_flex::block::decompress(&frozen.payload, size).map_err(|e| {
                    BitboxError::Corruption(format!("{}: decompression failed: {}", key, e))
                })?,
            };

            if decompressed.len() as u64 != frozen.uncompressed_size {
                return Err(BitboxError::Corruption(format!(
                    "{}: decompressed {} bytes, expected {}",
                    key,
                    decompressed.len(),
                    frozen.uncompressed_size
                )));
            }
            &decompressed
        }
    };

    parse_raw(key, raw, now)
}

/// Refuse declared sizes no compressor could produce from this payload
fn check_declared_size(key: &str, frozen: &SerializedForm) -> Result<()> {
    let max_size = (frozen.payload.len() as u64).saturating_mul(MAX_COMPRESSION_RATIO);
    if frozen.uncompressed_size > max_size.saturating_add(HEADER_SIZE as u64) {
        return Err(BitboxError::Corruption(format!(
            "{}: declared size {} impossible for {} compressed bytes",
            key,
            frozen.uncompressed_size,
            frozen.payload.len()
        )));
    }
    Ok(())
}

/// Build `len (i64) | offset (i64) | window bytes`
fn raw_form(array: &SparseBitArray) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(HEADER_SIZE + array.len());
    buf.put_i64_le(array.len() as i64);
    buf.put_i64_le(array.byte_offset() as i64);
    buf.put_slice(array.as_bytes());
    buf.to_vec()
}

fn parse_raw(key: &str, raw: &[u8], now: Timestamp) -> Result<SparseBitArray> {
    if raw.len() < HEADER_SIZE {
        return Err(BitboxError::Corruption(format!(
            "{}: frozen form is {} bytes, shorter than its {}-byte header",
            key,
            raw.len(),
            HEADER_SIZE
        )));
    }

    let mut header = &raw[..HEADER_SIZE];
    let len = header.get_i64_le();
    let offset = header.get_i64_le();
    let body = &raw[HEADER_SIZE..];

    if len < 0 || offset < 0 {
        return Err(BitboxError::Corruption(format!(
            "{}: negative window (len {}, offset {})",
            key, len, offset
        )));
    }
    if len as u64 != body.len() as u64 {
        return Err(BitboxError::Corruption(format!(
            "{}: header declares {} window bytes, found {}",
            key,
            len,
            body.len()
        )));
    }

    let buffer = if body.is_empty() { Vec::new() } else { body.to_vec() };
    Ok(SparseBitArray::from_parts(key, buffer, offset as u64, now))
}
