//! Array file layout
//!
//! Encodes a SerializedForm into the bytes of one array file and back.

use bytes::{Buf, BufMut, BytesMut};

use crate::codec::{Compression, SerializedForm};
use crate::error::{BitboxError, Result};

use super::{CHECKSUM_SIZE, COMPRESSED_FLAG, CURRENT_VERSION, FILE_HEADER_SIZE};

/// Split a flags byte into (version, is_compressed)
fn parse_flags(flags: u8) -> Result<(u8, bool)> {
    let version = flags >> 4;
    let reserved = flags & 0x0e;

    if reserved != 0 || version > CURRENT_VERSION {
        return Err(BitboxError::UnsupportedFormat(flags));
    }
    Ok((version, flags & COMPRESSED_FLAG != 0))
}

/// Encode a frozen array in the current file format
///
/// LZF payloads only exist in version 0 files, so they are written back in
/// that layout (no checksum) rather than mislabelled as LZ4.
pub fn encode_file(frozen: &SerializedForm) -> Vec<u8> {
    if frozen.compression == Compression::Lzf {
        return encode_legacy(frozen);
    }

    let mut flags = CURRENT_VERSION << 4;
    if frozen.is_compressed() {
        flags |= COMPRESSED_FLAG;
    }

    let mut buf = BytesMut::with_capacity(FILE_HEADER_SIZE + frozen.payload.len() + CHECKSUM_SIZE);
    buf.put_u8(flags);
    buf.put_i64_le(frozen.uncompressed_size as i64);
    buf.put_slice(&frozen.payload);
    buf.put_u32_le(crc32fast::hash(&frozen.payload));
    buf.to_vec()
}

fn encode_legacy(frozen: &SerializedForm) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(FILE_HEADER_SIZE + frozen.payload.len());
    buf.put_u8(COMPRESSED_FLAG);
    buf.put_i64_le(frozen.uncompressed_size as i64);
    buf.put_slice(&frozen.payload);
    buf.to_vec()
}

/// Decode the contents of an array file
///
/// Version 0 files (no checksum, LZF when compressed) are read as written by
/// older releases.
pub fn decode_file(key: &str, contents: &[u8]) -> Result<SerializedForm> {
    if contents.len() < FILE_HEADER_SIZE {
        return Err(BitboxError::Corruption(format!(
            "{}: file is {} bytes, shorter than its {}-byte header",
            key,
            contents.len(),
            FILE_HEADER_SIZE
        )));
    }

    let mut header = &contents[..FILE_HEADER_SIZE];
    let flags = header.get_u8();
    let uncompressed_size = header.get_i64_le();
    let (version, is_compressed) = parse_flags(flags)?;

    if uncompressed_size < 0 {
        return Err(BitboxError::Corruption(format!(
            "{}: negative uncompressed size {}",
            key, uncompressed_size
        )));
    }

    let body = &contents[FILE_HEADER_SIZE..];
    let payload = match version {
        0 => body,
        _ => {
            if body.len() < CHECKSUM_SIZE {
                return Err(BitboxError::Corruption(format!(
                    "{}: file truncated before checksum",
                    key
                )));
            }
            let (payload, mut trailer) = body.split_at(body.len() - CHECKSUM_SIZE);
            let expected = trailer.get_u32_le();
            let actual = crc32fast::hash(payload);
            if expected != actual {
                return Err(BitboxError::Corruption(format!(
                    "{}: checksum mismatch (expected {:08x}, got {:08x})",
                    key, expected, actual
                )));
            }
            payload
        }
    };

    let compression = match (is_compressed, version) {
        (false, _) => Compression::None,
        (true, 0) => Compression::Lzf,
        (true, _) => Compression::Lz4,
    };

    Ok(SerializedForm {
        compression,
        uncompressed_size: uncompressed_size as u64,
        payload: payload.to_vec(),
    })
}
