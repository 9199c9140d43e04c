//! Storage Module
//!
//! Persistent storage for frozen arrays, one file per key.
//!
//! ## File Format
//! ```text
//! ┌────────────────────────────────────────┐
//! │ Header                                 │
//! │ ┌──────────┬─────────────────────────┐ │
//! │ │Flags (1) │ Uncompressed size (8)   │ │
//! │ └──────────┴─────────────────────────┘ │
//! ├────────────────────────────────────────┤
//! │ Payload (frozen array, maybe LZ4)      │
//! ├────────────────────────────────────────┤
//! │ CRC32 of payload (4)   [version >= 1]  │
//! └────────────────────────────────────────┘
//! ```
//!
//! Flags: bit 0 = compressed, bits 4..7 = format version. Version 0 files
//! carry no checksum and are LZF-compressed when bit 0 is set; version 1
//! files use LZ4. Integers are little-endian.

mod disk;
mod file;

pub use disk::{encode_key, DiskStore};
pub use file::{decode_file, encode_file};

/// Flags byte + uncompressed size
pub const FILE_HEADER_SIZE: usize = 9;

/// CRC32 trailer
pub const CHECKSUM_SIZE: usize = 4;

/// Format version written by this release
pub const CURRENT_VERSION: u8 = 1;

/// Flags bit marking a compressed payload
pub const COMPRESSED_FLAG: u8 = 0x01;

/// Suffix of in-progress writes
pub const TEMP_SUFFIX: &str = ".tmp";

/// Longest file name derived from a key (longer keys are shortened with a digest)
pub const MAX_FILE_NAME_LEN: usize = 200;
