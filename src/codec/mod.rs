//! Codec Module
//!
//! Freezes a SparseBitArray into a compact byte buffer and thaws it back.
//!
//! ## Raw Form
//! ```text
//! ┌──────────────┬──────────────┬──────────────────────────┐
//! │ Len (8, i64) │ Off (8, i64) │   Window bytes (Len)     │
//! └──────────────┴──────────────┴──────────────────────────┘
//! ```
//! Integers are little-endian. The raw form is LZ4 block-compressed when
//! that shrinks it; otherwise it is kept verbatim. LZF payloads from version 0
//! files are thawed but never produced.

mod frozen;

pub use frozen::{freeze, freeze_uncompressed, thaw, Compression, SerializedForm};

/// Raw form header: window length + byte offset
pub const HEADER_SIZE: usize = 16;
