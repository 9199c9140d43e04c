//! Bit Array Module
//!
//! Growable sparse bit vectors, one per key.
//!
//! ## Layout
//! ```text
//!   logical bytes:  0 ............ byte_offset ........ byte_offset+len ........ ∞
//!                   │  implicit 0  │      buffer[0..len]       │   implicit 0
//! ```
//!
//! ## Growth
//! - Empty array: the first `set_bit` allocates one byte at the target.
//! - Target above the window: grow up by max(needed, len).
//! - Target below the window: grow down by max(needed, len), clamped at byte 0.

mod array;
mod resize;

pub use array::{byte_index, SparseBitArray};
pub use resize::{plan_growth, Growth};

/// Logical access tick used for LRU ordering
pub type Timestamp = u64;
