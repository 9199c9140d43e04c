//! Growth planning
//!
//! Pure arithmetic for widening an array's byte window so that it covers a
//! target byte. Kept apart from the buffer so the policy can be tested alone.

/// New window for a buffer that must grow to cover a target byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Growth {
    /// Length of the new buffer in bytes
    pub new_len: u64,

    /// Logical byte index of the new buffer's first byte
    pub new_offset: u64,

    /// Position of the old buffer's first byte inside the new buffer
    pub shift: u64,
}

impl Growth {
    /// Logical byte index one past the end of the new window
    pub fn end(&self) -> u64 {
        self.new_offset + self.new_len
    }
}

/// Plan the growth needed for the window `[offset, offset + len)` to reach
/// `target_byte`
///
/// Returns `None` when the target already lies inside the window.
///
/// Either direction grows by at least what is needed, and never by less than
/// doubling. Growing downward stops at byte 0: if doubling would push the
/// offset below zero, the new window starts at 0 and is exactly
/// `offset + len` bytes long.
///
/// # Panics
/// If `len` is zero (an empty array has no window to grow) or the window
/// arithmetic overflows.
pub fn plan_growth(len: u64, offset: u64, target_byte: u64) -> Option<Growth> {
    assert!(len > 0, "growth planned for an empty window");
    let end = offset
        .checked_add(len)
        .expect("array window end overflows u64");

    if target_byte >= end {
        let needed = target_byte - end + 1;
        let new_len = (len + needed).max(len.saturating_mul(2));
        return Some(Growth {
            new_len,
            new_offset: offset,
            shift: 0,
        });
    }

    if target_byte < offset {
        let needed = offset - target_byte;
        let new_len = (len + needed).max(len.saturating_mul(2));
        let grow_by = new_len - len;

        let (new_len, new_offset) = match offset.checked_sub(grow_by) {
            Some(new_offset) => (new_len, new_offset),
            // Went past byte 0: start the window at 0 instead of doubling further.
            None => (offset + len, 0),
        };

        return Some(Growth {
            new_len,
            new_offset,
            shift: offset - new_offset,
        });
    }

    None
}
