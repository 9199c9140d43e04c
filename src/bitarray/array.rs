//! SparseBitArray implementation
//!
//! A byte window over an unbounded bit space. Bits outside the window read as
//! zero; setting one grows the window in place.

use super::resize::plan_growth;
use super::Timestamp;

/// Byte holding bit `index`
#[inline]
pub fn byte_index(index: u64) -> u64 {
    index / 8
}

#[inline]
fn mask(index: u64) -> u8 {
    1 << (index % 8)
}

/// One key's bit vector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SparseBitArray {
    /// Key this array belongs to (never changes)
    key: String,

    /// Window bytes; empty (and unallocated) until the first bit is set
    buffer: Vec<u8>,

    /// Logical byte index of `buffer[0]`
    byte_offset: u64,

    /// Tick of the last get/set, used only for LRU ordering
    last_access: Timestamp,
}

impl SparseBitArray {
    /// Create an empty array
    pub fn new(key: impl Into<String>, now: Timestamp) -> Self {
        Self {
            key: key.into(),
            buffer: Vec::new(),
            byte_offset: 0,
            last_access: now,
        }
    }

    /// Rebuild an array from a window recovered by the codec
    ///
    /// An empty buffer always gets offset 0.
    pub fn from_parts(
        key: impl Into<String>,
        buffer: Vec<u8>,
        byte_offset: u64,
        now: Timestamp,
    ) -> Self {
        let byte_offset = if buffer.is_empty() { 0 } else { byte_offset };
        Self {
            key: key.into(),
            buffer,
            byte_offset,
            last_access: now,
        }
    }

    /// Read a bit, recording the access
    pub fn get_bit(&mut self, index: u64, now: Timestamp) -> bool {
        self.last_access = now;
        self.peek_bit(index)
    }

    /// Read a bit without touching `last_access`
    pub fn peek_bit(&self, index: u64) -> bool {
        match self.slot(byte_index(index)) {
            Some(pos) => self.buffer[pos] & mask(index) != 0,
            None => false,
        }
    }

    /// Set a bit, growing the window if needed
    pub fn set_bit(&mut self, index: u64, now: Timestamp) {
        self.last_access = now;
        let target = byte_index(index);

        if self.buffer.is_empty() {
            self.buffer = vec![0u8; 1];
            self.byte_offset = target;
        } else {
            self.grow_to_reach(target);
        }

        let pos = self
            .slot(target)
            .unwrap_or_else(|| panic!("byte {} outside window after growth", target));
        self.buffer[pos] |= mask(index);
    }

    /// Buffer position of a logical byte, if inside the window
    fn slot(&self, byte: u64) -> Option<usize> {
        if byte < self.byte_offset {
            return None;
        }
        let pos = usize::try_from(byte - self.byte_offset).ok()?;
        (pos < self.buffer.len()).then_some(pos)
    }

    fn grow_to_reach(&mut self, target_byte: u64) {
        let Some(growth) = plan_growth(self.buffer.len() as u64, self.byte_offset, target_byte)
        else {
            return;
        };

        let new_len = to_usize(growth.new_len);
        if growth.shift == 0 {
            self.buffer.resize(new_len, 0);
        } else {
            let shift = to_usize(growth.shift);
            let mut grown = vec![0u8; new_len];
            grown[shift..shift + self.buffer.len()].copy_from_slice(&self.buffer);
            self.buffer = grown;
        }
        self.byte_offset = growth.new_offset;

        debug_assert!(self.slot(target_byte).is_some());
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Window length in bytes
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// True until the first bit is set
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn byte_offset(&self) -> u64 {
        self.byte_offset
    }

    pub fn last_access(&self) -> Timestamp {
        self.last_access
    }

    /// Raw window bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Number of set bits
    pub fn count_ones(&self) -> u64 {
        self.buffer.iter().map(|b| b.count_ones() as u64).sum()
    }

    /// Indices of all set bits, ascending
    pub fn iter_ones(&self) -> impl Iterator<Item = u64> + '_ {
        let base = self.byte_offset * 8;
        self.buffer.iter().enumerate().flat_map(move |(pos, &byte)| {
            (0..8u64)
                .filter(move |&bit| byte & (1u8 << bit) != 0)
                .map(move |bit| base + pos as u64 * 8 + bit)
        })
    }
}

fn to_usize(n: u64) -> usize {
    usize::try_from(n).unwrap_or_else(|_| panic!("array window of {} bytes exceeds address space", n))
}
