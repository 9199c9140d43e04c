//! LRU index
//!
//! Orders resident keys by last-access tick.

use std::collections::BTreeMap;

use crate::bitarray::Timestamp;

/// Last-access tick → keys accessed at that tick
///
/// Several keys may share a tick, so removal by `(tick, key)` scans that
/// tick's group only.
#[derive(Debug, Default)]
pub struct LruIndex {
    by_tick: BTreeMap<Timestamp, Vec<String>>,
    len: usize,
}

impl LruIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, tick: Timestamp, key: String) {
        self.by_tick.entry(tick).or_default().push(key);
        self.len += 1;
    }

    /// Remove `key` from the group at `tick`, handing back the stored key
    pub fn remove(&mut self, tick: Timestamp, key: &str) -> Option<String> {
        let group = self.by_tick.get_mut(&tick)?;
        let pos = group.iter().position(|k| k == key)?;
        let removed = group.remove(pos);
        if group.is_empty() {
            self.by_tick.remove(&tick);
        }
        self.len -= 1;
        Some(removed)
    }

    /// Move `key` from `old_tick` to `new_tick`
    pub fn touch(&mut self, key: &str, old_tick: Timestamp, new_tick: Timestamp) {
        let key = self.remove(old_tick, key).unwrap_or_else(|| key.to_string());
        self.insert(new_tick, key);
    }

    /// Least recently used entry
    pub fn oldest(&self) -> Option<(Timestamp, &str)> {
        let (&tick, group) = self.by_tick.iter().next()?;
        group.first().map(|k| (tick, k.as_str()))
    }

    /// Remove and return the least recently used entry
    pub fn pop_oldest(&mut self) -> Option<(Timestamp, String)> {
        let mut first = self.by_tick.first_entry()?;
        let tick = *first.key();
        let group = first.get_mut();
        let key = group.remove(0);
        if group.is_empty() {
            first.remove();
        }
        self.len -= 1;
        Some((tick, key))
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
