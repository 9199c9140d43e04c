//! Cache implementation
//!
//! Resident arrays, their LRU order, and the set of arrays awaiting
//! write-back.

use std::collections::{HashMap, HashSet};

use crate::bitarray::{SparseBitArray, Timestamp};
use crate::codec;
use crate::config::Config;
use crate::error::Result;
use crate::storage::DiskStore;

use super::lru::LruIndex;
use super::policy::{policy_for, CacheStats, EvictionPolicy};

/// The bit-set store
///
/// ## Invariants
/// - Every resident key has exactly one LRU entry (`lru.len() == arrays.len()`)
/// - `dirty` only holds resident keys
/// - `resident_bytes` equals the summed window length of resident arrays
///
/// Not thread-safe on its own; the engine serializes access with a mutex.
#[derive(Debug)]
pub struct Cache {
    /// Where evicted and written-back arrays go
    store: DiskStore,

    /// Resident arrays by key
    arrays: HashMap<String, SparseBitArray>,

    /// Resident keys ordered by last access
    lru: LruIndex,

    /// Resident keys whose file is stale
    dirty: HashSet<String>,

    /// When to shed arrays
    policy: Box<dyn EvictionPolicy>,

    /// Logical clock, advanced on every access
    clock: Timestamp,

    resident_bytes: usize,
    loads: u64,
    creates: u64,
    evictions: u64,
    write_backs: u64,
}

impl Cache {
    /// Subdirectory of `data_dir` holding array files
    const ARRAY_DIR: &'static str = "arrays";

    /// Open a cache over the configured data directory
    pub fn open(config: &Config) -> Result<Self> {
        config.validate()?;
        Self::with_policy(config, policy_for(config.eviction))
    }

    /// Open a cache with a custom eviction policy
    pub fn with_policy(config: &Config, policy: Box<dyn EvictionPolicy>) -> Result<Self> {
        let store = DiskStore::open(&config.data_dir.join(Self::ARRAY_DIR))?;
        tracing::info!("Cache opened at {} ({:?})", store.dir().display(), policy);

        Ok(Self {
            store,
            arrays: HashMap::new(),
            lru: LruIndex::new(),
            dirty: HashSet::new(),
            policy,
            clock: 0,
            resident_bytes: 0,
            loads: 0,
            creates: 0,
            evictions: 0,
            write_backs: 0,
        })
    }

    // =========================================================================
    // Bit Operations
    // =========================================================================

    /// Read a bit
    ///
    /// Unknown keys read as all zeros; no array or file is created for them.
    pub fn get_bit(&mut self, key: &str, index: u64) -> Result<bool> {
        if !self.ensure_resident(key)? {
            return Ok(false);
        }

        let now = self.tick();
        let array = self.arrays.get_mut(key).expect("resident array missing from map");
        let old_tick = array.last_access();
        let bit = array.get_bit(index, now);
        self.lru.touch(key, old_tick, now);

        Ok(bit)
    }

    /// Set a bit, evicting past the hard limit before returning
    pub fn set_bit(&mut self, key: &str, index: u64) -> Result<()> {
        self.set_bits(key, std::iter::once(index))
    }

    /// Set several bits under one lookup
    ///
    /// Evicts past the hard limit once, after all bits are set. An empty
    /// `indices` is a no-op.
    pub fn set_bits<I>(&mut self, key: &str, indices: I) -> Result<()>
    where
        I: IntoIterator<Item = u64>,
    {
        let mut indices = indices.into_iter().peekable();
        if indices.peek().is_none() {
            return Ok(());
        }

        self.ensure_resident_or_create(key)?;

        let now = self.tick();
        let array = self.arrays.get_mut(key).expect("resident array missing from map");
        let old_tick = array.last_access();
        let old_len = array.len();
        for index in indices {
            array.set_bit(index, now);
        }
        let new_len = array.len();

        self.resident_bytes = self.resident_bytes - old_len + new_len;
        self.lru.touch(key, old_tick, now);
        if !self.dirty.contains(key) {
            self.dirty.insert(key.to_string());
        }

        self.evict_past_hard_limit()
    }

    // =========================================================================
    // Maintenance
    // =========================================================================

    /// One unit of background work
    ///
    /// Evicts at most one array (if over the soft limit) and writes back at
    /// most one dirty array. Returns whether more work remains.
    pub fn run_maintenance_step(&mut self) -> Result<bool> {
        if self.policy.should_evict(&self.stats()) {
            self.evict_oldest()?;
        }
        self.write_back_one()?;

        Ok(self.policy.should_evict(&self.stats()) || !self.dirty.is_empty())
    }

    /// Write back every dirty array
    ///
    /// Tries every key once; returns the first failure after attempting all.
    pub fn shutdown(&mut self) -> Result<()> {
        let pending: Vec<String> = self.dirty.iter().cloned().collect();
        let total = pending.len();
        let mut first_error = None;

        for key in pending {
            if let Err(e) = self.flush_key(&key) {
                tracing::warn!("Failed to write back {} during shutdown: {}", key, e);
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => {
                tracing::info!("Shutdown wrote back {} arrays", total);
                Ok(())
            }
        }
    }

    /// Persist one key if it is dirty; returns whether a write happened
    pub fn flush_key(&mut self, key: &str) -> Result<bool> {
        if !self.dirty.contains(key) {
            return Ok(false);
        }

        let array = self.arrays.get(key).expect("dirty key not resident");
        self.store.save(key, &codec::freeze(array))?;
        self.dirty.remove(key);
        self.write_backs += 1;

        tracing::debug!("Wrote back {} ({} dirty left)", key, self.dirty.len());
        Ok(true)
    }

    /// Drop the least recently used array from memory, persisting it first
    ///
    /// Returns the evicted key, or `None` if nothing is resident. If the
    /// write fails the array stays resident and the error is returned.
    pub fn evict_oldest(&mut self) -> Result<Option<String>> {
        debug_assert_eq!(self.lru.len(), self.arrays.len());

        let Some((tick, key)) = self.lru.pop_oldest() else {
            return Ok(None);
        };
        let array = self.arrays.remove(&key).expect("LRU key not resident");

        // Clean arrays already match their file.
        if self.dirty.contains(&key) {
            if let Err(e) = self.store.save(&key, &codec::freeze(&array)) {
                self.lru.insert(tick, key.clone());
                self.arrays.insert(key, array);
                return Err(e);
            }
            self.dirty.remove(&key);
        }

        self.resident_bytes -= array.len();
        self.evictions += 1;

        tracing::debug!(
            "Evicted {} ({} bytes, {} arrays resident)",
            key,
            array.len(),
            self.arrays.len()
        );
        Ok(Some(key))
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Current occupancy and counters
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            resident_arrays: self.arrays.len(),
            resident_bytes: self.resident_bytes,
            dirty_arrays: self.dirty.len(),
            loads: self.loads,
            creates: self.creates,
            evictions: self.evictions,
            write_backs: self.write_backs,
        }
    }

    /// Look at a resident array without recording an access
    pub fn peek(&self, key: &str) -> Option<&SparseBitArray> {
        self.arrays.get(key)
    }

    pub fn is_resident(&self, key: &str) -> bool {
        self.arrays.contains_key(key)
    }

    pub fn is_dirty(&self, key: &str) -> bool {
        self.dirty.contains(key)
    }

    pub fn resident_count(&self) -> usize {
        self.arrays.len()
    }

    pub fn dirty_count(&self) -> usize {
        self.dirty.len()
    }

    /// Key that would be evicted next
    pub fn oldest_key(&self) -> Option<&str> {
        self.lru.oldest().map(|(_, key)| key)
    }

    /// Get the underlying disk store
    pub fn store(&self) -> &DiskStore {
        &self.store
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn tick(&mut self) -> Timestamp {
        self.clock += 1;
        self.clock
    }

    /// Bring `key` into memory if it exists anywhere
    ///
    /// Returns false when the key is neither resident nor on disk.
    fn ensure_resident(&mut self, key: &str) -> Result<bool> {
        if self.arrays.contains_key(key) {
            return Ok(true);
        }

        let Some(frozen) = self.store.load(key)? else {
            return Ok(false);
        };

        let now = self.tick();
        let array = codec::thaw(key, &frozen, now)?;
        tracing::debug!("Loaded {} from disk ({} bytes)", key, array.len());
        self.loads += 1;
        self.admit(array);
        Ok(true)
    }

    /// Bring `key` into memory, creating an empty array if it exists nowhere
    fn ensure_resident_or_create(&mut self, key: &str) -> Result<()> {
        if !self.ensure_resident(key)? {
            let now = self.tick();
            self.creates += 1;
            self.admit(SparseBitArray::new(key, now));
        }
        Ok(())
    }

    fn admit(&mut self, array: SparseBitArray) {
        let key = array.key().to_string();
        self.resident_bytes += array.len();
        self.lru.insert(array.last_access(), key.clone());
        self.arrays.insert(key, array);
    }

    fn evict_past_hard_limit(&mut self) -> Result<()> {
        while !self.lru.is_empty() && self.policy.should_evict_hard(&self.stats()) {
            self.evict_oldest()?;
        }
        Ok(())
    }

    fn write_back_one(&mut self) -> Result<bool> {
        let Some(key) = self.dirty.iter().next().cloned() else {
            return Ok(false);
        };
        self.flush_key(&key)
    }
}
