//! Eviction policies
//!
//! Decide when the cache is too big. The eviction mechanism itself (oldest
//! first, persist, drop) does not depend on which metric is used.

use serde::{Deserialize, Serialize};

use crate::config::EvictionLimits;

/// Snapshot of cache occupancy and activity counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Arrays currently in memory
    pub resident_arrays: usize,

    /// Summed window bytes of resident arrays
    pub resident_bytes: usize,

    /// Resident arrays whose file is stale
    pub dirty_arrays: usize,

    /// Arrays thawed from disk
    pub loads: u64,

    /// Arrays created empty
    pub creates: u64,

    /// Arrays dropped from memory
    pub evictions: u64,

    /// Dirty arrays written back without being evicted
    pub write_backs: u64,
}

/// Decides whether the cache should shed arrays
pub trait EvictionPolicy: Send + std::fmt::Debug {
    /// Over the soft limit: evict gradually during maintenance
    fn should_evict(&self, stats: &CacheStats) -> bool;

    /// Over the hard limit: evict before a write returns
    fn should_evict_hard(&self, stats: &CacheStats) -> bool;
}

/// Limit by number of resident arrays
#[derive(Debug, Clone, Copy)]
pub struct ItemCountPolicy {
    pub soft: usize,
    pub hard: usize,
}

impl EvictionPolicy for ItemCountPolicy {
    fn should_evict(&self, stats: &CacheStats) -> bool {
        stats.resident_arrays > self.soft
    }

    fn should_evict_hard(&self, stats: &CacheStats) -> bool {
        stats.resident_arrays > self.hard
    }
}

/// Limit by summed window bytes of resident arrays
#[derive(Debug, Clone, Copy)]
pub struct MemoryPolicy {
    pub soft_bytes: usize,
    pub hard_bytes: usize,
}

impl EvictionPolicy for MemoryPolicy {
    fn should_evict(&self, stats: &CacheStats) -> bool {
        stats.resident_bytes > self.soft_bytes
    }

    fn should_evict_hard(&self, stats: &CacheStats) -> bool {
        stats.resident_bytes > self.hard_bytes
    }
}

/// Build the policy described by a config
pub fn policy_for(limits: EvictionLimits) -> Box<dyn EvictionPolicy> {
    match limits {
        EvictionLimits::Items { soft, hard } => Box::new(ItemCountPolicy { soft, hard }),
        EvictionLimits::Bytes { soft, hard } => Box::new(MemoryPolicy {
            soft_bytes: soft,
            hard_bytes: hard,
        }),
    }
}
