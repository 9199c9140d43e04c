//! Cache Module
//!
//! Keeps recently used arrays in memory and spills the rest to disk.
//!
//! ## Responsibilities
//! - Resolve keys: memory → disk → new empty array
//! - Order resident arrays by last access (LRU)
//! - Track arrays whose file is stale (dirty set)
//! - Evict oldest-first past a soft limit (gradually) or hard limit (at once)
//!
//! ## Write Path
//! ```text
//!   set_bit(key, i)
//!     │
//!     ├─▶ find or create ──▶ memory? ──▶ disk (thaw)? ──▶ new empty
//!     ├─▶ array.set_bit(i)            (may grow the window)
//!     ├─▶ LRU: move key to newest
//!     ├─▶ mark dirty
//!     └─▶ while over hard limit: evict oldest (freeze + save + drop)
//! ```
//!
//! Maintenance (`run_maintenance_step`) does one soft-limit eviction and one
//! dirty write-back per call, so the host can interleave it with requests.

mod lru;
mod policy;
mod store;

pub use lru::LruIndex;
pub use policy::{policy_for, CacheStats, EvictionPolicy, ItemCountPolicy, MemoryPolicy};
pub use store::Cache;
