//! # Bitbox
//!
//! A key-addressed sparse bit-set store with:
//! - One unbounded, sparsely populated bit vector per key
//! - LRU eviction of cold vectors to compressed files
//! - Incremental, host-driven write-back of modified vectors
//! - TCP-based client protocol
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                              │
//! │                  (Multiple Clients)                          │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                       Engine                                 │
//! │        (Mutex<Cache>, maintenance ticker)                    │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                        Cache                                 │
//! │        (arrays by key, LRU index, dirty set)                 │
//! └──────────┬──────────────────────────────────┬───────────────┘
//!            │                                  │
//!            ▼                                  ▼
//!   ┌────────────────┐   freeze / thaw   ┌─────────────┐
//!   │ SparseBitArray │ ◀───────────────▶ │   Codec     │
//!   └────────────────┘                   └──────┬──────┘
//!                                               │
//!                                               ▼
//!                                        ┌─────────────┐
//!                                        │  DiskStore  │
//!                                        │ (file/key)  │
//!                                        └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod bitarray;
pub mod codec;
pub mod storage;
pub mod cache;
pub mod network;
pub mod protocol;
pub mod engine;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use bitarray::SparseBitArray;
pub use cache::{Cache, CacheStats};
pub use config::Config;
pub use engine::Engine;
pub use error::{BitboxError, Result};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of Bitbox
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
