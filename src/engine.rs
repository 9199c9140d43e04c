//! Engine Module
//!
//! The request handler that sits between the network layer and the cache.
//!
//! ## Responsibilities
//! - Own the cache and serialize access to it
//! - Route protocol commands to cache operations
//! - Map signed wire indices onto the cache's unsigned ones
//! - Drive maintenance: one step after each write, plus a background ticker

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Sender};
use parking_lot::Mutex;

use crate::cache::{Cache, CacheStats};
use crate::config::Config;
use crate::error::{BitboxError, Result};
use crate::protocol::Command;

/// Upper bound on maintenance steps per ticker wake-up
const MAX_STEPS_PER_TICK: usize = 256;

/// The request handler
///
/// ## Concurrency Model
///
/// The cache is single-threaded. Every operation takes the cache mutex for
/// its whole find → mutate → evict sequence, so no key is touched by two
/// requests at once. Maintenance takes the lock one step at a time, letting
/// requests run in between.
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// The bit-set store
    cache: Mutex<Cache>,

    /// Set once a shutdown has been requested
    shutdown_requested: AtomicBool,
}

impl Engine {
    /// Open or create an engine with the given config
    pub fn open(config: Config) -> Result<Self> {
        let cache = Cache::open(&config)?;

        Ok(Self {
            config,
            cache: Mutex::new(cache),
            shutdown_requested: AtomicBool::new(false),
        })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path) -> Result<Self> {
        let config = Config::builder().data_dir(path).build();
        Self::open(config)
    }

    /// Execute a command
    ///
    /// Routes commands to appropriate handlers
    pub fn execute(&self, command: Command) -> Result<Option<Vec<u8>>> {
        match command {
            Command::GetBit { key, index } => {
                let bit = self.get_bit(&key, index)?;
                Ok(Some(vec![bit as u8]))
            }
            Command::SetBit { key, index } => {
                self.set_bit(&key, index)?;
                Ok(None)
            }
            Command::SetBits { key, indices } => {
                self.set_bits(&key, &indices)?;
                Ok(None)
            }
            Command::Ping => Ok(Some(b"PONG".to_vec())),
            Command::Shutdown => {
                self.shutdown()?;
                Ok(None)
            }
            Command::Stats => {
                let encoded = bincode::serialize(&self.stats())
                    .map_err(|e| BitboxError::Serialization(e.to_string()))?;
                Ok(Some(encoded))
            }
        }
    }

    /// Read a bit
    ///
    /// Negative indices are never set, so they read as false.
    pub fn get_bit(&self, key: &str, index: i64) -> Result<bool> {
        if index < 0 {
            return Ok(false);
        }
        self.cache.lock().get_bit(key, index as u64)
    }

    /// Set a bit
    ///
    /// The bit is in memory once this returns `Ok`. The write-back attempted
    /// afterwards only logs its failure; the array stays dirty and the error
    /// surfaces from `run_maintenance_step` or `shutdown`.
    pub fn set_bit(&self, key: &str, index: i64) -> Result<()> {
        let index = Self::check_index(index)?;

        let mut cache = self.cache.lock();
        cache.set_bit(key, index)?;
        Self::maintain_after_write(&mut cache);
        Ok(())
    }

    /// Set several bits of one key
    ///
    /// Rejects the whole request if any index is negative. Write-back
    /// failures are reported as for `set_bit`.
    pub fn set_bits(&self, key: &str, indices: &[i64]) -> Result<()> {
        let indices = indices
            .iter()
            .map(|&i| Self::check_index(i))
            .collect::<Result<Vec<u64>>>()?;

        let mut cache = self.cache.lock();
        cache.set_bits(key, indices)?;
        Self::maintain_after_write(&mut cache);
        Ok(())
    }

    /// Run one unit of maintenance; returns whether more work remains
    pub fn run_maintenance_step(&self) -> Result<bool> {
        self.cache.lock().run_maintenance_step()
    }

    /// Write back every dirty array and mark the engine as shutting down
    pub fn shutdown(&self) -> Result<()> {
        self.shutdown_requested.store(true, Ordering::SeqCst);
        tracing::info!("Shutdown requested, writing back dirty arrays");
        self.cache.lock().shutdown()
    }

    /// Whether a shutdown has been requested
    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_requested.load(Ordering::SeqCst)
    }

    /// Close the engine gracefully
    ///
    /// Writes back any dirty arrays
    pub fn close(self) -> Result<()> {
        self.cache.into_inner().shutdown()
    }

    /// Start the background maintenance ticker
    ///
    /// On each tick, runs maintenance steps until no work remains (or a
    /// per-tick cap is hit), taking the lock once per step.
    pub fn spawn_maintenance(self: &Arc<Self>) -> Result<MaintenanceHandle> {
        let interval = Duration::from_millis(self.config.maintenance_interval_ms);
        let ticker = channel::tick(interval);
        let (stop_tx, stop_rx) = channel::bounded::<()>(1);
        let engine = Arc::clone(self);

        let thread = thread::Builder::new()
            .name("bitbox-maintenance".to_string())
            .spawn(move || loop {
                crossbeam::select! {
                    recv(stop_rx) -> _ => break,
                    recv(ticker) -> _ => engine.drain_maintenance(),
                }
            })?;

        tracing::debug!("Maintenance ticker started ({:?} interval)", interval);
        Ok(MaintenanceHandle {
            stop: stop_tx,
            thread: Some(thread),
        })
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Current cache occupancy and counters
    pub fn stats(&self) -> CacheStats {
        self.cache.lock().stats()
    }

    /// Run a closure with exclusive access to the cache
    pub fn with_cache<R>(&self, f: impl FnOnce(&mut Cache) -> R) -> R {
        f(&mut self.cache.lock())
    }

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn check_index(index: i64) -> Result<u64> {
        u64::try_from(index)
            .map_err(|_| BitboxError::Protocol(format!("negative bit index {}", index)))
    }

    /// One maintenance step on the write path; failures are logged, the
    /// write itself already succeeded
    fn maintain_after_write(cache: &mut Cache) {
        if let Err(e) = cache.run_maintenance_step() {
            tracing::warn!("Maintenance after write failed: {}", e);
        }
    }

    fn drain_maintenance(&self) {
        for _ in 0..MAX_STEPS_PER_TICK {
            match self.run_maintenance_step() {
                Ok(true) => continue,
                Ok(false) => return,
                Err(e) => {
                    tracing::warn!("Maintenance step failed: {}", e);
                    return;
                }
            }
        }
    }
}

/// Stops the maintenance ticker when dropped
pub struct MaintenanceHandle {
    stop: Sender<()>,
    thread: Option<JoinHandle<()>>,
}

impl MaintenanceHandle {
    /// Stop the ticker and wait for its thread
    pub fn stop(mut self) {
        self.stop_and_join();
    }

    fn stop_and_join(&mut self) {
        if let Some(thread) = self.thread.take() {
            let _ = self.stop.try_send(());
            if thread.join().is_err() {
                tracing::error!("Maintenance thread panicked");
            }
        }
    }
}

impl Drop for MaintenanceHandle {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}
