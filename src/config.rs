//! Configuration for Bitbox
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{BitboxError, Result};

/// Main configuration for a Bitbox instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all data files
    /// Internal structure:
    ///   {data_dir}/
    ///     └── arrays/          (one frozen array per key)
    pub data_dir: PathBuf,

    // -------------------------------------------------------------------------
    // Cache Configuration
    // -------------------------------------------------------------------------
    /// Soft/hard eviction thresholds and the metric they apply to
    pub eviction: EvictionLimits,

    /// How often the background maintenance ticker fires (milliseconds)
    pub maintenance_interval_ms: u64,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Max concurrent client connections
    pub max_connections: usize,

    /// Connection read timeout (milliseconds, 0 = none)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds, 0 = none)
    pub write_timeout_ms: u64,
}

/// Eviction thresholds
///
/// Crossing `soft` lets the maintenance step evict one array at a time.
/// Crossing `hard` makes `set_bit`/`set_bits` evict before returning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionLimits {
    /// Limit the number of resident arrays
    Items { soft: usize, hard: usize },

    /// Limit the summed buffer bytes of resident arrays
    Bytes { soft: usize, hard: usize },
}

impl EvictionLimits {
    fn soft(&self) -> usize {
        match *self {
            EvictionLimits::Items { soft, .. } | EvictionLimits::Bytes { soft, .. } => soft,
        }
    }

    fn hard(&self) -> usize {
        match *self {
            EvictionLimits::Items { hard, .. } | EvictionLimits::Bytes { hard, .. } => hard,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./bitbox_data"),
            eviction: EvictionLimits::Items {
                soft: 10_000,
                hard: 12_000,
            },
            maintenance_interval_ms: 50,
            listen_addr: "127.0.0.1:9090".to_string(),
            max_connections: 1024,
            read_timeout_ms: 0,
            write_timeout_ms: 5000,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check that the limits make sense together
    pub fn validate(&self) -> Result<()> {
        let (soft, hard) = (self.eviction.soft(), self.eviction.hard());
        if soft == 0 || hard == 0 {
            return Err(BitboxError::Config(
                "eviction limits must be non-zero".to_string(),
            ));
        }
        if soft > hard {
            return Err(BitboxError::Config(format!(
                "soft limit {} exceeds hard limit {}",
                soft, hard
            )));
        }
        if self.maintenance_interval_ms == 0 {
            return Err(BitboxError::Config(
                "maintenance_interval_ms must be non-zero".to_string(),
            ));
        }
        if self.max_connections == 0 {
            return Err(BitboxError::Config(
                "max_connections must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all storage)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Limit resident arrays by count
    pub fn item_limits(mut self, soft: usize, hard: usize) -> Self {
        self.config.eviction = EvictionLimits::Items { soft, hard };
        self
    }

    /// Limit resident arrays by summed buffer size (in bytes)
    pub fn byte_limits(mut self, soft: usize, hard: usize) -> Self {
        self.config.eviction = EvictionLimits::Bytes { soft, hard };
        self
    }

    /// Set the maintenance tick interval (in milliseconds)
    pub fn maintenance_interval_ms(mut self, ms: u64) -> Self {
        self.config.maintenance_interval_ms = ms;
        self
    }

    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the maximum number of concurrent connections
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
