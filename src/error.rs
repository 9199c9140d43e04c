//! Error types for Bitbox
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using BitboxError
pub type Result<T> = std::result::Result<T, BitboxError>;

/// Unified error type for Bitbox operations
#[derive(Debug, Error)]
pub enum BitboxError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Storage Errors
    // -------------------------------------------------------------------------
    #[error("Corrupt array data: {0}")]
    Corruption(String),

    #[error("Unsupported on-disk format (flags byte 0x{0:02x})")]
    UnsupportedFormat(u8),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Network error: {0}")]
    Network(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}
