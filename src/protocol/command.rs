//! Command definitions
//!
//! Represents commands from clients.

/// Command types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandType {
    GetBit = 0x01,
    SetBit = 0x02,
    SetBits = 0x03,
    Ping = 0x04,
    Shutdown = 0x05,
    Stats = 0x06,
}

/// A parsed command
///
/// Indices travel as signed 64-bit integers; the engine decides what a
/// negative index means.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Read one bit
    GetBit { key: String, index: i64 },

    /// Set one bit
    SetBit { key: String, index: i64 },

    /// Set many bits of one key
    SetBits { key: String, indices: Vec<i64> },

    /// Ping (health check)
    Ping,

    /// Write back all dirty arrays and stop the server
    Shutdown,

    /// Cache occupancy and counters
    Stats,
}

impl Command {
    /// Get the command type
    pub fn command_type(&self) -> CommandType {
        match self {
            Command::GetBit { .. } => CommandType::GetBit,
            Command::SetBit { .. } => CommandType::SetBit,
            Command::SetBits { .. } => CommandType::SetBits,
            Command::Ping => CommandType::Ping,
            Command::Shutdown => CommandType::Shutdown,
            Command::Stats => CommandType::Stats,
        }
    }
}
