//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! ## Wire Format
//!
//! ### Request (Command) Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Cmd (1)  │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Payload by Command Type
//! - GET_BIT:  key_len (4) + key + index (8)
//! - SET_BIT:  key_len (4) + key + index (8)
//! - SET_BITS: key_len (4) + key + count (4) + index (8) × count
//! - PING, SHUTDOWN, STATS: empty
//!
//! ### Response Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │Status(1) │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! All integers are big-endian.

use std::io::{Read, Write};

use crate::error::{BitboxError, Result};

use super::{Command, Response, Status};

/// Header size: 1 byte command/status + 4 bytes length
pub const HEADER_SIZE: usize = 5;

/// Maximum payload size (16 MB)
pub const MAX_PAYLOAD_SIZE: u32 = 16 * 1024 * 1024;

/// Size of one encoded bit index
const INDEX_SIZE: usize = 8;

// =============================================================================
// Command Encoding/Decoding
// =============================================================================

/// Encode a command to bytes
///
/// Format: cmd_type (1) + payload_len (4) + payload
pub fn encode_command(command: &Command) -> Vec<u8> {
    let cmd_type = command.command_type() as u8;

    // Build payload based on command type
    let payload = match command {
        Command::GetBit { key, index } | Command::SetBit { key, index } => {
            let mut payload = Vec::with_capacity(4 + key.len() + INDEX_SIZE);
            put_key(&mut payload, key);
            payload.extend_from_slice(&index.to_be_bytes());
            payload
        }
        Command::SetBits { key, indices } => {
            let mut payload = Vec::with_capacity(4 + key.len() + 4 + indices.len() * INDEX_SIZE);
            put_key(&mut payload, key);
            payload.extend_from_slice(&(indices.len() as u32).to_be_bytes());
            for index in indices {
                payload.extend_from_slice(&index.to_be_bytes());
            }
            payload
        }
        Command::Ping | Command::Shutdown | Command::Stats => Vec::new(),
    };

    frame(cmd_type, &payload)
}

/// Decode a command from bytes
pub fn decode_command(bytes: &[u8]) -> Result<Command> {
    let (cmd_type, payload) = unframe(bytes, "command")?;

    // Parse command based on type
    match cmd_type {
        0x01 => {
            let (key, index) = decode_key_and_index("GET_BIT", payload)?;
            Ok(Command::GetBit { key, index })
        }
        0x02 => {
            let (key, index) = decode_key_and_index("SET_BIT", payload)?;
            Ok(Command::SetBit { key, index })
        }
        0x03 => decode_set_bits_command(payload),
        0x04 => decode_empty_command("PING", payload, Command::Ping),
        0x05 => decode_empty_command("SHUTDOWN", payload, Command::Shutdown),
        0x06 => decode_empty_command("STATS", payload, Command::Stats),
        _ => Err(BitboxError::Protocol(format!(
            "Unknown command type: 0x{:02x}",
            cmd_type
        ))),
    }
}

/// Decode GET_BIT / SET_BIT payload: key followed by exactly one index
fn decode_key_and_index(name: &str, payload: &[u8]) -> Result<(String, i64)> {
    let (key, rest) = take_key(name, payload)?;

    if rest.len() != INDEX_SIZE {
        return Err(BitboxError::Protocol(format!(
            "{} command: expected {}-byte index, got {} bytes",
            name,
            INDEX_SIZE,
            rest.len()
        )));
    }

    Ok((key, read_i64(rest)))
}

/// Decode SET_BITS command payload
fn decode_set_bits_command(payload: &[u8]) -> Result<Command> {
    let (key, rest) = take_key("SET_BITS", payload)?;

    if rest.len() < 4 {
        return Err(BitboxError::Protocol(
            "SET_BITS command: missing index count".to_string(),
        ));
    }

    let count = u32::from_be_bytes([rest[0], rest[1], rest[2], rest[3]]) as usize;
    let body = &rest[4..];

    if body.len() != count * INDEX_SIZE {
        return Err(BitboxError::Protocol(format!(
            "SET_BITS command: {} indices need {} bytes, got {}",
            count,
            count * INDEX_SIZE,
            body.len()
        )));
    }

    let indices = body.chunks_exact(INDEX_SIZE).map(read_i64).collect();
    Ok(Command::SetBits { key, indices })
}

/// Decode a command that carries no payload
fn decode_empty_command(name: &str, payload: &[u8], command: Command) -> Result<Command> {
    if !payload.is_empty() {
        return Err(BitboxError::Protocol(format!(
            "{} command: unexpected payload of {} bytes",
            name,
            payload.len()
        )));
    }
    Ok(command)
}

fn put_key(payload: &mut Vec<u8>, key: &str) {
    payload.extend_from_slice(&(key.len() as u32).to_be_bytes());
    payload.extend_from_slice(key.as_bytes());
}

/// Split a length-prefixed UTF-8 key off the front of a payload
fn take_key<'a>(name: &str, payload: &'a [u8]) -> Result<(String, &'a [u8])> {
    if payload.len() < 4 {
        return Err(BitboxError::Protocol(format!(
            "{} command: missing key length",
            name
        )));
    }

    let key_len = u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]) as usize;

    if payload.len() < 4 + key_len {
        return Err(BitboxError::Protocol(format!(
            "{} command: incomplete key (expected {}, got {})",
            name,
            key_len,
            payload.len() - 4
        )));
    }

    let key = std::str::from_utf8(&payload[4..4 + key_len])
        .map_err(|e| BitboxError::Protocol(format!("{} command: key is not UTF-8: {}", name, e)))?
        .to_string();

    Ok((key, &payload[4 + key_len..]))
}

fn read_i64(bytes: &[u8]) -> i64 {
    let mut raw = [0u8; INDEX_SIZE];
    raw.copy_from_slice(&bytes[..INDEX_SIZE]);
    i64::from_be_bytes(raw)
}

// =============================================================================
// Response Encoding/Decoding
// =============================================================================

/// Encode a response to bytes
///
/// Format: status (1) + payload_len (4) + payload
pub fn encode_response(response: &Response) -> Vec<u8> {
    let payload = response.payload.as_deref().unwrap_or(&[]);
    frame(response.status as u8, payload)
}

/// Decode a response from bytes
pub fn decode_response(bytes: &[u8]) -> Result<Response> {
    let (status_byte, payload) = unframe(bytes, "response")?;

    // Parse status
    let status = match status_byte {
        0x00 => Status::Ok,
        0x01 => Status::Error,
        _ => {
            return Err(BitboxError::Protocol(format!(
                "Unknown response status: 0x{:02x}",
                status_byte
            )))
        }
    };

    // Extract payload
    let payload = if payload.is_empty() {
        None
    } else {
        Some(payload.to_vec())
    };

    Ok(Response { status, payload })
}

// =============================================================================
// Framing
// =============================================================================

fn frame(kind: u8, payload: &[u8]) -> Vec<u8> {
    let mut message = Vec::with_capacity(HEADER_SIZE + payload.len());
    message.push(kind);
    message.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    message.extend_from_slice(payload);
    message
}

/// Validate a frame and split it into (kind byte, payload)
fn unframe<'a>(bytes: &'a [u8], what: &str) -> Result<(u8, &'a [u8])> {
    if bytes.len() < HEADER_SIZE {
        return Err(BitboxError::Protocol(format!(
            "Incomplete {} header: expected {} bytes, got {}",
            what,
            HEADER_SIZE,
            bytes.len()
        )));
    }

    let payload_len = u32::from_be_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]);
    check_payload_len(payload_len)?;

    let total_len = HEADER_SIZE + payload_len as usize;
    if bytes.len() < total_len {
        return Err(BitboxError::Protocol(format!(
            "Incomplete {} payload: expected {} bytes, got {}",
            what,
            total_len,
            bytes.len()
        )));
    }

    Ok((bytes[0], &bytes[HEADER_SIZE..total_len]))
}

fn check_payload_len(payload_len: u32) -> Result<()> {
    if payload_len > MAX_PAYLOAD_SIZE {
        return Err(BitboxError::Protocol(format!(
            "Payload too large: {} bytes (max {})",
            payload_len, MAX_PAYLOAD_SIZE
        )));
    }
    Ok(())
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read one complete frame (header + payload) from a stream
fn read_frame<R: Read>(reader: &mut R) -> Result<Vec<u8>> {
    // Read header first
    let mut header = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header)?;

    let payload_len = u32::from_be_bytes([header[1], header[2], header[3], header[4]]);
    check_payload_len(payload_len)?;

    let mut message = vec![0u8; HEADER_SIZE + payload_len as usize];
    message[..HEADER_SIZE].copy_from_slice(&header);
    reader.read_exact(&mut message[HEADER_SIZE..])?;

    Ok(message)
}

/// Read a complete command from a stream
///
/// Blocks until a complete command is received or an error occurs
pub fn read_command<R: Read>(reader: &mut R) -> Result<Command> {
    decode_command(&read_frame(reader)?)
}

/// Write a command to a stream
pub fn write_command<W: Write>(writer: &mut W, command: &Command) -> Result<()> {
    let bytes = encode_command(command);
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

/// Read a complete response from a stream
pub fn read_response<R: Read>(reader: &mut R) -> Result<Response> {
    decode_response(&read_frame(reader)?)
}

/// Write a response to a stream
pub fn write_response<W: Write>(writer: &mut W, response: &Response) -> Result<()> {
    let bytes = encode_response(response);
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}
