//! Blocking client
//!
//! One TCP connection, one request at a time.

use std::io::{BufReader, BufWriter};
use std::net::{TcpStream, ToSocketAddrs};

use crate::cache::CacheStats;
use crate::error::{BitboxError, Result};
use crate::protocol::{read_response, write_command, Command, Response};

/// Client for a Bitbox server
pub struct Client {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl Client {
    /// Connect to a server
    pub fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        let stream = TcpStream::connect(addr)
            .map_err(|e| BitboxError::Network(format!("Failed to connect: {}", e)))?;
        stream.set_nodelay(true)?;

        Ok(Self {
            reader: BufReader::new(stream.try_clone()?),
            writer: BufWriter::new(stream),
        })
    }

    /// Send a command and wait for the raw response
    pub fn send(&mut self, command: &Command) -> Result<Response> {
        write_command(&mut self.writer, command)?;
        read_response(&mut self.reader)
    }

    pub fn get_bit(&mut self, key: &str, index: i64) -> Result<bool> {
        let response = self.request(Command::GetBit {
            key: key.to_string(),
            index,
        })?;
        response
            .as_bit()
            .ok_or_else(|| BitboxError::Protocol("GET_BIT response carried no bit".to_string()))
    }

    pub fn set_bit(&mut self, key: &str, index: i64) -> Result<()> {
        self.request(Command::SetBit {
            key: key.to_string(),
            index,
        })?;
        Ok(())
    }

    pub fn set_bits(&mut self, key: &str, indices: &[i64]) -> Result<()> {
        self.request(Command::SetBits {
            key: key.to_string(),
            indices: indices.to_vec(),
        })?;
        Ok(())
    }

    pub fn ping(&mut self) -> Result<()> {
        let response = self.request(Command::Ping)?;
        match response.payload.as_deref() {
            Some(b"PONG") => Ok(()),
            _ => Err(BitboxError::Protocol("unexpected PING reply".to_string())),
        }
    }

    pub fn stats(&mut self) -> Result<CacheStats> {
        let response = self.request(Command::Stats)?;
        let payload = response.payload.unwrap_or_default();
        bincode::deserialize(&payload).map_err(|e| BitboxError::Serialization(e.to_string()))
    }

    /// Ask the server to write back everything and stop
    pub fn shutdown(&mut self) -> Result<()> {
        self.request(Command::Shutdown)?;
        Ok(())
    }

    /// Send a command, turning ERROR responses into errors
    fn request(&mut self, command: Command) -> Result<Response> {
        let response = self.send(&command)?;
        match response.error_message() {
            Some(message) => Err(BitboxError::Network(format!("server error: {}", message))),
            None => Ok(response),
        }
    }
}
