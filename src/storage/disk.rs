//! Disk Store
//!
//! One file per key under `{data_dir}/arrays/`.
//!
//! ## Responsibilities
//! - Map keys to file names deterministically
//! - Replace a key's file atomically (temp file + fsync + rename)
//! - Report "never written" as absence, not as an error
//! - Clear temp files left behind by a crash

use std::fmt::Write as _;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::codec::SerializedForm;
use crate::error::{BitboxError, Result};

use super::file::{decode_file, encode_file};
use super::{MAX_FILE_NAME_LEN, TEMP_SUFFIX};

/// Hex length of a SHA-256 digest
const DIGEST_HEX_LEN: usize = 64;

/// Marks a name shortened with a digest; never produced by the plain encoding
const LONG_NAME_SEPARATOR: char = '~';

/// Encode a key as a file name
///
/// ASCII letters, digits, `-` and `_` are kept; every other byte becomes
/// `%XX`. Names that would exceed `MAX_FILE_NAME_LEN` keep a prefix of the
/// encoding followed by `~` and the SHA-256 of the full key, so every key
/// gets a bounded, deterministic name. Encoded names never contain `.`, so
/// no key can collide with a temp file, and `~` only appears in long names.
pub fn encode_key(key: &str) -> Result<String> {
    if key.is_empty() {
        return Err(BitboxError::InvalidKey("key is empty".to_string()));
    }

    let mut name = String::with_capacity(key.len());
    for &b in key.as_bytes() {
        if b.is_ascii_alphanumeric() || b == b'-' || b == b'_' {
            name.push(b as char);
        } else {
            let _ = write!(name, "%{:02X}", b);
        }
    }

    if name.len() > MAX_FILE_NAME_LEN {
        // The encoding is pure ASCII, so any byte position is a char boundary.
        name.truncate(MAX_FILE_NAME_LEN - DIGEST_HEX_LEN - 1);
        name.push(LONG_NAME_SEPARATOR);
        for b in Sha256::digest(key.as_bytes()) {
            let _ = write!(name, "{:02x}", b);
        }
    }
    Ok(name)
}

/// Persistent store for frozen arrays
#[derive(Debug)]
pub struct DiskStore {
    /// Directory holding one file per key
    dir: PathBuf,
}

impl DiskStore {
    /// Open or create the store in the given directory
    ///
    /// Removes `*.tmp` files left by an interrupted save.
    pub fn open(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)?;

        let mut stale = 0usize;
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            let is_temp = path
                .file_name()
                .map(|n| n.to_string_lossy().ends_with(TEMP_SUFFIX))
                .unwrap_or(false);
            if is_temp && path.is_file() {
                fs::remove_file(&path)?;
                stale += 1;
            }
        }
        if stale > 0 {
            tracing::warn!("Removed {} stale temp files from {}", stale, dir.display());
        }

        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    /// Write a frozen array, replacing any previous file for the key
    ///
    /// Readers see either the old file or the new one, never a partial write.
    /// The directory is synced after the rename so the new entry survives a
    /// power loss.
    pub fn save(&self, key: &str, frozen: &SerializedForm) -> Result<()> {
        let path = self.path_for(key)?;
        let temp_path = self.temp_path_for(key)?;
        let contents = encode_file(frozen);

        if let Err(e) = Self::write_synced(&temp_path, &contents) {
            let _ = fs::remove_file(&temp_path);
            return Err(e);
        }

        if let Err(e) = fs::rename(&temp_path, &path) {
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }
        self.sync_dir()?;

        tracing::trace!(
            "Saved {} ({} bytes, {:?})",
            key,
            contents.len(),
            frozen.compression
        );
        Ok(())
    }

    /// Read a frozen array
    ///
    /// Returns:
    /// - `Ok(Some(frozen))`: file found and well-formed
    /// - `Ok(None)`: key was never written
    /// - `Err(Corruption | UnsupportedFormat)`: file exists but is unreadable
    pub fn load(&self, key: &str) -> Result<Option<SerializedForm>> {
        let path = self.path_for(key)?;
        let contents = match fs::read(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        decode_file(key, &contents).map(Some)
    }

    /// Whether a file exists for the key
    pub fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.path_for(key)?.is_file())
    }

    /// Delete a key's file; returns whether one existed
    pub fn remove(&self, key: &str) -> Result<bool> {
        match fs::remove_file(self.path_for(key)?) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// File path for a key
    pub fn path_for(&self, key: &str) -> Result<PathBuf> {
        Ok(self.dir.join(encode_key(key)?))
    }

    /// Get the store directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn temp_path_for(&self, key: &str) -> Result<PathBuf> {
        Ok(self.dir.join(format!("{}{}", encode_key(key)?, TEMP_SUFFIX)))
    }

    fn write_synced(path: &Path, contents: &[u8]) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;
        file.write_all(contents)?;
        file.sync_all()?;
        Ok(())
    }

    #[cfg(unix)]
    fn sync_dir(&self) -> Result<()> {
        fs::File::open(&self.dir)?.sync_all()?;
        Ok(())
    }

    // Directories cannot be opened as files on Windows; rename is durable there.
    #[cfg(not(unix))]
    fn sync_dir(&self) -> Result<()> {
        Ok(())
    }
}
