//! SHA-256 file hasher with streaming support.
//!
//! # Overview
//!
//! This module provides [`ContentDigest`], the 256-bit content fingerprint
//! used as the key of every digest map, and [`Hasher`], which computes it
//! by reading a file in fixed-size chunks so that files of any size can be
//! hashed without loading them into memory.
//!
//! Digests are persisted as 64-character lowercase hex strings.
//!
//! # Example
//!
//! ```no_run
//! use backupgap::scanner::Hasher;
//! use std::path::Path;
//!
//! let hasher = Hasher::new();
//! let digest = hasher.hash_file(Path::new("photo.jpg")).unwrap();
//! println!("{digest}");
//! ```

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use super::HashError;

/// Default read chunk size in bytes.
pub const DEFAULT_BUFFER_SIZE: usize = 8192;

/// Length of a digest in bytes.
pub const DIGEST_LEN: usize = 32;

/// SHA-256 fingerprint of a file's full byte content.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentDigest([u8; DIGEST_LEN]);

/// Error returned when a hex string is not a valid digest.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DigestParseError {
    /// The string does not have exactly 64 characters.
    #[error("expected {expected} hex characters, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// The string contains a non-hex character.
    #[error("invalid hex character '{0}'")]
    InvalidCharacter(char),
}

impl ContentDigest {
    /// Wrap raw digest bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(bytes)
    }

    /// Raw digest bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    /// Digest of an in-memory byte slice.
    #[must_use]
    pub fn of_bytes(data: &[u8]) -> Self {
        Self(Sha256::digest(data).into())
    }

    /// Lowercase hex encoding (64 characters).
    #[must_use]
    pub fn to_hex(&self) -> String {
        hash_to_hex(&self.0)
    }

    /// Parse a 64-character hex string. Upper and lower case are accepted.
    ///
    /// # Errors
    ///
    /// Returns [`DigestParseError`] on wrong length or non-hex characters.
    pub fn from_hex(s: &str) -> Result<Self, DigestParseError> {
        hex_to_hash(s).map(Self)
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentDigest({self})")
    }
}

impl FromStr for ContentDigest {
    type Err = DigestParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for ContentDigest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ContentDigest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Encode digest bytes as lowercase hex.
#[must_use]
pub fn hash_to_hex(hash: &[u8; DIGEST_LEN]) -> String {
    use fmt::Write;

    let mut out = String::with_capacity(DIGEST_LEN * 2);
    for byte in hash {
        // Writing to a String cannot fail.
        let _ = write!(out, "{byte:02x}");
    }
    out
}

/// Decode a 64-character hex string into digest bytes.
///
/// # Errors
///
/// Returns [`DigestParseError`] on wrong length or non-hex characters.
pub fn hex_to_hash(s: &str) -> Result<[u8; DIGEST_LEN], DigestParseError> {
    if s.len() != DIGEST_LEN * 2 || !s.is_ascii() {
        return Err(DigestParseError::InvalidLength {
            expected: DIGEST_LEN * 2,
            actual: s.chars().count(),
        });
    }

    let mut out = [0u8; DIGEST_LEN];
    let bytes = s.as_bytes();
    for (i, slot) in out.iter_mut().enumerate() {
        let hi = hex_value(bytes[i * 2])?;
        let lo = hex_value(bytes[i * 2 + 1])?;
        *slot = (hi << 4) | lo;
    }
    Ok(out)
}

fn hex_value(c: u8) -> Result<u8, DigestParseError> {
    match c {
        b'0'..=b'9' => Ok(c - b'0'),
        b'a'..=b'f' => Ok(c - b'a' + 10),
        b'A'..=b'F' => Ok(c - b'A' + 10),
        _ => Err(DigestParseError::InvalidCharacter(c as char)),
    }
}

/// Streaming SHA-256 file hasher.
#[derive(Debug, Clone)]
pub struct Hasher {
    buffer_size: usize,
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher {
    /// Create a hasher with the default 8 KiB chunk size.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }

    /// Create a hasher reading `buffer_size` bytes per chunk (minimum 1).
    #[must_use]
    pub fn with_buffer_size(buffer_size: usize) -> Self {
        Self {
            buffer_size: buffer_size.max(1),
        }
    }

    /// Chunk size used for reads.
    #[must_use]
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Hash the full content of a file.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the file vanished before it could be opened
    /// - `PermissionDenied` if it cannot be read
    /// - `Io` for any other read failure, including mid-stream errors
    pub fn hash_file(&self, path: &Path) -> Result<ContentDigest, HashError> {
        let file = File::open(path).map_err(|e| HashError::from_io(path, e))?;
        self.hash_reader(file)
            .map_err(|e| HashError::from_io(path, e))
    }

    /// Hash everything readable from `reader` in fixed-size chunks.
    ///
    /// # Errors
    ///
    /// Propagates the first read error other than `Interrupted`.
    pub fn hash_reader<R: Read>(&self, mut reader: R) -> io::Result<ContentDigest> {
        let mut hasher = Sha256::new();
        let mut buffer = vec![0u8; self.buffer_size];

        loop {
            let n = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            hasher.update(&buffer[..n]);
        }

        Ok(ContentDigest(hasher.finalize().into()))
    }
}
