//! Scanner module for directory traversal and file hashing.
//!
//! This module provides functionality for:
//! - Sequential, sorted directory walking using walkdir
//! - Content hashing with SHA-256 (streaming, fixed-size chunks)
//! - Path helpers for roots and filename comparisons
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`walker`]: Directory traversal and file discovery
//! - [`hasher`]: SHA-256 file hashing (streaming)
//! - [`path_utils`]: Root resolution and stem/extension handling
//!
//! # Example
//!
//! ```no_run
//! use backupgap::scanner::{Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let walker = Walker::new(Path::new("."), WalkerConfig::default());
//! for entry in walker.walk() {
//!     match entry {
//!         Ok(path) => println!("{}", path.display()),
//!         Err(e) => eprintln!("Warning: {}", e),
//!     }
//! }
//! ```

pub mod hasher;
pub mod path_utils;
pub mod walker;

use std::io;
use std::path::{Path, PathBuf};

// Re-export main types
pub use hasher::{hash_to_hex, hex_to_hash, ContentDigest, DigestParseError, Hasher};
pub use walker::Walker;

/// Default name of the side-car cache file written at each scanned root.
pub const DEFAULT_CACHE_FILE_NAME: &str = "hash.json";

/// Configuration for directory walking.
#[derive(Debug, Clone)]
pub struct WalkerConfig {
    /// Basename excluded from the walk at every depth (the cache file).
    pub exclude_name: String,

    /// Follow symbolic links during traversal.
    /// Warning: May cause infinite loops with symlink cycles.
    pub follow_symlinks: bool,

    /// Directories pruned from the walk, as they appear under the root.
    /// The root itself is never pruned.
    pub skip_dirs: Vec<PathBuf>,
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            exclude_name: DEFAULT_CACHE_FILE_NAME.to_string(),
            follow_symlinks: false,
            skip_dirs: Vec::new(),
        }
    }
}

impl WalkerConfig {
    /// Create a new configuration.
    #[must_use]
    pub fn new(exclude_name: impl Into<String>, follow_symlinks: bool) -> Self {
        Self {
            exclude_name: exclude_name.into(),
            follow_symlinks,
            skip_dirs: Vec::new(),
        }
    }

    /// Leave the subtree at `dir` out of every walk.
    #[must_use]
    pub fn with_skip_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.skip_dirs.push(dir.into());
        self
    }
}

/// Errors that can occur during directory scanning.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Permission was denied when accessing a file or directory.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The specified path was not found.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// An I/O error occurred while accessing a file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The path cannot be recorded in a hash map.
    #[error("Path is not valid UTF-8: {0}")]
    NotUtf8(PathBuf),

    /// A file was found but could not be hashed.
    #[error(transparent)]
    HashError(#[from] HashError),
}

impl ScanError {
    /// Path the error refers to.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::PermissionDenied(p)
            | Self::NotFound(p)
            | Self::NotUtf8(p)
            | Self::Io { path: p, .. } => p,
            Self::HashError(e) => e.path(),
        }
    }
}

/// Errors that can occur during file hashing.
#[derive(thiserror::Error, Debug)]
pub enum HashError {
    /// The specified file was not found.
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Permission was denied when reading the file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// An I/O error occurred while reading the file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: io::Error,
    },
}

impl HashError {
    /// Classify an I/O error raised while hashing `path`.
    #[must_use]
    pub fn from_io(path: &Path, error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: error,
            },
        }
    }

    /// Path of the file that failed to hash.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound(p) | Self::PermissionDenied(p) | Self::Io { path: p, .. } => p,
        }
    }
}
