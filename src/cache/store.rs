//! JSON persistence of a tree's digest map.
//!
//! The cache lives inside the tree it describes, as a single file named
//! [`DEFAULT_CACHE_FILE_NAME`](crate::scanner::DEFAULT_CACHE_FILE_NAME)
//! unless configured otherwise. The walker skips that name so the cache
//! never hashes itself.
//!
//! Saving writes a temporary file next to the cache and renames it over the
//! old one, so a failed save leaves the previous cache intact.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::duplicates::DigestMap;

/// Errors reading or writing a cache file.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The cache file could not be opened, created or written.
    #[error("Cache I/O error for {path}: {source}")]
    Io {
        /// Cache file path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The cache file exists but is not a valid digest map.
    #[error("Corrupt cache file {path}: {source}")]
    Parse {
        /// Cache file path
        path: PathBuf,
        /// Underlying parse error
        #[source]
        source: serde_json::Error,
    },

    /// The digest map could not be serialized.
    #[error("Failed to serialize cache {path}")]
    Serialize {
        /// Cache file path
        path: PathBuf,
        /// Underlying serialization error
        #[source]
        source: serde_json::Error,
    },
}

impl CacheError {
    /// Path of the cache file involved.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Io { path, .. } | Self::Parse { path, .. } | Self::Serialize { path, .. } => path,
        }
    }
}

/// Result alias for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// Handle to the cache file of one tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestCache {
    path: PathBuf,
}

impl DigestCache {
    /// Cache named `file_name` directly under `root`.
    #[must_use]
    pub fn new(root: &Path, file_name: &str) -> Self {
        Self {
            path: root.join(file_name),
        }
    }

    /// Full path of the cache file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a cache file is present.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Read the digest map.
    ///
    /// # Errors
    ///
    /// [`CacheError::Io`] if the file cannot be opened, [`CacheError::Parse`]
    /// if it is not a JSON object of hex digests to path lists.
    pub fn load(&self) -> CacheResult<DigestMap> {
        let file = File::open(&self.path).map_err(|source| CacheError::Io {
            path: self.path.clone(),
            source,
        })?;
        let map: DigestMap =
            serde_json::from_reader(BufReader::new(file)).map_err(|source| CacheError::Parse {
                path: self.path.clone(),
                source,
            })?;
        log::debug!(
            "Loaded {} digests ({} files) from {}",
            map.len(),
            map.file_count(),
            self.path.display()
        );
        Ok(map)
    }

    /// Write `map`, replacing any previous cache.
    ///
    /// # Errors
    ///
    /// [`CacheError::Io`] if the file cannot be created or written,
    /// [`CacheError::Serialize`] if a path cannot be stored as JSON. The old
    /// cache file is untouched in both cases.
    pub fn save(&self, map: &DigestMap) -> CacheResult<()> {
        let io_err = |source: std::io::Error| CacheError::Io {
            path: self.path.clone(),
            source,
        };

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let prefix = match self.path.file_name() {
            Some(name) => format!(".{}.", name.to_string_lossy()),
            None => ".cache.".to_string(),
        };
        let temp = tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(".tmp")
            .tempfile_in(dir)
            .map_err(io_err)?;

        let mut writer = BufWriter::new(temp);
        serde_json::to_writer_pretty(&mut writer, map).map_err(|source| {
            if source.is_io() {
                CacheError::Io {
                    path: self.path.clone(),
                    source: source.into(),
                }
            } else {
                CacheError::Serialize {
                    path: self.path.clone(),
                    source,
                }
            }
        })?;
        writer.write_all(b"\n").map_err(io_err)?;
        let temp = writer.into_inner().map_err(|e| io_err(e.into_error()))?;
        temp.persist(&self.path).map_err(|e| io_err(e.error))?;

        log::debug!("Saved {} digests to {}", map.len(), self.path.display());
        Ok(())
    }
}
