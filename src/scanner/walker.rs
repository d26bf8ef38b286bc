//! Directory walker implementation using walkdir.
//!
//! # Overview
//!
//! This module provides the [`Walker`] struct for enumerating every regular
//! file below a root, at any depth. Traversal is single-threaded and sorted
//! by file name, so the order in which files are discovered (and therefore
//! the order of paths inside a digest group) is deterministic.
//!
//! Any file whose basename equals the configured cache file name is skipped,
//! wherever it appears in the tree, along with temporary files left by an
//! interrupted cache save. A walk never yields the cache file it is about to
//! write. Directories listed in [`WalkerConfig::skip_dirs`] are pruned.
//!
//! Paths that are not valid UTF-8 are reported as errors instead of being
//! yielded, because a hash map cannot record them.
//!
//! # Example
//!
//! ```no_run
//! use backupgap::scanner::{Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let walker = Walker::new(Path::new("/home/user/Photos"), WalkerConfig::default());
//! let files: Vec<_> = walker.walk().filter_map(Result::ok).collect();
//! println!("Found {} files", files.len());
//! ```

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use super::{ScanError, WalkerConfig};

/// Directory walker for sequential file discovery.
#[derive(Debug)]
pub struct Walker {
    /// Root path to walk
    root: PathBuf,
    /// Walker configuration
    config: WalkerConfig,
}

impl Walker {
    /// Create a new walker for the given path.
    #[must_use]
    pub fn new(path: &Path, config: WalkerConfig) -> Self {
        Self {
            root: path.to_path_buf(),
            config,
        }
    }

    /// Root this walker enumerates.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether `path` names the excluded cache file or a leftover temporary
    /// copy of it.
    fn is_excluded(&self, path: &Path) -> bool {
        let Some(name) = path.file_name() else {
            return false;
        };
        if name == OsStr::new(&self.config.exclude_name) {
            return true;
        }
        let name = name.to_string_lossy();
        name.strip_prefix('.')
            .and_then(|rest| rest.strip_prefix(self.config.exclude_name.as_str()))
            .is_some_and(|rest| rest.starts_with('.') && rest.ends_with(".tmp"))
    }

    /// Whether `entry` is a directory pruned from the walk.
    fn is_skipped_dir(&self, entry: &DirEntry) -> bool {
        entry.depth() > 0
            && entry.file_type().is_dir()
            && self.config.skip_dirs.iter().any(|d| d == entry.path())
    }

    /// Walk the directory tree, yielding regular file paths.
    ///
    /// Errors are yielded as [`ScanError`] values rather than stopping
    /// iteration; callers decide whether to report and continue.
    pub fn walk(&self) -> impl Iterator<Item = Result<PathBuf, ScanError>> + '_ {
        WalkDir::new(&self.root)
            .follow_links(self.config.follow_symlinks)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |entry| {
                let skip = self.is_skipped_dir(entry);
                if skip {
                    log::debug!("Not descending into {}", entry.path().display());
                }
                !skip
            })
            .filter_map(move |entry_result| match entry_result {
                Ok(entry) => {
                    // With follow_links off, symlinks report their own type
                    // and are skipped here along with directories.
                    if !entry.file_type().is_file() {
                        return None;
                    }

                    let path = entry.into_path();
                    if self.is_excluded(&path) {
                        log::trace!("Skipping cache file: {}", path.display());
                        return None;
                    }
                    if path.to_str().is_none() {
                        return Some(Err(ScanError::NotUtf8(path)));
                    }

                    Some(Ok(path))
                }
                Err(e) => Some(Err(self.handle_walk_error(e))),
            })
    }

    /// Convert a walkdir error into a [`ScanError`].
    fn handle_walk_error(&self, error: walkdir::Error) -> ScanError {
        use std::io::ErrorKind;

        let path = error
            .path()
            .map_or_else(|| self.root.clone(), Path::to_path_buf);

        if let Some(ancestor) = error.loop_ancestor() {
            log::warn!(
                "Symlink loop at {} (points back to {})",
                path.display(),
                ancestor.display()
            );
        }

        match error.io_error().map(std::io::Error::kind) {
            Some(ErrorKind::PermissionDenied) => {
                log::warn!("Permission denied: {}", path.display());
                ScanError::PermissionDenied(path)
            }
            Some(ErrorKind::NotFound) => {
                log::debug!("Path not found (may have been deleted): {}", path.display());
                ScanError::NotFound(path)
            }
            _ => {
                log::warn!("Walker error for {}: {}", path.display(), error);
                let source = error
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("directory walk failed"));
                ScanError::Io { path, source }
            }
        }
    }
}
