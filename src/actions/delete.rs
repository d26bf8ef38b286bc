//! File deletion with empty-directory cleanup.
//!
//! # Overview
//!
//! This module provides the deletion side of the tool:
//! - Permanent deletion (default) or move to system trash
//! - Removal of ancestor directories left empty by a deletion
//! - Batch operations that report per-file failures and keep going
//! - A confirmation gate that must be passed before a batch touches anything
//!
//! # Safety
//!
//! Directories are only ever removed with [`std::fs::remove_dir`], which
//! refuses non-empty directories. Pruning walks upward from the deleted
//! file's parent and stops at the first directory that cannot be removed.
//!
//! # Example
//!
//! ```no_run
//! use backupgap::actions::delete::{delete_file, DeleteConfig};
//! use std::path::Path;
//!
//! match delete_file(Path::new("/backup/old/dup.txt"), &DeleteConfig::default()) {
//!     Ok(result) => println!("Deleted: {}", result.path.display()),
//!     Err(e) => eprintln!("Failed: {}", e),
//! }
//! ```

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use bytesize::ByteSize;
use thiserror::Error;

use crate::prompt::{Prompt, CONFIRM_PHRASE};

/// Error type for deletion operations.
#[derive(Debug, Error)]
pub enum DeleteError {
    /// File was not found (may have been deleted or moved).
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    /// Permission denied when attempting to delete.
    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// Trash operation failed.
    #[error("trash operation failed for {path}: {message}")]
    TrashFailed { path: PathBuf, message: String },

    /// Permanent delete operation failed.
    #[error("permanent delete failed for {path}: {message}")]
    PermanentDeleteFailed { path: PathBuf, message: String },

    /// Attempted to delete all copies (at least one must be preserved).
    #[error("cannot delete all copies - at least one file must be preserved")]
    AllCopiesWouldBeDeleted,

    /// General I/O error.
    #[error("I/O error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl DeleteError {
    /// Get the path associated with this error (if any).
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::NotFound(p)
            | Self::PermissionDenied(p)
            | Self::TrashFailed { path: p, .. }
            | Self::PermanentDeleteFailed { path: p, .. }
            | Self::Io { path: p, .. } => Some(p),
            Self::AllCopiesWouldBeDeleted => None,
        }
    }

    fn from_metadata_error(path: &Path, e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source: e,
            },
        }
    }
}

/// Result of a successful deletion operation.
#[derive(Debug, Clone)]
pub struct DeleteResult {
    /// Path that was deleted.
    pub path: PathBuf,
    /// Size of the deleted file in bytes.
    pub size: u64,
    /// Whether deletion was permanent (true) or to trash (false).
    pub permanent: bool,
    /// Directories removed afterwards because they became empty, innermost first.
    pub pruned_dirs: Vec<PathBuf>,
}

impl DeleteResult {
    /// Create a new delete result.
    #[must_use]
    pub fn new(path: PathBuf, size: u64, permanent: bool) -> Self {
        Self {
            path,
            size,
            permanent,
            pruned_dirs: Vec::new(),
        }
    }
}

/// Results of a batch deletion operation.
#[derive(Debug, Clone, Default)]
pub struct BatchDeleteResult {
    /// Successfully deleted files.
    pub successes: Vec<DeleteResult>,
    /// Failed deletions with their errors.
    pub failures: Vec<(PathBuf, String)>,
    /// Total bytes freed.
    pub bytes_freed: u64,
}

impl BatchDeleteResult {
    /// Number of successful deletions.
    #[must_use]
    pub fn success_count(&self) -> usize {
        self.successes.len()
    }

    /// Number of failed deletions.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    /// Total number of attempted deletions.
    #[must_use]
    pub fn total_count(&self) -> usize {
        self.successes.len() + self.failures.len()
    }

    /// Number of directories removed by pruning.
    #[must_use]
    pub fn pruned_count(&self) -> usize {
        self.successes.iter().map(|s| s.pruned_dirs.len()).sum()
    }

    /// Check if all deletions succeeded.
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }

    /// Paths that were actually deleted, in deletion order.
    pub fn deleted_paths(&self) -> impl Iterator<Item = &Path> {
        self.successes.iter().map(|s| s.path.as_path())
    }

    /// Human-readable summary of the operation.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut out = format!("Deleted {} file(s)", self.success_count());
        if !self.all_succeeded() {
            out.push_str(&format!(", {} failed", self.failure_count()));
        }
        out.push_str(&format!(", freed {}", ByteSize::b(self.bytes_freed)));
        let pruned = self.pruned_count();
        if pruned > 0 {
            out.push_str(&format!(", removed {pruned} empty director(ies)"));
        }
        out
    }
}

/// Outcome of a confirmation-gated batch.
#[derive(Debug, Clone)]
pub enum BatchOutcome {
    /// The operator declined; nothing was touched.
    Cancelled,
    /// The batch ran (possibly with per-file failures).
    Completed(BatchDeleteResult),
}

/// Configuration for deletion operations.
#[derive(Debug, Clone)]
pub struct DeleteConfig {
    /// Unlink files (true) or move them to the system trash (false).
    pub permanent: bool,
    /// Remove ancestor directories left empty by a deletion.
    pub prune_empty_dirs: bool,
    /// Continue on error (process remaining files even if some fail).
    pub continue_on_error: bool,
}

impl Default for DeleteConfig {
    fn default() -> Self {
        Self {
            permanent: true,
            prune_empty_dirs: true,
            continue_on_error: true,
        }
    }
}

impl DeleteConfig {
    /// Create config for permanent deletion.
    #[must_use]
    pub fn permanent() -> Self {
        Self::default()
    }

    /// Create config for trash deletion.
    #[must_use]
    pub fn trash() -> Self {
        Self {
            permanent: false,
            ..Self::default()
        }
    }

    /// Enable/disable empty-directory pruning.
    #[must_use]
    pub fn with_prune_empty_dirs(mut self, prune: bool) -> Self {
        self.prune_empty_dirs = prune;
        self
    }

    /// Enable/disable continue on error.
    #[must_use]
    pub fn with_continue_on_error(mut self, continue_on_error: bool) -> Self {
        self.continue_on_error = continue_on_error;
        self
    }
}

/// Move a single file to the system trash.
///
/// # Errors
///
/// - `NotFound` if the file doesn't exist
/// - `PermissionDenied` if its metadata cannot be read
/// - `TrashFailed` if the trash operation fails
pub fn delete_to_trash(path: &Path) -> Result<DeleteResult, DeleteError> {
    let metadata = fs::metadata(path).map_err(|e| DeleteError::from_metadata_error(path, e))?;
    let size = metadata.len();

    trash::delete(path).map_err(|e| {
        log::error!("Trash operation failed for {}: {}", path.display(), e);
        DeleteError::TrashFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        }
    })?;

    log::info!("Moved to trash: {} ({} bytes)", path.display(), size);

    Ok(DeleteResult::new(path.to_path_buf(), size, false))
}

/// Permanently delete a single file.
///
/// **WARNING**: This operation cannot be undone.
///
/// # Errors
///
/// - `NotFound` if the file doesn't exist
/// - `PermissionDenied` if its metadata cannot be read
/// - `PermanentDeleteFailed` if the unlink fails
pub fn permanent_delete(path: &Path) -> Result<DeleteResult, DeleteError> {
    let metadata = fs::metadata(path).map_err(|e| DeleteError::from_metadata_error(path, e))?;
    let size = metadata.len();

    fs::remove_file(path).map_err(|e| {
        log::error!("Permanent delete failed for {}: {}", path.display(), e);
        DeleteError::PermanentDeleteFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        }
    })?;

    log::info!("Deleted: {} ({} bytes)", path.display(), size);

    Ok(DeleteResult::new(path.to_path_buf(), size, true))
}

/// Remove the now-empty ancestors of a deleted file.
///
/// Starts at `deleted`'s parent and moves upward, removing each directory
/// until one cannot be removed (not empty, not permitted) or the top of the
/// path is reached. Returns the removed directories, innermost first.
pub fn prune_empty_parents(deleted: &Path) -> Vec<PathBuf> {
    let mut removed = Vec::new();
    let mut current = deleted.parent();

    while let Some(dir) = current {
        if dir.as_os_str().is_empty() {
            break;
        }
        match fs::remove_dir(dir) {
            Ok(()) => {
                log::info!("Removed empty directory: {}", dir.display());
                removed.push(dir.to_path_buf());
                current = dir.parent();
            }
            Err(e) => {
                log::trace!("Stopped pruning at {}: {}", dir.display(), e);
                break;
            }
        }
    }

    removed
}

/// Delete one file according to `config`, then prune empty ancestors.
///
/// # Errors
///
/// Errors from [`permanent_delete`] or [`delete_to_trash`]. Pruning
/// failures are not errors; pruning simply stops.
pub fn delete_file(path: &Path, config: &DeleteConfig) -> Result<DeleteResult, DeleteError> {
    let mut result = if config.permanent {
        permanent_delete(path)?
    } else {
        delete_to_trash(path)?
    };

    if config.prune_empty_dirs {
        result.pruned_dirs = prune_empty_parents(path);
    }

    Ok(result)
}

/// Delete multiple files in batch.
///
/// Processes all files, continuing on error if configured to do so. Each
/// failure is logged as it happens.
pub fn delete_batch(paths: &[PathBuf], config: &DeleteConfig) -> BatchDeleteResult {
    let mut result = BatchDeleteResult::default();

    for path in paths {
        match delete_file(path, config) {
            Ok(del) => {
                result.bytes_freed += del.size;
                result.successes.push(del);
            }
            Err(e) => {
                let error_msg = e.to_string();
                log::warn!("Failed to delete {}: {}", path.display(), error_msg);
                result.failures.push((path.clone(), error_msg));

                if !config.continue_on_error {
                    log::info!("Stopping batch deletion due to error (continue_on_error=false)");
                    break;
                }
            }
        }
    }

    log::info!("{}", result.summary());

    result
}

/// Delete a batch only after the operator types the confirmation phrase.
///
/// An empty batch completes immediately without asking. Declining returns
/// [`BatchOutcome::Cancelled`] and leaves the filesystem untouched.
pub fn delete_batch_confirmed(
    paths: &[PathBuf],
    config: &DeleteConfig,
    prompt: &mut dyn Prompt,
    question: &str,
) -> BatchOutcome {
    if paths.is_empty() {
        log::info!("No files found to delete.");
        return BatchOutcome::Completed(BatchDeleteResult::default());
    }

    if !prompt.confirm_phrase(question, CONFIRM_PHRASE) {
        log::info!("Deletion cancelled; {} file(s) left untouched", paths.len());
        return BatchOutcome::Cancelled;
    }

    BatchOutcome::Completed(delete_batch(paths, config))
}

/// Validate that a selection doesn't delete all copies.
///
/// At least one copy of each duplicate group must be preserved.
///
/// # Errors
///
/// Returns `AllCopiesWouldBeDeleted` if all copies would be deleted.
///
/// # Example
///
/// ```
/// use backupgap::actions::delete::validate_preserves_copy;
/// use std::path::PathBuf;
///
/// let group = vec![PathBuf::from("/original.txt"), PathBuf::from("/copy1.txt")];
///
/// assert!(validate_preserves_copy(&group[1..], &group).is_ok());
/// assert!(validate_preserves_copy(&group, &group).is_err());
/// ```
pub fn validate_preserves_copy(
    selected_paths: &[PathBuf],
    group_paths: &[PathBuf],
) -> Result<(), DeleteError> {
    let selected_set: HashSet<&PathBuf> = selected_paths.iter().collect();
    let preserved_count = group_paths
        .iter()
        .filter(|p| !selected_set.contains(p))
        .count();

    if preserved_count == 0 {
        log::error!(
            "Attempted to delete all {} copies of a duplicate group",
            group_paths.len()
        );
        Err(DeleteError::AllCopiesWouldBeDeleted)
    } else {
        log::debug!(
            "Deletion validated: {} files selected, {} preserved",
            selected_paths.len(),
            preserved_count
        );
        Ok(())
    }
}
