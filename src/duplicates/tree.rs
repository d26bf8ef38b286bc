//! Tree hashing: one root in, one [`DigestMap`] out.
//!
//! # Overview
//!
//! [`TreeHasher::hash_tree`] runs the whole pipeline for a root:
//! 1. **Walk**: list every regular file, skipping the cache file name
//! 2. **Hash**: stream each file through SHA-256, one at a time
//! 3. **Resolve**: hand digest collisions to the [`DuplicateResolver`] and
//!    carry out the deletions it asks for
//! 4. **Persist**: overwrite the root's cache file with the new map
//!
//! Walk and hash failures are collected in the [`HashSummary`] and never stop
//! the run.
//!
//! # Example
//!
//! ```no_run
//! use backupgap::duplicates::{DuplicatePolicy, DuplicateResolver, TreeHasher};
//! use backupgap::prompt::TerminalPrompt;
//! use backupgap::scanner::{Hasher, WalkerConfig};
//! use std::path::Path;
//!
//! let tree = TreeHasher::new(Hasher::new(), WalkerConfig::default());
//! let resolver = DuplicateResolver::new(DuplicatePolicy::Report);
//! let outcome = tree
//!     .hash_tree(Path::new("/data/photos"), &resolver, &mut TerminalPrompt::new())
//!     .unwrap();
//! println!("{} distinct files", outcome.map.len());
//! ```

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::{Decision, DigestMap, DuplicateResolver};
use crate::actions::{delete_file, DeleteConfig, DeleteResult};
use crate::cache::{CacheError, DigestCache};
use crate::progress::{ProgressCallback, PHASE_HASH, PHASE_WALK};
use crate::prompt::Prompt;
use crate::scanner::{Hasher, ScanError, Walker, WalkerConfig};

/// Errors that stop a tree from being hashed.
#[derive(Debug, Error)]
pub enum FinderError {
    /// The provided path does not exist.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// The provided path is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// The cache file could not be written.
    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// Counters and non-fatal failures from hashing one tree.
#[derive(Debug, Default)]
pub struct HashSummary {
    /// Regular files found by the walk.
    pub files_found: usize,
    /// Files hashed successfully.
    pub files_hashed: usize,
    /// Duplicates kept in the map (reported, kept both, ambiguous).
    pub duplicates_kept: usize,
    /// Duplicates the auto-delete guard refused to touch.
    pub ambiguous: usize,
    /// Walk and hash failures, in the order they happened.
    pub scan_errors: Vec<ScanError>,
    /// Files removed by the duplicate policy.
    pub deleted: Vec<DeleteResult>,
    /// Files the duplicate policy wanted removed but could not be.
    pub delete_failures: Vec<(PathBuf, String)>,
}

impl HashSummary {
    /// Whether any file was skipped or failed to delete.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        !self.scan_errors.is_empty() || !self.delete_failures.is_empty()
    }

    /// Bytes freed by policy deletions.
    #[must_use]
    pub fn bytes_freed(&self) -> u64 {
        self.deleted.iter().map(|d| d.size).sum()
    }
}

/// Result of hashing one tree.
#[derive(Debug)]
pub struct HashOutcome {
    /// Digest map of every file that hashed and still exists.
    pub map: DigestMap,
    /// What happened along the way.
    pub summary: HashSummary,
}

/// Walks, hashes and resolves duplicates for one root.
pub struct TreeHasher<'a> {
    hasher: Hasher,
    walker_config: WalkerConfig,
    delete_config: DeleteConfig,
    progress: Option<&'a dyn ProgressCallback>,
}

impl std::fmt::Debug for TreeHasher<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeHasher")
            .field("hasher", &self.hasher)
            .field("walker_config", &self.walker_config)
            .field("delete_config", &self.delete_config)
            .field("progress", &self.progress.map(|_| "<callback>"))
            .finish()
    }
}

impl<'a> TreeHasher<'a> {
    /// Create a tree hasher. Policy deletions are permanent and prune empty
    /// directories unless [`with_delete_config`](Self::with_delete_config)
    /// says otherwise.
    #[must_use]
    pub fn new(hasher: Hasher, walker_config: WalkerConfig) -> Self {
        Self {
            hasher,
            walker_config,
            delete_config: DeleteConfig::default(),
            progress: None,
        }
    }

    /// Set how policy deletions are carried out.
    #[must_use]
    pub fn with_delete_config(mut self, config: DeleteConfig) -> Self {
        self.delete_config = config;
        self
    }

    /// Report progress to `progress`.
    #[must_use]
    pub fn with_progress(mut self, progress: &'a dyn ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Basename of the cache file written at each root.
    #[must_use]
    pub fn cache_file_name(&self) -> &str {
        &self.walker_config.exclude_name
    }

    /// Cache handle for `root`.
    #[must_use]
    pub fn cache_for(&self, root: &Path) -> DigestCache {
        DigestCache::new(root, self.cache_file_name())
    }

    /// Hash `root` and overwrite its cache file with the result.
    ///
    /// # Errors
    ///
    /// Fails if `root` is missing or not a directory, or if the cache file
    /// cannot be written. Per-file failures are reported in the summary.
    pub fn hash_tree(
        &self,
        root: &Path,
        resolver: &DuplicateResolver<'_>,
        prompt: &mut dyn Prompt,
    ) -> Result<HashOutcome, FinderError> {
        let outcome = self.build(root, resolver, prompt)?;
        self.cache_for(root).save(&outcome.map)?;
        log::info!(
            "Saved hash map for {} ({} files)",
            root.display(),
            outcome.map.file_count()
        );
        Ok(outcome)
    }

    /// Hash `root` without touching its cache file.
    ///
    /// # Errors
    ///
    /// Fails if `root` is missing or not a directory.
    pub fn build(
        &self,
        root: &Path,
        resolver: &DuplicateResolver<'_>,
        prompt: &mut dyn Prompt,
    ) -> Result<HashOutcome, FinderError> {
        if !root.exists() {
            return Err(FinderError::NotFound(root.to_path_buf()));
        }
        if !root.is_dir() {
            return Err(FinderError::NotADirectory(root.to_path_buf()));
        }

        let mut summary = HashSummary::default();
        let files = self.walk(root, &mut summary);
        summary.files_found = files.len();

        let mut map = DigestMap::new();
        let mut prompt = SuspendingPrompt {
            inner: prompt,
            progress: self.progress,
        };

        if let Some(p) = self.progress {
            p.on_phase_start(PHASE_HASH, files.len());
        }

        for (i, path) in files.into_iter().enumerate() {
            if let Some(p) = self.progress {
                p.on_progress(i + 1, &path.to_string_lossy());
            }

            let digest = match self.hasher.hash_file(&path) {
                Ok(digest) => digest,
                Err(e) => {
                    log::warn!("Skipping {}: {}", path.display(), e);
                    summary.scan_errors.push(e.into());
                    continue;
                }
            };
            summary.files_hashed += 1;

            let resolution = resolver.resolve(&mut map, digest, path, &mut prompt);
            match resolution.decision {
                Decision::Recorded | Decision::KeptBoth => summary.duplicates_kept += 1,
                Decision::Ambiguous => {
                    summary.duplicates_kept += 1;
                    summary.ambiguous += 1;
                }
                Decision::Unique | Decision::KeptExisting | Decision::KeptNew => {}
            }

            for doomed in resolution.deletions {
                match delete_file(&doomed, &self.delete_config) {
                    Ok(result) => {
                        log::info!("Deleted duplicate {}", doomed.display());
                        summary.deleted.push(result);
                    }
                    Err(e) => {
                        log::warn!("Failed to delete {}: {}", doomed.display(), e);
                        summary.delete_failures.push((doomed.clone(), e.to_string()));
                        map.insert(digest, doomed);
                    }
                }
            }
        }

        if let Some(p) = self.progress {
            p.on_phase_end(PHASE_HASH);
        }

        log::debug!(
            "Hashed {}/{} files under {} into {} digests",
            summary.files_hashed,
            summary.files_found,
            root.display(),
            map.len()
        );

        Ok(HashOutcome { map, summary })
    }

    fn walk(&self, root: &Path, summary: &mut HashSummary) -> Vec<PathBuf> {
        let walker = Walker::new(root, self.walker_config.clone());
        if let Some(p) = self.progress {
            p.on_phase_start(PHASE_WALK, 0);
        }

        let mut files = Vec::new();
        for entry in walker.walk() {
            match entry {
                Ok(path) => {
                    files.push(path);
                    if let Some(p) = self.progress {
                        if let Some(last) = files.last() {
                            p.on_progress(files.len(), &last.to_string_lossy());
                        }
                    }
                }
                Err(e) => {
                    log::warn!("{}", e);
                    summary.scan_errors.push(e);
                }
            }
        }

        if let Some(p) = self.progress {
            p.on_phase_end(PHASE_WALK);
        }
        files
    }
}

/// Hides the progress bar while a question is on screen.
struct SuspendingPrompt<'p, 'q> {
    inner: &'p mut dyn Prompt,
    progress: Option<&'q dyn ProgressCallback>,
}

impl Prompt for SuspendingPrompt<'_, '_> {
    fn ask(&mut self, question: &str) -> io::Result<String> {
        let Some(progress) = self.progress else {
            return self.inner.ask(question);
        };

        let inner = &mut *self.inner;
        let mut answer = None;
        progress.suspend(&mut || answer = Some(inner.ask(question)));
        answer.unwrap_or_else(|| Err(io::Error::other("prompt was not shown")))
    }
}
