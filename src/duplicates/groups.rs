//! Digest map: content digest to the paths sharing that content.
//!
//! # Overview
//!
//! A [`DigestMap`] is the result of hashing one tree. Keys are
//! [`ContentDigest`]s in the order they were first seen; each value is the
//! non-empty list of paths with that content, in discovery order. A path is
//! listed at most once across the whole map.
//!
//! The map serializes to a JSON object `{ "<hex digest>": ["path", ...] }`
//! and reads back with the same key order and path order.
//!
//! # Example
//!
//! ```
//! use backupgap::duplicates::DigestMap;
//! use backupgap::scanner::ContentDigest;
//! use std::path::PathBuf;
//!
//! let mut map = DigestMap::new();
//! let digest = ContentDigest::of_bytes(b"same");
//! map.insert(digest, PathBuf::from("/a.txt"));
//! map.insert(digest, PathBuf::from("/b.txt"));
//!
//! assert_eq!(map.len(), 1);
//! assert_eq!(map.file_count(), 2);
//! ```

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::scanner::ContentDigest;

/// Insertion-ordered mapping from content digest to file paths.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DigestMap {
    entries: IndexMap<ContentDigest, Vec<PathBuf>>,
}

impl DigestMap {
    /// Create an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct digests.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the map has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of paths across all digests.
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    /// Whether any path has this digest.
    #[must_use]
    pub fn contains_digest(&self, digest: &ContentDigest) -> bool {
        self.entries.contains_key(digest)
    }

    /// Paths recorded for `digest`, in discovery order.
    #[must_use]
    pub fn get(&self, digest: &ContentDigest) -> Option<&[PathBuf]> {
        self.entries.get(digest).map(Vec::as_slice)
    }

    /// Append `path` to the list for `digest`.
    ///
    /// Returns `false` (and leaves the map unchanged) if the path is
    /// already listed under this digest.
    pub fn insert(&mut self, digest: ContentDigest, path: PathBuf) -> bool {
        let paths = self.entries.entry(digest).or_default();
        if paths.contains(&path) {
            return false;
        }
        paths.push(path);
        true
    }

    /// Replace every path recorded for `digest` with `paths`.
    ///
    /// The digest keeps its position. An empty `paths` removes the entry.
    pub fn replace(&mut self, digest: ContentDigest, paths: Vec<PathBuf>) {
        if paths.is_empty() {
            self.entries.shift_remove(&digest);
        } else {
            self.entries.insert(digest, paths);
        }
    }

    /// Remove a single path from `digest`'s list.
    ///
    /// The entry is dropped once its list becomes empty. Returns whether the
    /// path was present.
    pub fn remove_path(&mut self, digest: &ContentDigest, path: &Path) -> bool {
        let Some(paths) = self.entries.get_mut(digest) else {
            return false;
        };
        let Some(index) = paths.iter().position(|p| p == path) else {
            return false;
        };
        paths.remove(index);
        if paths.is_empty() {
            self.entries.shift_remove(digest);
        }
        true
    }

    /// Iterate over `(digest, paths)` in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&ContentDigest, &[PathBuf])> {
        self.entries.iter().map(|(d, p)| (d, p.as_slice()))
    }

    /// Iterate over every path in the map.
    pub fn paths(&self) -> impl Iterator<Item = &PathBuf> {
        self.entries.values().flatten()
    }
}

impl FromIterator<(ContentDigest, PathBuf)> for DigestMap {
    fn from_iter<I: IntoIterator<Item = (ContentDigest, PathBuf)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (digest, path) in iter {
            map.insert(digest, path);
        }
        map
    }
}
