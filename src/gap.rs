//! Backup-gap analysis.
//!
//! Pure functions over finished [`DigestMap`]s: no I/O, no mutation.
//!
//! Every source path lands in exactly one of two lists. If its digest is
//! absent from the backup map it is *missing*, otherwise it is *backed up*.
//! Paths stay grouped by digest, in source map order.
//!
//! # Example
//!
//! ```
//! use backupgap::duplicates::DigestMap;
//! use backupgap::gap::{redundant_copies, GapReport};
//! use backupgap::scanner::ContentDigest;
//! use std::path::PathBuf;
//!
//! let d1 = ContentDigest::of_bytes(b"one");
//! let d2 = ContentDigest::of_bytes(b"two");
//!
//! let backup: DigestMap = vec![(d1, PathBuf::from("/b/one"))].into_iter().collect();
//! let source: DigestMap = vec![
//!     (d1, PathBuf::from("/s/one")),
//!     (d1, PathBuf::from("/s/one-copy")),
//!     (d2, PathBuf::from("/s/two")),
//! ]
//! .into_iter()
//! .collect();
//!
//! let report = GapReport::analyze(&backup, &source);
//! assert_eq!(report.missing_count(), 1);
//! assert_eq!(report.backed_up_count(), 2);
//! assert_eq!(redundant_copies(&source), 1);
//! ```

use std::path::PathBuf;

use serde::Serialize;

use crate::duplicates::DigestMap;
use crate::scanner::ContentDigest;

/// Paths sharing one digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathGroup {
    /// Shared content digest.
    pub digest: ContentDigest,
    /// Paths in discovery order.
    pub paths: Vec<PathBuf>,
}

impl PathGroup {
    fn new(digest: ContentDigest, paths: &[PathBuf]) -> Self {
        Self {
            digest,
            paths: paths.to_vec(),
        }
    }

    /// First path of the group.
    #[must_use]
    pub fn first(&self) -> Option<&PathBuf> {
        self.paths.first()
    }
}

/// Source files split by whether the backup has their content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GapReport {
    /// Groups whose digest the backup lacks.
    pub missing: Vec<PathGroup>,
    /// Groups whose digest the backup has.
    pub backed_up: Vec<PathGroup>,
}

impl GapReport {
    /// Classify every path of `source` against `backup`.
    #[must_use]
    pub fn analyze(backup: &DigestMap, source: &DigestMap) -> Self {
        let mut report = Self::default();
        for (digest, paths) in source.iter() {
            let group = PathGroup::new(*digest, paths);
            if backup.contains_digest(digest) {
                report.backed_up.push(group);
            } else {
                report.missing.push(group);
            }
        }
        report
    }

    /// Every missing path, group by group.
    pub fn missing_paths(&self) -> impl Iterator<Item = &PathBuf> {
        self.missing.iter().flat_map(|g| g.paths.iter())
    }

    /// Every backed-up path, group by group.
    pub fn backed_up_paths(&self) -> impl Iterator<Item = &PathBuf> {
        self.backed_up.iter().flat_map(|g| g.paths.iter())
    }

    /// Number of missing paths.
    #[must_use]
    pub fn missing_count(&self) -> usize {
        self.missing.iter().map(|g| g.paths.len()).sum()
    }

    /// Number of backed-up paths.
    #[must_use]
    pub fn backed_up_count(&self) -> usize {
        self.backed_up.iter().map(|g| g.paths.len()).sum()
    }
}

/// Groups of a map holding more than one path.
#[must_use]
pub fn duplicate_groups(map: &DigestMap) -> Vec<PathGroup> {
    map.iter()
        .filter(|(_, paths)| paths.len() > 1)
        .map(|(digest, paths)| PathGroup::new(*digest, paths))
        .collect()
}

/// Redundant copies in a map: the sum of `len - 1` over its groups.
#[must_use]
pub fn redundant_copies(map: &DigestMap) -> usize {
    map.iter().map(|(_, paths)| paths.len().saturating_sub(1)).sum()
}

/// Every path but the first of each group, in map order.
#[must_use]
pub fn redundant_paths(map: &DigestMap) -> Vec<PathBuf> {
    map.iter()
        .flat_map(|(_, paths)| paths.iter().skip(1).cloned())
        .collect()
}
