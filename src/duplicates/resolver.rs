//! Duplicate resolution policies.
//!
//! # Overview
//!
//! When a freshly hashed file has the same digest as a file already in the
//! [`DigestMap`], the [`DuplicateResolver`] decides which copies survive.
//! It updates the map in place and returns the deletions it wants as a
//! [`Resolution`]; it never touches the filesystem itself. The caller runs
//! the deletions and reports them.
//!
//! # Policies
//!
//! - [`DuplicatePolicy::Report`]: keep every copy, log a notice.
//! - [`DuplicatePolicy::Interactive`]: ask the operator until they pick the
//!   existing copy, the new copy, or both.
//! - [`DuplicatePolicy::AutoDelete`]: if the extensions match exactly and one
//!   stem is a substring of the other, delete the copy with the older change
//!   time (ties delete the new copy). Otherwise keep both.
//!
//! # Example
//!
//! ```
//! use backupgap::duplicates::{DigestMap, DuplicatePolicy, DuplicateResolver, Decision};
//! use backupgap::prompt::ScriptedPrompt;
//! use backupgap::scanner::ContentDigest;
//! use std::path::PathBuf;
//!
//! let resolver = DuplicateResolver::new(DuplicatePolicy::Report);
//! let mut map = DigestMap::new();
//! let mut prompt = ScriptedPrompt::silent();
//! let digest = ContentDigest::of_bytes(b"x");
//!
//! resolver.resolve(&mut map, digest, PathBuf::from("/a"), &mut prompt);
//! let res = resolver.resolve(&mut map, digest, PathBuf::from("/b"), &mut prompt);
//!
//! assert_eq!(res.decision, Decision::Recorded);
//! assert!(res.deletions.is_empty());
//! assert_eq!(map.file_count(), 2);
//! ```

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use super::DigestMap;
use crate::prompt::Prompt;
use crate::scanner::path_utils::{same_extension, stems_related};
use crate::scanner::ContentDigest;

/// How digest collisions inside one tree are handled.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicatePolicy {
    /// Keep all copies and report them
    #[default]
    Report,
    /// Ask which copy to keep for every duplicate found
    Interactive,
    /// Delete the older of two similarly named copies
    AutoDelete,
}

impl DuplicatePolicy {
    /// Whether this policy may delete files during hashing.
    #[must_use]
    pub fn is_destructive(self) -> bool {
        !matches!(self, Self::Report)
    }
}

impl fmt::Display for DuplicatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Report => write!(f, "report"),
            Self::Interactive => write!(f, "interactive"),
            Self::AutoDelete => write!(f, "auto-delete"),
        }
    }
}

/// What the resolver decided for one discovered path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// First path with this digest.
    Unique,
    /// Duplicate recorded alongside the existing copies.
    Recorded,
    /// Existing copies kept, the new path is to be deleted.
    KeptExisting,
    /// New path kept, one or more existing copies are to be deleted.
    KeptNew,
    /// Operator chose to keep every copy.
    KeptBoth,
    /// Automatic deletion could not tell the copies apart; all kept.
    Ambiguous,
}

/// Outcome of resolving one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// The decision taken.
    pub decision: Decision,
    /// Files the caller should delete, already removed from the map.
    pub deletions: Vec<PathBuf>,
}

impl Resolution {
    fn keep(decision: Decision) -> Self {
        Self {
            decision,
            deletions: Vec::new(),
        }
    }

    fn delete(decision: Decision, deletions: Vec<PathBuf>) -> Self {
        Self {
            decision,
            deletions,
        }
    }
}

/// Lookup of a file's change time.
pub trait ChangeTimeSource {
    /// Change time of `path`, or `None` if it cannot be read.
    fn change_time(&self, path: &Path) -> Option<SystemTime>;
}

impl<F> ChangeTimeSource for F
where
    F: Fn(&Path) -> Option<SystemTime>,
{
    fn change_time(&self, path: &Path) -> Option<SystemTime> {
        self(path)
    }
}

/// Reads change times from filesystem metadata.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsChangeTime;

impl ChangeTimeSource for FsChangeTime {
    fn change_time(&self, path: &Path) -> Option<SystemTime> {
        fs::metadata(path).ok().and_then(|m| metadata_change_time(&m))
    }
}

/// Inode change time (`st_ctime`) on Unix, creation time elsewhere.
#[cfg(unix)]
#[must_use]
pub fn metadata_change_time(metadata: &fs::Metadata) -> Option<SystemTime> {
    use std::os::unix::fs::MetadataExt;

    let secs = metadata.ctime();
    let nanos = Duration::from_nanos(u64::try_from(metadata.ctime_nsec()).ok()?);
    if secs >= 0 {
        UNIX_EPOCH.checked_add(Duration::from_secs(secs.unsigned_abs()) + nanos)
    } else {
        UNIX_EPOCH
            .checked_sub(Duration::from_secs(secs.unsigned_abs()))?
            .checked_add(nanos)
    }
}

/// Inode change time (`st_ctime`) on Unix, creation time elsewhere.
#[cfg(not(unix))]
#[must_use]
pub fn metadata_change_time(metadata: &fs::Metadata) -> Option<SystemTime> {
    metadata.created().ok()
}

static FS_CHANGE_TIME: FsChangeTime = FsChangeTime;

/// Applies a [`DuplicatePolicy`] to each path recorded in a digest map.
pub struct DuplicateResolver<'a> {
    policy: DuplicatePolicy,
    times: &'a dyn ChangeTimeSource,
}

impl fmt::Debug for DuplicateResolver<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DuplicateResolver")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl DuplicateResolver<'static> {
    /// Resolver reading change times from the filesystem.
    #[must_use]
    pub fn new(policy: DuplicatePolicy) -> Self {
        Self {
            policy,
            times: &FS_CHANGE_TIME,
        }
    }
}

impl<'a> DuplicateResolver<'a> {
    /// Resolver with a custom change-time lookup.
    #[must_use]
    pub fn with_change_times(policy: DuplicatePolicy, times: &'a dyn ChangeTimeSource) -> Self {
        Self { policy, times }
    }

    /// Active policy.
    #[must_use]
    pub fn policy(&self) -> DuplicatePolicy {
        self.policy
    }

    /// Record `path` (with content `digest`) in `map`, resolving any collision.
    ///
    /// The map is updated to reflect the decision: paths listed in the
    /// returned deletions are no longer in the map.
    pub fn resolve(
        &self,
        map: &mut DigestMap,
        digest: ContentDigest,
        path: PathBuf,
        prompt: &mut dyn Prompt,
    ) -> Resolution {
        let existing = match map.get(&digest) {
            Some(paths) if paths.contains(&path) => {
                log::debug!("Already recorded: {}", path.display());
                return Resolution::keep(Decision::Recorded);
            }
            Some(paths) => paths.to_vec(),
            None => {
                map.insert(digest, path);
                return Resolution::keep(Decision::Unique);
            }
        };

        match self.policy {
            DuplicatePolicy::Report => Self::resolve_report(map, digest, path, &existing),
            DuplicatePolicy::Interactive => {
                Self::resolve_interactive(map, digest, path, &existing, prompt)
            }
            DuplicatePolicy::AutoDelete => self.resolve_auto(map, digest, path, &existing),
        }
    }

    fn resolve_report(
        map: &mut DigestMap,
        digest: ContentDigest,
        path: PathBuf,
        existing: &[PathBuf],
    ) -> Resolution {
        log::info!(
            "Duplicate: {} has the same content as {}",
            path.display(),
            existing[0].display()
        );
        map.insert(digest, path);
        Resolution::keep(Decision::Recorded)
    }

    fn resolve_interactive(
        map: &mut DigestMap,
        digest: ContentDigest,
        path: PathBuf,
        existing: &[PathBuf],
        prompt: &mut dyn Prompt,
    ) -> Resolution {
        let question = interactive_question(existing, &path);

        loop {
            let answer = match prompt.ask(&question) {
                Ok(answer) => answer,
                Err(e) => {
                    log::warn!("No answer ({}); keeping both copies of {}", e, path.display());
                    map.insert(digest, path);
                    return Resolution::keep(Decision::KeptBoth);
                }
            };

            match answer.trim().to_ascii_lowercase().as_str() {
                "1" => return Resolution::delete(Decision::KeptExisting, vec![path]),
                "2" => {
                    map.replace(digest, vec![path]);
                    return Resolution::delete(Decision::KeptNew, existing.to_vec());
                }
                "b" | "both" => {
                    map.insert(digest, path);
                    return Resolution::keep(Decision::KeptBoth);
                }
                other => log::warn!("Invalid choice '{}': enter 1, 2 or b", other),
            }
        }
    }

    fn resolve_auto(
        &self,
        map: &mut DigestMap,
        digest: ContentDigest,
        path: PathBuf,
        existing: &[PathBuf],
    ) -> Resolution {
        let candidate = existing
            .iter()
            .find(|old| same_extension(old, &path) && stems_related(old, &path));

        let Some(old) = candidate else {
            log::warn!(
                "Ambiguous duplicate, kept both: {} and {}",
                existing[0].display(),
                path.display()
            );
            map.insert(digest, path);
            return Resolution::keep(Decision::Ambiguous);
        };

        let (Some(old_time), Some(new_time)) =
            (self.times.change_time(old), self.times.change_time(&path))
        else {
            log::warn!(
                "Cannot read change time, kept both: {} and {}",
                old.display(),
                path.display()
            );
            map.insert(digest, path);
            return Resolution::keep(Decision::Ambiguous);
        };

        if new_time > old_time {
            log::info!("Keeping newer {}, deleting {}", path.display(), old.display());
            let mut paths: Vec<PathBuf> = existing.iter().filter(|p| *p != old).cloned().collect();
            paths.push(path);
            map.replace(digest, paths);
            Resolution::delete(Decision::KeptNew, vec![old.clone()])
        } else {
            log::info!(
                "Keeping {} ({}), deleting {}",
                old.display(),
                existing_kept_because(old_time, new_time),
                path.display()
            );
            Resolution::delete(Decision::KeptExisting, vec![path])
        }
    }
}

/// Why the recorded copy survives when the new one is not newer.
fn existing_kept_because(old_time: SystemTime, new_time: SystemTime) -> &'static str {
    if old_time == new_time {
        "same change time, seen first"
    } else {
        "newer"
    }
}

fn interactive_question(existing: &[PathBuf], path: &Path) -> String {
    let mut question = String::from("Identical content found:\n");
    for (i, old) in existing.iter().enumerate() {
        let label = if i == 0 { "  [1] " } else { "      " };
        question.push_str(label);
        question.push_str(&old.display().to_string());
        question.push('\n');
    }
    question.push_str("  [2] ");
    question.push_str(&path.display().to_string());
    question.push_str("\nKeep [1] existing, [2] new, or [b]oth?");
    question
}
