//! Cache reuse decisions.
//!
//! For each root the [`CacheReconciler`] first makes a [`CachePlan`]
//! (reuse the cache file or rehash) and then carries it out. Planning and
//! executing are separate so every question can be asked up front, before
//! a long hash starts.
//!
//! A root without a cache file is always hashed. With a cache file present,
//! [`RefreshPolicy`] decides: ask the operator, always rehash, or never
//! rehash. A reused cache is loaded verbatim; a corrupt one is an error.
//!
//! The backup root never runs a destructive duplicate policy.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::duplicates::{
    DigestMap, DuplicatePolicy, DuplicateResolver, FinderError, HashSummary, TreeHasher,
};
use crate::prompt::Prompt;

/// When an existing cache file is rebuilt.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum RefreshPolicy {
    /// Ask for each root that has a cache file
    #[default]
    Ask,
    /// Always rehash
    Always,
    /// Reuse any existing cache file
    Never,
}

/// Role a root plays in one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootRole {
    /// The tree checked for missing files.
    Source,
    /// The tree the source is compared against.
    Backup,
}

impl fmt::Display for RootRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Source => write!(f, "source"),
            Self::Backup => write!(f, "backup"),
        }
    }
}

/// What to do with one root's cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheAction {
    /// Load the cache file.
    Reuse,
    /// Hash the tree and overwrite the cache file.
    Rehash,
}

/// Decision for one root, made before any hashing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachePlan {
    /// Root directory.
    pub root: PathBuf,
    /// Role of the root.
    pub role: RootRole,
    /// Chosen action.
    pub action: CacheAction,
}

/// Where a reconciled map came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapSource {
    /// Loaded from the cache file.
    Cache,
    /// Freshly hashed.
    Fresh,
}

/// A root's digest map, ready for analysis.
#[derive(Debug)]
pub struct Reconciled {
    /// The digest map.
    pub map: DigestMap,
    /// Whether it was loaded or hashed.
    pub source: MapSource,
    /// Hashing details, present only for fresh maps.
    pub summary: Option<HashSummary>,
}

/// Chooses between cached and fresh digest maps.
#[derive(Debug)]
pub struct CacheReconciler<'r, 'p> {
    tree: &'r TreeHasher<'p>,
    refresh: RefreshPolicy,
}

impl<'r, 'p> CacheReconciler<'r, 'p> {
    /// Create a reconciler hashing with `tree`.
    #[must_use]
    pub fn new(tree: &'r TreeHasher<'p>, refresh: RefreshPolicy) -> Self {
        Self { tree, refresh }
    }

    /// Decide whether `root` is rehashed.
    pub fn plan(&self, root: &Path, role: RootRole, prompt: &mut dyn Prompt) -> CachePlan {
        let cache = self.tree.cache_for(root);

        let action = if !cache.exists() {
            log::info!("No hash map at {}; hashing {} tree", cache.path().display(), role);
            CacheAction::Rehash
        } else {
            match self.refresh {
                RefreshPolicy::Always => CacheAction::Rehash,
                RefreshPolicy::Never => CacheAction::Reuse,
                RefreshPolicy::Ask => {
                    let question =
                        format!("Do you want to update hash map: '{}'?", cache.path().display());
                    if prompt.confirm(&question) {
                        CacheAction::Rehash
                    } else {
                        CacheAction::Reuse
                    }
                }
            }
        };

        log::debug!("Plan for {} root {}: {:?}", role, root.display(), action);
        CachePlan {
            root: root.to_path_buf(),
            role,
            action,
        }
    }

    /// Carry out `plan`.
    ///
    /// `resolver` applies to source roots only; backup roots always use the
    /// report policy.
    ///
    /// # Errors
    ///
    /// [`FinderError::Cache`] if a reused cache cannot be read or parsed, or
    /// if a fresh map cannot be saved; root errors from hashing.
    pub fn execute(
        &self,
        plan: &CachePlan,
        resolver: &DuplicateResolver<'_>,
        prompt: &mut dyn Prompt,
    ) -> Result<Reconciled, FinderError> {
        match plan.action {
            CacheAction::Reuse => {
                let map = self.tree.cache_for(&plan.root).load()?;
                log::info!(
                    "Using cached hash map for {} ({} files)",
                    plan.root.display(),
                    map.file_count()
                );
                Ok(Reconciled {
                    map,
                    source: MapSource::Cache,
                    summary: None,
                })
            }
            CacheAction::Rehash => {
                let report;
                let resolver = if plan.role == RootRole::Backup && resolver.policy().is_destructive()
                {
                    report = DuplicateResolver::new(DuplicatePolicy::Report);
                    &report
                } else {
                    resolver
                };

                let outcome = self.tree.hash_tree(&plan.root, resolver, prompt)?;
                Ok(Reconciled {
                    map: outcome.map,
                    source: MapSource::Fresh,
                    summary: Some(outcome.summary),
                })
            }
        }
    }

    /// Plan and execute in one step.
    ///
    /// # Errors
    ///
    /// See [`execute`](Self::execute).
    pub fn reconcile(
        &self,
        root: &Path,
        role: RootRole,
        resolver: &DuplicateResolver<'_>,
        prompt: &mut dyn Prompt,
    ) -> Result<Reconciled, FinderError> {
        let plan = self.plan(root, role, prompt);
        self.execute(&plan, resolver, prompt)
    }
}
