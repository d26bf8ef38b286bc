//! Hash cache module.
//!
//! Each scanned root keeps its digest map in a side-car JSON file so a later
//! run can skip rehashing.
//!
//! # Architecture
//!
//! * [`store`]: reads and writes the cache file.
//! * [`reconcile`]: decides, per root, whether to reuse the cache or rehash.
//!
//! # Cache Invalidation
//!
//! There is none. A reused cache is trusted as-is; the operator decides when
//! to refresh it.

pub mod reconcile;
pub mod store;

pub use reconcile::{
    CacheAction, CachePlan, CacheReconciler, MapSource, Reconciled, RefreshPolicy, RootRole,
};
pub use store::{CacheError, CacheResult, DigestCache};
