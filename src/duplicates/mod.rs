//! Duplicate detection module.
//!
//! This module provides functionality for:
//! - The digest map shared by every stage ([`groups`])
//! - Duplicate resolution policies ([`resolver`])
//! - Hashing a whole tree into a digest map ([`tree`])

pub mod groups;
pub mod resolver;
pub mod tree;

pub use groups::DigestMap;
pub use resolver::{
    metadata_change_time, ChangeTimeSource, Decision, DuplicatePolicy, DuplicateResolver,
    FsChangeTime, Resolution,
};
pub use tree::{FinderError, HashOutcome, HashSummary, TreeHasher};
