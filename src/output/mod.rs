//! Report writers.
//!
//! This module provides the output formats of a run:
//! - Plain text lists (missing, backed up, duplicates) and the console summary
//! - JSON for automation and scripting
//!
//! # Example
//!
//! ```
//! use backupgap::duplicates::DigestMap;
//! use backupgap::gap::GapReport;
//! use backupgap::output::text::write_missing;
//!
//! let report = GapReport::analyze(&DigestMap::new(), &DigestMap::new());
//! let mut out = Vec::new();
//! write_missing(&mut out, &report.missing).unwrap();
//! assert!(out.is_empty());
//! ```

pub mod json;
pub mod text;

// Re-export main types
pub use json::{JsonOutputError, JsonReport};
pub use text::RunCounts;
