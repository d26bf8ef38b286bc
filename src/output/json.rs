//! JSON report for scripting and automation.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "source": "/data/photos",
//!   "backup": "/mnt/backup/photos",
//!   "missing": [
//!     { "hash": "ab12...", "files": ["/data/photos/new.jpg"] }
//!   ],
//!   "backed_up": [ ... ],
//!   "source_duplicates": [ ... ],
//!   "backup_duplicates": [ ... ],
//!   "summary": {
//!     "source_files": 120,
//!     "backup_files": 4000,
//!     "missing_files": 1,
//!     "backed_up_files": 119,
//!     "source_duplicates": 3,
//!     "backup_duplicates": 17
//!   }
//! }
//! ```

use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::duplicates::DigestMap;
use crate::gap::{duplicate_groups, redundant_copies, GapReport, PathGroup};

/// One digest group.
#[derive(Debug, Clone, Serialize)]
pub struct JsonGroup {
    /// SHA-256 as hexadecimal string (64 characters)
    pub hash: String,
    /// Paths sharing the content
    pub files: Vec<String>,
}

impl From<&PathGroup> for JsonGroup {
    fn from(group: &PathGroup) -> Self {
        Self {
            hash: group.digest.to_hex(),
            files: group
                .paths
                .iter()
                .map(|p| p.to_string_lossy().into_owned())
                .collect(),
        }
    }
}

/// Summary counts.
#[derive(Debug, Clone, Serialize)]
pub struct JsonSummary {
    /// Files recorded for the source root
    pub source_files: usize,
    /// Files recorded for the backup root
    pub backup_files: usize,
    /// Source files whose content the backup lacks
    pub missing_files: usize,
    /// Source files whose content the backup has
    pub backed_up_files: usize,
    /// Redundant copies in the source tree
    pub source_duplicates: usize,
    /// Redundant copies in the backup tree
    pub backup_duplicates: usize,
}

/// Complete JSON report.
#[derive(Debug, Clone, Serialize)]
pub struct JsonReport {
    /// Source root
    pub source: String,
    /// Backup root
    pub backup: String,
    /// Groups missing from the backup
    pub missing: Vec<JsonGroup>,
    /// Groups already in the backup
    pub backed_up: Vec<JsonGroup>,
    /// Duplicate groups inside the source tree
    pub source_duplicates: Vec<JsonGroup>,
    /// Duplicate groups inside the backup tree
    pub backup_duplicates: Vec<JsonGroup>,
    /// Counts
    pub summary: JsonSummary,
}

impl JsonReport {
    /// Build the report from both maps and their analysis.
    #[must_use]
    pub fn new(
        source_root: &Path,
        backup_root: &Path,
        source: &DigestMap,
        backup: &DigestMap,
        report: &GapReport,
    ) -> Self {
        let convert = |groups: &[PathGroup]| -> Vec<JsonGroup> {
            groups.iter().map(JsonGroup::from).collect()
        };

        Self {
            source: source_root.to_string_lossy().into_owned(),
            backup: backup_root.to_string_lossy().into_owned(),
            missing: convert(&report.missing),
            backed_up: convert(&report.backed_up),
            source_duplicates: convert(&duplicate_groups(source)),
            backup_duplicates: convert(&duplicate_groups(backup)),
            summary: JsonSummary {
                source_files: source.file_count(),
                backup_files: backup.file_count(),
                missing_files: report.missing_count(),
                backed_up_files: report.backed_up_count(),
                source_duplicates: redundant_copies(source),
                backup_duplicates: redundant_copies(backup),
            },
        }
    }

    /// Serialize to pretty-printed JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails (unlikely for valid data).
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write pretty JSON to a writer.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), JsonOutputError> {
        serde_json::to_writer_pretty(&mut *writer, self)?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}

/// Errors that can occur during JSON output.
#[derive(thiserror::Error, Debug)]
pub enum JsonOutputError {
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error during writing
    #[error("I/O error during JSON generation: {0}")]
    Io(#[from] std::io::Error),
}
