//! Command-line interface definitions for backupgap.
//!
//! This module defines all CLI arguments and options using the clap derive API.
//!
//! # Example
//!
//! ```bash
//! # Which photos are not in the backup yet?
//! backupgap ~/Pictures /mnt/backup/Pictures -m missing.txt
//!
//! # Delete source files the backup already holds (asks for 'confirm')
//! backupgap ~/Pictures /mnt/backup/Pictures --delete-backed
//!
//! # Clean "photo (1).jpg" style copies from the source while hashing
//! backupgap ~/Pictures /mnt/backup/Pictures -d auto-delete
//! ```

use std::path::PathBuf;

use bytesize::ByteSize;
use clap::Parser;

use crate::cache::RefreshPolicy;
use crate::duplicates::DuplicatePolicy;

/// Find files in a source tree that are not backed up, by content.
///
/// Both trees are hashed (SHA-256) and the digests cached in a side-car file
/// at each root. Every source file is then reported as missing from the
/// backup or already backed up. Duplicates inside each tree are counted and
/// can optionally be removed.
#[derive(Debug, Parser)]
#[command(name = "backupgap")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, env = "NO_COLOR")]
    pub no_color: bool,

    /// Print fatal errors as JSON on stderr
    #[arg(long)]
    pub json_errors: bool,

    /// Path to a TOML configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory whose files should be backed up
    #[arg(value_name = "SOURCE")]
    pub source: PathBuf,

    /// Directory holding the backup
    #[arg(value_name = "BACKUP")]
    pub backup: PathBuf,

    /// Write the files missing from the backup to this file
    #[arg(short, long, value_name = "FILE")]
    pub missing: Option<PathBuf>,

    /// Write the source files already in the backup to this file
    #[arg(short, long, value_name = "FILE")]
    pub backed: Option<PathBuf>,

    /// Write the duplicate groups found in the source to this file
    #[arg(long, value_name = "FILE")]
    pub source_duplicates: Option<PathBuf>,

    /// Write the duplicate groups found in the backup to this file
    #[arg(long, value_name = "FILE")]
    pub backup_duplicates: Option<PathBuf>,

    /// Write a JSON report to this file
    #[arg(long, value_name = "FILE")]
    pub json_report: Option<PathBuf>,

    /// Do not list missing and backed-up paths on the console
    #[arg(long)]
    pub no_list: bool,

    /// Delete source files that are already backed up (asks for confirmation)
    #[arg(long)]
    pub delete_backed: bool,

    /// Delete all but the first copy of each source duplicate group
    /// (asks for confirmation)
    #[arg(long)]
    pub delete_duplicates: bool,

    /// How duplicates found while hashing the source are handled
    ///
    /// auto-delete asks for confirmation once at startup.
    #[arg(short = 'd', long = "duplicates", value_enum, value_name = "POLICY")]
    pub duplicate_policy: Option<DuplicatePolicy>,

    /// When an existing hash map is rebuilt
    #[arg(long, value_enum, value_name = "WHEN")]
    pub refresh: Option<RefreshPolicy>,

    /// Name of the hash map file kept at each root
    #[arg(long, value_name = "NAME")]
    pub cache_name: Option<String>,

    /// Read buffer size for hashing (e.g. 8KiB, 1MiB)
    #[arg(long, value_name = "SIZE", value_parser = parse_buffer_size)]
    pub buffer_size: Option<usize>,

    /// Move deleted files to the system trash instead of unlinking them
    #[arg(long)]
    pub trash: bool,

    /// Leave directories emptied by deletions in place
    #[arg(long)]
    pub keep_empty_dirs: bool,

    /// Follow symbolic links during scan
    ///
    /// Warning: May cause infinite loops if symlinks form cycles.
    #[arg(long)]
    pub follow_symlinks: bool,
}

/// Parse a human-readable buffer size into bytes.
///
/// Accepts anything [`ByteSize`] parses (`8192`, `8KiB`, `1 MB`). Zero is
/// rejected.
///
/// # Examples
///
/// ```
/// use backupgap::cli::parse_buffer_size;
///
/// assert_eq!(parse_buffer_size("8192").unwrap(), 8192);
/// assert_eq!(parse_buffer_size("8KiB").unwrap(), 8192);
/// assert!(parse_buffer_size("0").is_err());
/// ```
///
/// # Errors
///
/// Returns an error for unparsable input, zero, or a size that does not
/// fit in memory addresses.
pub fn parse_buffer_size(s: &str) -> Result<usize, String> {
    let size: ByteSize = s.trim().parse().map_err(|e| format!("Invalid size '{s}': {e}"))?;
    let bytes = usize::try_from(size.as_u64()).map_err(|_| format!("Size too large: '{s}'"))?;
    if bytes == 0 {
        return Err("Buffer size must be greater than zero".to_string());
    }
    Ok(bytes)
}
