//! Plain-text report formats.
//!
//! - Missing list: one path per line. Within a digest group the first path
//!   is written bare and the rest indented by four spaces.
//! - Backed-up list: one path per line, flat.
//! - Duplicate report: per group, the basename of the first path as a
//!   header, then every path of the group indented.
//!
//! The console summary printed at the end of a run lives here too.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use yansi::Paint;

use crate::gap::{GapReport, PathGroup};
use crate::scanner::path_utils::display_name;

const INDENT: &str = "    ";

/// Write the missing-files list.
///
/// # Errors
///
/// Returns any error from `writer`.
pub fn write_missing<W: Write>(writer: &mut W, groups: &[PathGroup]) -> io::Result<()> {
    for group in groups {
        for (i, path) in group.paths.iter().enumerate() {
            if i > 0 {
                writer.write_all(INDENT.as_bytes())?;
            }
            writeln!(writer, "{}", path.display())?;
        }
    }
    Ok(())
}

/// Write the backed-up list.
///
/// # Errors
///
/// Returns any error from `writer`.
pub fn write_backed_up<W: Write>(writer: &mut W, groups: &[PathGroup]) -> io::Result<()> {
    for path in groups.iter().flat_map(|g| g.paths.iter()) {
        writeln!(writer, "{}", path.display())?;
    }
    Ok(())
}

/// Write a duplicate-group report.
///
/// # Errors
///
/// Returns any error from `writer`.
pub fn write_duplicates<W: Write>(writer: &mut W, groups: &[PathGroup]) -> io::Result<()> {
    for group in groups {
        let header = group.first().map(|p| display_name(p)).unwrap_or_default();
        writeln!(writer, "{header}")?;
        for path in &group.paths {
            writeln!(writer, "{INDENT}{}", path.display())?;
        }
    }
    Ok(())
}

/// Create `path` and fill it with `write`.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn save_to<F>(path: &Path, write: F) -> io::Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> io::Result<()>,
{
    let mut writer = BufWriter::new(File::create(path)?);
    write(&mut writer)?;
    writer.flush()
}

/// Counts shown at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunCounts {
    /// Source files whose content the backup lacks.
    pub missing: usize,
    /// Source files whose content the backup has.
    pub backed_up: usize,
    /// Redundant copies inside the source tree.
    pub source_duplicates: usize,
    /// Redundant copies inside the backup tree.
    pub backup_duplicates: usize,
}

/// Print the listing and counts to `writer`.
///
/// Colour follows the global `yansi` setting.
///
/// # Errors
///
/// Returns any error from `writer`.
pub fn write_console_report<W: Write>(
    writer: &mut W,
    report: &GapReport,
    counts: &RunCounts,
    list_paths: bool,
) -> io::Result<()> {
    writeln!(
        writer,
        "\nFound {} files in source that are not in backup.",
        counts.missing.red().bold()
    )?;
    if list_paths {
        write_missing(writer, &report.missing)?;
    }

    writeln!(
        writer,
        "\nFound {} files in source that ARE in backup.",
        counts.backed_up.green().bold()
    )?;
    if list_paths {
        write_backed_up(writer, &report.backed_up)?;
    }

    writeln!(
        writer,
        "\nDuplicates: {} in source, {} in backup.",
        counts.source_duplicates.yellow(),
        counts.backup_duplicates.yellow()
    )?;
    Ok(())
}
