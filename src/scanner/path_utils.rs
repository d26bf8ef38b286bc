//! Path helpers for scan roots and filename comparison.
//!
//! Roots are made absolute (without resolving symlinks) so that every path
//! recorded in a digest map is absolute and stable across invocations from
//! different working directories.
//!
//! Filename stems are compared in Unicode NFC form. macOS stores names in
//! NFD, so `café (1).jpg` and `café.jpg` may differ byte-wise even though
//! one stem visibly contains the other.
//!
//! # Example
//!
//! ```
//! use backupgap::scanner::path_utils::{normalize_path_str, stems_related};
//! use std::path::Path;
//!
//! assert_eq!(normalize_path_str("cafe\u{0301}"), "café");
//! assert!(stems_related(Path::new("photo.jpg"), Path::new("photo (1).jpg")));
//! ```

use std::io;
use std::path::{Path, PathBuf};

use unicode_normalization::UnicodeNormalization;

/// Normalize a string to NFC (Composed) form.
#[must_use]
pub fn normalize_path_str(s: &str) -> String {
    s.nfc().collect()
}

/// Make a root path absolute relative to the current directory.
///
/// Symlinks are not resolved and `..` components are kept, so the path
/// stays recognisable to the operator.
///
/// # Errors
///
/// Returns an error if the current directory cannot be determined or the
/// path is empty.
pub fn absolute_root(path: &Path) -> io::Result<PathBuf> {
    std::path::absolute(path)
}

/// NFC-normalized filename stem (`photo (1)` for `photo (1).jpg`).
#[must_use]
pub fn file_stem_nfc(path: &Path) -> Option<String> {
    path.file_stem()
        .map(|s| normalize_path_str(&s.to_string_lossy()))
}

/// Whether both paths have exactly the same extension.
///
/// The comparison is case-sensitive; two paths without an extension match.
#[must_use]
pub fn same_extension(a: &Path, b: &Path) -> bool {
    a.extension() == b.extension()
}

/// Whether one path's stem is a substring of the other's.
#[must_use]
pub fn stems_related(a: &Path, b: &Path) -> bool {
    match (file_stem_nfc(a), file_stem_nfc(b)) {
        (Some(sa), Some(sb)) => sa.contains(&sb) || sb.contains(&sa),
        _ => false,
    }
}

/// Basename of a path for display, falling back to the whole path.
#[must_use]
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
}

/// Whether `inner` is `outer` or lies beneath it (component-wise).
#[must_use]
pub fn is_within(inner: &Path, outer: &Path) -> bool {
    inner.starts_with(outer)
}
