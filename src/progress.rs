//! Progress reporting utilities using indicatif.
//!
//! [`Progress`] implements [`ProgressCallback`] and draws a spinner while a
//! tree is walked and a bar while its files are hashed. Interactive
//! questions asked during hashing go through [`ProgressCallback::suspend`]
//! so the bar does not overwrite them.

use std::sync::Mutex;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

/// Phase name used while listing files.
pub const PHASE_WALK: &str = "walking";
/// Phase name used while hashing files.
pub const PHASE_HASH: &str = "hashing";

/// Progress callback for tree hashing phases.
pub trait ProgressCallback: Send + Sync {
    /// Called when a phase starts.
    ///
    /// # Arguments
    ///
    /// * `phase` - Name of the phase ([`PHASE_WALK`] or [`PHASE_HASH`])
    /// * `total` - Total number of items to process, 0 if unknown
    fn on_phase_start(&self, phase: &str, total: usize);

    /// Called for each item processed.
    ///
    /// # Arguments
    ///
    /// * `current` - Current item number (1-based)
    /// * `path` - Path being processed
    fn on_progress(&self, current: usize, path: &str);

    /// Called when a phase completes.
    fn on_phase_end(&self, phase: &str);

    /// Run `f` with any visible progress hidden.
    fn suspend(&self, f: &mut dyn FnMut()) {
        f();
    }
}

/// Progress reporter using indicatif.
pub struct Progress {
    bar: Mutex<Option<ProgressBar>>,
    label: Mutex<String>,
    quiet: bool,
}

impl Progress {
    /// Create a new progress reporter.
    ///
    /// # Arguments
    ///
    /// * `quiet` - If true, no progress bars will be displayed.
    ///
    /// # Examples
    ///
    /// ```
    /// use backupgap::progress::Progress;
    ///
    /// let progress = Progress::new(false);
    /// ```
    #[must_use]
    pub fn new(quiet: bool) -> Self {
        Self {
            bar: Mutex::new(None),
            label: Mutex::new(String::new()),
            quiet,
        }
    }

    /// Set the label shown in front of the current path, e.g. the root
    /// being hashed.
    pub fn set_label(&self, label: &str) {
        if let Ok(mut current) = self.label.lock() {
            *current = label.to_string();
        }
    }

    fn walking_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed_precise}] {pos} files")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
    }

    fn hashing_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{bar:40.green/blue}] {pos}/{len} ({percent}%) {msg} (ETA: {eta})",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█>-")
    }

    fn label(&self) -> String {
        self.label.lock().map(|l| l.clone()).unwrap_or_default()
    }
}

impl ProgressCallback for Progress {
    fn on_phase_start(&self, phase: &str, total: usize) {
        if self.quiet {
            return;
        }

        let label = self.label();
        let pb = if phase == PHASE_WALK {
            let pb = ProgressBar::new_spinner();
            pb.set_style(Self::walking_style());
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        } else {
            let pb = ProgressBar::new(total as u64);
            pb.set_style(Self::hashing_style());
            pb
        };
        if label.is_empty() {
            pb.set_message(phase.to_string());
        } else {
            pb.set_message(format!("{phase} {label}"));
        }

        if let Ok(mut bar) = self.bar.lock() {
            if let Some(old) = bar.replace(pb) {
                old.finish_and_clear();
            }
        }
    }

    fn on_progress(&self, current: usize, path: &str) {
        if self.quiet {
            return;
        }

        if let Ok(bar) = self.bar.lock() {
            if let Some(pb) = bar.as_ref() {
                pb.set_position(current as u64);
                pb.set_message(truncate_path(path, 30));
            }
        }
    }

    fn on_phase_end(&self, phase: &str) {
        if self.quiet {
            return;
        }

        if let Ok(mut bar) = self.bar.lock() {
            if let Some(pb) = bar.take() {
                pb.finish_and_clear();
                log::debug!("Phase {} complete after {} items", phase, pb.position());
            }
        }
    }

    fn suspend(&self, f: &mut dyn FnMut()) {
        let bar = self.bar.lock().ok().and_then(|b| b.clone());
        match bar {
            Some(pb) => pb.suspend(f),
            None => f(),
        }
    }
}

/// Truncate a path for display in the progress bar.
fn truncate_path(path: &str, max_len: usize) -> String {
    if path.chars().count() <= max_len {
        return path.to_string();
    }

    let file_name = std::path::Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let name_len = file_name.chars().count();
    if name_len >= max_len {
        let tail: String = file_name.chars().skip(name_len + 3 - max_len).collect();
        return format!("...{tail}");
    }

    format!(".../{file_name}")
}
