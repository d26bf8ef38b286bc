//! backupgap - find the files a backup is missing
//!
//! Hashes a source tree and a backup tree by content (SHA-256), caches the
//! digest maps in a side-car file at each root, and reports which source
//! files have no copy anywhere in the backup. Duplicates inside either tree
//! are counted and can be resolved while hashing or deleted afterwards.

pub mod actions;
pub mod app;
pub mod cache;
pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod gap;
pub mod logging;
pub mod output;
pub mod progress;
pub mod prompt;
pub mod scanner;

use crate::cli::Cli;
use crate::error::ExitCode;
use crate::prompt::TerminalPrompt;

/// Run the application with parsed arguments, asking questions on the
/// terminal.
///
/// # Errors
///
/// Returns an error for fatal failures; see [`app::run`].
pub fn run_app(cli: Cli) -> anyhow::Result<ExitCode> {
    let mut prompt = TerminalPrompt::new();
    let outcome = app::run(&cli, &mut prompt)?;
    Ok(outcome.exit_code)
}
