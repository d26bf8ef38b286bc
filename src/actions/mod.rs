//! File actions module.
//!
//! This module provides functionality for:
//! - Permanent deletion or move to system trash
//! - Empty-directory cleanup after a deletion
//! - Confirmation-gated batch deletion
//!
//! ```no_run
//! use backupgap::actions::{delete_batch_confirmed, BatchOutcome, DeleteConfig};
//! use backupgap::prompt::TerminalPrompt;
//! use std::path::PathBuf;
//!
//! let paths = vec![PathBuf::from("/source/already-backed-up.jpg")];
//! let mut prompt = TerminalPrompt::new();
//! match delete_batch_confirmed(&paths, &DeleteConfig::default(), &mut prompt, "Delete?") {
//!     BatchOutcome::Completed(result) => println!("{}", result.summary()),
//!     BatchOutcome::Cancelled => println!("Deletion action cancelled."),
//! }
//! ```

pub mod delete;

// Re-export commonly used types
pub use delete::{
    delete_batch, delete_batch_confirmed, delete_file, delete_to_trash, permanent_delete,
    prune_empty_parents, validate_preserves_copy, BatchDeleteResult, BatchOutcome, DeleteConfig,
    DeleteError, DeleteResult,
};
