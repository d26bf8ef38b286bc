//! One run of the tool, from parsed arguments to exit code.
//!
//! The run is strictly sequential:
//! 1. settle configuration and roots
//! 2. confirm a destructive duplicate policy
//! 3. ask every cache question (backup first, then source)
//! 4. load or hash the backup, then the source
//! 5. classify, print and write reports
//! 6. run confirmed batch deletions
//!
//! All operator input goes through the [`Prompt`] passed in.

use std::collections::HashSet;
use std::fs;
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bytesize::ByteSize;

use crate::actions::{
    delete_batch_confirmed, validate_preserves_copy, BatchDeleteResult, BatchOutcome, DeleteConfig,
};
use crate::cache::{CacheReconciler, Reconciled, RootRole};
use crate::cli::Cli;
use crate::config::Config;
use crate::duplicates::{DigestMap, DuplicatePolicy, DuplicateResolver, HashSummary, TreeHasher};
use crate::error::ExitCode;
use crate::gap::{duplicate_groups, redundant_copies, GapReport};
use crate::logging::init_logging;
use crate::output::text::{
    save_to, write_backed_up, write_console_report, write_duplicates, write_missing,
};
use crate::output::{JsonReport, RunCounts};
use crate::progress::Progress;
use crate::prompt::{Prompt, CONFIRM_PHRASE};
use crate::scanner::path_utils::{absolute_root, is_within};
use crate::scanner::{ContentDigest, Hasher, WalkerConfig};

/// What a finished run produced.
#[derive(Debug)]
pub struct RunOutcome {
    /// Exit code to report.
    pub exit_code: ExitCode,
    /// Classification of the source files.
    pub report: GapReport,
    /// Counts printed at the end of the analysis.
    pub counts: RunCounts,
    /// Duplicate policy actually used for the source.
    pub policy: DuplicatePolicy,
    /// Files removed by batch deletions.
    pub deleted: Vec<PathBuf>,
}

/// Run with `cli`, reading all answers from `prompt`.
///
/// # Errors
///
/// Fails on unusable roots, unreadable caches, and report files that
/// cannot be written. Individual hash and delete failures only downgrade
/// the exit code to [`ExitCode::PartialSuccess`].
pub fn run(cli: &Cli, prompt: &mut dyn Prompt) -> Result<RunOutcome> {
    init_logging(cli.verbose, cli.quiet);
    if cli.no_color || !io::stdout().is_terminal() {
        yansi::disable();
    }

    let mut config = Config::load(cli.config.as_deref());
    config.apply_cli(cli);
    config.validate()?;
    log::debug!("Effective configuration: {:?}", config);

    let Roots {
        source,
        backup,
        nested,
    } = resolve_roots(&cli.source, &cli.backup)?;

    let policy = confirm_policy(config.duplicate_policy, prompt);

    let delete_config = if config.use_trash {
        DeleteConfig::trash()
    } else {
        DeleteConfig::permanent()
    }
    .with_prune_empty_dirs(config.prune_empty_dirs);

    let mut walker_config =
        WalkerConfig::new(config.cache_file_name.clone(), config.follow_symlinks);
    if let Some(nested) = &nested {
        walker_config = walker_config.with_skip_dir(&nested.inner_dir);
    }

    let progress = Progress::new(cli.quiet);
    let tree = TreeHasher::new(Hasher::with_buffer_size(config.buffer_size), walker_config)
        .with_delete_config(delete_config.clone())
        .with_progress(&progress);
    let reconciler = CacheReconciler::new(&tree, config.refresh);

    let backup_plan = reconciler.plan(&backup, RootRole::Backup, prompt);
    let source_plan = reconciler.plan(&source, RootRole::Source, prompt);

    let resolver = DuplicateResolver::new(policy);

    progress.set_label(&backup.to_string_lossy());
    let backup_side = reconciler
        .execute(&backup_plan, &resolver, prompt)
        .with_context(|| format!("Failed to build hash map for backup {}", backup.display()))?;
    progress.set_label(&source.to_string_lossy());
    let source_side = reconciler
        .execute(&source_plan, &resolver, prompt)
        .with_context(|| format!("Failed to build hash map for source {}", source.display()))?;

    let mut partial = false;
    partial |= log_hash_summary(RootRole::Backup, &backup_side);
    partial |= log_hash_summary(RootRole::Source, &source_side);

    let mut source_map = source_side.map;
    let mut backup_map = backup_side.map;

    if let Some(nested) = &nested {
        let outer_map = match nested.outer {
            RootRole::Source => &mut source_map,
            RootRole::Backup => &mut backup_map,
        };
        let dropped = drop_subtree(outer_map, &nested.inner_dir);
        if dropped > 0 {
            log::warn!(
                "Ignored {} cached {} entries under {}",
                dropped,
                nested.outer,
                nested.inner_dir.display()
            );
        }
    }

    let report = GapReport::analyze(&backup_map, &source_map);
    let counts = RunCounts {
        missing: report.missing_count(),
        backed_up: report.backed_up_count(),
        source_duplicates: redundant_copies(&source_map),
        backup_duplicates: redundant_copies(&backup_map),
    };

    {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        write_console_report(&mut out, &report, &counts, !cli.no_list && !cli.quiet)
            .and_then(|()| out.flush())
            .context("Failed to print report")?;
    }

    write_reports(cli, &source, &backup, &source_map, &backup_map, &report)?;

    let mut deleted: Vec<PathBuf> = Vec::new();

    if cli.delete_backed {
        let paths: Vec<PathBuf> = report.backed_up_paths().cloned().collect();
        println!(
            "\nYou have chosen to delete {} source file(s) that are already backed up. \
             Please be very cautious!",
            paths.len()
        );
        if let Some(result) = run_batch(&paths, &delete_config, prompt, "Delete them?") {
            partial |= !result.all_succeeded();
            deleted.extend(result.deleted_paths().map(Path::to_path_buf));
        }
    }

    if cli.delete_duplicates {
        let already: HashSet<&Path> = deleted.iter().map(PathBuf::as_path).collect();
        let paths = redundant_source_copies(&source_map, &already)?;
        println!(
            "\nYou have chosen to delete {} duplicate file(s) from the source, \
             keeping the first copy of each group.",
            paths.len()
        );
        if let Some(result) = run_batch(&paths, &delete_config, prompt, "Delete them?") {
            partial |= !result.all_succeeded();
            deleted.extend(result.deleted_paths().map(Path::to_path_buf));
        }
    }

    if !deleted.is_empty() {
        log::warn!(
            "The hash map at {} still lists the {} deleted file(s); refresh it on the next run",
            tree.cache_for(&source).path().display(),
            deleted.len()
        );
    }

    let exit_code = if partial {
        ExitCode::PartialSuccess
    } else {
        ExitCode::Success
    };

    Ok(RunOutcome {
        exit_code,
        report,
        counts,
        policy,
        deleted,
    })
}

/// Source and backup roots of one run.
#[derive(Debug)]
struct Roots {
    source: PathBuf,
    backup: PathBuf,
    nested: Option<Nesting>,
}

/// One root lies inside the other.
#[derive(Debug, PartialEq, Eq)]
struct Nesting {
    /// Role of the enclosing root.
    outer: RootRole,
    /// The inner root as it appears under the outer root's walk.
    inner_dir: PathBuf,
}

/// Absolute source and backup roots, rejecting unusable combinations.
fn resolve_roots(source: &Path, backup: &Path) -> Result<Roots> {
    let source = absolute_root(source)
        .with_context(|| format!("Invalid source path {}", source.display()))?;
    let backup = absolute_root(backup)
        .with_context(|| format!("Invalid backup path {}", backup.display()))?;

    for (role, root) in [(RootRole::Source, &source), (RootRole::Backup, &backup)] {
        let meta = fs::metadata(root)
            .with_context(|| format!("Cannot access {} directory {}", role, root.display()))?;
        if !meta.is_dir() {
            anyhow::bail!("The {} path {} is not a directory", role, root.display());
        }
    }

    let source_real = fs::canonicalize(&source)
        .with_context(|| format!("Cannot resolve {}", source.display()))?;
    let backup_real = fs::canonicalize(&backup)
        .with_context(|| format!("Cannot resolve {}", backup.display()))?;

    if source_real == backup_real {
        anyhow::bail!(
            "Source and backup are the same directory: {}",
            source_real.display()
        );
    }

    let nested = if is_within(&backup_real, &source_real) {
        backup_real.strip_prefix(&source_real).ok().map(|rel| Nesting {
            outer: RootRole::Source,
            inner_dir: source.join(rel),
        })
    } else if is_within(&source_real, &backup_real) {
        source_real.strip_prefix(&backup_real).ok().map(|rel| Nesting {
            outer: RootRole::Backup,
            inner_dir: backup.join(rel),
        })
    } else {
        None
    };
    if let Some(nested) = &nested {
        log::warn!(
            "{} lies inside the {} root; it is left out of the {} scan",
            nested.inner_dir.display(),
            nested.outer,
            nested.outer
        );
    }

    Ok(Roots {
        source,
        backup,
        nested,
    })
}

/// Remove every path under `dir` from `map`. Returns how many were removed.
fn drop_subtree(map: &mut DigestMap, dir: &Path) -> usize {
    let inside: Vec<(ContentDigest, PathBuf)> = map
        .iter()
        .flat_map(|(digest, paths)| {
            paths
                .iter()
                .filter(|p| p.starts_with(dir))
                .map(move |p| (*digest, p.clone()))
        })
        .collect();
    for (digest, path) in &inside {
        map.remove_path(digest, path);
    }
    inside.len()
}

/// Require the confirmation phrase before automatic deletion.
fn confirm_policy(policy: DuplicatePolicy, prompt: &mut dyn Prompt) -> DuplicatePolicy {
    if policy != DuplicatePolicy::AutoDelete {
        return policy;
    }

    println!(
        "\nAutomatic duplicate deletion permanently removes the older of two \
         similarly named identical files in the source."
    );
    if prompt.confirm_phrase("Enable automatic deletion?", CONFIRM_PHRASE) {
        log::info!("Automatic duplicate deletion enabled");
        policy
    } else {
        log::warn!("Automatic deletion not confirmed; duplicates will only be reported");
        DuplicatePolicy::Report
    }
}

/// Log what hashing did for one root. Returns whether anything failed.
fn log_hash_summary(role: RootRole, side: &Reconciled) -> bool {
    let Some(summary) = &side.summary else {
        return false;
    };
    log_summary_details(role, summary);
    summary.has_failures()
}

fn log_summary_details(role: RootRole, summary: &HashSummary) {
    log::info!(
        "Hashed {} of {} {} files",
        summary.files_hashed,
        summary.files_found,
        role
    );
    if !summary.scan_errors.is_empty() {
        log::warn!(
            "{} {} file(s) could not be read and were left out",
            summary.scan_errors.len(),
            role
        );
    }
    if !summary.deleted.is_empty() {
        log::info!(
            "Removed {} duplicate(s) from the {}, freed {}",
            summary.deleted.len(),
            role,
            ByteSize::b(summary.bytes_freed())
        );
    }
    if summary.ambiguous > 0 {
        log::info!(
            "{} duplicate(s) in the {} were kept because their names differ",
            summary.ambiguous,
            role
        );
    }
}

/// Write every report file requested on the command line.
fn write_reports(
    cli: &Cli,
    source: &Path,
    backup: &Path,
    source_map: &DigestMap,
    backup_map: &DigestMap,
    report: &GapReport,
) -> Result<()> {
    if let Some(path) = &cli.missing {
        save_to(path, |w| write_missing(w, &report.missing))
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Missing file list saved to: {}", path.display());
    }
    if let Some(path) = &cli.backed {
        save_to(path, |w| write_backed_up(w, &report.backed_up))
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Backed-up file list saved to: {}", path.display());
    }
    if let Some(path) = &cli.source_duplicates {
        let groups = duplicate_groups(source_map);
        save_to(path, |w| write_duplicates(w, &groups))
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Source duplicate report saved to: {}", path.display());
    }
    if let Some(path) = &cli.backup_duplicates {
        let groups = duplicate_groups(backup_map);
        save_to(path, |w| write_duplicates(w, &groups))
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("Backup duplicate report saved to: {}", path.display());
    }
    if let Some(path) = &cli.json_report {
        let json = JsonReport::new(source, backup, source_map, backup_map, report);
        let mut file = io::BufWriter::new(
            fs::File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?,
        );
        json.write_to(&mut file)
            .map_err(anyhow::Error::from)
            .and_then(|()| file.flush().map_err(anyhow::Error::from))
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("JSON report saved to: {}", path.display());
    }
    Ok(())
}

/// All but the first surviving copy of each source duplicate group.
///
/// Paths in `already_deleted` are ignored, so a group emptied down to one
/// file by an earlier batch loses nothing more.
fn redundant_source_copies(
    map: &DigestMap,
    already_deleted: &HashSet<&Path>,
) -> Result<Vec<PathBuf>> {
    let mut doomed = Vec::new();
    for group in duplicate_groups(map) {
        let remaining: Vec<PathBuf> = group
            .paths
            .into_iter()
            .filter(|p| !already_deleted.contains(p.as_path()))
            .collect();
        if remaining.len() < 2 {
            continue;
        }
        let extra = &remaining[1..];
        validate_preserves_copy(extra, &remaining)?;
        doomed.extend_from_slice(extra);
    }
    Ok(doomed)
}

/// Run a confirmed batch and print its result. `None` if nothing ran.
fn run_batch(
    paths: &[PathBuf],
    config: &DeleteConfig,
    prompt: &mut dyn Prompt,
    question: &str,
) -> Option<BatchDeleteResult> {
    if paths.is_empty() {
        println!("No files found to delete.");
        return None;
    }
    match delete_batch_confirmed(paths, config, prompt, question) {
        BatchOutcome::Cancelled => {
            println!("Deletion action cancelled.");
            None
        }
        BatchOutcome::Completed(result) => {
            for (path, error) in &result.failures {
                eprintln!("Error deleting {}: {}", path.display(), error);
            }
            println!("{}", result.summary());
            Some(result)
        }
    }
}
