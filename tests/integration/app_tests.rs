use backupgap::app::{run, RunOutcome};
use backupgap::cli::Cli;
use backupgap::duplicates::DuplicatePolicy;
use backupgap::error::ExitCode;
use backupgap::prompt::ScriptedPrompt;
use clap::Parser;
use std::fs;
use std::path::Path;
use tempfile::{tempdir, TempDir};

use crate::ENV_MUTEX;

struct Fixture {
    source: TempDir,
    backup: TempDir,
    scratch: TempDir,
}

impl Fixture {
    /// Source holds one unique file and one file that is also in the
    /// backup under another name.
    fn new() -> Self {
        let fixture = Self {
            source: tempdir().unwrap(),
            backup: tempdir().unwrap(),
            scratch: tempdir().unwrap(),
        };
        fixture.source_file("only_here.txt", b"unique");
        fixture.source_file("docs/saved.txt", b"saved");
        fixture.backup_file("archive/saved-renamed.txt", b"saved");
        fixture
    }

    fn source_file(&self, rel: &str, content: &[u8]) {
        write(&self.source.path().join(rel), content);
    }

    fn backup_file(&self, rel: &str, content: &[u8]) {
        write(&self.backup.path().join(rel), content);
    }

    fn cli(&self, extra: &[&str]) -> Cli {
        cli_for(
            self.source.path(),
            self.backup.path(),
            &self.scratch.path().join("absent.toml"),
            extra,
        )
    }

    fn run(&self, extra: &[&str], prompt: &mut ScriptedPrompt) -> RunOutcome {
        run_locked(&self.cli(extra), prompt)
    }
}

fn cli_for(source: &Path, backup: &Path, config: &Path, extra: &[&str]) -> Cli {
    let mut args = vec![
        "backupgap".to_string(),
        "-q".to_string(),
        "--config".to_string(),
        config.to_string_lossy().into_owned(),
        source.to_string_lossy().into_owned(),
        backup.to_string_lossy().into_owned(),
    ];
    args.extend(extra.iter().map(|s| (*s).to_string()));
    Cli::try_parse_from(args).unwrap()
}

fn run_locked(cli: &Cli, prompt: &mut ScriptedPrompt) -> RunOutcome {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    run(cli, prompt).unwrap()
}

fn write(path: &Path, content: &[u8]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

#[test]
fn test_first_run_hashes_both_roots_without_questions() {
    let fx = Fixture::new();
    let mut prompt = ScriptedPrompt::silent();

    let outcome = fx.run(&[], &mut prompt);

    assert_eq!(outcome.exit_code, ExitCode::Success);
    assert_eq!(outcome.counts.missing, 1);
    assert_eq!(outcome.counts.backed_up, 1);
    assert_eq!(
        outcome.report.missing_paths().collect::<Vec<_>>(),
        vec![&fx.source.path().join("only_here.txt")]
    );
    assert!(prompt.asked().is_empty());
    assert!(fx.source.path().join("hash.json").is_file());
    assert!(fx.backup.path().join("hash.json").is_file());
}

#[test]
fn test_refresh_questions_come_backup_first() {
    let fx = Fixture::new();
    fx.run(&[], &mut ScriptedPrompt::silent());

    // New content after the caches were written is invisible when reused.
    fx.source_file("late.txt", b"late");
    let mut prompt = ScriptedPrompt::new(["n", "n"]);
    let outcome = fx.run(&[], &mut prompt);

    assert_eq!(prompt.asked().len(), 2);
    assert!(prompt.asked()[0].contains(&fx.backup.path().join("hash.json").display().to_string()));
    assert!(prompt.asked()[1].contains(&fx.source.path().join("hash.json").display().to_string()));
    assert_eq!(outcome.counts.missing, 1);

    let outcome = fx.run(&["--refresh", "always"], &mut ScriptedPrompt::silent());
    assert_eq!(outcome.counts.missing, 2);
}

#[test]
fn test_report_files_are_written() {
    let fx = Fixture::new();
    let missing = fx.scratch.path().join("missing.txt");
    let backed = fx.scratch.path().join("backed.txt");
    let json = fx.scratch.path().join("report.json");

    fx.run(
        &[
            "-m",
            missing.to_str().unwrap(),
            "-b",
            backed.to_str().unwrap(),
            "--json-report",
            json.to_str().unwrap(),
        ],
        &mut ScriptedPrompt::silent(),
    );

    assert_eq!(
        fs::read_to_string(&missing).unwrap(),
        format!("{}\n", fx.source.path().join("only_here.txt").display())
    );
    assert_eq!(
        fs::read_to_string(&backed).unwrap(),
        format!("{}\n", fx.source.path().join("docs/saved.txt").display())
    );
    let value: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&json).unwrap()).unwrap();
    assert_eq!(value["summary"]["missing_files"], 1);
    assert_eq!(value["summary"]["backed_up_files"], 1);
}

#[test]
fn test_delete_backed_needs_confirmation() {
    let fx = Fixture::new();
    let saved = fx.source.path().join("docs/saved.txt");

    let outcome = fx.run(&["--delete-backed"], &mut ScriptedPrompt::new(["yes"]));
    assert!(saved.exists());
    assert!(outcome.deleted.is_empty());

    let outcome = fx.run(
        &["--delete-backed", "--refresh", "never"],
        &mut ScriptedPrompt::new(["confirm"]),
    );
    assert!(!saved.exists());
    // The emptied directory went with it.
    assert!(!fx.source.path().join("docs").exists());
    assert!(fx.source.path().join("only_here.txt").exists());
    assert_eq!(outcome.deleted, vec![saved]);
    assert_eq!(outcome.exit_code, ExitCode::Success);
}

#[test]
fn test_delete_duplicates_keeps_first_copy() {
    let fx = Fixture::new();
    fx.source_file("b.txt", b"unique");
    fx.source_file("c.txt", b"unique");

    let outcome = fx.run(&["--delete-duplicates"], &mut ScriptedPrompt::new(["confirm"]));

    assert_eq!(outcome.counts.source_duplicates, 2);
    assert!(fx.source.path().join("b.txt").exists());
    assert!(!fx.source.path().join("c.txt").exists());
    assert!(!fx.source.path().join("only_here.txt").exists());
}

#[test]
fn test_delete_duplicates_skips_files_already_deleted() {
    let fx = Fixture::new();
    fx.source_file("docs/saved copy.txt", b"saved");

    let mut prompt = ScriptedPrompt::new(["confirm"]);
    let outcome = fx.run(&["--delete-backed", "--delete-duplicates"], &mut prompt);

    // Both copies went with the first batch; the second had nothing left.
    assert_eq!(outcome.deleted.len(), 2);
    assert_eq!(prompt.asked().len(), 1);
    assert!(fx.source.path().join("only_here.txt").exists());
}

#[test]
fn test_auto_delete_requires_phrase() {
    let fx = Fixture::new();
    fx.source_file("photo.jpg", b"img");
    fx.source_file("photo (1).jpg", b"img");

    let outcome = fx.run(&["-d", "auto-delete"], &mut ScriptedPrompt::new(["sure"]));

    assert_eq!(outcome.policy, DuplicatePolicy::Report);
    assert!(fx.source.path().join("photo.jpg").exists());
    assert!(fx.source.path().join("photo (1).jpg").exists());
}

#[test]
fn test_auto_delete_removes_renamed_copy() {
    let fx = Fixture::new();
    fx.source_file("photo.jpg", b"img");
    fx.source_file("photo (1).jpg", b"img");

    let outcome = fx.run(&["-d", "auto-delete"], &mut ScriptedPrompt::new(["confirm"]));

    assert_eq!(outcome.policy, DuplicatePolicy::AutoDelete);
    let left = ["photo.jpg", "photo (1).jpg"]
        .iter()
        .filter(|name| fx.source.path().join(name).exists())
        .count();
    assert_eq!(left, 1);
    assert_eq!(outcome.counts.source_duplicates, 0);
}

#[test]
fn test_same_root_is_rejected() {
    let fx = Fixture::new();
    let path = fx.source.path().to_string_lossy().into_owned();
    let cli = Cli::try_parse_from(["backupgap", "-q", &path, &path]).unwrap();

    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let err = run(&cli, &mut ScriptedPrompt::silent()).unwrap_err();
    assert!(err.to_string().contains("same directory"));
}

#[test]
fn test_missing_root_is_rejected() {
    let fx = Fixture::new();
    let cli = fx.cli(&[]);
    let cli = Cli {
        backup: fx.scratch.path().join("nowhere"),
        ..cli
    };

    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    assert!(run(&cli, &mut ScriptedPrompt::silent()).is_err());
}

#[test]
fn test_backup_nested_in_source_keeps_backup_copy() {
    let source = tempdir().unwrap();
    let scratch = tempdir().unwrap();
    let backup = source.path().join("backup");
    write(&source.path().join("photo.jpg"), b"img");
    write(&source.path().join("notes.txt"), b"notes");
    write(&backup.join("photo.jpg"), b"img");

    let cli = cli_for(
        source.path(),
        &backup,
        &scratch.path().join("absent.toml"),
        &["--delete-backed"],
    );
    let outcome = run_locked(&cli, &mut ScriptedPrompt::new(["confirm"]));

    assert_eq!(outcome.counts.backed_up, 1);
    assert_eq!(outcome.counts.missing, 1);
    assert_eq!(outcome.counts.source_duplicates, 0);
    assert_eq!(outcome.deleted, vec![source.path().join("photo.jpg")]);
    assert!(!source.path().join("photo.jpg").exists());
    assert!(backup.join("photo.jpg").exists());
}

#[test]
fn test_source_nested_in_backup_is_not_its_own_backup() {
    let backup = tempdir().unwrap();
    let scratch = tempdir().unwrap();
    let source = backup.path().join("inbox");
    write(&source.join("new.txt"), b"new");
    write(&backup.path().join("old.txt"), b"old");

    let cli = cli_for(&source, backup.path(), &scratch.path().join("absent.toml"), &[]);
    let outcome = run_locked(&cli, &mut ScriptedPrompt::silent());

    assert_eq!(outcome.counts.missing, 1);
    assert_eq!(outcome.counts.backed_up, 0);
    assert_eq!(
        outcome.report.missing_paths().collect::<Vec<_>>(),
        vec![&source.join("new.txt")]
    );
}

#[cfg(target_os = "linux")]
#[test]
fn test_unrecordable_file_gives_partial_success_and_counts() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let fx = Fixture::new();
    let bad = fx.source.path().join(OsStr::from_bytes(b"bad\xff.txt"));
    fs::write(&bad, b"saved").unwrap();

    let outcome = fx.run(&[], &mut ScriptedPrompt::silent());

    assert_eq!(outcome.exit_code, ExitCode::PartialSuccess);
    assert_eq!(outcome.counts.missing, 1);
    assert_eq!(outcome.counts.backed_up, 1);
    assert!(bad.exists());

    // The saved cache is whole and is reused on the next run.
    let outcome = fx.run(&["--refresh", "never"], &mut ScriptedPrompt::silent());
    assert_eq!(outcome.exit_code, ExitCode::Success);
    assert_eq!(outcome.counts.missing, 1);
    assert_eq!(outcome.counts.backed_up, 1);
}
