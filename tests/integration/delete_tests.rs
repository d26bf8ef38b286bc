use backupgap::actions::{
    delete_batch, delete_batch_confirmed, validate_preserves_copy, BatchOutcome, DeleteConfig,
};
use backupgap::prompt::ScriptedPrompt;
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

#[test]
fn test_confirmed_batch_requires_phrase() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("a.txt");
    fs::write(&file, b"data").unwrap();
    let paths = vec![file.clone()];

    let mut prompt = ScriptedPrompt::new(["y"]);
    let outcome = delete_batch_confirmed(&paths, &DeleteConfig::permanent(), &mut prompt, "Delete?");
    assert!(matches!(outcome, BatchOutcome::Cancelled));
    assert!(file.exists());

    let mut prompt = ScriptedPrompt::new(["confirm"]);
    let outcome = delete_batch_confirmed(&paths, &DeleteConfig::permanent(), &mut prompt, "Delete?");
    let BatchOutcome::Completed(result) = outcome else {
        panic!("expected deletion to run");
    };
    assert_eq!(result.success_count(), 1);
    assert_eq!(result.bytes_freed, 4);
    assert!(!file.exists());
}

#[test]
fn test_empty_batch_asks_nothing() {
    let mut prompt = ScriptedPrompt::silent();
    let outcome = delete_batch_confirmed(&[], &DeleteConfig::permanent(), &mut prompt, "Delete?");
    assert!(matches!(outcome, BatchOutcome::Completed(r) if r.total_count() == 0));
    assert!(prompt.asked().is_empty());
}

#[test]
fn test_batch_continues_after_failure_and_prunes() {
    let dir = tempdir().unwrap();
    let nested = dir.path().join("x/y");
    fs::create_dir_all(&nested).unwrap();
    let deep = nested.join("deep.txt");
    fs::write(&deep, b"deep").unwrap();
    fs::write(dir.path().join("keep.txt"), b"keep").unwrap();

    let paths = vec![dir.path().join("missing.txt"), deep.clone()];
    let result = delete_batch(&paths, &DeleteConfig::permanent());

    assert_eq!(result.failure_count(), 1);
    assert_eq!(result.success_count(), 1);
    assert!(!dir.path().join("x").exists());
    assert!(dir.path().exists());
    assert_eq!(result.pruned_count(), 2);
    assert!(result.summary().contains("1 failed"));
}

#[test]
fn test_keep_empty_dirs() {
    let dir = tempdir().unwrap();
    let nested = dir.path().join("x");
    fs::create_dir_all(&nested).unwrap();
    let file = nested.join("f.txt");
    fs::write(&file, b"f").unwrap();

    let config = DeleteConfig::permanent().with_prune_empty_dirs(false);
    let result = delete_batch(&[file], &config);
    assert!(result.all_succeeded());
    assert!(nested.is_dir());
}

#[test]
fn test_batch_stops_on_error_when_configured() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("b.txt");
    fs::write(&file, b"b").unwrap();

    let config = DeleteConfig::permanent().with_continue_on_error(false);
    let result = delete_batch(&[dir.path().join("nope"), file.clone()], &config);
    assert_eq!(result.total_count(), 1);
    assert!(file.exists());
}

#[test]
fn test_whole_group_is_never_selected() {
    let group = vec![PathBuf::from("/a"), PathBuf::from("/b")];
    assert!(validate_preserves_copy(&group[1..], &group).is_ok());
    assert!(validate_preserves_copy(&group, &group).is_err());
}
