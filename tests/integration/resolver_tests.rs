use backupgap::duplicates::{DuplicatePolicy, DuplicateResolver, TreeHasher};
use backupgap::prompt::ScriptedPrompt;
use backupgap::scanner::{ContentDigest, Hasher, WalkerConfig};
use std::fs;
use std::path::{Path, PathBuf};
use std::thread::sleep;
use std::time::Duration;
use tempfile::tempdir;

fn tree() -> TreeHasher<'static> {
    TreeHasher::new(Hasher::new(), WalkerConfig::default())
}

fn write(path: &Path, content: &[u8]) {
    fs::write(path, content).unwrap();
}

#[test]
fn test_interactive_keep_existing_deletes_new_file() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("a.txt"), b"same");
    write(&dir.path().join("b.txt"), b"same");

    let resolver = DuplicateResolver::new(DuplicatePolicy::Interactive);
    let mut prompt = ScriptedPrompt::new(["1"]);
    let outcome = tree().build(dir.path(), &resolver, &mut prompt).unwrap();

    assert!(dir.path().join("a.txt").exists());
    assert!(!dir.path().join("b.txt").exists());
    assert_eq!(outcome.summary.deleted.len(), 1);
    assert_eq!(outcome.map.file_count(), 1);
    assert!(prompt.asked()[0].contains("a.txt"));
    assert!(prompt.asked()[0].contains("b.txt"));
}

#[test]
fn test_interactive_keep_new_deletes_existing_file() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("a.txt"), b"same");
    write(&dir.path().join("b.txt"), b"same");

    let resolver = DuplicateResolver::new(DuplicatePolicy::Interactive);
    let mut prompt = ScriptedPrompt::new(["maybe", "2"]);
    let outcome = tree().build(dir.path(), &resolver, &mut prompt).unwrap();

    assert!(!dir.path().join("a.txt").exists());
    assert!(dir.path().join("b.txt").exists());
    assert_eq!(
        outcome.map.get(&ContentDigest::of_bytes(b"same")).unwrap(),
        &[dir.path().join("b.txt")]
    );
    // The invalid answer was asked again.
    assert_eq!(prompt.asked().len(), 2);
}

#[test]
fn test_interactive_keep_both() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("a.txt"), b"same");
    write(&dir.path().join("b.txt"), b"same");

    let resolver = DuplicateResolver::new(DuplicatePolicy::Interactive);
    let outcome = tree()
        .build(dir.path(), &resolver, &mut ScriptedPrompt::new(["b"]))
        .unwrap();

    assert!(dir.path().join("a.txt").exists());
    assert!(dir.path().join("b.txt").exists());
    assert_eq!(outcome.map.file_count(), 2);
    assert_eq!(outcome.summary.duplicates_kept, 1);
}

#[test]
fn test_auto_delete_leaves_unrelated_names() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("invoice.pdf"), b"same");
    write(&dir.path().join("receipt.pdf"), b"same");
    write(&dir.path().join("invoice.txt"), b"same");

    let resolver = DuplicateResolver::new(DuplicatePolicy::AutoDelete);
    let outcome = tree()
        .build(dir.path(), &resolver, &mut ScriptedPrompt::silent())
        .unwrap();

    assert_eq!(outcome.map.file_count(), 3);
    assert_eq!(outcome.summary.ambiguous, 2);
    assert!(outcome.summary.deleted.is_empty());
}

#[test]
fn test_auto_delete_prunes_emptied_directory() {
    let dir = tempdir().unwrap();
    fs::create_dir_all(dir.path().join("z/copies")).unwrap();
    write(&dir.path().join("a.jpg"), b"same");
    sleep(Duration::from_millis(50));
    write(&dir.path().join("z/copies/a (2).jpg"), b"same");

    let times = |p: &Path| -> Option<std::time::SystemTime> {
        let base = std::time::UNIX_EPOCH;
        if p.ends_with("a.jpg") {
            Some(base + Duration::from_secs(100))
        } else {
            Some(base + Duration::from_secs(10))
        }
    };
    let resolver = DuplicateResolver::with_change_times(DuplicatePolicy::AutoDelete, &times);
    let outcome = tree()
        .build(dir.path(), &resolver, &mut ScriptedPrompt::silent())
        .unwrap();

    assert!(dir.path().join("a.jpg").exists());
    assert!(!dir.path().join("z").exists());
    assert_eq!(outcome.summary.deleted[0].pruned_dirs.len(), 2);
}

/// Setting a file's mtime bumps its ctime, so `older` ends up with the
/// newest ctime but the oldest mtime. The copy that survives shows which
/// timestamp decided.
#[cfg(unix)]
#[test]
fn test_auto_delete_compares_change_time_not_mtime() {
    let dir = tempdir().unwrap();
    let plain: PathBuf = dir.path().join("photo.jpg");
    let copy: PathBuf = dir.path().join("photo (1).jpg");

    write(&plain, b"pixels");
    sleep(Duration::from_millis(50));
    write(&copy, b"pixels");
    sleep(Duration::from_millis(50));
    filetime::set_file_mtime(&copy, filetime::FileTime::from_unix_time(1_000, 0)).unwrap();

    let resolver = DuplicateResolver::new(DuplicatePolicy::AutoDelete);
    let outcome = tree()
        .build(dir.path(), &resolver, &mut ScriptedPrompt::silent())
        .unwrap();

    // "photo (1).jpg" sorts first and has the newer ctime: it is kept.
    assert!(copy.exists());
    assert!(!plain.exists());
    assert_eq!(outcome.map.paths().cloned().collect::<Vec<_>>(), vec![copy]);
}
