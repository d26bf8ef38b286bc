use backupgap::duplicates::{DuplicatePolicy, DuplicateResolver, FinderError, TreeHasher};
use backupgap::prompt::ScriptedPrompt;
use backupgap::scanner::{ContentDigest, Hasher, WalkerConfig};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn write(path: &Path, content: &[u8]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn report() -> DuplicateResolver<'static> {
    DuplicateResolver::new(DuplicatePolicy::Report)
}

#[test]
fn test_scan_empty_directory() {
    let dir = tempdir().unwrap();
    let tree = TreeHasher::new(Hasher::new(), WalkerConfig::default());

    let outcome = tree
        .hash_tree(dir.path(), &report(), &mut ScriptedPrompt::silent())
        .unwrap();

    assert!(outcome.map.is_empty());
    assert_eq!(outcome.summary.files_found, 0);
    // An empty map is still persisted.
    let cached = fs::read_to_string(dir.path().join("hash.json")).unwrap();
    assert_eq!(cached.trim(), "{}");
}

#[test]
fn test_scan_records_discovery_order() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("b.txt"), b"same");
    write(&dir.path().join("a.txt"), b"same");
    write(&dir.path().join("sub/c.txt"), b"other");

    let tree = TreeHasher::new(Hasher::new(), WalkerConfig::default());
    let outcome = tree
        .build(dir.path(), &report(), &mut ScriptedPrompt::silent())
        .unwrap();

    let same = ContentDigest::of_bytes(b"same");
    assert_eq!(
        outcome.map.get(&same).unwrap(),
        &[dir.path().join("a.txt"), dir.path().join("b.txt")]
    );
    assert_eq!(outcome.map.len(), 2);
    assert_eq!(outcome.summary.files_hashed, 3);
    assert_eq!(outcome.summary.duplicates_kept, 1);
    assert!(!outcome.summary.has_failures());
}

#[test]
fn test_scan_skips_cache_file_at_every_depth() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("hash.json"), b"{}");
    write(&dir.path().join("nested/hash.json"), b"{}");
    write(&dir.path().join("nested/keep.txt"), b"keep");

    let tree = TreeHasher::new(Hasher::new(), WalkerConfig::default());
    let outcome = tree
        .build(dir.path(), &report(), &mut ScriptedPrompt::silent())
        .unwrap();

    let paths: Vec<_> = outcome.map.paths().cloned().collect();
    assert_eq!(paths, vec![dir.path().join("nested/keep.txt")]);
}

#[test]
fn test_scan_custom_cache_name() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("hash.json"), b"a regular file now");
    write(&dir.path().join(".digests.json"), b"{}");

    let tree = TreeHasher::new(Hasher::new(), WalkerConfig::new(".digests.json", false));
    let outcome = tree
        .hash_tree(dir.path(), &report(), &mut ScriptedPrompt::silent())
        .unwrap();

    assert_eq!(outcome.map.file_count(), 1);
    assert!(outcome.map.paths().any(|p| p.ends_with("hash.json")));
    assert!(tree.cache_for(dir.path()).exists());
}

#[test]
fn test_scan_digest_matches_sha256() {
    let dir = tempdir().unwrap();
    write(&dir.path().join("abc.txt"), b"abc");

    let tree = TreeHasher::new(Hasher::with_buffer_size(1), WalkerConfig::default());
    let outcome = tree
        .build(dir.path(), &report(), &mut ScriptedPrompt::silent())
        .unwrap();

    let (digest, _) = outcome.map.iter().next().unwrap();
    assert_eq!(
        digest.to_hex(),
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
}

#[test]
fn test_scan_rejects_missing_and_file_roots() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("file.txt");
    write(&file, b"x");
    let tree = TreeHasher::new(Hasher::new(), WalkerConfig::default());

    let err = tree
        .build(&dir.path().join("gone"), &report(), &mut ScriptedPrompt::silent())
        .unwrap_err();
    assert!(matches!(err, FinderError::NotFound(_)));

    let err = tree
        .build(&file, &report(), &mut ScriptedPrompt::silent())
        .unwrap_err();
    assert!(matches!(err, FinderError::NotADirectory(_)));
}

#[cfg(unix)]
#[test]
fn test_scan_does_not_follow_symlinks_by_default() {
    let dir = tempdir().unwrap();
    let outside = tempdir().unwrap();
    write(&outside.path().join("secret.txt"), b"secret");
    write(&dir.path().join("real.txt"), b"real");
    std::os::unix::fs::symlink(outside.path(), dir.path().join("link")).unwrap();
    std::os::unix::fs::symlink(dir.path().join("real.txt"), dir.path().join("alias.txt")).unwrap();

    let tree = TreeHasher::new(Hasher::new(), WalkerConfig::default());
    let outcome = tree
        .build(dir.path(), &report(), &mut ScriptedPrompt::silent())
        .unwrap();
    assert_eq!(outcome.map.file_count(), 1);

    let tree = TreeHasher::new(Hasher::new(), WalkerConfig::new("hash.json", true));
    let outcome = tree
        .build(dir.path(), &report(), &mut ScriptedPrompt::silent())
        .unwrap();
    assert_eq!(outcome.map.file_count(), 3);
}
