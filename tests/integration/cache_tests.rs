use backupgap::cache::{
    CacheAction, CacheError, CacheReconciler, DigestCache, MapSource, RefreshPolicy, RootRole,
};
use backupgap::duplicates::{DigestMap, DuplicatePolicy, DuplicateResolver, FinderError, TreeHasher};
use backupgap::prompt::ScriptedPrompt;
use backupgap::scanner::{ContentDigest, Hasher, WalkerConfig};
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

fn tree() -> TreeHasher<'static> {
    TreeHasher::new(Hasher::new(), WalkerConfig::default())
}

#[test]
fn test_cache_file_format_is_hex_to_paths() {
    let dir = tempdir().unwrap();
    let cache = DigestCache::new(dir.path(), "hash.json");
    let map: DigestMap = vec![(ContentDigest::of_bytes(b"abc"), PathBuf::from("/s/abc.txt"))]
        .into_iter()
        .collect();
    cache.save(&map).unwrap();

    let value: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(cache.path()).unwrap()).unwrap();
    assert_eq!(
        value["ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"],
        serde_json::json!(["/s/abc.txt"])
    );
}

#[test]
fn test_cache_load_preserves_file_order() {
    let dir = tempdir().unwrap();
    let cache = DigestCache::new(dir.path(), "hash.json");
    let text = format!(
        "{{\"{}\": [\"/z\"], \"{}\": [\"/a\", \"/b\"]}}",
        ContentDigest::of_bytes(b"z").to_hex(),
        ContentDigest::of_bytes(b"a").to_hex()
    );
    fs::write(cache.path(), text).unwrap();

    let map = cache.load().unwrap();
    let order: Vec<_> = map.paths().cloned().collect();
    assert_eq!(
        order,
        vec![PathBuf::from("/z"), PathBuf::from("/a"), PathBuf::from("/b")]
    );
}

#[test]
fn test_corrupt_cache_is_an_error() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("hash.json"), "{ not json").unwrap();
    let cache = DigestCache::new(dir.path(), "hash.json");
    assert!(matches!(cache.load(), Err(CacheError::Parse { .. })));

    fs::write(dir.path().join("hash.json"), "{\"xyz\": [\"/a\"]}").unwrap();
    assert!(matches!(cache.load(), Err(CacheError::Parse { .. })));

    let tree = tree();
    let reconciler = CacheReconciler::new(&tree, RefreshPolicy::Never);
    let err = reconciler
        .reconcile(
            dir.path(),
            RootRole::Backup,
            &DuplicateResolver::new(DuplicatePolicy::Report),
            &mut ScriptedPrompt::silent(),
        )
        .unwrap_err();
    assert!(matches!(err, FinderError::Cache(CacheError::Parse { .. })));
}

#[test]
fn test_declined_refresh_reuses_stale_cache() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("one.txt"), b"one").unwrap();
    let tree = tree();
    let resolver = DuplicateResolver::new(DuplicatePolicy::Report);
    tree.hash_tree(dir.path(), &resolver, &mut ScriptedPrompt::silent())
        .unwrap();

    fs::write(dir.path().join("two.txt"), b"two").unwrap();

    let reconciler = CacheReconciler::new(&tree, RefreshPolicy::Ask);
    let mut prompt = ScriptedPrompt::new(["n"]);
    let reconciled = reconciler
        .reconcile(dir.path(), RootRole::Source, &resolver, &mut prompt)
        .unwrap();

    assert_eq!(reconciled.source, MapSource::Cache);
    assert_eq!(reconciled.map.file_count(), 1);
    assert!(reconciled.summary.is_none());
    assert!(prompt.asked()[0].contains("Do you want to update hash map"));
}

#[test]
fn test_accepted_refresh_rehashes_and_saves() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("one.txt"), b"one").unwrap();
    let tree = tree();
    let resolver = DuplicateResolver::new(DuplicatePolicy::Report);
    tree.hash_tree(dir.path(), &resolver, &mut ScriptedPrompt::silent())
        .unwrap();
    fs::write(dir.path().join("two.txt"), b"two").unwrap();

    let reconciler = CacheReconciler::new(&tree, RefreshPolicy::Ask);
    let reconciled = reconciler
        .reconcile(
            dir.path(),
            RootRole::Source,
            &resolver,
            &mut ScriptedPrompt::new(["y"]),
        )
        .unwrap();

    assert_eq!(reconciled.source, MapSource::Fresh);
    assert_eq!(reconciled.map.file_count(), 2);
    assert_eq!(tree.cache_for(dir.path()).load().unwrap(), reconciled.map);
}

#[test]
fn test_backup_is_never_pruned_by_policy() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("photo.jpg"), b"img").unwrap();
    fs::write(dir.path().join("photo (1).jpg"), b"img").unwrap();

    let tree = tree();
    let reconciler = CacheReconciler::new(&tree, RefreshPolicy::Always);
    let plan = reconciler.plan(dir.path(), RootRole::Backup, &mut ScriptedPrompt::silent());
    assert_eq!(plan.action, CacheAction::Rehash);

    let reconciled = reconciler
        .execute(
            &plan,
            &DuplicateResolver::new(DuplicatePolicy::AutoDelete),
            &mut ScriptedPrompt::silent(),
        )
        .unwrap();

    assert_eq!(reconciled.map.file_count(), 2);
    assert!(dir.path().join("photo.jpg").exists());
    assert!(dir.path().join("photo (1).jpg").exists());
}
