//! Integration tests for content-based directory merge

mod common;

use chrono::Local;
use common::create_test_file;
use fsak::merge::{backup_dir_name, execute_merge, plan_merge, MergeEvent, MERGE_TAG};
use fsak::{CatalogStore, SqliteCatalog};
use std::fs;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

#[test]
fn test_only_novel_content_is_copied() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let source = temp_dir.path().join("A");
    let target = temp_dir.path().join("B");
    create_test_file(&source.join("a.txt"), b"X");
    create_test_file(&source.join("b.txt"), b"Y");
    create_test_file(&target.join("c.txt"), b"X");
    let store = SqliteCatalog::open_in_memory().expect("open catalog");

    let plan = plan_merge(&source, &target, &store, &[], None).expect("plan");
    assert_eq!(plan.source_files, 2);
    assert_eq!(plan.target_files, 1);
    assert_eq!(plan.novel.len(), 1);
    assert_eq!(plan.novel[0].name, "b.txt");

    let copied = Arc::new(Mutex::new(Vec::new()));
    let sink = copied.clone();
    let callback = move |event: &MergeEvent| {
        if let MergeEvent::Copied { to, .. } = event {
            sink.lock().unwrap().push(to.clone());
        }
    };
    let summary = execute_merge(&plan, &store, Some(&callback)).expect("merge");

    assert_eq!(summary.copied, 1);
    assert_eq!(summary.bytes, 1);

    let backup = fs::canonicalize(&target)
        .expect("canonical target")
        .join(backup_dir_name(Local::now().date_naive()));
    assert_eq!(plan.backup_dir, backup);
    assert_eq!(fs::read(backup.join("b.txt")).expect("read copy"), b"Y");
    assert!(!backup.join("a.txt").exists(), "a.txt content is already in B");
    assert_eq!(*copied.lock().unwrap(), vec![backup.join("b.txt")]);

    // Source untouched, target's own file untouched
    assert_eq!(fs::read(source.join("a.txt")).expect("read a"), b"X");
    assert_eq!(fs::read(source.join("b.txt")).expect("read b"), b"Y");
    assert_eq!(fs::read(target.join("c.txt")).expect("read c"), b"X");

    let row = store
        .get(&backup.join("b.txt"))
        .expect("lookup")
        .expect("copy is catalogued");
    assert_eq!(row.tag, MERGE_TAG);
    assert_eq!(row.fingerprint, plan.novel[0].fingerprint);
}

#[test]
fn test_identical_trees_copy_nothing() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let source = temp_dir.path().join("A");
    let target = temp_dir.path().join("B");
    create_test_file(&source.join("one.txt"), b"1");
    create_test_file(&source.join("deep/two.txt"), b"2");
    create_test_file(&target.join("renamed.txt"), b"2");
    create_test_file(&target.join("elsewhere/uno.txt"), b"1");
    let store = SqliteCatalog::open_in_memory().expect("open catalog");

    let plan = plan_merge(&source, &target, &store, &[], None).expect("plan");
    let summary = execute_merge(&plan, &store, None).expect("merge");

    assert_eq!(summary.copied, 0);
    assert!(!plan.backup_dir.exists());
}

#[test]
fn test_name_collision_in_backup_gets_suffix() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let source = temp_dir.path().join("A");
    let target = temp_dir.path().join("B");
    create_test_file(&source.join("note.txt"), b"first");
    fs::create_dir_all(&target).expect("create target");
    let store = SqliteCatalog::open_in_memory().expect("open catalog");

    let plan = plan_merge(&source, &target, &store, &[], None).expect("plan");
    execute_merge(&plan, &store, None).expect("first merge");

    // Same name, different content on the same day
    fs::write(source.join("note.txt"), b"second").expect("rewrite source");
    let store = SqliteCatalog::open_in_memory().expect("open fresh catalog");
    let plan = plan_merge(&source, &target, &store, &[], None).expect("replan");
    assert_eq!(plan.novel.len(), 1);
    execute_merge(&plan, &store, None).expect("second merge");

    assert_eq!(
        fs::read(plan.backup_dir.join("note.txt")).expect("read first"),
        b"first"
    );
    assert_eq!(
        fs::read(plan.backup_dir.join("note_1.txt")).expect("read second"),
        b"second"
    );
}

#[test]
fn test_second_merge_keeps_part_named_backup_file() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let source = temp_dir.path().join("A");
    let target = temp_dir.path().join("B");
    create_test_file(&source.join("a.txt.part"), b"partial download");
    fs::create_dir_all(&target).expect("create target");
    let store = SqliteCatalog::open_in_memory().expect("open catalog");

    let plan = plan_merge(&source, &target, &store, &[], None).expect("plan");
    execute_merge(&plan, &store, None).expect("first merge");
    let kept = plan.backup_dir.join("a.txt.part");
    assert_eq!(fs::read(&kept).expect("read copy"), b"partial download");

    create_test_file(&source.join("a.txt"), b"finished file");
    let plan = plan_merge(&source, &target, &store, &[], None).expect("replan");
    assert_eq!(plan.novel.len(), 1);
    assert_eq!(plan.novel[0].name, "a.txt");
    execute_merge(&plan, &store, None).expect("second merge");

    assert_eq!(fs::read(&kept).expect("read kept"), b"partial download");
    assert_eq!(
        fs::read(plan.backup_dir.join("a.txt")).expect("read new copy"),
        b"finished file"
    );
    let row = store
        .get(&kept)
        .expect("lookup")
        .expect("earlier copy is still catalogued");
    assert_eq!(row.size, "partial download".len() as u64);
}

#[test]
fn test_failed_copy_stops_the_merge() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let source = temp_dir.path().join("A");
    let target = temp_dir.path().join("B");
    create_test_file(&source.join("first.txt"), b"1");
    create_test_file(&source.join("second.txt"), b"2");
    fs::create_dir_all(&target).expect("create target");
    let store = SqliteCatalog::open_in_memory().expect("open catalog");

    let plan = plan_merge(&source, &target, &store, &[], None).expect("plan");
    assert_eq!(plan.novel.len(), 2);
    // The first planned copy fails, so nothing after it may run
    fs::remove_file(&plan.novel[0].path).expect("remove first source file");

    let copied = Arc::new(Mutex::new(0usize));
    let sink = copied.clone();
    let callback = move |event: &MergeEvent| {
        if let MergeEvent::Copied { .. } = event {
            *sink.lock().unwrap() += 1;
        }
    };
    let err = execute_merge(&plan, &store, Some(&callback)).expect_err("merge must abort");

    assert!(err.is_per_file());
    assert_eq!(*copied.lock().unwrap(), 0);
    assert!(!plan.backup_dir.join(&plan.novel[1].name).exists());
    assert!(store
        .all()
        .expect("list rows")
        .iter()
        .all(|row| row.tag != MERGE_TAG));
}
