#![allow(clippy::unwrap_used, clippy::expect_used, missing_docs)]

use std::fs;

use dircache::{
    DirCache, DirRecord, DirScanner as _, OpenError, RecordKind, StdScanner, alphasort,
    by_kind_then_name,
};

fn populate_tree() -> tempfile::TempDir {
    let tmp = tempfile::tempdir().unwrap();
    fs::write(tmp.path().join("b"), b"b").unwrap();
    fs::write(tmp.path().join("a"), b"a").unwrap();
    fs::write(tmp.path().join("c"), b"c").unwrap();
    fs::create_dir(tmp.path().join("sub")).unwrap();
    tmp
}

fn names<'a>(records: impl IntoIterator<Item = &'a DirRecord>) -> Vec<String> {
    records
        .into_iter()
        .map(|r| r.name.to_string_lossy().into_owned())
        .collect()
}

#[test]
fn scanner_reports_entries_with_kinds_and_dots() {
    let tmp = populate_tree();
    let mut records = StdScanner::default().scan(tmp.path()).unwrap();
    records.sort_by(alphasort);

    assert_eq!(names(&records), [".", "..", "a", "b", "c", "sub"]);
    assert!(records[0].is_dir() && records[1].is_dir());
    assert_eq!(records[2].kind, RecordKind::File);
    assert_eq!(records[5].kind, RecordKind::Directory);
    #[cfg(unix)]
    assert!(records.iter().all(|r| r.ino != 0));
}

#[test]
fn scanner_without_dots_reports_only_real_entries() {
    let tmp = populate_tree();
    let records = StdScanner::without_dots().scan(tmp.path()).unwrap();
    assert_eq!(records.len(), 4);
    assert!(records.iter().all(|r| !r.is_dot_entry()));
}

#[test]
fn cache_over_real_directory_orders_and_reuses() {
    let tmp = populate_tree();
    let cache = DirCache::new();

    let mut handle = cache.open(tmp.path()).unwrap();
    let mut read = Vec::new();
    while let Some(record) = handle.read() {
        read.push(record.name.to_string_lossy().into_owned());
    }
    assert_eq!(read, [".", "..", "a", "b", "c", "sub"]);
    handle.close();

    // New files do not show up until the cache is invalidated.
    fs::write(tmp.path().join("d"), b"d").unwrap();
    let files_only = |r: &DirRecord| r.kind == RecordKind::File;
    let listing = cache
        .list(tmp.path(), Some(&files_only), Some(&alphasort))
        .unwrap();
    assert_eq!(names(&listing), ["a", "b", "c"]);

    cache.invalidate_all();
    let listing = cache
        .list(tmp.path(), Some(&files_only), Some(&alphasort))
        .unwrap();
    assert_eq!(names(&listing), ["a", "b", "c", "d"]);
}

#[test]
fn directories_first_listing() {
    let tmp = populate_tree();
    let cache = DirCache::new();
    let not_dots = |r: &DirRecord| !r.is_dot_entry();

    let listing = cache
        .list(tmp.path(), Some(&not_dots), Some(&by_kind_then_name))
        .unwrap();
    assert_eq!(names(&listing), ["sub", "a", "b", "c"]);
}

#[test]
fn missing_directory_is_not_found() {
    let tmp = tempfile::tempdir().unwrap();
    let cache = DirCache::new();

    let err = cache.open(tmp.path().join("missing")).unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(i32::from(&err), libc::ENOENT);
    assert!(cache.is_empty());
}

#[test]
fn regular_file_is_not_a_directory() {
    let tmp = populate_tree();
    let cache = DirCache::new();

    let err = cache.open(tmp.path().join("a")).unwrap_err();
    assert!(matches!(err, OpenError::NotFound { .. }));
    assert_eq!(i32::from(&err), libc::ENOTDIR);
    assert!(cache.list(tmp.path().join("a"), None, None).is_err());
}
