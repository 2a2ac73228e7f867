//! Archive extraction: traversal safety, single-root flattening, 7z support
//! and cancellation.

use obsup::archive::{ArchiveExtractor, ExtractionProgress};
use obsup::CancellationToken;
use std::fs;
use std::sync::{Arc, Mutex};

mod common;
use common::helpers::*;

#[test]
fn test_traversal_entries_are_skipped() {
    let work = create_temp_dir();
    let target = work.path().join("target");
    let archive = write_zip(
        &work.path().join("evil.zip"),
        &[
            ("../../evil.dll", b"evil"),
            ("/abs.dll", b"evil"),
            ("C:/Windows/evil.dll", b"evil"),
            ("obs-plugins\\64bit\\good.dll", b"good"),
            ("data/ok.txt", b"ok"),
        ],
    );

    let result = ArchiveExtractor::new().extract(&archive, &target, false);

    assert!(result.success);
    assert_eq!(result.files_extracted, 2);
    assert_eq!(result.entries_skipped, 3);
    assert_eq!(result.entries_failed, 0);
    assert!(!work.path().join("evil.dll").exists());
    assert_eq!(
        fs::read(target.join("obs-plugins").join("64bit").join("good.dll")).unwrap(),
        b"good"
    );
    assert_file_exists(&target.join("data/ok.txt"));
}

#[test]
fn test_single_root_is_flattened() {
    let work = create_temp_dir();
    let target = work.path().join("target");
    let archive = write_zip(
        &work.path().join("payload.zip"),
        &[
            ("payload-v2/", b""),
            ("payload-v2/bin/x.exe", b"exe"),
            ("payload-v2/data/y.dat", b"dat"),
        ],
    );

    let result = ArchiveExtractor::new().extract(&archive, &target, true);

    assert!(result.success);
    assert_eq!(result.files_extracted, 2);
    assert_eq!(fs::read(target.join("bin/x.exe")).unwrap(), b"exe");
    assert_eq!(fs::read(target.join("data/y.dat")).unwrap(), b"dat");
    assert!(!target.join("payload-v2").exists());

    let leftovers: Vec<_> = fs::read_dir(&target)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|n| n.starts_with('.'))
        .collect();
    assert!(leftovers.is_empty(), "scratch directory left: {:?}", leftovers);
}

#[test]
fn test_flatten_merges_into_existing_install() {
    let work = create_temp_dir();
    let target = work.path().join("target");
    fs::create_dir_all(target.join("bin")).unwrap();
    fs::write(target.join("bin/x.exe"), b"old").unwrap();
    fs::write(target.join("bin/keep.cfg"), b"user").unwrap();
    fs::write(target.join("data"), b"a file where a directory goes").unwrap();

    let archive = write_zip(
        &work.path().join("update.zip"),
        &[("obs/bin/x.exe", b"new"), ("obs/data/y.dat", b"dat")],
    );

    let result = ArchiveExtractor::new().extract(&archive, &target, true);

    assert!(result.success);
    assert_eq!(fs::read(target.join("bin/x.exe")).unwrap(), b"new");
    assert_eq!(fs::read(target.join("bin/keep.cfg")).unwrap(), b"user");
    assert!(target.join("data").is_dir());
    assert_eq!(fs::read(target.join("data/y.dat")).unwrap(), b"dat");
}

#[test]
fn test_no_flatten_when_disabled_or_multiple_roots() {
    let work = create_temp_dir();

    let target = work.path().join("kept");
    let archive = write_zip(
        &work.path().join("plugin.zip"),
        &[("obs-plugins/64bit/p.dll", b"p")],
    );
    let result = ArchiveExtractor::new().extract(&archive, &target, false);
    assert!(result.success);
    assert_file_exists(&target.join("obs-plugins/64bit/p.dll"));

    let target = work.path().join("multi");
    let archive = write_zip(
        &work.path().join("multi.zip"),
        &[("a/one.txt", b"1"), ("b/two.txt", b"2")],
    );
    let result = ArchiveExtractor::new().extract(&archive, &target, true);
    assert!(result.success);
    assert_file_exists(&target.join("a/one.txt"));
    assert_file_exists(&target.join("b/two.txt"));
}

#[test]
fn test_extract_7z() {
    let work = create_temp_dir();
    let target = work.path().join("target");
    let archive = write_7z(
        &work.path().join("plugin.7z"),
        &[
            ("obs-plugins/64bit/plugin.dll", b"dll"),
            ("data/obs-plugins/plugin/locale/en-US.ini", b"Name=Plugin"),
        ],
    );

    let result = ArchiveExtractor::new().extract(&archive, &target, false);

    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.files_extracted, 2);
    assert_eq!(result.bytes_extracted, 3 + 11);
    assert_eq!(
        fs::read(target.join("obs-plugins/64bit/plugin.dll")).unwrap(),
        b"dll"
    );
    assert_file_exists(&target.join("data/obs-plugins/plugin/locale/en-US.ini"));
}

#[test]
fn test_unsupported_and_corrupt_archives() {
    let work = create_temp_dir();
    let target = work.path().join("target");

    let exe = work.path().join("setup.exe");
    fs::write(&exe, b"MZ").unwrap();
    let result = ArchiveExtractor::new().extract(&exe, &target, false);
    assert!(!result.success);
    assert!(result.error.unwrap().contains("unsupported"));

    let corrupt = work.path().join("corrupt.zip");
    fs::write(&corrupt, b"PK but not really").unwrap();
    let result = ArchiveExtractor::new().extract(&corrupt, &target, false);
    assert!(!result.success);
    assert_eq!(result.files_extracted, 0);
}

#[test]
fn test_progress_callback() {
    let work = create_temp_dir();
    let archive = write_zip(
        &work.path().join("a.zip"),
        &[("a.txt", b"aa"), ("b/c.txt", b"ccc")],
    );

    let seen: Arc<Mutex<Vec<ExtractionProgress>>> = Arc::default();
    let sink = seen.clone();
    let extractor =
        ArchiveExtractor::new().on_progress(move |p| sink.lock().unwrap().push(p.clone()));
    let result = extractor.extract(&archive, &work.path().join("out"), false);
    assert!(result.success);

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    let last = seen.last().unwrap();
    assert_eq!(last.files_extracted, 2);
    assert_eq!(last.total_files, 2);
    assert_eq!(last.bytes_extracted, 5);
    assert_eq!(last.total_bytes, 5);
}

#[test]
fn test_cancelled_extraction() {
    let work = create_temp_dir();
    let target = work.path().join("target");
    let archive = write_zip(
        &work.path().join("a.zip"),
        &[("one.txt", b"1"), ("two.txt", b"2"), ("three.txt", b"3")],
    );

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let extractor = ArchiveExtractor::new()
        .cancel_token(cancel)
        .on_progress(move |_| trigger.cancel());

    let result = extractor.extract(&archive, &target, false);

    assert!(!result.success);
    assert_eq!(result.files_extracted, 1);
    assert!(target.join("one.txt").exists());
    assert!(!target.join("three.txt").exists());
}
