use std::path::Path;

use ftpsync::events::SyncObserver;
use ftpsync::mode::TransferMode;
use ftpsync::session::Direction;
use ftpsync::transfer::TransferLimits;
use ftpsync::{FilterMode, FilterSet, MemorySession, RemoteSession, SyncError, Syncer};
use walkdir::WalkDir;

/// Relative paths of every entry under `root`, directories suffixed with `/`.
fn local_tree(root: &Path) -> Vec<String> {
    let mut out: Vec<String> = WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .map(|e| {
            let rel = e.path().strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/");
            if e.file_type().is_dir() { format!("{}/", rel) } else { rel }
        })
        .collect();
    out.sort();
    out
}

#[derive(Default)]
struct Recorder {
    events: Vec<String>,
}

impl SyncObserver for Recorder {
    fn on_enter_directory(&mut self, remote: &str) {
        self.events.push(format!("enter {}", remote));
    }
    fn on_directory_created(&mut self, path: &str, local: bool) {
        self.events.push(format!("mkdir {} local={}", path, local));
    }
    fn on_skip(&mut self, remote: &str) {
        self.events.push(format!("skip {}", remote));
    }
    fn on_file_start(&mut self, direction: Direction, remote: &str, mode: TransferMode) {
        self.events.push(format!("{} {} {}", direction.label(), remote, mode.label()));
    }
    fn on_file_done(&mut self, remote: &str, ok: bool) {
        self.events.push(format!("done {} {}", remote, ok));
    }
    fn on_delete(&mut self, remote: &str, ok: bool) {
        self.events.push(format!("delete {} {}", remote, ok));
    }
}

#[test]
fn push_then_pull_reproduces_the_tree() {
    let src = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(src.path().join("a/b")).unwrap();
    std::fs::write(src.path().join("a/1.txt"), b"one").unwrap();
    std::fs::write(src.path().join("a/b/2.bin"), [0u8, 1, 2, 255]).unwrap();
    std::fs::write(src.path().join("index.php"), b"<?php echo 1;").unwrap();

    let mut remote = MemorySession::new().with_chunk_size(3);
    remote.add_dir("/srv/www");
    let filter = FilterSet::default();
    let pushed = Syncer::new(&mut remote, &filter).push(src.path(), "/srv/www", true).unwrap();
    assert_eq!(pushed.files_transferred, 3);
    assert_eq!(pushed.dirs_created, 2);
    assert_eq!(remote.dirs(), vec!["/srv", "/srv/www", "/srv/www/a", "/srv/www/a/b"]);

    let dst = tempfile::tempdir().unwrap();
    let copy = dst.path().join("copy");
    let pulled = Syncer::new(&mut remote, &filter)
        .pull(&copy, "/srv/www", true, FilterMode::Blacklist)
        .unwrap();
    assert_eq!(pulled.files_transferred, 3);
    assert_eq!(local_tree(src.path()), local_tree(&copy));
    assert_eq!(std::fs::read(copy.join("a/b/2.bin")).unwrap(), vec![0u8, 1, 2, 255]);
}

#[test]
fn whitelist_pull_downloads_only_matching_files() {
    let mut remote = MemorySession::new();
    remote.add_file("/d/keep.txt", b"k");
    remote.add_file("/d/skip.log", b"s");
    let filter = FilterSet::new(["keep"]).unwrap();
    let out = tempfile::tempdir().unwrap();
    let report = Syncer::new(&mut remote, &filter)
        .pull(out.path(), "/d", true, FilterMode::Whitelist)
        .unwrap();
    assert_eq!(report.files_transferred, 1);
    assert_eq!(report.skipped, 1);
    assert_eq!(local_tree(out.path()), vec!["keep.txt"]);
}

#[test]
fn blacklist_pull_with_empty_filter_takes_everything() {
    let mut remote = MemorySession::new();
    remote.add_file("/d/a.txt", b"a");
    remote.add_file("/d/sub/b.txt", b"b");
    let filter = FilterSet::default();
    let out = tempfile::tempdir().unwrap();
    Syncer::new(&mut remote, &filter).pull(out.path(), "/d", true, FilterMode::Blacklist).unwrap();
    assert_eq!(local_tree(out.path()), vec!["a.txt", "sub/", "sub/b.txt"]);
}

#[test]
fn push_filter_excludes_whole_subtree() {
    let src = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(src.path().join("cache/deep")).unwrap();
    std::fs::write(src.path().join("cache/deep/x.txt"), b"x").unwrap();
    std::fs::write(src.path().join("app.js"), b"js").unwrap();

    let mut remote = MemorySession::new();
    remote.add_dir("/www");
    let filter = FilterSet::new(["/www/cache"]).unwrap();
    let report = Syncer::new(&mut remote, &filter).push(src.path(), "/www", true).unwrap();
    assert_eq!(report.skipped, 1);
    assert_eq!(remote.files(), vec!["/www/app.js"]);
    assert!(!remote.is_dir("/www/cache"));
}

#[test]
fn remote_mkdir_failure_aborts_before_later_siblings() {
    let src = tempfile::tempdir().unwrap();
    std::fs::create_dir(src.path().join("a")).unwrap();
    std::fs::create_dir(src.path().join("b")).unwrap();
    std::fs::write(src.path().join("a/f.txt"), b"f").unwrap();
    std::fs::write(src.path().join("b/g.txt"), b"g").unwrap();

    let mut remote = MemorySession::new();
    remote.add_dir("/www");
    remote.fail_mkdir("/www/a");
    let filter = FilterSet::default();
    let err = Syncer::new(&mut remote, &filter).push(src.path(), "/www", true).unwrap_err();
    assert_eq!(err, SyncError::DirectoryCreateFailed { path: "/www/a".to_string(), local: false });
    assert_eq!(remote.calls.mkdirs, vec!["/www/a"]);
    assert!(remote.files().is_empty());
}

#[test]
fn upload_failure_names_the_remote_path() {
    let src = tempfile::tempdir().unwrap();
    std::fs::write(src.path().join("a.txt"), b"a").unwrap();
    std::fs::write(src.path().join("b.txt"), b"b").unwrap();
    let mut remote = MemorySession::new();
    remote.add_dir("/www");
    remote.fail_transfer("/www/a.txt");
    let filter = FilterSet::default();
    let err = Syncer::new(&mut remote, &filter).push(src.path(), "/www", true).unwrap_err();
    assert_eq!(err.path(), Some("/www/a.txt"));
    assert_eq!(err.operation(), "upload");
    // b.txt sorts after a.txt and is never attempted
    assert_eq!(remote.calls.puts.len(), 1);
}

#[test]
fn stalled_transfer_is_bounded() {
    let mut remote = MemorySession::new();
    remote.add_file("/d/big.iso", b"0123456789");
    remote.set_stalled(true);
    let filter = FilterSet::default();
    let out = tempfile::tempdir().unwrap();
    let err = Syncer::new(&mut remote, &filter)
        .with_limits(TransferLimits { max_polls: Some(10), timeout: None })
        .pull(out.path(), "/d", true, FilterMode::Blacklist)
        .unwrap_err();
    assert!(matches!(err, SyncError::TransferStalled { polls: 10, .. }));
    assert_eq!(remote.cwd(), "/");
}

#[test]
fn prune_whitelist_deletes_by_absolute_path() {
    let mut remote = MemorySession::new();
    remote.add_file("/site/a.tmp", b"");
    remote.add_file("/site/b.tmp", b"");
    let filter = FilterSet::new(["\\.tmp$"]).unwrap();
    let report = Syncer::new(&mut remote, &filter)
        .prune("/site", true, FilterMode::Whitelist)
        .unwrap();
    assert_eq!(report.files_deleted, 2);
    assert_eq!(report.delete_failures, 0);
    assert!(remote.files().is_empty());
    assert_eq!(remote.calls.deletes, vec!["/site/a.tmp", "/site/b.tmp"]);
}

#[test]
fn prune_blacklist_keeps_matching_entries() {
    let mut remote = MemorySession::new();
    remote.add_file("/site/index.html", b"");
    remote.add_file("/site/old.bak", b"");
    remote.add_file("/site/assets/logo.png", b"");
    let filter = FilterSet::new(["index|assets"]).unwrap();
    let report = Syncer::new(&mut remote, &filter)
        .prune("/site", true, FilterMode::Blacklist)
        .unwrap();
    assert_eq!(report.files_deleted, 1);
    assert_eq!(remote.files(), vec!["/site/assets/logo.png", "/site/index.html"]);
}

#[test]
fn observer_sees_events_in_walk_order() {
    let mut remote = MemorySession::new();
    remote.add_file("/d/x.css", b"x");
    remote.add_file("/d/y.tmp", b"y");
    let filter = FilterSet::new(["\\.tmp$"]).unwrap();
    let out = tempfile::tempdir().unwrap();
    let target = out.path().join("t");
    let mut syncer = Syncer::new(&mut remote, &filter).with_observer(Recorder::default());
    syncer.pull(&target, "/d", true, FilterMode::Blacklist).unwrap();
    let events = syncer.into_observer().events;
    assert_eq!(
        events,
        vec![
            "enter /d".to_string(),
            format!("mkdir {} local=true", target.to_string_lossy()),
            "download /d/x.css text".to_string(),
            "done /d/x.css true".to_string(),
            "skip /d/y.tmp".to_string(),
        ]
    );
}

#[test]
fn relative_root_uses_session_cursor() {
    let mut remote = MemorySession::new();
    remote.add_file("/home/ftp/site/a.txt", b"a");
    assert!(remote.enter("/home/ftp"));
    let filter = FilterSet::new(["^site/a\\.txt$"]).unwrap();
    let report = Syncer::new(&mut remote, &filter)
        .prune("site", true, FilterMode::Whitelist)
        .unwrap();
    assert_eq!(report.files_deleted, 1);
    assert_eq!(remote.cwd(), "/home/ftp");
}

#[test]
fn failed_delete_is_counted_and_later_siblings_are_still_pruned() {
    let mut remote = MemorySession::new();
    remote.add_file("/site/a.tmp", b"");
    remote.add_file("/site/b.tmp", b"");
    remote.add_file("/site/c.tmp", b"");
    remote.fail_delete("/site/a.tmp");
    let filter = FilterSet::new(["\\.tmp$"]).unwrap();
    let mut syncer = Syncer::new(&mut remote, &filter).with_observer(Recorder::default());
    let report = syncer.prune("/site", true, FilterMode::Whitelist).unwrap();
    assert_eq!(report.delete_failures, 1);
    assert_eq!(report.files_deleted, 2);
    assert!(syncer.observer().events.contains(&"delete /site/a.tmp false".to_string()));
    drop(syncer);
    assert_eq!(remote.files(), vec!["/site/a.tmp"]);
}

#[test]
fn every_entered_directory_is_left_again() {
    let mut remote = MemorySession::new();
    remote.add_file("/site/a/b/deep.txt", b"d");
    remote.add_file("/site/a/top.txt", b"t");
    remote.add_file("/site/c/other.txt", b"o");
    let filter = FilterSet::default();
    let out = tempfile::tempdir().unwrap();
    Syncer::new(&mut remote, &filter)
        .pull(out.path(), "/site", true, FilterMode::Blacklist)
        .unwrap();
    // root, then a directory check and a descent each for a, a/b and c
    assert_eq!(remote.calls.enters.len(), 7);
    assert_eq!(remote.calls.enters.len(), remote.calls.leaves);
    assert_eq!(
        remote.calls.gets,
        vec![
            ("/site/a/b/deep.txt".to_string(), TransferMode::Text),
            ("/site/a/top.txt".to_string(), TransferMode::Text),
            ("/site/c/other.txt".to_string(), TransferMode::Text),
        ]
    );
    assert_eq!(remote.cwd(), "/");
}
