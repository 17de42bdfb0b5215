use ftpsync::config::Config;
use ftpsync::session::EntryKind;
use ftpsync::{FilterSet, MemorySession, RemoteSession, SyncError};

#[test]
fn typical_deploy_ignore_list() {
    let filter = FilterSet::new([
        "\\.git",
        "/httpdocs/.*\\/cache",
        "\\.DS_Store$",
    ])
    .unwrap();
    assert!(filter.matches("/var/www/httpdocs/app/cache"));
    assert!(filter.matches("/var/www/httpdocs/app/cache/page.html"));
    assert!(filter.matches("project/.git/config"));
    assert!(filter.matches("/site/img/.DS_Store"));
    assert!(!filter.matches("/var/www/httpdocs/app/index.php"));
    assert!(!filter.matches("/var/www/static/cache.js"));
}

#[test]
fn result_does_not_depend_on_pattern_order() {
    let paths = ["/a/b/c", "/x/a/y/b", "/b/a", "a/b", "/q"];
    let forward = FilterSet::new(["/a/b", "/x/.*/b", "q$"]).unwrap();
    let backward = FilterSet::new(["q$", "/x/.*/b", "/a/b"]).unwrap();
    for p in paths {
        assert_eq!(forward.matches(p), backward.matches(p), "{}", p);
    }
}

#[test]
fn invalid_pattern_surfaces_from_config() {
    let cfg = Config { ignore: vec!["(unclosed".to_string()], ..Config::default() };
    let err = cfg.filter_set().unwrap_err();
    assert!(matches!(err, SyncError::FilterPatternInvalid { ref pattern, .. } if pattern == "(unclosed"));
    assert_eq!(err.operation(), "filter");
}

#[test]
fn detailed_listing_of_memory_session() {
    let mut s = MemorySession::new();
    s.add_file("/pub/readme.txt", b"hello");
    s.add_dir("/pub/files");
    let entries = s.list_detailed("/pub/").unwrap();
    assert_eq!(entries.len(), 2);
    let files = entries.iter().find(|e| e.name == "files").unwrap();
    assert_eq!(files.kind, EntryKind::Directory);
    let readme = entries.iter().find(|e| e.name == "readme.txt").unwrap();
    assert_eq!(readme.kind, EntryKind::File);
    assert_eq!(readme.size, 5);
    assert!(s.list_detailed("/missing").is_none());
}

#[test]
fn config_patterns_are_kept_in_order() {
    let cfg = Config { ignore: vec!["b$".to_string(), "^a".to_string()], ..Config::default() };
    let filter = cfg.filter_set().unwrap();
    assert_eq!(filter.patterns(), ["b$".to_string(), "^a".to_string()]);
    assert_eq!(filter.len(), 2);
}
