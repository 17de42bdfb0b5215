// session module: the remote collaborator contract and its implementations
pub mod memory;
pub mod sftp;

use std::path::Path;

use crate::mode::TransferMode;

pub use memory::MemorySession;
pub use sftp::{SessionConfig, SftpSession};

/// Status returned by every put/get start and continuation call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransferStatus {
    Pending,
    Completed,
    Failed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Upload,
    Download,
}

impl Direction {
    pub fn label(self) -> &'static str {
        match self {
            Direction::Upload => "upload",
            Direction::Download => "download",
        }
    }
}

/// A stateful remote file-transfer connection with a current-directory cursor.
///
/// Relative paths are resolved against the cursor. Only one operation may use a
/// session at a time; the walker restores the cursor after every descent.
pub trait RemoteSession {
    /// Move the cursor into `path`; false if it is not a traversable directory.
    fn enter(&mut self, path: &str) -> bool;
    /// Move the cursor to its parent (best-effort).
    fn leave(&mut self);
    /// Current cursor as an absolute path, if the session can report it.
    fn pwd(&mut self) -> Option<String>;
    /// Entry names directly under `path`; may include `.` and `..`.
    /// An unreadable directory lists as empty.
    fn list(&mut self, path: &str) -> Vec<String>;
    /// Raw `ls -l` style lines for `path`, or None when the listing call fails.
    fn raw_list(&mut self, path: &str) -> Option<Vec<String>>;
    fn make_directory(&mut self, path: &str) -> bool;
    fn delete(&mut self, path: &str) -> bool;
    fn put(&mut self, remote: &str, local: &Path, mode: TransferMode) -> TransferStatus;
    fn continue_put(&mut self) -> TransferStatus;
    fn get(&mut self, local: &Path, remote: &str, mode: TransferMode) -> TransferStatus;
    fn continue_get(&mut self) -> TransferStatus;

    /// Parsed detailed listing; None (unavailable) when the raw listing fails.
    /// Lines that do not look like `ls -l` output (e.g. `total 12`) are dropped.
    fn list_detailed(&mut self, path: &str) -> Option<Vec<RemoteEntry>> {
        let lines = self.raw_list(path.trim_end_matches('/'))?;
        Some(lines.iter().filter_map(|l| parse_list_line(l)).collect())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// One parsed line of a detailed remote listing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteEntry {
    pub permissions: String,
    pub link_count: u32,
    pub owner: String,
    pub group: String,
    pub size: u64,
    pub month: String,
    pub day: String,
    pub time: String,
    pub kind: EntryKind,
    pub name: String,
}

/// Parse a Unix `ls -l` style line:
/// `drwxr-xr-x 2 user group 4096 Jan 01 12:00 name`.
/// The name is the last whitespace-free run of the line.
pub fn parse_list_line(line: &str) -> Option<RemoteEntry> {
    let chunks: Vec<&str> = line.split_whitespace().collect();
    if chunks.len() < 9 {
        return None;
    }
    let permissions = chunks[0].to_string();
    let kind = if permissions.starts_with('d') { EntryKind::Directory } else { EntryKind::File };
    Some(RemoteEntry {
        link_count: chunks[1].parse().ok()?,
        owner: chunks[2].to_string(),
        group: chunks[3].to_string(),
        size: chunks[4].parse().ok()?,
        month: chunks[5].to_string(),
        day: chunks[6].to_string(),
        time: chunks[7].to_string(),
        kind,
        name: chunks[chunks.len() - 1].to_string(),
        permissions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_directory_line() {
        let e = parse_list_line("drwxr-xr-x    2 web  www     4096 Mar 14 09:12 assets").unwrap();
        assert_eq!(e.kind, EntryKind::Directory);
        assert_eq!(e.link_count, 2);
        assert_eq!(e.owner, "web");
        assert_eq!(e.group, "www");
        assert_eq!(e.size, 4096);
        assert_eq!((e.month.as_str(), e.day.as_str(), e.time.as_str()), ("Mar", "14", "09:12"));
        assert_eq!(e.name, "assets");
    }

    #[test]
    fn parse_file_line_takes_trailing_token_as_name() {
        let e = parse_list_line("-rw-r--r-- 1 web www 120 Jan 2 2023 my notes.txt").unwrap();
        assert_eq!(e.kind, EntryKind::File);
        assert_eq!(e.size, 120);
        assert_eq!(e.name, "notes.txt");
    }

    #[test]
    fn reject_summary_and_garbage_lines() {
        assert!(parse_list_line("total 12").is_none());
        assert!(parse_list_line("").is_none());
        assert!(parse_list_line("-rw-r--r-- x web www 12 Jan 2 2023 a").is_none());
    }

    #[test]
    fn list_detailed_unavailable_when_raw_listing_fails() {
        let mut s = MemorySession::new();
        s.add_dir("/site");
        s.add_file("/site/index.html", b"<html/>");
        let entries = s.list_detailed("/site/").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "index.html");
        assert_eq!(entries[0].size, 7);
        assert!(s.list_detailed("/missing").is_none());
    }
}
