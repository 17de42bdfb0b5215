use std::collections::{BTreeMap, HashSet, VecDeque};
use std::fs::File;
use std::io::Write;
use std::path::Path;

use super::{RemoteSession, TransferStatus};
use crate::mode::TransferMode;

#[derive(Clone, Debug)]
enum Node {
    Dir,
    File(Vec<u8>),
}

enum Active {
    Upload { dest: String, data: Vec<u8>, offset: usize },
    Download { file: File, data: Vec<u8>, offset: usize },
}

/// Calls observed by a [`MemorySession`], in order.
#[derive(Clone, Debug, Default)]
pub struct CallLog {
    /// Directories actually entered; failed attempts are not recorded.
    pub enters: Vec<String>,
    pub leaves: usize,
    pub mkdirs: Vec<String>,
    pub deletes: Vec<String>,
    pub puts: Vec<(String, TransferMode)>,
    pub gets: Vec<(String, TransferMode)>,
    pub continuations: u64,
}

/// In-memory remote tree implementing [`RemoteSession`].
///
/// Transfers move `chunk_size` bytes per call so multi-chunk files go through
/// the Pending loop. Outcomes can also be scripted, and individual mkdir,
/// transfer and delete targets can be made to fail.
pub struct MemorySession {
    nodes: BTreeMap<String, Node>,
    cwd: String,
    chunk_size: usize,
    active: Option<Active>,
    script: VecDeque<TransferStatus>,
    stalled: bool,
    failing_mkdirs: HashSet<String>,
    failing_transfers: HashSet<String>,
    failing_deletes: HashSet<String>,
    pub calls: CallLog,
}

impl Default for MemorySession {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySession {
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert("/".to_string(), Node::Dir);
        Self {
            nodes,
            cwd: "/".to_string(),
            chunk_size: 8,
            active: None,
            script: VecDeque::new(),
            stalled: false,
            failing_mkdirs: HashSet::new(),
            failing_transfers: HashSet::new(),
            failing_deletes: HashSet::new(),
            calls: CallLog::default(),
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Create `path` and any missing ancestors as directories.
    pub fn add_dir(&mut self, path: &str) {
        let abs = self.resolve(path);
        let mut accum = String::new();
        for seg in abs.split('/').filter(|s| !s.is_empty()) {
            accum.push('/');
            accum.push_str(seg);
            self.nodes.entry(accum.clone()).or_insert(Node::Dir);
        }
    }

    /// Create a file (and its ancestors).
    pub fn add_file(&mut self, path: &str, content: &[u8]) {
        let abs = self.resolve(path);
        self.add_dir(&parent_of(&abs));
        self.nodes.insert(abs, Node::File(content.to_vec()));
    }

    /// Queue statuses returned by the next put/get/continue calls instead of
    /// moving real data.
    pub fn script_transfer<I: IntoIterator<Item = TransferStatus>>(&mut self, statuses: I) {
        self.script.extend(statuses);
    }

    /// Every transfer call reports Pending from now on.
    pub fn set_stalled(&mut self, stalled: bool) {
        self.stalled = stalled;
    }

    pub fn fail_mkdir(&mut self, path: &str) {
        let abs = self.resolve(path);
        self.failing_mkdirs.insert(abs);
    }

    pub fn fail_transfer(&mut self, path: &str) {
        let abs = self.resolve(path);
        self.failing_transfers.insert(abs);
    }

    pub fn fail_delete(&mut self, path: &str) {
        let abs = self.resolve(path);
        self.failing_deletes.insert(abs);
    }

    pub fn file(&self, path: &str) -> Option<&[u8]> {
        match self.nodes.get(&normalize("/", path)) {
            Some(Node::File(data)) => Some(data),
            _ => None,
        }
    }

    pub fn is_dir(&self, path: &str) -> bool {
        matches!(self.nodes.get(&normalize("/", path)), Some(Node::Dir))
    }

    /// Absolute paths of all files, sorted.
    pub fn files(&self) -> Vec<String> {
        self.nodes
            .iter()
            .filter(|(_, n)| matches!(n, Node::File(_)))
            .map(|(p, _)| p.clone())
            .collect()
    }

    /// Absolute paths of all directories except the root, sorted.
    pub fn dirs(&self) -> Vec<String> {
        self.nodes
            .iter()
            .filter(|(p, n)| matches!(n, Node::Dir) && p.as_str() != "/")
            .map(|(p, _)| p.clone())
            .collect()
    }

    pub fn cwd(&self) -> &str {
        &self.cwd
    }

    fn resolve(&self, path: &str) -> String {
        normalize(&self.cwd, path)
    }

    fn children(&self, dir: &str) -> Vec<(&str, &Node)> {
        let prefix = if dir == "/" { "/".to_string() } else { format!("{}/", dir) };
        self.nodes
            .range(prefix.clone()..)
            .take_while(|(p, _)| p.starts_with(&prefix))
            .filter_map(|(p, n)| {
                let rest = &p[prefix.len()..];
                (!rest.is_empty() && !rest.contains('/')).then_some((rest, n))
            })
            .collect()
    }

    fn scripted(&mut self) -> Option<TransferStatus> {
        if self.stalled {
            return Some(TransferStatus::Pending);
        }
        self.script.pop_front()
    }

    fn step(&mut self) -> TransferStatus {
        let chunk = self.chunk_size;
        // Some(done) on progress, None on a write failure
        let progressed = match self.active.as_mut() {
            None => return TransferStatus::Failed,
            Some(Active::Upload { dest, data, offset }) => {
                let end = (*offset + chunk).min(data.len());
                match self.nodes.get_mut(dest.as_str()) {
                    Some(Node::File(buf)) => {
                        buf.extend_from_slice(&data[*offset..end]);
                        *offset = end;
                        Some(end >= data.len())
                    }
                    _ => None,
                }
            }
            Some(Active::Download { file, data, offset }) => {
                let end = (*offset + chunk).min(data.len());
                if file.write_all(&data[*offset..end]).is_ok() {
                    *offset = end;
                    Some(end >= data.len())
                } else {
                    None
                }
            }
        };
        match progressed {
            Some(false) => TransferStatus::Pending,
            Some(true) => {
                self.active = None;
                TransferStatus::Completed
            }
            None => {
                self.active = None;
                TransferStatus::Failed
            }
        }
    }
}

impl RemoteSession for MemorySession {
    fn enter(&mut self, path: &str) -> bool {
        let abs = self.resolve(path);
        if matches!(self.nodes.get(&abs), Some(Node::Dir)) {
            self.calls.enters.push(abs.clone());
            self.cwd = abs;
            true
        } else {
            false
        }
    }

    fn leave(&mut self) {
        self.calls.leaves += 1;
        self.cwd = parent_of(&self.cwd);
    }

    fn pwd(&mut self) -> Option<String> {
        Some(self.cwd.clone())
    }

    fn list(&mut self, path: &str) -> Vec<String> {
        let abs = self.resolve(path);
        if !matches!(self.nodes.get(&abs), Some(Node::Dir)) {
            return Vec::new();
        }
        let mut names = vec![".".to_string(), "..".to_string()];
        names.extend(self.children(&abs).into_iter().map(|(name, _)| name.to_string()));
        names
    }

    fn raw_list(&mut self, path: &str) -> Option<Vec<String>> {
        let abs = self.resolve(path);
        if !matches!(self.nodes.get(&abs), Some(Node::Dir)) {
            return None;
        }
        let lines = self
            .children(&abs)
            .into_iter()
            .map(|(name, node)| match node {
                Node::Dir => format!("drwxr-xr-x 2 ftp ftp 0 Jan 01 00:00 {}", name),
                Node::File(data) => {
                    format!("-rw-r--r-- 1 ftp ftp {} Jan 01 00:00 {}", data.len(), name)
                }
            })
            .collect();
        Some(lines)
    }

    fn make_directory(&mut self, path: &str) -> bool {
        let abs = self.resolve(path);
        self.calls.mkdirs.push(abs.clone());
        if self.failing_mkdirs.contains(&abs) || self.nodes.contains_key(&abs) {
            return false;
        }
        if !matches!(self.nodes.get(&parent_of(&abs)), Some(Node::Dir)) {
            return false;
        }
        self.nodes.insert(abs, Node::Dir);
        true
    }

    fn delete(&mut self, path: &str) -> bool {
        let abs = self.resolve(path);
        self.calls.deletes.push(abs.clone());
        if self.failing_deletes.contains(&abs) {
            return false;
        }
        if matches!(self.nodes.get(&abs), Some(Node::File(_))) {
            self.nodes.remove(&abs);
            true
        } else {
            false
        }
    }

    fn put(&mut self, remote: &str, local: &Path, mode: TransferMode) -> TransferStatus {
        let dest = self.resolve(remote);
        self.calls.puts.push((dest.clone(), mode));
        if let Some(s) = self.scripted() {
            return s;
        }
        if self.failing_transfers.contains(&dest)
            || !matches!(self.nodes.get(&parent_of(&dest)), Some(Node::Dir))
            || matches!(self.nodes.get(&dest), Some(Node::Dir))
        {
            return TransferStatus::Failed;
        }
        let Ok(data) = std::fs::read(local) else {
            return TransferStatus::Failed;
        };
        self.nodes.insert(dest.clone(), Node::File(Vec::new()));
        self.active = Some(Active::Upload { dest, data, offset: 0 });
        self.step()
    }

    fn continue_put(&mut self) -> TransferStatus {
        self.calls.continuations += 1;
        if let Some(s) = self.scripted() {
            return s;
        }
        match self.active {
            Some(Active::Upload { .. }) => self.step(),
            _ => TransferStatus::Failed,
        }
    }

    fn get(&mut self, local: &Path, remote: &str, mode: TransferMode) -> TransferStatus {
        let src = self.resolve(remote);
        self.calls.gets.push((src.clone(), mode));
        if let Some(s) = self.scripted() {
            return s;
        }
        if self.failing_transfers.contains(&src) {
            return TransferStatus::Failed;
        }
        let Some(Node::File(data)) = self.nodes.get(&src) else {
            return TransferStatus::Failed;
        };
        let data = data.clone();
        let Ok(file) = File::create(local) else {
            return TransferStatus::Failed;
        };
        self.active = Some(Active::Download { file, data, offset: 0 });
        self.step()
    }

    fn continue_get(&mut self) -> TransferStatus {
        self.calls.continuations += 1;
        if let Some(s) = self.scripted() {
            return s;
        }
        match self.active {
            Some(Active::Download { .. }) => self.step(),
            _ => TransferStatus::Failed,
        }
    }
}

fn normalize(cwd: &str, path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    let base = if path.starts_with('/') { "" } else { cwd };
    for seg in base.split('/').chain(path.split('/')) {
        match seg {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            s => parts.push(s),
        }
    }
    format!("/{}", parts.join("/"))
}

fn parent_of(abs: &str) -> String {
    match abs.trim_end_matches('/').rsplit_once('/') {
        Some(("", _)) | None => "/".to_string(),
        Some((parent, _)) => parent.to_string(),
    }
}
