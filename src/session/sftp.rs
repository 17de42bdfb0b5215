use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::{RemoteSession, TransferStatus};
use crate::error::SyncError;
use crate::mode::TransferMode;

/// Connection parameters for [`SftpSession::connect`].
#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub identity_file: Option<PathBuf>,
    /// Bytes moved per put/get poll.
    pub chunk_size: usize,
}

enum Active {
    Upload { src: std::fs::File, dst: ssh2::File },
    Download { src: ssh2::File, dst: std::fs::File },
}

/// [`RemoteSession`] over an SSH SFTP channel.
///
/// SFTP has no server-side working directory, so the cursor is kept here and
/// relative paths are joined onto it. Transfers are chunked: each put/get or
/// continue call moves at most `chunk_size` bytes. SFTP has no ASCII mode;
/// both modes copy bytes verbatim.
pub struct SftpSession {
    // keeps the SSH transport alive for the SFTP channel
    _sess: ssh2::Session,
    sftp: ssh2::Sftp,
    cwd: String,
    buf: Vec<u8>,
    active: Option<Active>,
}

/// Try public-key auth with the configured identity, then the usual `~/.ssh` keys.
fn try_key_authentication(
    sess: &mut ssh2::Session,
    username: &str,
    identity: Option<&Path>,
) -> bool {
    if sess.authenticated() {
        return true;
    }
    let mut candidates: Vec<PathBuf> = identity.map(Path::to_path_buf).into_iter().collect();
    if let Some(home) = dirs::home_dir() {
        for name in ["id_ed25519", "id_rsa", "id_ecdsa"] {
            candidates.push(home.join(".ssh").join(name));
        }
    }
    for p in candidates.iter().filter(|p| p.exists()) {
        let _ = sess.userauth_pubkey_file(username, None, p, None);
        if sess.authenticated() {
            tracing::debug!("authenticated with key {}", p.display());
            return true;
        }
    }
    false
}

fn create_tcp_connection(addr: &str) -> Result<TcpStream, SyncError> {
    let mut addrs =
        addr.to_socket_addrs().map_err(|e| SyncError::Session(format!("{}: {}", addr, e)))?;
    let sock =
        addrs.next().ok_or_else(|| SyncError::Session(format!("cannot resolve address: {}", addr)))?;
    let tcp = TcpStream::connect_timeout(&sock, Duration::from_secs(10))
        .map_err(|e| SyncError::Session(format!("connect {}: {}", addr, e)))?;
    let _ = tcp.set_read_timeout(Some(Duration::from_secs(30)));
    let _ = tcp.set_write_timeout(Some(Duration::from_secs(30)));
    Ok(tcp)
}

impl SftpSession {
    pub fn connect(cfg: &SessionConfig) -> Result<Self, SyncError> {
        let addr = format!("{}:{}", cfg.host, cfg.port);
        let tcp = create_tcp_connection(&addr)?;
        let mut sess = ssh2::Session::new()
            .map_err(|_| SyncError::Session(format!("cannot create SSH session: {}", addr)))?;
        sess.set_tcp_stream(tcp);
        sess.handshake()
            .map_err(|e| SyncError::Session(format!("SSH handshake failed: {}: {}", addr, e)))?;
        if !try_key_authentication(&mut sess, &cfg.username, cfg.identity_file.as_deref()) {
            return Err(SyncError::Session(format!(
                "SSH authentication failed: {}@{}",
                cfg.username, addr
            )));
        }
        let sftp = sess
            .sftp()
            .map_err(|e| SyncError::Session(format!("SFTP channel failed: {}: {}", addr, e)))?;
        let cwd = sftp
            .realpath(Path::new("."))
            .map(|p| p.to_string_lossy().replace('\\', "/"))
            .unwrap_or_else(|_| "/".to_string());
        tracing::info!("connected to {} as {}, cwd {}", addr, cfg.username, cwd);
        Ok(Self {
            _sess: sess,
            sftp,
            cwd,
            buf: vec![0u8; cfg.chunk_size.max(1)],
            active: None,
        })
    }

    fn resolve(&self, path: &str) -> String {
        let mut parts: Vec<&str> = Vec::new();
        let base = if path.starts_with('/') { "" } else { self.cwd.as_str() };
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

    fn step(&mut self) -> TransferStatus {
        let Some(active) = self.active.as_mut() else {
            return TransferStatus::Failed;
        };
        let (reader, writer): (&mut dyn Read, &mut dyn Write) = match active {
            Active::Upload { src, dst } => (src as &mut dyn Read, dst as &mut dyn Write),
            Active::Download { src, dst } => (src as &mut dyn Read, dst as &mut dyn Write),
        };
        let status = match reader.read(&mut self.buf) {
            Ok(0) => match writer.flush() {
                Ok(()) => TransferStatus::Completed,
                Err(_) => TransferStatus::Failed,
            },
            Ok(n) => match writer.write_all(&self.buf[..n]) {
                Ok(()) => TransferStatus::Pending,
                Err(e) => {
                    tracing::debug!("sftp write failed: {}", e);
                    TransferStatus::Failed
                }
            },
            Err(e) => {
                tracing::debug!("sftp read failed: {}", e);
                TransferStatus::Failed
            }
        };
        if status != TransferStatus::Pending {
            self.active = None;
        }
        status
    }
}

fn format_stat_line(name: &str, st: &ssh2::FileStat) -> String {
    let kind = if st.is_dir() { 'd' } else { '-' };
    let perm = st.perm.unwrap_or(0o644);
    let mut rights = String::with_capacity(10);
    rights.push(kind);
    for shift in [6u32, 3, 0] {
        let bits = (perm >> shift) & 0o7;
        rights.push(if bits & 0o4 != 0 { 'r' } else { '-' });
        rights.push(if bits & 0o2 != 0 { 'w' } else { '-' });
        rights.push(if bits & 0o1 != 0 { 'x' } else { '-' });
    }
    let when = st
        .mtime
        .and_then(|t| chrono::DateTime::from_timestamp(t as i64, 0))
        .map(|dt| dt.format("%b %d %H:%M").to_string())
        .unwrap_or_else(|| "Jan 01 00:00".to_string());
    format!(
        "{} 1 {} {} {} {} {}",
        rights,
        st.uid.unwrap_or(0),
        st.gid.unwrap_or(0),
        st.size.unwrap_or(0),
        when,
        name
    )
}

impl RemoteSession for SftpSession {
    fn enter(&mut self, path: &str) -> bool {
        let target = self.resolve(path);
        match self.sftp.stat(Path::new(&target)) {
            Ok(st) if st.is_dir() => {
                tracing::debug!("cd {}", target);
                self.cwd = target;
                true
            }
            _ => false,
        }
    }

    fn leave(&mut self) {
        self.cwd = self.resolve("..");
    }

    fn pwd(&mut self) -> Option<String> {
        Some(self.cwd.clone())
    }

    fn list(&mut self, path: &str) -> Vec<String> {
        let target = self.resolve(path);
        match self.sftp.readdir(Path::new(&target)) {
            Ok(entries) => entries
                .into_iter()
                .filter_map(|(p, _)| p.file_name().and_then(|n| n.to_str()).map(str::to_string))
                .collect(),
            Err(e) => {
                tracing::warn!("readdir failed: {}: {}", target, e);
                Vec::new()
            }
        }
    }

    fn raw_list(&mut self, path: &str) -> Option<Vec<String>> {
        let target = self.resolve(path);
        let entries = self.sftp.readdir(Path::new(&target)).ok()?;
        Some(
            entries
                .iter()
                .filter_map(|(p, st)| {
                    p.file_name().and_then(|n| n.to_str()).map(|n| format_stat_line(n, st))
                })
                .collect(),
        )
    }

    fn make_directory(&mut self, path: &str) -> bool {
        let target = self.resolve(path);
        self.sftp.mkdir(Path::new(&target), 0o755).is_ok()
    }

    fn delete(&mut self, path: &str) -> bool {
        let target = self.resolve(path);
        self.sftp.unlink(Path::new(&target)).is_ok()
    }

    fn put(&mut self, remote: &str, local: &Path, mode: TransferMode) -> TransferStatus {
        let target = self.resolve(remote);
        tracing::debug!("put {} -> {} ({})", local.display(), target, mode.label());
        let src = match std::fs::File::open(local) {
            Ok(f) => f,
            Err(e) => {
                tracing::debug!("open local failed: {}: {}", local.display(), e);
                return TransferStatus::Failed;
            }
        };
        let dst = match self.sftp.create(Path::new(&target)) {
            Ok(f) => f,
            Err(e) => {
                tracing::debug!("create remote failed: {}: {}", target, e);
                return TransferStatus::Failed;
            }
        };
        self.active = Some(Active::Upload { src, dst });
        self.step()
    }

    fn continue_put(&mut self) -> TransferStatus {
        match self.active {
            Some(Active::Upload { .. }) => self.step(),
            _ => TransferStatus::Failed,
        }
    }

    fn get(&mut self, local: &Path, remote: &str, mode: TransferMode) -> TransferStatus {
        let target = self.resolve(remote);
        tracing::debug!("get {} -> {} ({})", target, local.display(), mode.label());
        let src = match self.sftp.open(Path::new(&target)) {
            Ok(f) => f,
            Err(e) => {
                tracing::debug!("open remote failed: {}: {}", target, e);
                return TransferStatus::Failed;
            }
        };
        let dst = match std::fs::File::create(local) {
            Ok(f) => f,
            Err(e) => {
                tracing::debug!("create local failed: {}: {}", local.display(), e);
                return TransferStatus::Failed;
            }
        };
        self.active = Some(Active::Download { src, dst });
        self.step()
    }

    fn continue_get(&mut self) -> TransferStatus {
        match self.active {
            Some(Active::Download { .. }) => self.step(),
            _ => TransferStatus::Failed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreachable_host_is_a_session_error() {
        let cfg = SessionConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
            username: "nobody".to_string(),
            identity_file: None,
            chunk_size: 1024,
        };
        match SftpSession::connect(&cfg) {
            Err(SyncError::Session(msg)) => assert!(msg.contains("127.0.0.1:1")),
            Err(other) => panic!("unexpected error: {:?}", other),
            Ok(_) => panic!("expected connection failure"),
        }
    }
}
