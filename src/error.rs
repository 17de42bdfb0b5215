/// Structured errors for sync operations. Every variant is fatal to the
/// operation that produced it; partial progress is not rolled back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// A remote directory (the root, or one the walk descends into) cannot be entered.
    RemoteRootMissing(String),
    /// A directory could not be created (remote on push, local on pull).
    DirectoryCreateFailed { path: String, local: bool },
    /// The session reported Failed for a file transfer.
    TransferFailed { direction: crate::session::Direction, path: String },
    /// A filter pattern (or one of its segments) is not a valid regular expression.
    FilterPatternInvalid { pattern: String, message: String },
    /// The transfer kept returning Pending past the configured poll/time limit.
    TransferStalled { path: String, polls: u64 },
    /// The cancel token was raised while working on `path`.
    Cancelled(String),
    /// Local directory enumeration failed.
    LocalIo { path: String, message: String },
    /// Session setup (connect / handshake / auth / SFTP channel) failed.
    Session(String),
}

impl std::fmt::Display for SyncError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use SyncError::*;
        match self {
            RemoteRootMissing(p) => write!(f, "remote directory not enterable: {}", p),
            DirectoryCreateFailed { path, local: true } => {
                write!(f, "failed to create local directory: {}", display_path(path))
            }
            DirectoryCreateFailed { path, local: false } => {
                write!(f, "failed to create remote directory: {}", path)
            }
            TransferFailed { direction, path } => {
                write!(f, "{} failed: {}", direction.label(), display_path(path))
            }
            FilterPatternInvalid { pattern, message } => {
                write!(f, "invalid filter pattern '{}': {}", pattern, message)
            }
            TransferStalled { path, polls } => {
                write!(f, "transfer stalled after {} polls: {}", polls, display_path(path))
            }
            Cancelled(p) => write!(f, "cancelled at: {}", display_path(p)),
            LocalIo { path, message } => {
                write!(f, "local I/O error: {}: {}", display_path(path), message)
            }
            Session(msg) => write!(f, "session error: {}", msg),
        }
    }
}

impl std::error::Error for SyncError {}

impl SyncError {
    /// Short label of the operation that failed, used in summaries and JSON output.
    pub fn operation(&self) -> &'static str {
        use SyncError::*;
        match self {
            RemoteRootMissing(_) => "enter",
            DirectoryCreateFailed { local: true, .. } => "mkdir-local",
            DirectoryCreateFailed { local: false, .. } => "mkdir-remote",
            TransferFailed { direction, .. } => direction.label(),
            FilterPatternInvalid { .. } => "filter",
            TransferStalled { .. } => "transfer",
            Cancelled(_) => "cancel",
            LocalIo { .. } => "list-local",
            Session(_) => "session",
        }
    }

    /// The path (or pattern, for filter errors) the failure refers to.
    pub fn path(&self) -> Option<&str> {
        use SyncError::*;
        match self {
            RemoteRootMissing(p) | Cancelled(p) => Some(p),
            DirectoryCreateFailed { path, .. }
            | TransferFailed { path, .. }
            | TransferStalled { path, .. }
            | LocalIo { path, .. } => Some(path),
            FilterPatternInvalid { pattern, .. } => Some(pattern),
            Session(_) => None,
        }
    }
}

/// Errors raised while reading or writing the configuration file.
#[derive(Debug, Clone)]
pub enum ConfigError {
    NoHomeDir,
    Read(std::path::PathBuf, String),
    Parse(std::path::PathBuf, String),
    Write(std::path::PathBuf, String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NoHomeDir => write!(f, "cannot find the user's home directory"),
            ConfigError::Read(p, msg) => {
                write!(f, "failed to read config: {}: {}", display_path(&p.to_string_lossy()), msg)
            }
            ConfigError::Parse(p, msg) => {
                write!(f, "malformed config: {}: {}", display_path(&p.to_string_lossy()), msg)
            }
            ConfigError::Write(p, msg) => {
                write!(f, "failed to write config: {}: {}", display_path(&p.to_string_lossy()), msg)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

fn display_path(p: &str) -> String {
    if p.contains('\\') { p.replace('\\', "/") } else { p.to_string() }
}
