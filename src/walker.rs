// walker module: recursive push / pull / prune over a cursor-based session
use std::path::Path;

use serde::Serialize;

use crate::error::SyncError;
use crate::events::{CancelToken, NoopObserver, SyncObserver};
use crate::filter::{FilterMode, FilterSet};
use crate::local::{LocalFs, StdLocalFs};
use crate::session::{Direction, RemoteSession};
use crate::transfer::{TransferCtx, TransferLimits, transfer_file};

/// Counters for one completed operation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub dirs_entered: u64,
    pub dirs_created: u64,
    pub files_transferred: u64,
    pub files_deleted: u64,
    pub delete_failures: u64,
    pub skipped: u64,
}

/// Drives push, pull and prune against one remote session.
///
/// The session cursor is moved with a strict enter/leave discipline: every
/// directory the walker enters is left again before its parent continues, and
/// the cursor the operation started from is restored when it ends (also on
/// error). Any fatal condition aborts the whole traversal.
pub struct Syncer<
    'a,
    S: RemoteSession + ?Sized,
    L: LocalFs = StdLocalFs,
    O: SyncObserver = NoopObserver,
> {
    session: &'a mut S,
    filter: &'a FilterSet,
    local: L,
    observer: O,
    cancel: CancelToken,
    limits: TransferLimits,
    report: SyncReport,
}

impl<'a, S: RemoteSession + ?Sized> Syncer<'a, S> {
    pub fn new(session: &'a mut S, filter: &'a FilterSet) -> Self {
        Syncer {
            session,
            filter,
            local: StdLocalFs,
            observer: NoopObserver,
            cancel: CancelToken::new(),
            limits: TransferLimits::default(),
            report: SyncReport::default(),
        }
    }
}

impl<'a, S: RemoteSession + ?Sized, L: LocalFs, O: SyncObserver> Syncer<'a, S, L, O> {
    pub fn with_observer<O2: SyncObserver>(self, observer: O2) -> Syncer<'a, S, L, O2> {
        Syncer {
            session: self.session,
            filter: self.filter,
            local: self.local,
            observer,
            cancel: self.cancel,
            limits: self.limits,
            report: self.report,
        }
    }

    pub fn with_local<L2: LocalFs>(self, local: L2) -> Syncer<'a, S, L2, O> {
        Syncer {
            session: self.session,
            filter: self.filter,
            local,
            observer: self.observer,
            cancel: self.cancel,
            limits: self.limits,
            report: self.report,
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_limits(mut self, limits: TransferLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn into_observer(self) -> O {
        self.observer
    }

    /// Upload `local_root` into the existing remote directory `remote_root`.
    ///
    /// Entries whose candidate path (`remote_root/.../name`) matches the filter
    /// are skipped; there is no whitelist sense for uploads. Missing remote
    /// directories are created one level at a time.
    pub fn push(
        &mut self,
        local_root: &Path,
        remote_root: &str,
        recursive: bool,
    ) -> Result<SyncReport, SyncError> {
        let root = trim_root(remote_root);
        self.run(|this| this.push_dir(local_root, &root, &root, recursive))
    }

    /// Download the remote directory `remote_root` into `local_root`.
    /// `"."` means the directory the cursor already points at.
    pub fn pull(
        &mut self,
        local_root: &Path,
        remote_root: &str,
        recursive: bool,
        mode: FilterMode,
    ) -> Result<SyncReport, SyncError> {
        let root = trim_root(remote_root);
        self.run(|this| this.pull_dir(local_root, &root, &root, recursive, mode))
    }

    /// Delete remote files under `remote_root` selected by the filter. With
    /// [`FilterMode::Whitelist`] (the usual sense here) only matching entries
    /// are removed. Directories are emptied but never removed themselves.
    pub fn prune(
        &mut self,
        remote_root: &str,
        recursive: bool,
        mode: FilterMode,
    ) -> Result<SyncReport, SyncError> {
        let root = trim_root(remote_root);
        self.run(|this| this.prune_dir(&root, &root, recursive, mode))
    }

    fn run<F>(&mut self, op: F) -> Result<SyncReport, SyncError>
    where
        F: FnOnce(&mut Self) -> Result<(), SyncError>,
    {
        self.report = SyncReport::default();
        let origin = self.session.pwd();
        let result = op(self);
        if let Some(origin) = origin
            && self.session.pwd().as_deref() != Some(origin.as_str())
            && !self.session.enter(&origin)
        {
            tracing::warn!("could not restore remote cursor to {}", origin);
        }
        result.map(|()| std::mem::take(&mut self.report))
    }

    fn check_cancel(&self, shown: &str) -> Result<(), SyncError> {
        if self.cancel.is_cancelled() {
            return Err(SyncError::Cancelled(shown.to_string()));
        }
        Ok(())
    }

    fn enter_dir(&mut self, remote_dir: &str, shown: &str) -> Result<(), SyncError> {
        if !self.session.enter(remote_dir) {
            return Err(SyncError::RemoteRootMissing(shown.to_string()));
        }
        self.report.dirs_entered += 1;
        self.observer.on_enter_directory(shown);
        tracing::debug!("enter {}", shown);
        Ok(())
    }

    // check by entering and leaving right away
    fn is_remote_dir(&mut self, name: &str) -> bool {
        if self.session.enter(name) {
            self.session.leave();
            true
        } else {
            false
        }
    }

    /// True when the filter rejects `candidate` under `mode`.
    fn filtered(&mut self, candidate: &str, mode: FilterMode) -> bool {
        if mode.skips(self.filter.matches(candidate)) {
            tracing::debug!("skip {}", candidate);
            self.report.skipped += 1;
            self.observer.on_skip(candidate);
            true
        } else {
            false
        }
    }

    fn transfer(
        &mut self,
        direction: Direction,
        local: &Path,
        remote: &str,
    ) -> Result<(), SyncError> {
        let mut ctx =
            TransferCtx { limits: self.limits, cancel: &self.cancel, observer: &mut self.observer };
        transfer_file(&mut *self.session, direction, local, remote, &mut ctx)?;
        self.report.files_transferred += 1;
        Ok(())
    }

    fn push_dir(
        &mut self,
        local_dir: &Path,
        remote_dir: &str,
        shown: &str,
        recursive: bool,
    ) -> Result<(), SyncError> {
        self.check_cancel(shown)?;
        self.enter_dir(remote_dir, shown)?;
        let result = self.push_entries(local_dir, shown, recursive);
        self.session.leave();
        result
    }

    fn push_entries(
        &mut self,
        local_dir: &Path,
        shown: &str,
        recursive: bool,
    ) -> Result<(), SyncError> {
        let cwd = self.session.pwd();
        for name in self.local.list_entries(local_dir)? {
            if is_pseudo(&name) {
                continue;
            }
            let candidate = join(shown, &name);
            self.check_cancel(&candidate)?;
            if self.filtered(&candidate, FilterMode::Blacklist) {
                continue;
            }
            let local_path = local_dir.join(&name);
            if self.local.is_dir(&local_path) {
                if !recursive {
                    continue;
                }
                if !self.is_remote_dir(&name) {
                    tracing::info!("mkdir {}", candidate);
                    if !self.session.make_directory(&name) {
                        return Err(SyncError::DirectoryCreateFailed {
                            path: candidate,
                            local: false,
                        });
                    }
                    self.report.dirs_created += 1;
                    self.observer.on_directory_created(&candidate, false);
                }
                self.push_dir(&local_path, &name, &candidate, recursive)?;
            } else {
                let remote = cursor_path(cwd.as_deref(), &name);
                self.transfer(Direction::Upload, &local_path, &remote)?;
            }
        }
        Ok(())
    }

    fn ensure_local_dir(&mut self, local_dir: &Path) -> Result<(), SyncError> {
        if self.local.is_dir(local_dir) {
            return Ok(());
        }
        let path = local_dir.to_string_lossy().to_string();
        if !self.local.create_dir(local_dir) {
            return Err(SyncError::DirectoryCreateFailed { path, local: true });
        }
        tracing::info!("mkdir (local) {}", path);
        self.report.dirs_created += 1;
        self.observer.on_directory_created(&path, true);
        Ok(())
    }

    fn pull_dir(
        &mut self,
        local_dir: &Path,
        remote_dir: &str,
        shown: &str,
        recursive: bool,
        mode: FilterMode,
    ) -> Result<(), SyncError> {
        self.check_cancel(shown)?;
        let entered = remote_dir != ".";
        if entered {
            self.enter_dir(remote_dir, shown)?;
        }
        let result = self.pull_entries(local_dir, shown, recursive, mode);
        if entered {
            self.session.leave();
        }
        result
    }

    fn pull_entries(
        &mut self,
        local_dir: &Path,
        shown: &str,
        recursive: bool,
        mode: FilterMode,
    ) -> Result<(), SyncError> {
        self.ensure_local_dir(local_dir)?;
        let cwd = self.session.pwd();
        for name in self.session.list(".") {
            if is_pseudo(&name) {
                continue;
            }
            let candidate = join(shown, &name);
            self.check_cancel(&candidate)?;
            if self.filtered(&candidate, mode) {
                continue;
            }
            let local_path = local_dir.join(&name);
            if self.is_remote_dir(&name) {
                if recursive {
                    self.pull_dir(&local_path, &name, &candidate, recursive, mode)?;
                }
            } else {
                let remote = cursor_path(cwd.as_deref(), &name);
                self.transfer(Direction::Download, &local_path, &remote)?;
            }
        }
        Ok(())
    }

    fn prune_dir(
        &mut self,
        remote_dir: &str,
        shown: &str,
        recursive: bool,
        mode: FilterMode,
    ) -> Result<(), SyncError> {
        self.check_cancel(shown)?;
        let entered = remote_dir != ".";
        if entered {
            self.enter_dir(remote_dir, shown)?;
        }
        let result = self.prune_entries(shown, recursive, mode);
        if entered {
            self.session.leave();
        }
        result
    }

    fn prune_entries(&mut self, shown: &str, recursive: bool, mode: FilterMode) -> Result<(), SyncError> {
        let cwd = self.session.pwd();
        for name in self.session.list(".") {
            if is_pseudo(&name) {
                continue;
            }
            let candidate = join(shown, &name);
            self.check_cancel(&candidate)?;
            if self.filtered(&candidate, mode) {
                continue;
            }
            if self.is_remote_dir(&name) {
                if recursive {
                    self.prune_dir(&name, &candidate, recursive, mode)?;
                }
            } else {
                let remote = cursor_path(cwd.as_deref(), &name);
                let ok = self.session.delete(&remote);
                self.observer.on_delete(&remote, ok);
                if ok {
                    tracing::info!("delete {}", remote);
                    self.report.files_deleted += 1;
                } else {
                    tracing::warn!("delete failed: {}", remote);
                    self.report.delete_failures += 1;
                }
            }
        }
        Ok(())
    }
}

fn is_pseudo(name: &str) -> bool {
    matches!(name, "." | "..")
}

// strip trailing separators but keep a bare "/"
fn trim_root(root: &str) -> String {
    let trimmed = root.trim_end_matches('/');
    if trimmed.is_empty() {
        if root.starts_with('/') { "/".to_string() } else { ".".to_string() }
    } else {
        trimmed.to_string()
    }
}

fn join(base: &str, name: &str) -> String {
    if base.ends_with('/') { format!("{}{}", base, name) } else { format!("{}/{}", base, name) }
}

// absolute path of `name` under the cursor when the session can report it
fn cursor_path(cwd: Option<&str>, name: &str) -> String {
    match cwd {
        Some(dir) => join(dir, name),
        None => name.to_string(),
    }
}
