use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::mode::TransferMode;
use crate::session::Direction;

/// Progress events emitted by the walker and the transfer loop.
/// All methods default to no-ops so consumers implement only what they show.
pub trait SyncObserver {
    fn on_enter_directory(&mut self, _remote: &str) {}
    fn on_directory_created(&mut self, _path: &str, _local: bool) {}
    /// Entry rejected by the path filter.
    fn on_skip(&mut self, _remote: &str) {}
    fn on_file_start(&mut self, _direction: Direction, _remote: &str, _mode: TransferMode) {}
    /// One Pending status; `polls` counts continuation calls so far.
    fn on_file_progress(&mut self, _remote: &str, _polls: u64) {}
    fn on_file_done(&mut self, _remote: &str, _ok: bool) {}
    fn on_delete(&mut self, _remote: &str, _ok: bool) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl SyncObserver for NoopObserver {}

/// Observer that forwards every event to `tracing` at trace level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl SyncObserver for TracingObserver {
    fn on_enter_directory(&mut self, remote: &str) {
        tracing::trace!(target: "ftpsync::events", "enter {}", remote);
    }

    fn on_directory_created(&mut self, path: &str, local: bool) {
        tracing::trace!(target: "ftpsync::events", "created {} (local={})", path, local);
    }

    fn on_skip(&mut self, remote: &str) {
        tracing::trace!(target: "ftpsync::events", "skip {}", remote);
    }

    fn on_file_start(&mut self, direction: Direction, remote: &str, mode: TransferMode) {
        tracing::trace!(target: "ftpsync::events", "{} start {} [{}]", direction.label(), remote, mode.label());
    }

    fn on_file_done(&mut self, remote: &str, ok: bool) {
        tracing::trace!(target: "ftpsync::events", "done {} ok={}", remote, ok);
    }

    fn on_delete(&mut self, remote: &str, ok: bool) {
        tracing::trace!(target: "ftpsync::events", "delete {} ok={}", remote, ok);
    }
}

/// Fan one event stream out to two observers.
impl<A: SyncObserver, B: SyncObserver> SyncObserver for (A, B) {
    fn on_enter_directory(&mut self, remote: &str) {
        self.0.on_enter_directory(remote);
        self.1.on_enter_directory(remote);
    }

    fn on_directory_created(&mut self, path: &str, local: bool) {
        self.0.on_directory_created(path, local);
        self.1.on_directory_created(path, local);
    }

    fn on_skip(&mut self, remote: &str) {
        self.0.on_skip(remote);
        self.1.on_skip(remote);
    }

    fn on_file_start(&mut self, direction: Direction, remote: &str, mode: TransferMode) {
        self.0.on_file_start(direction, remote, mode);
        self.1.on_file_start(direction, remote, mode);
    }

    fn on_file_progress(&mut self, remote: &str, polls: u64) {
        self.0.on_file_progress(remote, polls);
        self.1.on_file_progress(remote, polls);
    }

    fn on_file_done(&mut self, remote: &str, ok: bool) {
        self.0.on_file_done(remote, ok);
        self.1.on_file_done(remote, ok);
    }

    fn on_delete(&mut self, remote: &str, ok: bool) {
        self.0.on_delete(remote, ok);
        self.1.on_delete(remote, ok);
    }
}

/// Shared abort flag, checked on every directory entry and every transfer poll.
#[derive(Debug, Default, Clone)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
