// transfer module: drives one file through the session's Pending loop
use std::path::Path;
use std::time::{Duration, Instant};

use crate::error::SyncError;
use crate::events::{CancelToken, SyncObserver};
use crate::mode::mode_for;
use crate::session::{Direction, RemoteSession, TransferStatus};

/// Default cap on continuation calls for a single file.
pub const DEFAULT_MAX_POLLS: u64 = 1_000_000;

/// Bounds on the Pending loop so a stalled session cannot block forever.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransferLimits {
    pub max_polls: Option<u64>,
    pub timeout: Option<Duration>,
}

impl Default for TransferLimits {
    fn default() -> Self {
        Self { max_polls: Some(DEFAULT_MAX_POLLS), timeout: None }
    }
}

impl TransferLimits {
    pub fn unbounded() -> Self {
        Self { max_polls: None, timeout: None }
    }
}

/// Per-call context for [`transfer_file`].
pub struct TransferCtx<'a> {
    pub limits: TransferLimits,
    pub cancel: &'a CancelToken,
    pub observer: &'a mut dyn SyncObserver,
}

/// Upload or download one file: start the transfer with the mode picked from
/// the remote file name, then keep continuing while the session reports
/// Pending. Returns the number of continuation calls on success.
///
/// A failed or aborted transfer may leave the destination partially written.
pub fn transfer_file<S: RemoteSession + ?Sized>(
    session: &mut S,
    direction: Direction,
    local: &Path,
    remote: &str,
    ctx: &mut TransferCtx<'_>,
) -> Result<u64, SyncError> {
    let name = remote.rsplit('/').next().unwrap_or(remote);
    let mode = mode_for(name);
    if ctx.cancel.is_cancelled() {
        return Err(SyncError::Cancelled(remote.to_string()));
    }
    ctx.observer.on_file_start(direction, remote, mode);
    tracing::info!("{} {} ({})", direction.label(), remote, mode.label());

    let started = Instant::now();
    let mut status = match direction {
        Direction::Upload => session.put(remote, local, mode),
        Direction::Download => session.get(local, remote, mode),
    };
    let mut polls: u64 = 0;
    while status == TransferStatus::Pending {
        if ctx.cancel.is_cancelled() {
            ctx.observer.on_file_done(remote, false);
            return Err(SyncError::Cancelled(remote.to_string()));
        }
        let over_polls = ctx.limits.max_polls.is_some_and(|max| polls >= max);
        let over_time = ctx.limits.timeout.is_some_and(|t| started.elapsed() >= t);
        if over_polls || over_time {
            tracing::warn!("{} stalled after {} polls: {}", direction.label(), polls, remote);
            ctx.observer.on_file_done(remote, false);
            return Err(SyncError::TransferStalled { path: remote.to_string(), polls });
        }
        ctx.observer.on_file_progress(remote, polls);
        status = match direction {
            Direction::Upload => session.continue_put(),
            Direction::Download => session.continue_get(),
        };
        polls += 1;
    }

    let ok = status == TransferStatus::Completed;
    ctx.observer.on_file_done(remote, ok);
    if ok {
        tracing::debug!("{} done after {} polls: {}", direction.label(), polls, remote);
        Ok(polls)
    } else {
        Err(SyncError::TransferFailed { direction, path: remote.to_string() })
    }
}
