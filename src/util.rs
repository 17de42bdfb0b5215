use std::path::Path;
use std::time::Duration;

use cli_table::format::Justify;
use cli_table::{Cell, CellStruct, Style, Table, TableStruct};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use owo_colors::OwoColorize;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use walkdir::WalkDir;

use crate::config::Config;
use crate::events::SyncObserver;
use crate::mode::TransferMode;
use crate::session::{Direction, EntryKind, RemoteEntry};
use crate::walker::SyncReport;

/// Try to enable ANSI escape sequence support on Windows consoles.
#[cfg(windows)]
pub fn try_enable_ansi_on_windows() -> bool {
    enable_ansi_support::enable_ansi_support().is_ok()
}

#[cfg(not(windows))]
pub fn try_enable_ansi_on_windows() -> bool {
    true
}

/// Install the global subscriber. Console output goes to stderr at `warn`
/// (`debug` with `verbose`); `RUST_LOG` overrides either. With `verbose` a
/// daily-rolling file under `~/.ftpsync/logs` is added; keep the returned
/// guard alive until exit so buffered lines are flushed.
pub fn init_logging(verbose: bool) -> Option<WorkerGuard> {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let console = fmt::layer().with_writer(std::io::stderr).with_target(false);

    if verbose
        && let Ok(dir) = Config::storage_dir().map(|d| d.join("logs"))
        && std::fs::create_dir_all(&dir).is_ok()
    {
        let appender = tracing_appender::rolling::daily(dir, "ftpsync.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let file = fmt::layer().with_writer(writer).with_ansi(false);
        let _ = tracing_subscriber::registry().with(filter).with(console).with(file).try_init();
        return Some(guard);
    }
    let _ = tracing_subscriber::registry().with(filter).with(console).try_init();
    None
}

/// Convert a byte count into a human readable string using IEC units (KiB/MiB/GiB).
pub fn human_bytes(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;
    let b = bytes as f64;
    if b >= GB {
        format!("{:.2} GiB", b / GB)
    } else if b >= MB {
        format!("{:.2} MiB", b / MB)
    } else if b >= KB {
        format!("{:.2} KiB", b / KB)
    } else {
        format!("{} B", bytes)
    }
}

/// Number of regular files under `root`, used as the upload bar length.
/// Filtered entries are included, so the bar may finish short of its end.
pub fn count_local_files(root: &Path, recursive: bool) -> u64 {
    let depth = if recursive { usize::MAX } else { 1 };
    WalkDir::new(root)
        .min_depth(1)
        .max_depth(depth)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .count() as u64
}

/// Console progress driven by walker events.
pub struct ProgressObserver {
    bar: ProgressBar,
    failures: Vec<String>,
}

impl ProgressObserver {
    /// A bar when `total` is known, a spinner otherwise; hidden when `quiet`.
    pub fn new(action: &str, total: Option<u64>, quiet: bool) -> Self {
        let bar = if quiet {
            ProgressBar::with_draw_target(total, ProgressDrawTarget::hidden())
        } else {
            match total {
                Some(n) => ProgressBar::new(n),
                None => ProgressBar::new_spinner(),
            }
        };
        let template = if total.is_some() {
            "{prefix:.green} [{bar:30.cyan/blue}] {pos}/{len} {wide_msg}"
        } else {
            "{prefix:.green} {spinner} {pos} {wide_msg}"
        };
        bar.set_style(ProgressStyle::with_template(template).unwrap_or_else(|_| ProgressStyle::default_bar()));
        bar.set_prefix(action.to_string());
        bar.enable_steady_tick(Duration::from_millis(120));
        ProgressObserver { bar, failures: Vec::new() }
    }

    /// Paths whose transfer or delete did not succeed.
    pub fn failures(&self) -> &[String] {
        &self.failures
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl SyncObserver for ProgressObserver {
    fn on_enter_directory(&mut self, remote: &str) {
        self.bar.set_message(remote.to_string());
    }

    fn on_file_start(&mut self, _direction: Direction, remote: &str, mode: TransferMode) {
        self.bar.set_message(format!("{} [{}]", remote, mode.label()));
    }

    fn on_file_progress(&mut self, _remote: &str, polls: u64) {
        if polls % 64 == 0 {
            self.bar.tick();
        }
    }

    fn on_file_done(&mut self, remote: &str, ok: bool) {
        self.bar.inc(1);
        if !ok {
            self.failures.push(remote.to_string());
        }
    }

    fn on_delete(&mut self, remote: &str, ok: bool) {
        self.bar.inc(1);
        if !ok {
            self.failures.push(remote.to_string());
        }
    }
}

/// Print a concise coloured summary line for a completed operation.
pub fn print_summary(action: &str, report: &SyncReport, elapsed: Duration) {
    let line = summary_line(action, report, elapsed);
    if try_enable_ansi_on_windows() {
        if report.delete_failures > 0 {
            println!("{}", line.yellow());
        } else {
            println!("{}", line.green());
        }
    } else {
        println!("{}", line);
    }
}

pub fn summary_line(action: &str, report: &SyncReport, elapsed: Duration) -> String {
    let mut line = format!(
        "{}: {} files, {} deleted, {} dirs created, {} skipped in {:.2}s",
        action,
        report.files_transferred,
        report.files_deleted,
        report.dirs_created,
        report.skipped,
        elapsed.as_secs_f64()
    );
    if report.delete_failures > 0 {
        line.push_str(&format!(" ({} deletes failed)", report.delete_failures));
    }
    line
}

/// Single-line machine readable summary.
pub fn summary_json(action: &str, report: &SyncReport, elapsed: Duration) -> serde_json::Value {
    serde_json::json!({
        "action": action,
        "report": report,
        "elapsed_secs": elapsed.as_secs_f64(),
    })
}

/// Table for `fts ls`.
pub fn listing_table(entries: &[RemoteEntry]) -> TableStruct {
    let title = vec![
        "Permissions".cell().bold(true),
        "Owner".cell().bold(true),
        "Group".cell().bold(true),
        "Size".cell().bold(true),
        "Modified".cell().bold(true),
        "Name".cell().bold(true),
    ];
    let rows: Vec<Vec<CellStruct>> = entries
        .iter()
        .map(|e| {
            let name = match e.kind {
                EntryKind::Directory => format!("{}/", e.name),
                EntryKind::File => e.name.clone(),
            };
            vec![
                e.permissions.clone().cell(),
                e.owner.clone().cell(),
                e.group.clone().cell(),
                human_bytes(e.size).cell().justify(Justify::Right),
                format!("{} {} {}", e.month, e.day, e.time).cell(),
                name.cell(),
            ]
        })
        .collect();
    rows.table().title(title)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn human_bytes_units() {
        assert_eq!(human_bytes(512), "512 B");
        assert_eq!(human_bytes(2048), "2.00 KiB");
        assert_eq!(human_bytes(5 * 1024 * 1024), "5.00 MiB");
    }

    #[test]
    fn summary_mentions_delete_failures_only_when_present() {
        let mut report = SyncReport { files_transferred: 3, skipped: 1, ..SyncReport::default() };
        let line = summary_line("push", &report, Duration::from_millis(1500));
        assert_eq!(line, "push: 3 files, 0 deleted, 0 dirs created, 1 skipped in 1.50s");
        report.delete_failures = 2;
        assert!(summary_line("prune", &report, Duration::ZERO).ends_with("(2 deletes failed)"));
    }

    #[test]
    fn json_summary_carries_report() {
        let report = SyncReport { files_deleted: 4, ..SyncReport::default() };
        let v = summary_json("prune", &report, Duration::from_secs(2));
        assert_eq!(v["action"], "prune");
        assert_eq!(v["report"]["files_deleted"], 4);
    }

    #[test]
    fn count_local_files_respects_recursion() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("a.txt"), b"a").unwrap();
        std::fs::write(dir.path().join("sub/b.txt"), b"b").unwrap();
        assert_eq!(count_local_files(dir.path(), true), 2);
        assert_eq!(count_local_files(dir.path(), false), 1);
    }

    #[test]
    fn hidden_progress_collects_failures() {
        let mut p = ProgressObserver::new("pull", Some(2), true);
        p.on_file_done("/a", true);
        p.on_file_done("/b", false);
        p.on_delete("/c", false);
        assert_eq!(p.failures(), ["/b".to_string(), "/c".to_string()]);
        p.finish();
    }
}
