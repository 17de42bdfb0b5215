use std::path::Path;
use std::process::ExitCode;
use std::time::Instant;

use anyhow::{Context, Result, anyhow, bail};
use clap::Parser;
use cli_table::print_stdout;
use owo_colors::OwoColorize;

use ftpsync::cli::{Cli, Commands, GlobalOpts};
use ftpsync::config::Config;
use ftpsync::events::{CancelToken, TracingObserver};
use ftpsync::filter::{FilterMode, FilterSet};
use ftpsync::local::StdLocalFs;
use ftpsync::session::{RemoteSession, SftpSession};
use ftpsync::transfer::TransferLimits;
use ftpsync::util::{self, ProgressObserver};
use ftpsync::walker::{SyncReport, Syncer};
use ftpsync::SyncError;

type CliSyncer<'a> = Syncer<'a, SftpSession, StdLocalFs, (ProgressObserver, TracingObserver)>;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let _log_guard = util::init_logging(cli.global.verbose);
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report_error(&e);
            if matches!(e.downcast_ref::<SyncError>(), Some(SyncError::Cancelled(_))) {
                ExitCode::from(130)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

fn report_error(e: &anyhow::Error) {
    let label = if util::try_enable_ansi_on_windows() {
        "error".red().bold().to_string()
    } else {
        "error".to_string()
    };
    if let Some(sync) = e.downcast_ref::<SyncError>()
        && let Some(path) = sync.path()
    {
        eprintln!("{}: {} failed at {}: {:#}", label, sync.operation(), path, e);
    } else {
        eprintln!("{}: {:#}", label, e);
    }
}

fn run(cli: Cli) -> Result<()> {
    let global = cli.global;
    let config_path = match &global.config {
        Some(p) => p.clone(),
        None => Config::default_path()?,
    };
    if let Commands::Config { init } = cli.command {
        return handle_config(&config_path, init);
    }

    let file_config = Config::load(&config_path)
        .with_context(|| format!("failed to load config {}", config_path.display()))?;
    let config = apply_overrides(file_config, &global);
    if config.host.is_empty() {
        bail!("no remote host: pass --host or set `host` in {}", config_path.display());
    }
    let filter = config.filter_set().context("invalid filter pattern")?;
    tracing::debug!("filter patterns: {:?}", filter.patterns());
    let limits = config.limits();

    let cancel = CancelToken::new();
    {
        let token = cancel.clone();
        ctrlc::set_handler(move || token.cancel()).context("failed to install Ctrl-C handler")?;
    }

    let mut session = SftpSession::connect(&config.session_config())
        .with_context(|| format!("connecting to {}@{}:{}", config.username, config.host, config.port))?;

    let ctx = RunCtx { filter: &filter, limits, cancel, quiet: global.quiet };
    let started = Instant::now();
    let (action, report) = match cli.command {
        Commands::Push { local, remote, no_recursive } => {
            let recursive = !no_recursive;
            if !local.is_dir() {
                bail!("local directory not found: {}", local.display());
            }
            let total = util::count_local_files(&local, recursive);
            let report = run_sync(&mut session, &ctx, "push", Some(total), |s| {
                s.push(&local, &remote, recursive)
            })?;
            ("push", report)
        }
        Commands::Pull { remote, local, no_recursive, whitelist } => {
            let mode = FilterMode::from_whitelist(whitelist);
            let report = run_sync(&mut session, &ctx, "pull", None, |s| {
                s.pull(&local, &remote, !no_recursive, mode)
            })?;
            ("pull", report)
        }
        Commands::Prune { remote, recursive, blacklist } => {
            let mode = FilterMode::from_whitelist(!blacklist);
            let report = run_sync(&mut session, &ctx, "prune", None, |s| {
                s.prune(&remote, recursive, mode)
            })?;
            ("prune", report)
        }
        Commands::List { remote } => {
            let entries = session
                .list_detailed(&remote)
                .ok_or_else(|| anyhow!("listing unavailable for {}", remote))?;
            print_stdout(util::listing_table(&entries)).context("failed to print listing")?;
            return Ok(());
        }
        Commands::Config { .. } => return Ok(()),
    };

    let elapsed = started.elapsed();
    if !global.quiet {
        util::print_summary(action, &report, elapsed);
    }
    if global.json
        && let Ok(line) = serde_json::to_string(&util::summary_json(action, &report, elapsed))
    {
        println!("{}", line);
    }
    Ok(())
}

struct RunCtx<'a> {
    filter: &'a FilterSet,
    limits: TransferLimits,
    cancel: CancelToken,
    quiet: bool,
}

fn run_sync<F>(
    session: &mut SftpSession,
    ctx: &RunCtx<'_>,
    action: &str,
    total: Option<u64>,
    op: F,
) -> Result<SyncReport>
where
    F: FnOnce(&mut CliSyncer<'_>) -> Result<SyncReport, SyncError>,
{
    let progress = ProgressObserver::new(action, total, ctx.quiet);
    let mut syncer = Syncer::new(session, ctx.filter)
        .with_observer((progress, TracingObserver))
        .with_cancel(ctx.cancel.clone())
        .with_limits(ctx.limits);
    let result = op(&mut syncer);
    let (progress, _) = syncer.into_observer();
    progress.finish();
    if !ctx.quiet && !progress.failures().is_empty() {
        eprintln!("{} paths failed:", progress.failures().len());
        for path in progress.failures() {
            eprintln!("  {}", path);
        }
    }
    Ok(result?)
}

/// CLI flags win over file values; `--ignore` patterns are appended.
fn apply_overrides(mut config: Config, global: &GlobalOpts) -> Config {
    if let Some(host) = &global.host {
        config.host = host.clone();
    }
    if let Some(port) = global.port {
        config.port = port;
    }
    if let Some(user) = &global.user {
        config.username = user.clone();
    }
    if let Some(identity) = &global.identity {
        config.identity_file = Some(identity.clone());
    }
    config.ignore.extend(global.ignore.iter().cloned());
    if let Some(max) = global.max_polls {
        config.max_polls = (max > 0).then_some(max);
    }
    if let Some(secs) = global.timeout_secs {
        config.transfer_timeout_secs = Some(secs);
    }
    config
}

fn handle_config(path: &Path, init: bool) -> Result<()> {
    if init {
        if path.exists() {
            println!("config already exists: {}", path.display());
        } else {
            Config::default()
                .save(path)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("wrote default config: {}", path.display());
        }
    }
    let config = Config::load(path).with_context(|| format!("failed to load config {}", path.display()))?;
    println!("{}", config.to_pretty_json());
    Ok(())
}
