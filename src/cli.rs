use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Cli {
    #[clap(flatten)]
    pub global: GlobalOpts,
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug, Clone, Default)]
pub struct GlobalOpts {
    #[clap(long, global = true, help = "Config file (default ~/.ftpsync/config.json)")]
    pub config: Option<PathBuf>,
    #[clap(long, global = true, help = "Remote host")]
    pub host: Option<String>,
    #[clap(long, global = true, help = "Remote SSH port")]
    pub port: Option<u16>,
    #[clap(short = 'u', long = "user", global = true, help = "Remote username")]
    pub user: Option<String>,
    #[clap(short = 'i', long, global = true, help = "Private key used for authentication")]
    pub identity: Option<PathBuf>,
    #[clap(
        short = 'x',
        long = "ignore",
        global = true,
        help = "Filter pattern, appended to the configured ones (repeatable)"
    )]
    pub ignore: Vec<String>,
    #[clap(long, global = true, help = "Cap on continuation polls per file (0 = unbounded)")]
    pub max_polls: Option<u64>,
    #[clap(long = "timeout", global = true, help = "Wall-clock cap per file in seconds")]
    pub timeout_secs: Option<u64>,
    #[clap(short, long, global = true, help = "Debug logging, also written to ~/.ftpsync/logs")]
    pub verbose: bool,
    #[clap(short, long, global = true, help = "No progress and no summary")]
    pub quiet: bool,
    #[clap(long, global = true, help = "Print a one-line JSON summary")]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[clap(about = "Upload a local tree into an existing remote directory", display_order = 1)]
    Push {
        local: PathBuf,
        remote: String,
        #[clap(long, help = "Only the top level of the local directory")]
        no_recursive: bool,
    },
    #[clap(about = "Download a remote tree into a local directory", display_order = 2)]
    Pull {
        #[clap(help = "Remote directory, `.` for the login directory")]
        remote: String,
        local: PathBuf,
        #[clap(long, help = "Only the top level of the remote directory")]
        no_recursive: bool,
        #[clap(short = 'w', long, help = "Download only entries matching the filters")]
        whitelist: bool,
    },
    #[clap(about = "Delete remote files matching the filters", display_order = 3)]
    Prune {
        remote: String,
        #[clap(short, long, help = "Descend into subdirectories")]
        recursive: bool,
        #[clap(short = 'b', long, help = "Delete everything except matching entries")]
        blacklist: bool,
    },
    #[clap(about = "Show a detailed remote listing", name = "ls", display_order = 4)]
    List { remote: String },
    #[clap(about = "Print or initialise the configuration", display_order = 5)]
    Config {
        #[clap(long, help = "Write a default config file if none exists")]
        init: bool,
    },
}
