use clap::Parser;
use std::path::PathBuf;

/// Restore a tree of SQL dumps into MySQL, then apply the project's modification scripts.
#[derive(Parser, Debug, Clone)]
#[command(name = "restoretool", version, about)]
pub struct Cli {
    /// Directory searched recursively for `*.sql` restore files
    #[arg(value_name = "RESTORE_PATH")]
    pub restore_path: PathBuf,

    /// Project folder; modification scripts are read from its `modify` subdirectory
    #[arg(short, long, default_value = "./")]
    pub folder: PathBuf,

    /// Optional JSON tuning file
    #[arg(short, long, default_value = "config.json")]
    pub config: PathBuf,

    /// Number of concurrent restore workers
    #[arg(short, long, env = "RESTORE_WORKERS")]
    pub workers: Option<usize>,

    /// Log file receiving every lifecycle event
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Kill a client command that runs longer than this many seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Mirror the log stream to stdout
    #[arg(short, long)]
    pub verbose: bool,
}
