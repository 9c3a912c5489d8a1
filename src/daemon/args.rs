use std::path::PathBuf;

use clap::Parser;
use tracing::level_filters::LevelFilter;

use super::DEFAULT_COLLECTION_INTERVAL;

#[derive(Parser)]
pub struct DaemonArgs {
    /// Run in the current process instead of detaching.
    #[arg(long)]
    pub force: bool,
    #[arg(long)]
    pub dir: Option<PathBuf>,
    /// How often the focused window is sampled, in milliseconds.
    #[arg(
        long = "interval-ms",
        default_value_t = DEFAULT_COLLECTION_INTERVAL.as_millis() as u64,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub interval_ms: u64,
    /// This option is for debugging purposes only.
    #[arg(long = "log-console")]
    pub log_console: bool,
    #[arg(long = "log-filter")]
    pub log: Option<LevelFilter>,
}
