pub mod daemon_path;
pub mod daily;
pub mod output;
pub mod process;
pub mod recent;

use std::{env, path::PathBuf, time::Duration};

use anyhow::Result;
use clap::{Parser, Subcommand};
use daemon_path::to_daemon_path;
use daily::{process_daily_command, DailyCommand};
use process::{kill_previous_servers, restart_server};
use recent::{process_recent_command, RecentCommand};
use tracing::level_filters::LevelFilter;

use crate::{
    daemon::{
        start_daemon, storage::activity_storage::ActivityStorageImpl, DEFAULT_COLLECTION_INTERVAL,
    },
    utils::{
        dir::resolve_application_path,
        logging::{enable_logging, CLI_PREFIX},
    },
};

#[derive(Parser, Debug)]
#[command(name = "Focuslog", version, long_about = None)]
#[command(about = "Tracks which windows you spend your time in", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(
        long,
        global = true,
        help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
    )]
    dir: Option<PathBuf>,
    #[arg(long, help = "Enable logging")]
    log: bool,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(about = "Starts a daemon for the application")]
    Init {
        #[arg(
            long = "interval-ms",
            default_value_t = DEFAULT_COLLECTION_INTERVAL.as_millis() as u64,
            help = "How often the focused window is sampled"
        )]
        interval_ms: u64,
    },
    #[command(
        about = "Run a daemon directly in current console. Used for creating a daemon internally and for debugging"
    )]
    Serve {
        #[arg(
            long = "interval-ms",
            default_value_t = DEFAULT_COLLECTION_INTERVAL.as_millis() as u64,
            help = "How often the focused window is sampled"
        )]
        interval_ms: u64,
    },
    #[command(about = "Stop currently running daemon.")]
    Stop {},
    #[command(about = "Show the most recent window sessions")]
    Recent {
        #[command(flatten)]
        command: RecentCommand,
    },
    #[command(about = "Show time spent per application during a day")]
    Daily {
        #[command(flatten)]
        command: DailyCommand,
    },
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let app_dir = resolve_application_path(args.dir)?;

    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };
    enable_logging(CLI_PREFIX, &app_dir, logging_level, args.log)?;

    match args.commands {
        Commands::Init { interval_ms } => restart_server(Some(app_dir), interval_ms),
        Commands::Stop {} => {
            let process_name = env::current_exe()?;
            let daemon_name = to_daemon_path(process_name.clone());
            kill_previous_servers(&[&process_name, &daemon_name])
        }
        Commands::Serve { interval_ms } => {
            start_daemon(app_dir, Duration::from_millis(interval_ms.max(1))).await
        }
        Commands::Recent { command } => {
            process_recent_command(ActivityStorageImpl::new(app_dir)?, command).await
        }
        Commands::Daily { command } => {
            process_daily_command(ActivityStorageImpl::new(app_dir)?, command).await
        }
    }
}
