// This runs daemon on windows without creating a console. Disable during development to see
// stdout.
#![windows_subsystem = "windows"]

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use focuslog::{
    daemon::{args::DaemonArgs, start_daemon},
    utils::{
        dir::resolve_application_path,
        logging::{DAEMON_PREFIX, enable_logging},
        runtime::single_thread_runtime,
    },
};

fn main() -> Result<()> {
    let command_args = std::env::args().collect::<Vec<_>>();
    let args = DaemonArgs::parse_from(&command_args);
    // Detaching changes the working directory, so a relative --dir has to be resolved first.
    let app_dir = resolve_application_path(args.dir)?;

    if !args.force && detach(command_args)? {
        println!("Created daemon");
        return Ok(());
    }

    enable_logging(DAEMON_PREFIX, &app_dir, args.log, args.log_console)?;
    let interval = Duration::from_millis(args.interval_ms);
    single_thread_runtime()?.block_on(start_daemon(app_dir, interval))
}

/// Moves the daemon away from the launching terminal. Returns `true` in the process that should
/// exit right away, `false` in the one that keeps running the daemon.
#[cfg(feature = "win")]
fn detach(mut command_args: Vec<String>) -> Result<bool> {
    use std::{os::windows::process::CommandExt, process::Stdio};
    use windows::Win32::System::Threading::DETACHED_PROCESS;

    // The detached copy gets --force so it doesn't try to detach again.
    command_args.push("--force".into());
    let mut command = std::process::Command::new(std::env::current_exe()?);
    command
        .args(command_args.into_iter().skip(1))
        .creation_flags(DETACHED_PROCESS.0)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    #[allow(clippy::zombie_processes)]
    command.spawn()?;
    Ok(true)
}

#[cfg(all(unix, not(feature = "win")))]
fn detach(_command_args: Vec<String>) -> Result<bool> {
    use daemonize::{Daemonize, Outcome, Stdio};

    let outcome = Daemonize::new()
        .stdout(Stdio::devnull())
        .stderr(Stdio::devnull())
        .execute();
    match outcome {
        Outcome::Parent(parent) => {
            parent?;
            Ok(true)
        }
        Outcome::Child(child) => {
            child?;
            Ok(false)
        }
    }
}

#[cfg(not(any(unix, feature = "win")))]
fn detach(_command_args: Vec<String>) -> Result<bool> {
    Ok(false)
}
