use anyhow::Result;
use clap::{CommandFactory, Parser};

use crate::daemon::storage::{
    activity_storage::ActivityStorage,
    validation::{RecentQuery, DEFAULT_RECENT_LIMIT},
};

use super::{
    output::{print_json, print_sessions},
    Args,
};

#[derive(Debug, Parser)]
pub struct RecentCommand {
    #[arg(
        short,
        long,
        default_value_t = DEFAULT_RECENT_LIMIT,
        help = "Amount of sessions to show, from 1 to 100"
    )]
    limit: usize,
    #[arg(long, help = "Print raw records as json")]
    json: bool,
}

/// Prints the most recent finished sessions, newest first.
pub async fn process_recent_command(
    storage: impl ActivityStorage,
    RecentCommand { limit, json }: RecentCommand,
) -> Result<()> {
    let query = RecentQuery::new(limit).map_err(|e| {
        Args::command().error(clap::error::ErrorKind::ValueValidation, e.to_string())
    })?;

    let sessions = storage.recent_sessions(query).await?;
    if json {
        print_json(&sessions)
    } else {
        print_sessions(&sessions);
        Ok(())
    }
}
