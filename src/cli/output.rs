use std::path::PathBuf;

use anyhow::Result;
use chrono::{Duration, Local, NaiveDate};
use serde::Serialize;

use crate::{
    daemon::storage::entities::{ApplicationUsageEntity, SessionRecordEntity},
    utils::{
        percentage::{duration_percentage, Percentage},
        time::format_duration,
    },
};

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_sessions(sessions: &[SessionRecordEntity]) {
    for session in sessions {
        let start = session.start_time.with_timezone(&Local);
        print!(
            "{}\t{}\t{}\t{}",
            start.format("%x %H:%M:%S"),
            format_duration(session.duration),
            clean_process_name(&session.application_name),
            session.window_title
        );
        match &session.url {
            Some(url) => println!("\t{url}"),
            None => println!(),
        }
    }
}

/// Rows whose share of the day is at least `min_percentage`, each paired with that share.
pub fn usage_shares(
    usage: &[ApplicationUsageEntity],
    min_percentage: Percentage,
) -> (Vec<(&ApplicationUsageEntity, Percentage)>, Duration) {
    let total = usage.iter().map(|v| v.total_duration).sum::<Duration>();
    let shares = usage
        .iter()
        .map(|v| (v, duration_percentage(v.total_duration, total)))
        .filter(|(_, share)| *share >= min_percentage)
        .collect();
    (shares, total)
}

pub fn print_usage(date: NaiveDate, usage: &[ApplicationUsageEntity], min_percentage: Percentage) {
    let (shares, total) = usage_shares(usage, min_percentage);
    println!("{}\t{}", date.format("%x"), format_duration(total));
    for (entry, share) in shares {
        println!(
            "{}%\t{}\t{}",
            *share as i32,
            format_duration(entry.total_duration),
            clean_process_name(&entry.application_name)
        );
    }
}

/// Native probes report full executable paths, only the file name is interesting for printing.
pub fn clean_process_name(value: &str) -> String {
    PathBuf::from(value)
        .file_name()
        .map(|v| v.to_string_lossy().to_string())
        .unwrap_or_else(|| value.to_string())
}
