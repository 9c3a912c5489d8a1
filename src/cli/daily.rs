use std::fmt::Display;

use anyhow::Result;
use chrono::{Local, NaiveDate};
use chrono_english::parse_date_string;
use clap::{CommandFactory, Parser, ValueEnum};

use crate::{daemon::storage::activity_storage::ActivityStorage, utils::percentage::Percentage};

use super::{
    output::{print_json, print_usage},
    Args,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DateStyle {
    Uk,
    Us,
}

impl From<DateStyle> for chrono_english::Dialect {
    fn from(value: DateStyle) -> Self {
        match value {
            DateStyle::Uk => Self::Uk,
            DateStyle::Us => Self::Us,
        }
    }
}

impl Display for DateStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateStyle::Uk => write!(f, "uk"),
            DateStyle::Us => write!(f, "us"),
        }
    }
}

#[derive(Debug, Parser)]
pub struct DailyCommand {
    #[arg(
        long,
        short,
        help = "Day to show. Examples are \"today\", \"yesterday\", \"15/03/2025\". Defaults to today"
    )]
    date: Option<String>,
    #[arg(
        long,
        default_value_t = DateStyle::Uk,
        help = "Style of dates used during parsing. For Uk it's day/month/year. For Us it's month/day/year"
    )]
    date_style: DateStyle,
    #[arg(
        short = 'p',
        long = "percentage",
        help = "Filter apps to have at least specified percentage",
        default_value_t = Percentage::ZERO
    )]
    min_percentage: Percentage,
    #[arg(long, help = "Print raw records as json")]
    json: bool,
}

/// Prints per application totals for a single day, biggest first.
pub async fn process_daily_command(
    storage: impl ActivityStorage,
    DailyCommand {
        date,
        date_style,
        min_percentage,
        json,
    }: DailyCommand,
) -> Result<()> {
    let date = parse_date(date, date_style)?;
    let usage = storage.daily_usage(date).await?;
    if json {
        print_json(&usage)
    } else {
        print_usage(date, &usage, min_percentage);
        Ok(())
    }
}

/// Rollups are kept per UTC day, the parsed value is used as a plain calendar date.
fn parse_date(date: Option<String>, date_style: DateStyle) -> Result<NaiveDate> {
    let now = Local::now();
    match date.map(|s| parse_date_string(&s, now, date_style.into())) {
        Some(Ok(v)) => Ok(v.date_naive()),
        Some(Err(e)) => Err(Args::command()
            .error(
                clap::error::ErrorKind::ValueValidation,
                format!("Failed to valiate date {e}"),
            )
            .into()),
        None => Ok(now.date_naive()),
    }
}
