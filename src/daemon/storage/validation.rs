//! Checks performed on records at the storage boundary. Limits match the column sizes of the
//! session log and the usage rollup.

use std::sync::Arc;

use chrono::Duration;
use thiserror::Error;

use super::entities::{ApplicationUsageEntity, SessionRecordEntity};

pub const MAX_WINDOW_TITLE_LEN: usize = 512;
pub const MAX_APPLICATION_NAME_LEN: usize = 255;
pub const MAX_URL_LEN: usize = 2048;

pub const DEFAULT_RECENT_LIMIT: usize = 10;
pub const MAX_RECENT_LIMIT: usize = 100;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field} is {len} characters long, at most {max} are allowed")]
    TooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },
    #[error("interval ends before it starts")]
    InvertedInterval,
    #[error("duration {actual} doesn't match the interval length {expected}")]
    DurationMismatch { expected: Duration, actual: Duration },
    #[error("total duration can't be negative, got {0}")]
    NegativeDuration(Duration),
    #[error("limit must be between 1 and {max}, got {0}", max = MAX_RECENT_LIMIT)]
    LimitOutOfRange(usize),
}

fn check_len(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    let len = value.chars().count();
    if len > max {
        Err(ValidationError::TooLong { field, len, max })
    } else {
        Ok(())
    }
}

pub fn validate_session_record(record: &SessionRecordEntity) -> Result<(), ValidationError> {
    check_len("windowTitle", &record.window_title, MAX_WINDOW_TITLE_LEN)?;
    check_len("applicationName", &record.application_name, MAX_APPLICATION_NAME_LEN)?;
    if let Some(url) = &record.url {
        check_len("url", url, MAX_URL_LEN)?;
    }
    if record.end_time < record.start_time {
        return Err(ValidationError::InvertedInterval);
    }
    let expected = record.end_time - record.start_time;
    if record.duration != expected {
        return Err(ValidationError::DurationMismatch {
            expected,
            actual: record.duration,
        });
    }
    Ok(())
}

pub fn validate_usage_record(record: &ApplicationUsageEntity) -> Result<(), ValidationError> {
    check_len("applicationName", &record.application_name, MAX_APPLICATION_NAME_LEN)?;
    if record.total_duration < Duration::zero() {
        return Err(ValidationError::NegativeDuration(record.total_duration));
    }
    Ok(())
}

/// Cuts `value` to at most `max` characters.
pub fn truncate_chars(value: Arc<str>, max: usize) -> Arc<str> {
    match value.char_indices().nth(max) {
        Some((byte_index, _)) => value[..byte_index].into(),
        None => value,
    }
}

/// Makes a record produced by the tracker fit into the column limits. Window titles are
/// arbitrary user data, so they get cut rather than rejected.
pub fn fit_session_record(record: SessionRecordEntity) -> SessionRecordEntity {
    SessionRecordEntity {
        window_title: truncate_chars(record.window_title, MAX_WINDOW_TITLE_LEN),
        application_name: truncate_chars(record.application_name, MAX_APPLICATION_NAME_LEN),
        url: record.url.map(|url| truncate_chars(url, MAX_URL_LEN)),
        ..record
    }
}

/// Bounded request for the most recent sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecentQuery {
    limit: usize,
}

impl RecentQuery {
    pub fn new(limit: usize) -> Result<Self, ValidationError> {
        if (1..=MAX_RECENT_LIMIT).contains(&limit) {
            Ok(Self { limit })
        } else {
            Err(ValidationError::LimitOutOfRange(limit))
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}

impl Default for RecentQuery {
    fn default() -> Self {
        Self {
            limit: DEFAULT_RECENT_LIMIT,
        }
    }
}
