use std::{
    future::Future,
    io::ErrorKind,
    ops::Deref,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Result;
use chrono::{Duration, NaiveDate};
use fs4::tokio::AsyncFileExt;
use serde::{de::DeserializeOwned, Serialize};
use tokio::{
    fs::File,
    io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt},
};
use tracing::{debug, instrument, warn};

use crate::{
    fs::operations::{lossy_lines, read_lines_backwards},
    utils::time::{date_to_record_name, record_name_to_date},
};

use super::{
    entities::{ApplicationUsageEntity, SessionRecordEntity},
    validation::{validate_session_record, validate_usage_record, RecentQuery},
};

const SESSIONS_DIR: &str = "sessions";
const USAGE_DIR: &str = "usage";

/// Storage port for tracked activity. Writes come from the daemon, reads from the cli.
///
/// `insert_session` and `add_usage` are separate writes. When a rollup update fails after the
/// session was inserted, the raw log keeps the session and the rollup for that day stays short
/// by its duration. Callers are expected to report that.
pub trait ActivityStorage {
    /// Appends a finalized session to the raw session log.
    fn insert_session(&self, record: SessionRecordEntity) -> impl Future<Output = Result<()>>;

    /// Adds `duration` to the rollup of `application` for `date`, creating the row if needed.
    fn add_usage(
        &self,
        application: Arc<str>,
        date: NaiveDate,
        duration: Duration,
    ) -> impl Future<Output = Result<()>>;

    /// Most recent sessions first, at most `query.limit()` of them.
    fn recent_sessions(
        &self,
        query: RecentQuery,
    ) -> impl Future<Output = Result<Vec<SessionRecordEntity>>>;

    /// Rollups for a single day ordered by descending total duration.
    fn daily_usage(
        &self,
        date: NaiveDate,
    ) -> impl Future<Output = Result<Vec<ApplicationUsageEntity>>>;
}

impl<T: Deref> ActivityStorage for T
where
    T::Target: ActivityStorage,
{
    fn insert_session(&self, record: SessionRecordEntity) -> impl Future<Output = Result<()>> {
        self.deref().insert_session(record)
    }

    fn add_usage(
        &self,
        application: Arc<str>,
        date: NaiveDate,
        duration: Duration,
    ) -> impl Future<Output = Result<()>> {
        self.deref().add_usage(application, date, duration)
    }

    fn recent_sessions(
        &self,
        query: RecentQuery,
    ) -> impl Future<Output = Result<Vec<SessionRecordEntity>>> {
        self.deref().recent_sessions(query)
    }

    fn daily_usage(
        &self,
        date: NaiveDate,
    ) -> impl Future<Output = Result<Vec<ApplicationUsageEntity>>> {
        self.deref().daily_usage(date)
    }
}

/// File backed [ActivityStorage]. Every UTC day gets one JSON lines file in `sessions/` and one
/// in `usage/`.
pub struct ActivityStorageImpl {
    sessions_dir: PathBuf,
    usage_dir: PathBuf,
}

impl ActivityStorageImpl {
    pub fn new(dir: PathBuf) -> Result<Self, std::io::Error> {
        let sessions_dir = dir.join(SESSIONS_DIR);
        let usage_dir = dir.join(USAGE_DIR);
        std::fs::create_dir_all(&sessions_dir)?;
        std::fs::create_dir_all(&usage_dir)?;

        Ok(Self {
            sessions_dir,
            usage_dir,
        })
    }

    /// Days that have a session log, newest first.
    async fn session_days(&self) -> Result<Vec<NaiveDate>> {
        let mut entries = tokio::fs::read_dir(&self.sessions_dir).await?;
        let mut days = vec![];
        while let Some(entry) = entries.next_entry().await? {
            match entry.file_name().to_str().and_then(record_name_to_date) {
                Some(day) => days.push(day),
                None => debug!("Skipping unexpected file {:?}", entry.path()),
            }
        }
        days.sort_unstable_by(|a, b| b.cmp(a));
        Ok(days)
    }

    async fn last_sessions_of(
        &self,
        day: NaiveDate,
        limit: usize,
    ) -> Result<Vec<SessionRecordEntity>> {
        let path = self.sessions_dir.join(date_to_record_name(day));
        let mut file = match File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => Err(e)?,
        };
        file.lock_shared()?;
        // Corrupt lines are skipped without using up the limit, so newer valid sessions of this
        // day are never traded for older ones.
        let sessions = read_lines_backwards(&mut file, limit, |line| {
            parse_line::<SessionRecordEntity>(&path, line)
        })
        .await;
        file.unlock_async().await?;

        Ok(sessions?)
    }
}

fn parse_line<T: DeserializeOwned>(path: &Path, line: &str) -> Option<T> {
    match serde_json::from_str::<T>(line) {
        Ok(v) => Some(v),
        Err(e) => {
            // ignore illegal values. Might happen after shutdowns
            warn!(
                "During parsing in path {:?} found illegal json string {}:  {e}",
                path, line
            );
            None
        }
    }
}

fn parse_lines<T: DeserializeOwned>(path: &Path, content: &[u8]) -> Vec<T> {
    lossy_lines(content)
        .filter_map(|line| parse_line(path, &line))
        .collect()
}

/// Reads every valid line of a JSON lines file. A missing file is treated as empty.
async fn read_entities<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    async fn extract(path: &Path) -> std::result::Result<Vec<u8>, std::io::Error> {
        debug!("Extracting {path:?}");
        let mut file = File::open(path).await?;
        file.lock_shared()?;
        let mut content = vec![];
        let result = file.read_to_end(&mut content).await;
        file.unlock_async().await?;
        result?;
        Ok(content)
    }

    match extract(path).await {
        Ok(content) => Ok(parse_lines(path, &content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(vec![]),
        Err(e) => Err(e)?,
    }
}

fn to_json_lines<'a, T: Serialize + 'a>(
    entities: impl IntoIterator<Item = &'a T>,
) -> Result<Vec<u8>> {
    let mut buffer = Vec::<u8>::new();
    for entity in entities {
        serde_json::to_writer(&mut buffer, entity)?;
        buffer.push(b'\n');
    }
    Ok(buffer)
}

/// Adds `duration` to the matching rollup row, or creates one.
fn merge_usage(
    rows: &mut Vec<ApplicationUsageEntity>,
    application: Arc<str>,
    date: NaiveDate,
    duration: Duration,
) -> &ApplicationUsageEntity {
    let index = match rows
        .iter()
        .position(|row| row.application_name == application && row.date == date)
    {
        Some(index) => index,
        None => {
            rows.push(ApplicationUsageEntity::new(application, date));
            rows.len() - 1
        }
    };
    let row = &mut rows[index];
    row.total_duration += duration;
    row
}

impl ActivityStorage for ActivityStorageImpl {
    #[instrument(skip(self))]
    async fn insert_session(&self, record: SessionRecordEntity) -> Result<()> {
        validate_session_record(&record)?;
        let path = self.sessions_dir.join(date_to_record_name(record.date()));

        let mut file = File::options()
            .append(true)
            .read(true)
            .create(true)
            .open(path)
            .await?;

        let buffer = to_json_lines([&record])?;

        // Semi-safe acquire-release for a file
        file.lock_exclusive()?;
        let result = async {
            // A write cut by shutdown leaves a line without a line break. Start a fresh line so
            // the new record isn't glued to it.
            if file.seek(std::io::SeekFrom::End(0)).await? > 0 {
                file.seek(std::io::SeekFrom::End(-1)).await?;
                if file.read_u8().await? != b'\n' {
                    file.write_all(b"\n").await?;
                }
            }
            file.write_all(&buffer).await?;
            file.flush().await
        }
        .await;
        file.unlock_async().await?;
        Ok(result?)
    }

    #[instrument(skip(self))]
    async fn add_usage(
        &self,
        application: Arc<str>,
        date: NaiveDate,
        duration: Duration,
    ) -> Result<()> {
        let path = self.usage_dir.join(date_to_record_name(date));

        let mut file = File::options()
            .write(true)
            .create(true)
            .read(true)
            .truncate(false)
            .open(&path)
            .await?;

        file.lock_exclusive()?;
        let result = async {
            // A rewrite cut short can leave broken bytes behind. Those lines are dropped here
            // and the file is rewritten clean.
            let mut content = vec![];
            file.read_to_end(&mut content).await?;
            let mut rows = parse_lines::<ApplicationUsageEntity>(&path, &content);

            validate_usage_record(merge_usage(&mut rows, application, date, duration))?;

            let buffer = to_json_lines(&rows)?;
            file.rewind().await?;
            file.set_len(0).await?;
            file.write_all(&buffer).await?;
            file.flush().await?;
            anyhow::Ok(())
        }
        .await;
        file.unlock_async().await?;
        result
    }

    #[instrument(skip(self))]
    async fn recent_sessions(&self, query: RecentQuery) -> Result<Vec<SessionRecordEntity>> {
        let mut sessions = vec![];
        for day in self.session_days().await? {
            let missing = query.limit() - sessions.len();
            if missing == 0 {
                break;
            }
            sessions.extend(self.last_sessions_of(day, missing).await?);
        }
        sessions.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        Ok(sessions)
    }

    #[instrument(skip(self))]
    async fn daily_usage(&self, date: NaiveDate) -> Result<Vec<ApplicationUsageEntity>> {
        let path = self.usage_dir.join(date_to_record_name(date));
        let mut rows = read_entities::<ApplicationUsageEntity>(&path)
            .await?
            .into_iter()
            .filter(|row| row.date == date)
            .collect::<Vec<_>>();
        rows.sort_by(|a, b| {
            b.total_duration
                .cmp(&a.total_duration)
                .then_with(|| a.application_name.cmp(&b.application_name))
        });
        Ok(rows)
    }
}
