use anyhow::Result;
use tracing::{debug, error, info};

use crate::daemon::storage::{
    activity_storage::ActivityStorage,
    entities::SessionRecordEntity,
    session_event::WindowSession,
    validation::fit_session_record,
};

use super::module::EventProcessor;

/// Represents saving module. Saving module main goal is to bridge
/// [ProcessingModule](super::ProcessingModule) and [ActivityStorage]. Every session goes into
/// the raw log first, then its duration is added to the daily rollup.
pub struct LocalSaver<S: ActivityStorage> {
    storage: S,
    saved: usize,
}

impl<S: ActivityStorage> LocalSaver<S> {
    pub fn new(storage: S) -> Self {
        Self { storage, saved: 0 }
    }
}

impl<S: ActivityStorage> EventProcessor for LocalSaver<S> {
    async fn process_next(&mut self, session: WindowSession) -> Result<()> {
        let record = fit_session_record(SessionRecordEntity::from(session));
        let application = record.application_name.clone();
        let daily = record.daily_durations();

        self.storage.insert_session(record).await?;

        for (date, duration) in daily {
            debug!("Adding {duration} of {application} to {date}");
            self.storage
                .add_usage(application.clone(), date, duration)
                .await
                .inspect_err(|e| {
                    error!(
                        %application,
                        %date,
                        duration_ms = duration.num_milliseconds(),
                        "Session is in the log but its duration is missing from the rollup: {e:?}"
                    )
                })?;
        }

        self.saved += 1;
        Ok(())
    }

    async fn finalize(&mut self) -> Result<()> {
        info!("Saved {} sessions", self.saved);
        Ok(())
    }
}
