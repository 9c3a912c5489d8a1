use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, Instrument};

use crate::{
    daemon::storage::session_event::WindowSession, utils::clock::Clock, window_api::WindowProbe,
};

use super::segmenter::SessionSegmenter;

pub struct DataCollectionModule {
    next: mpsc::Sender<WindowSession>,
    probe: Box<dyn WindowProbe>,
    shutdown: CancellationToken,
    segmenter: SessionSegmenter,
    collection_frequency: Duration,
    time_provider: Box<dyn Clock>,
}

impl DataCollectionModule {
    pub fn new(
        next: mpsc::Sender<WindowSession>,
        probe: Box<dyn WindowProbe>,
        shutdown: CancellationToken,
        collection_frequency: Duration,
        time_provider: Box<dyn Clock>,
    ) -> Self {
        Self {
            next,
            probe,
            shutdown,
            segmenter: SessionSegmenter::new(),
            collection_frequency,
            time_provider,
        }
    }

    /// Samples the focused window once. Probe failures count as an absent observation, which
    /// keeps the open session running.
    fn collect_data(&mut self) -> Option<WindowSession> {
        let observation = self
            .probe
            .get_active_window()
            .inspect_err(|e| error!("Encountered an error during collection {:?}", e))
            .ok()
            .flatten();
        let timestamp = self.time_provider.time();
        self.segmenter.sample(observation, timestamp)
    }

    async fn send(&self, session: WindowSession) -> Result<()> {
        let span = info_span!("Processing finalized session");
        debug!("Sending session {:?}", session);
        self.next
            .send(session)
            .instrument(span)
            .await
            .inspect_err(|e| error!("Unexpected error during sending {e:?}"))?;
        info!("Successfully sent session");
        Ok(())
    }

    /// Executes the collector event loop.
    pub async fn run(mut self) -> Result<()> {
        let mut collection_point = self.time_provider.instant();
        loop {
            collection_point += self.collection_frequency;

            if let Some(session) = self.collect_data() {
                self.send(session).await?;
            }

            tokio::select! {
                // Cancelation means we stop execution of the event loop. Which means we also drop
                // the sender channel and consequently stop processing module.
                _ = self.shutdown.cancelled() => {
                    break;
                }
                _ = self.time_provider.sleep_until(collection_point) => ()
            }
        }

        if let Some(session) = self.segmenter.flush(self.time_provider.time()) {
            info!("Flushing trailing session of {}", session.app_name);
            self.send(session).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use anyhow::{Result, anyhow};
    use chrono::{TimeZone, Utc};
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    use crate::{
        daemon::storage::session_event::WindowSession,
        utils::{clock::TestClock, logging::TEST_LOGGING},
        window_api::{MockWindowProbe, WindowIdentity},
    };

    use super::DataCollectionModule;

    fn identity(id: u64) -> WindowIdentity {
        WindowIdentity {
            id,
            title: format!("window {id}").into(),
            app_name: "editor".into(),
            url: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_collector_emits_on_change_and_flushes() -> Result<()> {
        *TEST_LOGGING;
        let mut probe = MockWindowProbe::new();
        let mut observations = vec![
            Ok(Some(identity(1))),
            Err(anyhow!("probe failed")),
            Ok(None),
            Ok(Some(identity(1))),
            Ok(Some(identity(2))),
        ]
        .into_iter();
        probe
            .expect_get_active_window()
            .returning(move || observations.next().unwrap_or_else(|| Ok(Some(identity(2)))));

        let start = Utc.with_ymd_and_hms(2018, 7, 4, 10, 0, 0).unwrap();
        let (sender, mut receiver) = mpsc::channel::<WindowSession>(10);
        let shutdown = CancellationToken::new();
        let collector = DataCollectionModule::new(
            sender,
            Box::new(probe),
            shutdown.clone(),
            Duration::from_secs(1),
            Box::new(TestClock::new(start)),
        );

        let (collection_result, _) = tokio::join!(collector.run(), async {
            tokio::time::sleep(Duration::from_millis(7500)).await;
            shutdown.cancel();
        });
        collection_result?;

        let mut sessions = vec![];
        while let Some(session) = receiver.recv().await {
            sessions.push(session);
        }

        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].window_id, 1);
        assert_eq!(sessions[1].window_id, 2);
        assert_eq!(sessions[0].end, sessions[1].start);
        // Samples at 0..=7s: 1, error, -, 1, 2, 2, 2, 2. Then a flush at 7.5s.
        assert_eq!(sessions[0].start, start);
        assert_eq!(sessions[0].duration().num_milliseconds(), 4000);
        assert_eq!(sessions[1].duration().num_milliseconds(), 3500);
        Ok(())
    }
}
