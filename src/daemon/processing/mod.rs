use anyhow::Result;
use module::EventProcessor;
use tokio::sync::mpsc::Receiver;
use tracing::{debug, error, info};

use super::storage::session_event::WindowSession;

pub mod local_save;
pub mod module;

/// Drains finalized sessions coming from the collector into a processor. Failing to process one
/// session is logged and doesn't stop the ones behind it.
pub struct ProcessingModule<Processor> {
    receiver: Receiver<WindowSession>,
    processor: Processor,
}

impl<P: EventProcessor> ProcessingModule<P> {
    pub fn new(receiver: Receiver<WindowSession>, processor: P) -> Self {
        Self {
            receiver,
            processor,
        }
    }

    pub async fn run(mut self) -> Result<()> {
        let mut failed = 0usize;
        while let Some(session) = self.receiver.recv().await {
            let window_id = session.window_id;
            let duration = session.duration();
            debug!(window_id, app = %session.app_name, "Received session");
            if let Err(e) = self.processor.process_next(session).await {
                failed += 1;
                error!(window_id, "Failed to process session: {e:?}");
            } else {
                debug!(window_id, duration_ms = duration.num_milliseconds(), "Session processed");
            }
        }

        info!(failed, "Session channel closed, finalizing");
        self.processor.finalize().await
    }
}
