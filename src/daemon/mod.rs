use std::{path::PathBuf, time::Duration};

use anyhow::Result;
use collection::collector::DataCollectionModule;
use processing::{local_save::LocalSaver, ProcessingModule};
use storage::{activity_storage::ActivityStorageImpl, session_event::WindowSession};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::{
    utils::clock::{Clock, DefaultClock},
    window_api::{GenericWindowProbe, WindowProbe},
};

pub mod args;
pub mod collection;
pub mod processing;
pub mod shutdown;
pub mod storage;

pub const DEFAULT_COLLECTION_INTERVAL: Duration = Duration::from_secs(1);

/// Represents the starting point for the daemon. The working directory is moved to the
/// filesystem root, relative `dir` is resolved before that.
pub async fn start_daemon(dir: PathBuf, collection_interval: Duration) -> Result<()> {
    let dir = std::path::absolute(dir)?;
    std::env::set_current_dir("/")?;

    let (sender, receiver) = mpsc::channel::<WindowSession>(10);
    let probe = GenericWindowProbe::new()?;

    let shutdown_token = CancellationToken::new();

    let collector = create_collector(
        sender,
        probe,
        &shutdown_token,
        collection_interval,
        DefaultClock,
    );

    let processor = create_processor(dir, receiver)?;

    info!("Tracking every {collection_interval:?}");
    let (_, collection_result, processing_result) = tokio::join!(
        shutdown::detect_shutdown(shutdown_token),
        collector.run(),
        processor.run(),
    );

    if let Err(collection_result) = collection_result {
        error!("Collection module got an error {:?}", collection_result);
    }

    if let Err(processing_result) = processing_result {
        error!("Processing module got an error {:?}", processing_result);
    }

    Ok(())
}

fn create_collector(
    sender: mpsc::Sender<WindowSession>,
    probe: impl WindowProbe + 'static,
    shutdown_token: &CancellationToken,
    collection_interval: Duration,
    clock: impl Clock,
) -> DataCollectionModule {
    DataCollectionModule::new(
        sender,
        Box::new(probe),
        shutdown_token.clone(),
        collection_interval,
        Box::new(clock),
    )
}

fn create_processor(
    dir: PathBuf,
    receiver: mpsc::Receiver<WindowSession>,
) -> Result<ProcessingModule<LocalSaver<ActivityStorageImpl>>, anyhow::Error> {
    let storage = ActivityStorageImpl::new(dir)?;
    let saver = LocalSaver::new(storage);
    Ok(ProcessingModule::new(receiver, saver))
}
