use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use crate::window_api::WindowId;

/// A finalized, closed interval during which a single window was focused. Produced by
/// [SessionSegmenter](crate::daemon::collection::segmenter::SessionSegmenter) and passed on to
/// the processing module. Never changed after it's emitted.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct WindowSession {
    pub window_id: WindowId,
    pub title: Arc<str>,
    pub app_name: Arc<str>,
    pub url: Option<Arc<str>>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl WindowSession {
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}
