//! Turns point-in-time observations of the focused window into closed sessions.
//!
//! The segmenter keeps at most one open session. A session ends only when a sample reports a
//! different window id, or when the owner calls [SessionSegmenter::flush].
//!
//! Two policies are deliberate and covered by tests:
//!  - An absent observation (probe failure, locked screen, no windows) is treated as "still
//!    focused". It neither closes nor discards the open session.
//!  - Identity is frozen at open. Title, application and url are captured by the first sample of
//!    a window id and later samples with the same id don't refresh them, even if the title
//!    changed in the meantime.

use chrono::{DateTime, Utc};

use crate::{daemon::storage::session_event::WindowSession, window_api::WindowIdentity};

#[derive(Debug, Default)]
enum SegmenterState {
    #[default]
    Idle,
    Tracking {
        window: WindowIdentity,
        start: DateTime<Utc>,
    },
}

#[derive(Debug, Default)]
pub struct SessionSegmenter {
    state: SegmenterState,
}

impl SessionSegmenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds the next observation. `now` must not decrease between calls.
    ///
    /// Returns the previous session when `observation` belongs to a different window than the
    /// open one.
    pub fn sample(
        &mut self,
        observation: Option<WindowIdentity>,
        now: DateTime<Utc>,
    ) -> Option<WindowSession> {
        let observation = observation?;

        if matches!(
            &self.state,
            SegmenterState::Tracking { window, .. } if window.id == observation.id
        ) {
            return None;
        }

        let previous = std::mem::replace(
            &mut self.state,
            SegmenterState::Tracking {
                window: observation,
                start: now,
            },
        );
        finalize(previous, now)
    }

    /// Closes the open session at `now`, leaving the segmenter idle. Meant for shutdown, so the
    /// trailing interval isn't lost.
    pub fn flush(&mut self, now: DateTime<Utc>) -> Option<WindowSession> {
        finalize(std::mem::take(&mut self.state), now)
    }

    /// Currently open window together with the moment it was opened.
    pub fn current(&self) -> Option<(&WindowIdentity, DateTime<Utc>)> {
        match &self.state {
            SegmenterState::Idle => None,
            SegmenterState::Tracking { window, start } => Some((window, *start)),
        }
    }
}

fn finalize(state: SegmenterState, now: DateTime<Utc>) -> Option<WindowSession> {
    let SegmenterState::Tracking { window, start } = state else {
        return None;
    };
    Some(WindowSession {
        window_id: window.id,
        title: window.title,
        app_name: window.app_name,
        url: window.url,
        start,
        // Callers are supposed to pass non-decreasing timestamps, but a clock step backwards must
        // not produce an inverted interval.
        end: now.max(start),
    })
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, TimeZone, Utc};

    use crate::{daemon::storage::session_event::WindowSession, window_api::WindowIdentity};

    use super::SessionSegmenter;

    fn at(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(1_530_662_400_000 + ms).unwrap()
    }

    fn window(id: u64, title: &str) -> Option<WindowIdentity> {
        Some(WindowIdentity {
            id,
            title: title.into(),
            app_name: format!("app {id}").into(),
            url: None,
        })
    }

    #[test]
    fn test_first_sample_opens_session() {
        let mut segmenter = SessionSegmenter::new();

        assert_eq!(segmenter.sample(window(1, "A"), at(0)), None);

        let (open, start) = segmenter.current().unwrap();
        assert_eq!(open.id, 1);
        assert_eq!(start, at(0));
    }

    #[test]
    fn test_same_id_never_emits() {
        let mut segmenter = SessionSegmenter::new();
        for i in 0..20 {
            assert_eq!(segmenter.sample(window(7, "same"), at(i * 1000)), None);
        }
        assert_eq!(segmenter.current().unwrap().1, at(0));
    }

    #[test]
    fn test_absent_observation_keeps_session() {
        let mut segmenter = SessionSegmenter::new();

        assert_eq!(segmenter.sample(None, at(0)), None);
        assert!(segmenter.current().is_none());

        assert_eq!(segmenter.sample(window(1, "W"), at(1)), None);
        assert_eq!(segmenter.sample(None, at(2)), None);
        assert_eq!(segmenter.sample(window(1, "W"), at(3)), None);

        assert_eq!(segmenter.current().unwrap().1, at(1));
    }

    #[test]
    fn test_identity_is_frozen_at_open() {
        let mut segmenter = SessionSegmenter::new();
        segmenter.sample(
            Some(WindowIdentity {
                id: 3,
                title: "Inbox".into(),
                app_name: "mail".into(),
                url: Some("https://mail.example.com".into()),
            }),
            at(0),
        );
        segmenter.sample(
            Some(WindowIdentity {
                id: 3,
                title: "Inbox (1)".into(),
                app_name: "mail-renamed".into(),
                url: None,
            }),
            at(10),
        );

        let session = segmenter.sample(window(4, "other"), at(20)).unwrap();
        assert_eq!(&*session.title, "Inbox");
        assert_eq!(&*session.app_name, "mail");
        assert_eq!(session.url.as_deref(), Some("https://mail.example.com"));
    }

    #[test]
    fn test_basic_scenario() {
        let mut segmenter = SessionSegmenter::new();

        assert_eq!(segmenter.sample(window(1, "A"), at(0)), None);
        assert_eq!(segmenter.sample(window(1, "A*"), at(5)), None);

        let finalized = segmenter.sample(window(2, "B"), at(10));
        assert_eq!(
            finalized,
            Some(WindowSession {
                window_id: 1,
                title: "A".into(),
                app_name: "app 1".into(),
                url: None,
                start: at(0),
                end: at(10),
            })
        );

        assert_eq!(segmenter.sample(None, at(15)), None);
        assert_eq!(segmenter.sample(window(2, "B"), at(20)), None);

        let (open, start) = segmenter.current().unwrap();
        assert_eq!(open.id, 2);
        assert_eq!(start, at(10));
    }

    #[test]
    fn test_sessions_are_ordered_and_non_overlapping() {
        let mut segmenter = SessionSegmenter::new();
        let ids = [1, 1, 2, 3, 3, 3, 1, 2, 2, 4];
        let mut sessions = ids
            .iter()
            .enumerate()
            .filter_map(|(i, id)| segmenter.sample(window(*id, "w"), at(i as i64 * 250)))
            .collect::<Vec<_>>();
        sessions.extend(segmenter.flush(at(ids.len() as i64 * 250)));

        assert_eq!(
            sessions.iter().map(|v| v.window_id).collect::<Vec<_>>(),
            vec![1, 2, 3, 1, 2, 4]
        );
        for session in &sessions {
            assert!(session.end >= session.start);
        }
        for pair in sessions.windows(2) {
            assert!(pair[0].end <= pair[1].start);
            assert!(pair[0].start <= pair[1].start);
        }
        assert_eq!(
            sessions.iter().map(|v| v.duration()).sum::<Duration>(),
            Duration::milliseconds(ids.len() as i64 * 250)
        );
    }

    #[test]
    fn test_zero_duration_session() {
        let mut segmenter = SessionSegmenter::new();
        segmenter.sample(window(1, "A"), at(0));
        let session = segmenter.sample(window(2, "B"), at(0)).unwrap();
        assert_eq!(session.start, session.end);
        assert_eq!(session.duration(), Duration::zero());
    }

    #[test]
    fn test_clock_going_backwards_doesnt_invert_interval() {
        let mut segmenter = SessionSegmenter::new();
        segmenter.sample(window(1, "A"), at(100));
        let session = segmenter.sample(window(2, "B"), at(50)).unwrap();
        assert!(session.end >= session.start);
    }

    #[test]
    fn test_flush() {
        let mut segmenter = SessionSegmenter::new();
        assert_eq!(segmenter.flush(at(0)), None);

        segmenter.sample(window(1, "A"), at(0));
        let flushed = segmenter.flush(at(30)).unwrap();
        assert_eq!(flushed.window_id, 1);
        assert_eq!(flushed.duration(), Duration::milliseconds(30));

        assert!(segmenter.current().is_none());
        assert_eq!(segmenter.flush(at(40)), None);

        // Same window after a flush starts a fresh session.
        assert_eq!(segmenter.sample(window(1, "A"), at(50)), None);
        assert_eq!(segmenter.current().unwrap().1, at(50));
    }
}
