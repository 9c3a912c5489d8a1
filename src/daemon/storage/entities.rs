use chrono::DateTime;
use chrono::Duration;
use chrono::NaiveDate;
use chrono::Utc;

use serde::Deserialize;
use serde::Serialize;

use std::sync::Arc;

use crate::utils::time::next_day_start;

use super::session_event::WindowSession;

/// One row of the raw session log. Unlike [WindowSession] it doesn't carry the platform window
/// id, which means nothing outside of the process that observed it.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecordEntity {
    pub window_title: Arc<str>,
    pub application_name: Arc<str>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<Arc<str>>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub start_time: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub end_time: DateTime<Utc>,
    #[serde(with = "duration_ser")]
    pub duration: Duration,
}

impl SessionRecordEntity {
    pub fn new(
        window_title: Arc<str>,
        application_name: Arc<str>,
        url: Option<Arc<str>>,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Self {
        Self {
            window_title,
            application_name,
            url,
            start_time,
            end_time,
            duration: end_time - start_time,
        }
    }

    /// UTC day the record is filed under.
    pub fn date(&self) -> NaiveDate {
        self.start_time.date_naive()
    }

    /// Splits the interval at every UTC midnight it crosses, returning how much of it belongs to
    /// each day. Zero-length records produce nothing.
    pub fn daily_durations(&self) -> Vec<(NaiveDate, Duration)> {
        let mut result = vec![];
        let mut current = self.start_time;
        while current < self.end_time {
            let split = next_day_start(current).min(self.end_time);
            result.push((current.date_naive(), split - current));
            current = split;
        }
        result
    }
}

impl From<WindowSession> for SessionRecordEntity {
    fn from(
        WindowSession {
            title,
            app_name,
            url,
            start,
            end,
            ..
        }: WindowSession,
    ) -> Self {
        SessionRecordEntity::new(title, app_name, url, start, end)
    }
}

/// Total time spent in an application during one UTC day.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationUsageEntity {
    pub application_name: Arc<str>,
    pub date: NaiveDate,
    #[serde(with = "duration_ser")]
    pub total_duration: Duration,
}

impl ApplicationUsageEntity {
    pub fn new(application_name: Arc<str>, date: NaiveDate) -> Self {
        Self {
            application_name,
            date,
            total_duration: Duration::zero(),
        }
    }

    pub fn with_total(self, total_duration: Duration) -> Self {
        Self {
            total_duration,
            ..self
        }
    }
}

mod duration_ser {
    use chrono::Duration;
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i64(duration.num_milliseconds())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let ms = i64::deserialize(deserializer)?;
        Ok(Duration::milliseconds(ms))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate, TimeZone, Utc};

    use super::SessionRecordEntity;

    #[test]
    fn test_daily_durations_single_day() {
        let start = Utc.with_ymd_and_hms(2018, 7, 4, 10, 0, 0).unwrap();
        let end = start + Duration::minutes(5);
        let record = SessionRecordEntity::new("a".into(), "b".into(), None, start, end);

        assert_eq!(
            record.daily_durations(),
            vec![(NaiveDate::from_ymd_opt(2018, 7, 4).unwrap(), Duration::minutes(5))]
        );
    }

    #[test]
    fn test_daily_durations_across_midnight() {
        let start = Utc.with_ymd_and_hms(2018, 7, 4, 23, 50, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2018, 7, 6, 0, 5, 0).unwrap();
        let record = SessionRecordEntity::new("a".into(), "b".into(), None, start, end);

        assert_eq!(
            record.daily_durations(),
            vec![
                (NaiveDate::from_ymd_opt(2018, 7, 4).unwrap(), Duration::minutes(10)),
                (NaiveDate::from_ymd_opt(2018, 7, 5).unwrap(), Duration::days(1)),
                (NaiveDate::from_ymd_opt(2018, 7, 6).unwrap(), Duration::minutes(5)),
            ]
        );
    }

    #[test]
    fn test_daily_durations_empty_record() {
        let start = Utc.with_ymd_and_hms(2018, 7, 4, 23, 50, 0).unwrap();
        let record = SessionRecordEntity::new("a".into(), "b".into(), None, start, start);
        assert!(record.daily_durations().is_empty());
        assert_eq!(record.duration, Duration::zero());
    }

    #[test]
    fn test_record_json_shape() {
        let start = Utc.timestamp_millis_opt(1_530_662_400_000).unwrap();
        let record = SessionRecordEntity::new(
            "title".into(),
            "app".into(),
            None,
            start,
            start + Duration::milliseconds(1500),
        );
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "windowTitle": "title",
                "applicationName": "app",
                "startTime": 1_530_662_400_000i64,
                "endTime": 1_530_662_401_500i64,
                "duration": 1500,
            })
        );
    }
}
