use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};

const RECORD_NAME_FORMAT: &str = "%Y-%m-%d";

/// This is the standard way of converting a date to a file name in focuslog.
pub fn date_to_record_name(date: NaiveDate) -> String {
    date.format(RECORD_NAME_FORMAT).to_string()
}

/// Inverse of [date_to_record_name]. Returns `None` for names that aren't record files.
pub fn record_name_to_date(name: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(name, RECORD_NAME_FORMAT).ok()
}

/// Returns start of the next UTC day.
pub fn next_day_start(time: DateTime<Utc>) -> DateTime<Utc> {
    (time.date_naive() + Duration::days(1))
        .and_time(NaiveTime::MIN)
        .and_utc()
}

/// Formats a duration the way cli prints it, e.g. `1h2m3s`.
pub fn format_duration(v: Duration) -> String {
    if v.num_hours() > 0 {
        format!(
            "{}h{}m{}s",
            v.num_hours(),
            v.num_minutes() % 60,
            v.num_seconds() % 60
        )
    } else if v.num_minutes() > 0 {
        format!("{}m{}s", v.num_minutes() % 60, v.num_seconds() % 60)
    } else {
        format!("{}s", v.num_seconds() % 60)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate, TimeZone, Utc};

    use super::*;

    #[test]
    fn test_record_name() {
        let date = NaiveDate::from_ymd_opt(2018, 7, 4).unwrap();
        assert_eq!(date_to_record_name(date), "2018-07-04");
        assert_eq!(record_name_to_date("2018-07-04"), Some(date));
        assert_eq!(record_name_to_date("2018-07-04.lock"), None);
    }

    #[test]
    fn test_next_day_start() {
        let time = Utc.with_ymd_and_hms(2018, 7, 4, 13, 45, 0).unwrap();
        assert_eq!(
            next_day_start(time),
            Utc.with_ymd_and_hms(2018, 7, 5, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::seconds(42)), "42s");
        assert_eq!(format_duration(Duration::seconds(62)), "1m2s");
        assert_eq!(format_duration(Duration::seconds(3723)), "1h2m3s");
    }
}
