//! The bot stores times as unix timestamps (seconds, UTC). These helpers
//! turn them into the strings shown by the dashboard.

use time::{
    format_description::well_known::Rfc3339, macros::format_description, OffsetDateTime,
    PrimitiveDateTime,
};

pub const DAY: i64 = 24 * 60 * 60;

pub fn now() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

fn datetime(timestamp: i64) -> Option<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp(timestamp).ok()
}

/// RFC 3339 form, e.g. `2026-10-19T14:30:00Z`. `None` if out of range.
pub fn iso(timestamp: i64) -> Option<String> {
    datetime(timestamp)?.format(&Rfc3339).ok()
}

/// e.g. `Oct 19, 2026 02:30 PM UTC`
pub fn readable(timestamp: i64) -> Option<String> {
    let format =
        format_description!("[month repr:short] [day], [year] [hour repr:12]:[minute] [period] UTC");
    datetime(timestamp)?.format(format).ok()
}

/// e.g. `2026-10-19 14:30:00 UTC`
pub fn full(timestamp: i64) -> Option<String> {
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second] UTC");
    datetime(timestamp)?.format(format).ok()
}

/// Short weekday name, e.g. `Mon`.
pub fn weekday(timestamp: i64) -> Option<String> {
    datetime(timestamp)?
        .format(format_description!("[weekday repr:short]"))
        .ok()
}

/// Start of the UTC day containing `timestamp`.
pub const fn day_start(timestamp: i64) -> i64 {
    timestamp - timestamp.rem_euclid(DAY)
}

/// Parse a date sent by the dashboard.
///
/// Accepts RFC 3339 (`2026-10-19T14:30:00Z`, `2026-10-19T16:30:00+02:00`) and
/// the offset-less `2026-10-19T14:30[:00]` of html date inputs, read as UTC.
pub fn parse(text: &str) -> Option<i64> {
    let text = text.trim();

    if let Ok(datetime) = OffsetDateTime::parse(text, &Rfc3339) {
        return Some(datetime.unix_timestamp());
    }

    let with_seconds = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
    let without_seconds = format_description!("[year]-[month]-[day]T[hour]:[minute]");
    PrimitiveDateTime::parse(text, with_seconds)
        .or_else(|_| PrimitiveDateTime::parse(text, without_seconds))
        .ok()
        .map(|datetime| datetime.assume_utc().unix_timestamp())
}

/// `just now`, `1 minute ago`, `3 hours ago`, `2 days ago`...
pub fn time_ago(seconds: i64) -> String {
    let (value, unit) = match seconds {
        s if s < 60 => return "just now".to_string(),
        s if s < 60 * 60 => (s / 60, "minute"),
        s if s < DAY => (s / (60 * 60), "hour"),
        s => (s / DAY, "day"),
    };
    let plural = if value == 1 { "" } else { "s" };

    format!("{value} {unit}{plural} ago")
}

#[cfg(test)]
mod test {
    use super::*;

    // Monday 19 October 2026, 14:30:00 UTC
    const SAMPLE: i64 = 1_792_420_200;

    #[test]
    fn formats() {
        assert_eq!(iso(SAMPLE).as_deref(), Some("2026-10-19T14:30:00Z"));
        assert_eq!(readable(SAMPLE).as_deref(), Some("Oct 19, 2026 02:30 PM UTC"));
        assert_eq!(full(SAMPLE).as_deref(), Some("2026-10-19 14:30:00 UTC"));
        assert_eq!(weekday(SAMPLE).as_deref(), Some("Mon"));
        assert_eq!(iso(i64::MAX), None);
    }

    #[test]
    fn day_boundaries() {
        assert_eq!(day_start(SAMPLE), SAMPLE - (14 * 60 + 30) * 60);
        assert_eq!(day_start(day_start(SAMPLE)), day_start(SAMPLE));
        assert_eq!(day_start(-1), -DAY);
    }

    #[test]
    fn parse_dashboard_dates() {
        assert_eq!(parse("2026-10-19T14:30:00Z"), Some(SAMPLE));
        assert_eq!(parse("2026-10-19T16:30:00+02:00"), Some(SAMPLE));
        assert_eq!(parse("2026-10-19T14:30:00"), Some(SAMPLE));
        assert_eq!(parse("2026-10-19T14:30"), Some(SAMPLE));
        assert_eq!(parse("tomorrow"), None);
        assert_eq!(parse(""), None);
    }

    #[test]
    fn time_ago_units() {
        assert_eq!(time_ago(0), "just now");
        assert_eq!(time_ago(59), "just now");
        assert_eq!(time_ago(60), "1 minute ago");
        assert_eq!(time_ago(150), "2 minutes ago");
        assert_eq!(time_ago(3600), "1 hour ago");
        assert_eq!(time_ago(DAY - 1), "23 hours ago");
        assert_eq!(time_ago(3 * DAY), "3 days ago");
    }
}
