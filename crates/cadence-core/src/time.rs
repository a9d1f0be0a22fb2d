//! Civil-time helpers.
//!
//! Clients give the start of a task as a date and time of day in IST
//! (UTC+05:30, no daylight saving); everything stored and compared afterwards
//! is a UTC unix timestamp in seconds.

use chrono::{DateTime, FixedOffset, Months, NaiveDate, NaiveTime, TimeZone, Utc};

/// Seconds east of UTC for Indian Standard Time.
pub const IST_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

/// Timestamp layout used for every stored `*_at` field.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Default lifetime of a task that does not carry an explicit expiry.
pub const DEFAULT_EXPIRY_MONTHS: u32 = 120;

pub fn ist() -> Option<FixedOffset> {
    FixedOffset::east_opt(IST_OFFSET_SECS)
}

/// Current instant formatted with [`TIMESTAMP_FORMAT`].
pub fn now_timestamp() -> String {
    format_timestamp(Utc::now())
}

pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse `YYYY-MM-DD`.
pub fn parse_date(date: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}

/// Parse `HH:MM`.
pub fn parse_time(time: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(time, "%H:%M").ok()
}

/// Convert an IST wall-clock date and time to a UTC unix timestamp.
pub fn ist_to_unix(date: &str, time: &str) -> Option<i64> {
    let naive = parse_date(date)?.and_time(parse_time(time)?);
    ist()?
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.timestamp())
}

/// Parse a UTC timestamp such as `2030-01-01T00:00:00.000Z`.
pub fn parse_utc(timestamp: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(timestamp)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Expiry applied when a client does not send one: ten years from `now`.
pub fn default_expiry(now: DateTime<Utc>) -> DateTime<Utc> {
    now.checked_add_months(Months::new(DEFAULT_EXPIRY_MONTHS))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ist_midnight_is_previous_day_utc() {
        // 2030-01-02 00:00 IST == 2030-01-01 18:30 UTC
        let unix = ist_to_unix("2030-01-02", "00:00").unwrap();
        let expected = Utc.with_ymd_and_hms(2030, 1, 1, 18, 30, 0).unwrap();
        assert_eq!(unix, expected.timestamp());
    }

    #[test]
    fn rejects_malformed_date_and_time() {
        assert!(ist_to_unix("2030/01/02", "10:00").is_none());
        assert!(ist_to_unix("2030-01-02", "25:00").is_none());
        assert!(ist_to_unix("2030-01-02", "10").is_none());
    }

    #[test]
    fn parses_utc_with_and_without_millis() {
        let a = parse_utc("2030-01-01T00:00:00.000Z").unwrap();
        let b = parse_utc("2030-01-01T00:00:00Z").unwrap();
        assert_eq!(a, b);
        assert!(parse_utc("2030-01-01").is_none());
    }

    #[test]
    fn timestamp_format_has_millis_and_zulu() {
        let at = Utc.with_ymd_and_hms(2031, 5, 6, 7, 8, 9).unwrap();
        assert_eq!(format_timestamp(at), "2031-05-06T07:08:09.000Z");
    }

    #[test]
    fn default_expiry_is_ten_years_out() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        let expiry = default_expiry(now);
        assert_eq!(expiry, Utc.with_ymd_and_hms(2036, 3, 1, 0, 0, 0).unwrap());
    }
}
