//! Best-effort date parsing
//!
//! Spreadsheet exports write dates in many shapes. [`parse_datetime`] tries the
//! common ones in a fixed order and returns `None` for anything else. Slash
//! dates are read month first (`03/04/2024` is March 4th).

use chrono::{DateTime, NaiveDate, NaiveDateTime};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d.%m.%Y",
    "%d-%b-%Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%Y%m%d",
];

/// Parse text into a datetime, trying a fixed list of common formats
///
/// RFC 3339 timestamps keep their local wall-clock time; the offset is dropped.
pub fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    // Shortest accepted shape is "%Y%m%d"
    if text.len() < 8 || !text.starts_with(|c: char| c.is_ascii_alphanumeric()) {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_local());
    }

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt);
        }
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return date.and_hms_opt(0, 0, 0);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_parse_dates() {
        assert_eq!(parse_datetime("2024-01-15"), Some(ymd(2024, 1, 15)));
        assert_eq!(parse_datetime("2024/01/15"), Some(ymd(2024, 1, 15)));
        assert_eq!(parse_datetime("01/15/2024"), Some(ymd(2024, 1, 15)));
        assert_eq!(parse_datetime("15.01.2024"), Some(ymd(2024, 1, 15)));
        assert_eq!(parse_datetime("20240115"), Some(ymd(2024, 1, 15)));
        assert_eq!(parse_datetime(" Jan 15, 2024 "), Some(ymd(2024, 1, 15)));
    }

    #[test]
    fn test_parse_datetimes() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(8, 30, 0)
            .unwrap();
        assert_eq!(parse_datetime("2024-01-15 08:30:00"), Some(expected));
        assert_eq!(parse_datetime("2024-01-15T08:30:00"), Some(expected));
        assert_eq!(parse_datetime("2024-01-15T08:30:00+02:00"), Some(expected));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_datetime(""), None);
        assert_eq!(parse_datetime("hello"), None);
        assert_eq!(parse_datetime("2024-13-45"), None);
        assert_eq!(parse_datetime("12345"), None);
    }
}
