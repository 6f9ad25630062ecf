//! Wire-date parsing and calendar helpers.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};

/// Parse a date from the formats the backend emits.
///
/// Accepts plain dates (`2021-06-01`) as well as ISO datetimes with a
/// `T` or space separator, with or without a zone offset. Datetimes
/// truncate to their calendar date.
pub fn parse_wire_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return Some(date);
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(text, format) {
            return Some(datetime.date());
        }
    }
    if let Ok(datetime) = DateTime::parse_from_rfc3339(text) {
        return Some(datetime.date_naive());
    }
    None
}

/// First day of the calendar year containing `date`.
pub fn start_of_year(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), 1, 1).unwrap_or(date)
}

/// First day of the calendar year two years after `today`.
///
/// Every computed domain extends to this horizon so the today markers
/// and some forward headroom stay visible whatever the data says.
pub fn forward_horizon(today: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(today.year() + 2, 1, 1).unwrap_or(today)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_plain_date() {
        assert_eq!(parse_wire_date("2021-06-01"), Some(date(2021, 6, 1)));
        assert_eq!(parse_wire_date("  2021-06-01  "), Some(date(2021, 6, 1)));
    }

    #[test]
    fn test_parse_datetime_truncates() {
        assert_eq!(
            parse_wire_date("2021-06-01T14:30:00"),
            Some(date(2021, 6, 1))
        );
        assert_eq!(
            parse_wire_date("2021-06-01 14:30:00.250"),
            Some(date(2021, 6, 1))
        );
        assert_eq!(
            parse_wire_date("2021-06-01T14:30:00Z"),
            Some(date(2021, 6, 1))
        );
        assert_eq!(
            parse_wire_date("2021-06-01T14:30:00+02:00"),
            Some(date(2021, 6, 1))
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_wire_date(""), None);
        assert_eq!(parse_wire_date("   "), None);
        assert_eq!(parse_wire_date("not-a-date"), None);
        assert_eq!(parse_wire_date("2021-13-01"), None);
        assert_eq!(parse_wire_date("2021-02-30"), None);
    }

    #[test]
    fn test_start_of_year() {
        assert_eq!(start_of_year(date(2021, 6, 15)), date(2021, 1, 1));
        assert_eq!(start_of_year(date(2021, 1, 1)), date(2021, 1, 1));
    }

    #[test]
    fn test_forward_horizon() {
        assert_eq!(forward_horizon(date(2024, 3, 15)), date(2026, 1, 1));
        assert_eq!(forward_horizon(date(2024, 12, 31)), date(2026, 1, 1));
        assert_eq!(forward_horizon(date(2025, 1, 1)), date(2027, 1, 1));
    }
}
