//! Serial day-number codec
//!
//! Dates are stored as spreadsheet serial numbers: days since 1899-12-30,
//! fractional for intra-day precision. Both directions go through UTC.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, Utc};

/// Serial number of 1970-01-01
pub const UNIX_EPOCH_SERIAL: f64 = 25569.0;

/// Milliseconds in one day
pub const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Offset from the start of a day to its last second
pub const END_OF_DAY: f64 = 1.0 - 1.0 / 86_400.0;

/// Display text for an absent or unrepresentable date
pub const NOT_AVAILABLE: &str = "N/A";

/// Convert a serial day number to a UTC calendar date-time
pub fn to_calendar_date(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() {
        return None;
    }
    let millis = ((serial - UNIX_EPOCH_SERIAL) * MILLIS_PER_DAY).round();
    if millis.abs() > i64::MAX as f64 {
        return None;
    }
    let millis = millis as i64;
    let secs = millis.div_euclid(1000);
    let nanos = (millis.rem_euclid(1000) * 1_000_000) as u32;
    DateTime::<Utc>::from_timestamp(secs, nanos).map(|dt| dt.naive_utc())
}

/// Calendar day of a serial, dropping the time of day
pub fn to_day(serial: f64) -> Option<NaiveDate> {
    to_calendar_date(serial).map(|dt| dt.date())
}

/// Convert a UTC date-time back to a serial day number
pub fn from_calendar_date(datetime: NaiveDateTime) -> f64 {
    datetime.and_utc().timestamp_millis() as f64 / MILLIS_PER_DAY + UNIX_EPOCH_SERIAL
}

/// Serial of midnight on the given day
pub fn from_day(date: NaiveDate) -> f64 {
    from_calendar_date(date.and_time(NaiveTime::MIN))
}

/// Format an optional serial with a chrono format string, "N/A" when absent
pub fn format_serial(serial: Option<f64>, format: &str) -> String {
    serial
        .and_then(to_calendar_date)
        .map(|dt| dt.format(format).to_string())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// Parse a date as typed in a spreadsheet cell or on the command line.
///
/// Accepts a bare serial number, `dd/mm/yyyy`, `yyyy-mm-dd` and the
/// date-time variants of both.
pub fn parse_date(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(serial) = text.parse::<f64>() {
        return serial.is_finite().then_some(serial);
    }

    for format in ["%Y-%m-%d %H:%M:%S", "%d/%m/%Y %H:%M:%S", "%d/%m/%Y %H:%M", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(from_calendar_date(dt));
        }
    }

    for format in ["%d/%m/%Y", "%Y-%m-%d", "%d-%m-%Y", "%d.%m.%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return Some(from_day(date));
        }
    }

    None
}

/// End-of-day serials for the last day of every month from `first` to `last`.
///
/// Used to sample net worth once per month for history charts.
pub fn month_ends(first: f64, last: f64) -> Vec<f64> {
    let (Some(start), Some(end)) = (to_day(first), to_day(last)) else {
        return Vec::new();
    };
    if start > end {
        return Vec::new();
    }

    let mut points = Vec::new();
    let (mut year, mut month) = (start.year(), start.month());
    loop {
        let next_first = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)
        };
        let Some(last_day) = next_first.and_then(|d| d.pred_opt()) else {
            break;
        };
        points.push(from_day(last_day) + END_OF_DAY);

        if year > end.year() || (year == end.year() && month >= end.month()) {
            break;
        }
        if month == 12 {
            year += 1;
            month = 1;
        } else {
            month += 1;
        }
    }
    points
}
