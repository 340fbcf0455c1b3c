//! Note dates: `YYYY-MM-DD` strings, checked with chrono.
//!
//! The store writes whatever date it is given. Callers check with [is_valid_date] first.

use chrono::{Local, NaiveDate};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// True iff `s` is exactly `YYYY-MM-DD` and names a real calendar day.
pub fn is_valid_date(s: &str) -> bool {
    let bytes = s.as_bytes();
    if bytes.len() != 10 {
        return false;
    }
    let shape_ok = bytes.iter().enumerate().all(|(i, b)| match i {
        4 | 7 => *b == b'-',
        _ => b.is_ascii_digit(),
    });
    shape_ok && NaiveDate::parse_from_str(s, DATE_FORMAT).is_ok()
}

/// Today's local date, formatted for a note header.
pub fn today() -> String {
    Local::now().date_naive().format(DATE_FORMAT).to_string()
}
