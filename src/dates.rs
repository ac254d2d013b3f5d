//! Calendar dates from ZNC log filenames.
//!
//! ZNC's log module has written two filename shapes over the years:
//! `2025-12-04.log` and `#channel_20251204.log`. Both resolve to the same
//! date. Anything else is rejected; there is no guessing for other shapes.

use chrono::NaiveDate;

/// Extension every log file carries.
pub const LOG_EXTENSION: &str = ".log";

/// Resolve the calendar date encoded in a log filename.
///
/// Returns `None` for any name that is not `YYYY-MM-DD.log` or
/// `<anything>_YYYYMMDD.log`, or whose digits are not a real date.
pub fn parse_log_date(filename: &str) -> Option<NaiveDate> {
    let stem = filename.strip_suffix(LOG_EXTENSION)?;

    if let Some(date) = parse_strict(stem, 10, "%Y-%m-%d") {
        return Some(date);
    }

    let tail = match stem.rfind('_') {
        Some(pos) => &stem[pos + 1..],
        None => stem,
    };
    parse_strict(tail, 8, "%Y%m%d")
}

/// Parse `s` with `fmt` only if it is exactly `len` ASCII digits, with
/// dashes at positions 4 and 7 for the dashed form.
fn parse_strict(s: &str, len: usize, fmt: &str) -> Option<NaiveDate> {
    if s.len() != len {
        return None;
    }
    let shape_ok = s.bytes().enumerate().all(|(i, b)| {
        if len == 10 && (i == 4 || i == 7) {
            b == b'-'
        } else {
            b.is_ascii_digit()
        }
    });
    if !shape_ok {
        return None;
    }
    NaiveDate::parse_from_str(s, fmt).ok()
}
