use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

/// Date layouts accepted for `Order_Date`, tried in order. ISO first so that
/// `2024-03-04` is never read day-first. Slashed dates are month-first unless
/// the first field cannot be a month.
const DATE_FMTS: &[&str] = &["%Y-%m-%d", "%d-%m-%Y", "%m/%d/%Y", "%d/%m/%Y", "%Y/%m/%d"];

const DATETIME_FMTS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%d-%m-%Y %H:%M",
    "%m/%d/%Y %H:%M",
    "%d/%m/%Y %H:%M",
];

const TIME_FMTS: &[&str] = &["%H:%M:%S", "%H:%M", "%I:%M %p", "%I:%M:%S %p"];

/// Parse an order date, with or without a time part.
/// Returns None for empty or unparseable strings.
pub fn parse_order_date(s: &str) -> Option<NaiveDate> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    DATE_FMTS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
        .or_else(|| parse_datetime(trimmed).map(|dt| dt.date()))
}

/// Parse a time of day ("18:45", "18:45:10", "06:45 PM", or a full datetime).
pub fn parse_order_time(s: &str) -> Option<NaiveTime> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    TIME_FMTS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(trimmed, fmt).ok())
        .or_else(|| parse_datetime(trimmed).map(|dt| dt.time()))
}

fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    DATETIME_FMTS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

/// Parse a measure ("1,250.50" → 1250.5, "₹ 300" → 300.0).
/// Returns None for empty, non-numeric or non-finite input.
pub fn parse_number(s: &str) -> Option<f64> {
    let cleaned: String = s
        .trim()
        .trim_start_matches(['₹', '$'])
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a 0/1 flag column. Anything non-zero or "true"/"yes" is set.
pub fn parse_flag(s: &str) -> bool {
    let trimmed = s.trim();
    match parse_number(trimmed) {
        Some(v) => v != 0.0,
        None => trimmed.eq_ignore_ascii_case("true") || trimmed.eq_ignore_ascii_case("yes"),
    }
}
