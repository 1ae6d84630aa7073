use chrono::{NaiveDate, NaiveDateTime};

/// Normalize a raw date value into a timestamp.
///
/// Accepts the two fixed source formats: 8-digit `YYYYMMDD` (midnight) and
/// 14-digit `YYYYMMDDHHMMSS`. Spreadsheet exports often render the column as a
/// float ("20230515.0"), so integer-valued floats are accepted too. Anything
/// else yields `None` rather than an error.
///
/// # Examples
/// ```
/// use wildfire_enricher::utils::dates::normalize_raw_date;
///
/// let midnight = normalize_raw_date("20230515").unwrap();
/// assert_eq!(midnight.to_string(), "2023-05-15 00:00:00");
///
/// assert!(normalize_raw_date("May 15 2023").is_none());
/// ```
pub fn normalize_raw_date(raw: &str) -> Option<NaiveDateTime> {
    let digits = canonical_digits(raw.trim())?;

    match digits.len() {
        8 => NaiveDate::parse_from_str(&digits, "%Y%m%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0)),
        14 => NaiveDateTime::parse_from_str(&digits, "%Y%m%d%H%M%S").ok(),
        _ => None,
    }
}

/// Reduce a raw value to its digit string, undoing float formatting.
fn canonical_digits(raw: &str) -> Option<String> {
    if raw.is_empty() {
        return None;
    }

    if raw.chars().all(|c| c.is_ascii_digit()) {
        return Some(raw.to_string());
    }

    let value = raw.parse::<f64>().ok()?;
    if !value.is_finite() || value < 0.0 || value.fract() != 0.0 {
        return None;
    }

    Some(format!("{:.0}", value))
}
