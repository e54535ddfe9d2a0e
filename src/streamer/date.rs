//! Tolerant date parsing for the GLEIF bulk format.
//!
//! Tries RFC3339 first, then the `YYYY-MM-DDT17:00:00Z` shape some fields
//! (notably `NextRenewalDate`) are occasionally published in, then a bare
//! `YYYY-MM-DD` date. On total failure, the caller leaves the field unset —
//! we deliberately do not special-case which field this happens to.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

/// Parse a date string using the tolerant format chain described above.
/// Returns `None` (never an error) if none of the formats match — a
/// per-field parse failure is not fatal to the run.
pub fn parse_tolerant_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Some(date_part) = raw.split('T').next() {
        if let Ok(naive) = NaiveDate::parse_from_str(date_part, "%Y-%m-%d") {
            if raw.contains("17:00:00") {
                if let Some(naive_dt) = naive.and_hms_opt(17, 0, 0) {
                    return Some(Utc.from_utc_datetime(&naive_dt));
                }
            }
        }
    }

    if let Ok(naive) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(naive_dt) = naive.and_hms_opt(0, 0, 0) {
            return Some(Utc.from_utc_datetime(&naive_dt));
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rfc3339() {
        let parsed = parse_tolerant_date("2026-07-20T10:15:30Z").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2026-07-20T10:15:30+00:00");
    }

    #[test]
    fn parses_forced_1700_shape() {
        let parsed = parse_tolerant_date("2026-07-20T17:00:00Z").unwrap();
        assert_eq!(parsed.date_naive().to_string(), "2026-07-20");
    }

    #[test]
    fn parses_bare_date() {
        let parsed = parse_tolerant_date("2026-07-20").unwrap();
        assert_eq!(parsed.date_naive().to_string(), "2026-07-20");
    }

    #[test]
    fn unparseable_date_yields_none() {
        assert!(parse_tolerant_date("not a date").is_none());
    }

    #[test]
    fn empty_string_yields_none() {
        assert!(parse_tolerant_date("").is_none());
    }
}
