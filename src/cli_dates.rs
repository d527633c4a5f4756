//! Date parsing for CLI filter flags.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};

/// Parse `YYYY-MM-DD` as the start of that day (UTC).
pub fn parse_day_start(s: &str) -> Result<DateTime<Utc>> {
    let date = parse_date(s)?;
    Ok(date
        .and_hms_opt(0, 0, 0)
        .expect("midnight is always valid")
        .and_utc())
}

/// Parse `YYYY-MM-DD` as the end of that day (UTC), so a `--updated-before`
/// filter includes the named day.
pub fn parse_day_end(s: &str) -> Result<DateTime<Utc>> {
    let date = parse_date(s)?;
    Ok(date
        .and_hms_opt(23, 59, 59)
        .expect("end of day is always valid")
        .and_utc())
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("invalid date '{}', expected YYYY-MM-DD", s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_bounds() {
        let start = parse_day_start("2024-06-15").unwrap();
        assert_eq!(start.to_rfc3339(), "2024-06-15T00:00:00+00:00");

        let end = parse_day_end("2024-06-15").unwrap();
        assert_eq!(end.to_rfc3339(), "2024-06-15T23:59:59+00:00");
    }

    #[test]
    fn test_rejects_malformed_dates() {
        assert!(parse_date("15/06/2024").is_err());
        assert!(parse_date("2024-13-01").is_err());
    }
}
