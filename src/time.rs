//! Time related utils.

use anyhow::anyhow;
use anyhow::Result;
use chrono::NaiveDateTime;
use chrono::Utc;

/// DateTime in UTC.
pub type DateTime = chrono::DateTime<Utc>;

/// Get current time.
pub fn now() -> DateTime {
    Utc::now()
}

/// Format to SigV4 timestamp: `20220313T072004Z`.
pub fn format_timestamp(t: DateTime) -> String {
    t.format("%Y%m%dT%H%M%SZ").to_string()
}

/// Format to SigV4 date: `20220313`.
pub fn format_date(t: DateTime) -> String {
    t.format("%Y%m%d").to_string()
}

/// Format to RFC 2822 style date used by HTTP: `Fri, 21 Nov 1997 09:55:06 GMT`.
#[allow(dead_code)]
pub fn format_rfc822(t: DateTime) -> String {
    t.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Parse a SigV4 timestamp like `20130524T000000Z`.
pub fn parse_timestamp(s: &str) -> Result<DateTime> {
    let t = NaiveDateTime::parse_from_str(s, "%Y%m%dT%H%M%SZ")?;
    Ok(t.and_utc())
}

/// Parse an ISO-8601 date time with seconds precision.
///
/// Accepts `2017-07-03T22:42:58` with an optional trailing `Z` or fractional
/// seconds, which are ignored. Fails when the six date/time fields cannot be
/// read.
pub fn parse_iso8601(s: &str) -> Result<DateTime> {
    let head = s
        .get(..19)
        .ok_or_else(|| anyhow!("invalid ISO-8601 date time: {s}"))?;
    let t = NaiveDateTime::parse_from_str(head, "%Y-%m-%dT%H:%M:%S")?;
    Ok(t.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_timestamp() {
        let t = parse_iso8601("2022-03-13T07:20:04Z").expect("must parse");
        assert_eq!(format_timestamp(t), "20220313T072004Z");
        assert_eq!(format_date(t), "20220313");
    }

    #[test]
    fn test_parse_timestamp() {
        let t = parse_timestamp("20130524T000000Z").expect("must parse");
        assert_eq!(format_timestamp(t), "20130524T000000Z");
    }

    #[test]
    fn test_parse_iso8601() {
        // Trailing Z optional, fractional seconds ignored.
        let a = parse_iso8601("2017-07-03T22:42:58").expect("must parse");
        let b = parse_iso8601("2017-07-03T22:42:58Z").expect("must parse");
        let c = parse_iso8601("2017-07-03T22:42:58.500Z").expect("must parse");
        assert_eq!(a, b);
        assert_eq!(a, c);

        assert!(parse_iso8601("2017-07-03").is_err());
        assert!(parse_iso8601("not a date at all!").is_err());
    }

    #[test]
    fn test_format_rfc822() {
        let t = parse_iso8601("1997-11-21T09:55:06Z").expect("must parse");
        assert_eq!(format_rfc822(t), "Fri, 21 Nov 1997 09:55:06 GMT");
    }
}
