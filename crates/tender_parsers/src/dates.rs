use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

/// A start/end pair extracted from a free-text time range, e.g. `"13:00-14:00"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

fn to_utc(naive: NaiveDateTime, offset: &FixedOffset) -> Option<DateTime<Utc>> {
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

/// `"YYYY-Mon-DD HH:MM:SS"` with a three-letter English month (Eskom's format).
pub fn parse_eskom_date(s: &str, offset: &FixedOffset) -> Option<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(s.trim(), "%Y-%b-%d %H:%M:%S").ok()?;
    to_utc(naive, offset)
}

/// `"YYYY/MM/DD HH:MM[:SS]"` (SANRAL's numeric format).
pub fn parse_sanral_numeric_date(s: &str, offset: &FixedOffset) -> Option<DateTime<Utc>> {
    let s = s.trim();
    let naive = NaiveDateTime::parse_from_str(s, "%Y/%m/%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y/%m/%d %H:%M"))
        .ok()?;
    to_utc(naive, offset)
}

/// `"M/D/YYYY H:MM[:SS] AM|PM"`, case-insensitive meridiem, single-digit day/month
/// tolerated (Transnet's format).
pub fn parse_transnet_date(s: &str, offset: &FixedOffset) -> Option<DateTime<Utc>> {
    let s = s.trim().to_uppercase();
    let naive = NaiveDateTime::parse_from_str(&s, "%m/%d/%Y %I:%M:%S %p")
        .or_else(|_| NaiveDateTime::parse_from_str(&s, "%m/%d/%Y %I:%M %p"))
        .ok()?;
    to_utc(naive, offset)
}

/// ISO-8601, for OCDS data. A naive (offset-less) timestamp is interpreted in the
/// configured local zone, per the "offset applies to anything lacking one" rule.
pub fn parse_iso(s: &str, offset: &FixedOffset) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S"))
        .or_else(|_| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d").map(|d| d.and_time(NaiveTime::MIN))
        })
        .ok()?;
    to_utc(naive, offset)
}

static TEXTUAL_DATE_TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(\d{1,2})\s+(January|February|March|April|May|June|July|August|September|October|November|December)\s+(\d{4})(?:[\s@.hH]+(\d{1,2})(?::(\d{2}))?\s*(AM|PM)?)?",
    )
    .unwrap()
});

/// Matches `D Month YYYY [HH[:MM] [AM|PM]]` with optional separators `@`, `H`, `h`,
/// `.` between the date and time; missing time defaults to `00:00`.
pub fn extract_textual_date_time(s: &str, offset: &FixedOffset) -> Option<DateTime<Utc>> {
    let caps = TEXTUAL_DATE_TIME.captures(s)?;
    let day: u32 = caps.get(1)?.as_str().parse().ok()?;
    let month = month_number(caps.get(2)?.as_str())?;
    let year: i32 = caps.get(3)?.as_str().parse().ok()?;

    let mut hour: u32 = caps.get(4).and_then(|m| m.as_str().parse().ok()).unwrap_or(0);
    let minute: u32 = caps.get(5).and_then(|m| m.as_str().parse().ok()).unwrap_or(0);
    if let Some(meridiem) = caps.get(6) {
        hour = apply_meridiem(hour, meridiem.as_str());
    }

    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    let time = NaiveTime::from_hms_opt(hour, minute, 0)?;
    to_utc(date.and_time(time), offset)
}

/// Like [`extract_textual_date_time`] but returns only the calendar date, ignoring
/// any time of day on the line. Used when a separate [`extract_time_range`] match on
/// the same line should supply the time instead.
pub fn extract_textual_date(s: &str) -> Option<NaiveDate> {
    let caps = TEXTUAL_DATE_TIME.captures(s)?;
    let day: u32 = caps.get(1)?.as_str().parse().ok()?;
    let month = month_number(caps.get(2)?.as_str())?;
    let year: i32 = caps.get(3)?.as_str().parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Combines a date and a time of day into an instant under the configured offset.
pub fn combine_date_time(
    date: NaiveDate,
    time: NaiveTime,
    offset: &FixedOffset,
) -> Option<DateTime<Utc>> {
    to_utc(date.and_time(time), offset)
}

static NUMERIC_DATE_TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{4})[/\-.](\d{1,2})[/\-.](\d{1,2})(?:[ T](\d{1,2}):(\d{2}))?").unwrap()
});

/// Matches `YYYY[/-.]MM[/-.]DD[ T HH:MM]?`.
pub fn extract_numeric_date_time(s: &str, offset: &FixedOffset) -> Option<DateTime<Utc>> {
    let caps = NUMERIC_DATE_TIME.captures(s)?;
    let year: i32 = caps.get(1)?.as_str().parse().ok()?;
    let month: u32 = caps.get(2)?.as_str().parse().ok()?;
    let day: u32 = caps.get(3)?.as_str().parse().ok()?;
    let hour: u32 = caps.get(4).and_then(|m| m.as_str().parse().ok()).unwrap_or(0);
    let minute: u32 = caps.get(5).and_then(|m| m.as_str().parse().ok()).unwrap_or(0);

    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    let time = NaiveTime::from_hms_opt(hour, minute, 0)?;
    to_utc(date.and_time(time), offset)
}

static TIME_RANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{1,2})[:.hH](\d{2})\s*[-\x{2013}]\s*(\d{1,2})[:.hH](\d{2})").unwrap()
});

/// Matches `HH[:.hH]MM – HH[:.hH]MM` (ASCII `-` or en-dash `–`).
pub fn extract_time_range(s: &str) -> Option<TimeRange> {
    let caps = TIME_RANGE.captures(s)?;
    let start = NaiveTime::from_hms_opt(
        caps.get(1)?.as_str().parse().ok()?,
        caps.get(2)?.as_str().parse().ok()?,
        0,
    )?;
    let end = NaiveTime::from_hms_opt(
        caps.get(3)?.as_str().parse().ok()?,
        caps.get(4)?.as_str().parse().ok()?,
        0,
    )?;
    Some(TimeRange { start, end })
}

fn month_number(name: &str) -> Option<u32> {
    let months = [
        "january", "february", "march", "april", "may", "june", "july", "august",
        "september", "october", "november", "december",
    ];
    months
        .iter()
        .position(|m| m.eq_ignore_ascii_case(name))
        .map(|i| i as u32 + 1)
}

fn apply_meridiem(hour: u32, meridiem: &str) -> u32 {
    match meridiem.to_uppercase().as_str() {
        "PM" if hour < 12 => hour + 12,
        "AM" if hour == 12 => 0,
        _ => hour,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tz::parse_offset;

    fn offset() -> FixedOffset {
        parse_offset("+02:00")
    }

    #[test]
    fn eskom_date_happy_path() {
        let dt = parse_eskom_date("2025-Oct-01 09:00:00", &offset()).unwrap();
        assert_eq!(dt.to_rfc3339(), "2025-10-01T07:00:00+00:00");
    }

    #[test]
    fn eskom_date_rejects_garbage() {
        assert!(parse_eskom_date("not a date", &offset()).is_none());
    }

    #[test]
    fn sanral_numeric_date() {
        let dt = parse_sanral_numeric_date("2025/08/20 12:00", &offset()).unwrap();
        assert_eq!(dt.to_rfc3339(), "2025-08-20T10:00:00+00:00");
    }

    #[test]
    fn transnet_am_pm() {
        let dt = parse_transnet_date("12/12/2025 4:00:00 PM", &offset()).unwrap();
        assert_eq!(dt.to_rfc3339(), "2025-12-12T14:00:00+00:00");
    }

    #[test]
    fn transnet_am_pm_case_insensitive() {
        let dt = parse_transnet_date("1/2/2025 9:30 am", &offset()).unwrap();
        assert_eq!(dt.to_rfc3339(), "2025-01-02T07:30:00+00:00");
    }

    #[test]
    fn iso_with_offset() {
        let dt = parse_iso("2025-08-20T12:00:00+02:00", &offset()).unwrap();
        assert_eq!(dt.to_rfc3339(), "2025-08-20T10:00:00+00:00");
    }

    #[test]
    fn textual_date_time_defaults_to_midnight() {
        let dt = extract_textual_date_time("Closing: 20 August 2025", &offset()).unwrap();
        assert_eq!(dt.to_rfc3339(), "2025-08-19T22:00:00+00:00");
    }

    #[test]
    fn textual_date_time_with_time() {
        let dt = extract_textual_date_time("20 August 2025 12:00", &offset()).unwrap();
        assert_eq!(dt.to_rfc3339(), "2025-08-20T10:00:00+00:00");
    }

    #[test]
    fn numeric_date_time_nullability() {
        assert!(extract_numeric_date_time("no date here", &offset()).is_none());
    }

    #[test]
    fn time_range_ascii_and_en_dash() {
        let r1 = extract_time_range("13:00-14:00").unwrap();
        let r2 = extract_time_range("13:00\u{2013}14:00").unwrap();
        assert_eq!(r1, r2);
        assert_eq!(r1.start, NaiveTime::from_hms_opt(13, 0, 0).unwrap());
        assert_eq!(r1.end, NaiveTime::from_hms_opt(14, 0, 0).unwrap());
    }
}
