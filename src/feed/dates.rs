//! Publication-date normalization.
//!
//! Feed publishers disagree on date formats, so a raw `<pubDate>` is tried
//! against a fixed, ordered list of layouts and the first match wins. A
//! string that matches nothing is reported as "no date", never as an error.
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Accepted date layouts, in the order they are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateLayout {
    /// `Mon, 02 Jan 2006 15:04:05 MST` (named zone)
    Rfc1123,
    /// `Mon, 02 Jan 2006 15:04:05 -0700` (numeric zone)
    Rfc1123Z,
    /// `2006-01-02T15:04:05Z07:00`
    Rfc3339,
    /// `2006-01-02`
    IsoDate,
    /// `02 Jan 2006`
    DayMonthYear,
}

impl DateLayout {
    pub const ALL: [DateLayout; 5] = [
        DateLayout::Rfc1123,
        DateLayout::Rfc1123Z,
        DateLayout::Rfc3339,
        DateLayout::IsoDate,
        DateLayout::DayMonthYear,
    ];

    /// Parse `raw` strictly against this single layout.
    pub fn parse(self, raw: &str) -> Option<DateTime<Utc>> {
        match self {
            DateLayout::Rfc1123 => parse_rfc1123_named(raw),
            DateLayout::Rfc1123Z => {
                DateTime::parse_from_str(strip_weekday(raw)?, "%d %b %Y %H:%M:%S %z")
                    .ok()
                    .map(|dt| dt.with_timezone(&Utc))
            }
            DateLayout::Rfc3339 => DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
            DateLayout::IsoDate => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .map(midnight_utc),
            DateLayout::DayMonthYear => NaiveDate::parse_from_str(raw, "%d %b %Y")
                .ok()
                .map(midnight_utc),
        }
    }
}

/// Try every layout in priority order and return the first match with the layout used.
pub fn match_layout(raw: &str) -> Option<(DateLayout, DateTime<Utc>)> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    DateLayout::ALL
        .iter()
        .find_map(|layout| layout.parse(raw).map(|dt| (*layout, dt)))
}

/// Normalize an optional raw date. Absent, empty and unrecognised input all yield `None`.
pub fn normalize_date(raw: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = raw?;
    let parsed = match_layout(raw).map(|(_, dt)| dt);
    if parsed.is_none() && !raw.trim().is_empty() {
        tracing::debug!(date = %raw, "Unrecognised publication date, storing none");
    }
    parsed
}

fn midnight_utc(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN))
}

/// RFC-1123 with a trailing zone abbreviation.
///
/// Abbreviations from the RFC-2822 table are honoured; any other alphabetic
/// zone is read as UTC.
fn parse_rfc1123_named(raw: &str) -> Option<DateTime<Utc>> {
    let (stamp, zone) = raw.rsplit_once(' ')?;
    if zone.is_empty() || !zone.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let naive = NaiveDateTime::parse_from_str(strip_weekday(stamp)?, "%d %b %Y %H:%M:%S").ok()?;
    let offset = FixedOffset::east_opt(zone_offset_hours(zone) * 3600)?;
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// Drop the leading `Www, ` of an RFC-1123 stamp.
///
/// The weekday must be a day name but is not checked against the date.
fn strip_weekday(raw: &str) -> Option<&str> {
    let (day, rest) = raw.split_once(", ")?;
    WEEKDAYS.contains(&day).then_some(rest)
}

fn zone_offset_hours(zone: &str) -> i32 {
    match zone.to_ascii_uppercase().as_str() {
        "EDT" => -4,
        "EST" | "CDT" => -5,
        "CST" | "MDT" => -6,
        "MST" | "PDT" => -7,
        "PST" => -8,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_rfc1123_named_zone_is_first_layout() {
        let (layout, dt) = match_layout("Mon, 02 Jan 2006 15:04:05 MST").unwrap();
        assert_eq!(layout, DateLayout::Rfc1123);
        assert_eq!(dt.to_rfc3339(), "2006-01-02T22:04:05+00:00");
    }

    #[test]
    fn test_rfc1123_gmt() {
        let (layout, dt) = match_layout("Tue, 10 Jun 2003 04:00:00 GMT").unwrap();
        assert_eq!(layout, DateLayout::Rfc1123);
        assert_eq!(dt.to_rfc3339(), "2003-06-10T04:00:00+00:00");
    }

    #[test]
    fn test_wrong_weekday_is_ignored() {
        let (layout, dt) = match_layout("Tue, 02 Jan 2006 15:04:05 GMT").unwrap();
        assert_eq!(layout, DateLayout::Rfc1123);
        assert_eq!(dt.to_rfc3339(), "2006-01-02T15:04:05+00:00");

        let (layout, dt) = match_layout("Tue, 02 Jan 2006 15:04:05 -0700").unwrap();
        assert_eq!(layout, DateLayout::Rfc1123Z);
        assert_eq!(dt.to_rfc3339(), "2006-01-02T22:04:05+00:00");
    }

    #[test]
    fn test_weekday_must_be_a_day_name() {
        assert_eq!(match_layout("Xyz, 02 Jan 2006 15:04:05 GMT"), None);
        assert_eq!(match_layout("Xyz, 02 Jan 2006 15:04:05 -0700"), None);
    }

    #[test]
    fn test_unknown_zone_abbreviation_reads_as_utc() {
        let (_, dt) = match_layout("Mon, 02 Jan 2006 15:04:05 XYZ").unwrap();
        assert_eq!(dt.to_rfc3339(), "2006-01-02T15:04:05+00:00");
    }

    #[test]
    fn test_rfc1123_numeric_zone() {
        let (layout, dt) = match_layout("Mon, 02 Jan 2006 15:04:05 -0700").unwrap();
        assert_eq!(layout, DateLayout::Rfc1123Z);
        assert_eq!(dt.to_rfc3339(), "2006-01-02T22:04:05+00:00");
    }

    #[test]
    fn test_rfc3339() {
        let (layout, dt) = match_layout("2006-01-02T15:04:05+02:00").unwrap();
        assert_eq!(layout, DateLayout::Rfc3339);
        assert_eq!(dt.to_rfc3339(), "2006-01-02T13:04:05+00:00");
    }

    #[test]
    fn test_bare_date() {
        let (layout, dt) = match_layout("2006-01-02").unwrap();
        assert_eq!(layout, DateLayout::IsoDate);
        assert_eq!(dt.to_rfc3339(), "2006-01-02T00:00:00+00:00");
    }

    #[test]
    fn test_day_month_year() {
        let (layout, dt) = match_layout("02 Jan 2006").unwrap();
        assert_eq!(layout, DateLayout::DayMonthYear);
        assert_eq!(dt.to_rfc3339(), "2006-01-02T00:00:00+00:00");
    }

    #[test]
    fn test_absent_and_garbage_yield_none() {
        assert_eq!(normalize_date(None), None);
        assert_eq!(normalize_date(Some("")), None);
        assert_eq!(normalize_date(Some("   ")), None);
        assert_eq!(normalize_date(Some("not a date")), None);
    }

    proptest! {
        #[test]
        fn normalize_never_panics(raw in ".{0,64}") {
            let _ = normalize_date(Some(&raw));
        }

        #[test]
        fn iso_dates_round_trip(y in 1970i32..2100, m in 1u32..=12, d in 1u32..=28) {
            let raw = format!("{y:04}-{m:02}-{d:02}");
            let dt = normalize_date(Some(&raw)).unwrap();
            prop_assert_eq!(dt.format("%Y-%m-%d").to_string(), raw);
        }
    }
}
