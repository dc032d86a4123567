//! Loose date/time parsing for feed documents.
//!
//! Feed producers emit dates in a handful of RFC 822 dialects, ISO 8601 variants,
//! and occasionally prose. [`parse_timestamp`] runs a fixed sequence of attempts:
//!
//! 1. Every entry in the layout table, first match wins.
//! 2. For strings ending in ` GMT` or ` UTC`, the same table with the zone name removed,
//!    read as UTC.
//! 3. A best-effort timezone abbreviation shim: the first abbreviation found in the
//!    string (longest codes first) is replaced with its numeric offset and step 1 runs
//!    once more.
//!
//! The abbreviation shim is a compatibility hack, not timezone resolution. Codes such as
//! `CST` or `IST` mean different things in different regions and the table simply picks
//! one reading. Feeds rarely give enough context to do better.

use std::sync::LazyLock;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use thiserror::Error;

/// Years below this are rejected for `%Y` layouts, so that `"02 Jan 06"` is never
/// accepted as the year 6 by a four-digit-year layout.
const MIN_FOUR_DIGIT_YEAR: i32 = 1000;

/// Errors produced by the timestamp normalizer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimestampError {
    /// The string matched no layout, even after the GMT/UTC and abbreviation fallbacks.
    #[error("unrecognized time format: {0}")]
    Unrecognized(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    /// Carries a numeric offset (`%z`).
    Zoned,
    /// No zone information; read as UTC.
    Naive,
    /// RFC 3339, including `Z` and fractional seconds.
    Rfc3339,
    /// A calendar date with no time of day; read as midnight UTC.
    DateOnly,
}

/// One accepted date/time layout.
#[derive(Debug, Clone, Copy)]
struct Layout {
    /// Whether the layout starts with a `"Mon, "` style day-of-week prefix.
    weekday: bool,
    pattern: &'static str,
    shape: Shape,
}

impl Layout {
    const fn zoned(weekday: bool, pattern: &'static str) -> Self {
        Self {
            weekday,
            pattern,
            shape: Shape::Zoned,
        }
    }

    const fn naive(weekday: bool, pattern: &'static str) -> Self {
        Self {
            weekday,
            pattern,
            shape: Shape::Naive,
        }
    }

    const fn rfc3339() -> Self {
        Self {
            weekday: false,
            pattern: "",
            shape: Shape::Rfc3339,
        }
    }

    const fn date_only(pattern: &'static str) -> Self {
        Self {
            weekday: false,
            pattern,
            shape: Shape::DateOnly,
        }
    }

    fn parse(&self, raw: &str) -> Option<DateTime<Utc>> {
        let body = match (self.weekday, split_weekday(raw)) {
            (true, Some(rest)) => rest,
            (false, None) => raw,
            _ => return None,
        };

        let parsed = match self.shape {
            Shape::Zoned => DateTime::parse_from_str(body, self.pattern)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
            Shape::Naive => NaiveDateTime::parse_from_str(body, self.pattern)
                .ok()
                .map(|dt| dt.and_utc()),
            Shape::Rfc3339 => DateTime::parse_from_rfc3339(body)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
            Shape::DateOnly => NaiveDate::parse_from_str(body, self.pattern)
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN).and_utc()),
        }?;

        if self.pattern.contains("%Y") && parsed.year() < MIN_FOUR_DIGIT_YEAR {
            return None;
        }
        Some(parsed)
    }

    /// Renders `value` the way a feed using this layout would write it.
    #[cfg(test)]
    fn render(&self, value: DateTime<Utc>, offset: chrono::FixedOffset) -> String {
        let pattern = if self.weekday {
            format!("%a, {}", self.pattern)
        } else {
            self.pattern.to_string()
        };
        match self.shape {
            Shape::Zoned => value.with_timezone(&offset).format(&pattern).to_string(),
            Shape::Rfc3339 => value.with_timezone(&offset).to_rfc3339(),
            Shape::Naive | Shape::DateOnly => value.format(&pattern).to_string(),
        }
    }

    /// The value this layout can actually carry: seconds and time of day are dropped
    /// by layouts that don't print them.
    #[cfg(test)]
    fn representable(&self, value: DateTime<Utc>) -> DateTime<Utc> {
        use chrono::Timelike;

        match self.shape {
            Shape::DateOnly => value.date_naive().and_time(NaiveTime::MIN).and_utc(),
            _ if !self.pattern.contains("%S") && self.shape != Shape::Rfc3339 => {
                value.with_second(0).unwrap_or(value)
            }
            _ => value,
        }
    }
}

/// Accepted layouts, in match order. Earlier entries win, so a layout that is a
/// structural subset of a later one must come first.
const LAYOUTS: &[Layout] = &[
    // Mon, 02 Jan 2006 15:04:05 -0700
    Layout::zoned(true, "%d %b %Y %H:%M:%S %z"),
    // 2006-01-02T15:04:05-07:00
    Layout::rfc3339(),
    // Mon, 02 Jan 2006 15:04:05 Z
    Layout::naive(true, "%d %b %Y %H:%M:%S Z"),
    // Mon, 02 Jan 2006 15:04:05
    Layout::naive(true, "%d %b %Y %H:%M:%S"),
    // 2 Jan 2006 15:04:05 -0700
    Layout::zoned(false, "%d %b %Y %H:%M:%S %z"),
    // 2 Jan 2006 15:04:05
    Layout::naive(false, "%d %b %Y %H:%M:%S"),
    // Mon, 2 Jan 2006 15:04 -0700
    Layout::zoned(true, "%d %b %Y %H:%M %z"),
    // Mon, 2 Jan 06 15:04:05 -0700
    Layout::zoned(true, "%d %b %y %H:%M:%S %z"),
    // January 2, 2006
    Layout::date_only("%B %d, %Y"),
    // 2006-01-02T15:04:05+0100
    Layout::zoned(false, "%Y-%m-%dT%H:%M:%S%.f%z"),
    // 2006-01-02T15:04:05
    Layout::naive(false, "%Y-%m-%dT%H:%M:%S%.f"),
    // 2006-01-02 15:04:05
    Layout::naive(false, "%Y-%m-%d %H:%M:%S"),
    // 2006-01-02
    Layout::date_only("%Y-%m-%d"),
];

/// Strips a leading `"Mon, "` style prefix, returning the remainder.
///
/// The day name is checked for shape only. It is not compared with the date, since
/// plenty of feeds publish the wrong weekday.
fn split_weekday(raw: &str) -> Option<&str> {
    let (day, rest) = raw.split_once(',')?;
    if day.len() >= 3 && day.chars().all(|c| c.is_ascii_alphabetic()) {
        Some(rest.trim_start())
    } else {
        None
    }
}

fn parse_layouts(raw: &str) -> Option<DateTime<Utc>> {
    LAYOUTS.iter().find_map(|layout| layout.parse(raw))
}

/// Offsets for zone abbreviations that show up in real feeds.
const BUILTIN_ZONES: &[(&str, &str)] = &[
    ("EEST", "+0300"),
    ("CEST", "+0200"),
    ("AKST", "-0900"),
    ("AKDT", "-0800"),
    ("HAST", "-1000"),
    ("HADT", "-0900"),
    ("CHST", "+1000"),
    ("AEST", "+1000"),
    ("AEDT", "+1100"),
    ("EET", "+0200"),
    ("AST", "-0400"),
    ("EST", "-0500"),
    ("EDT", "-0400"),
    ("CST", "-0600"),
    ("CDT", "-0500"),
    ("MST", "-0700"),
    ("MDT", "-0600"),
    ("PST", "-0800"),
    ("PDT", "-0700"),
    ("SST", "-1100"),
    ("SDT", "-1000"),
    ("CET", "+0100"),
    ("JST", "+0900"),
];

static BUILTIN_TABLE: LazyLock<TimezoneTable> =
    LazyLock::new(|| TimezoneTable::new(BUILTIN_ZONES.iter().copied()));

#[derive(Debug, Clone, PartialEq, Eq)]
struct Zone {
    code: String,
    offset: String,
}

/// Abbreviation-to-offset table, ordered longest code first.
///
/// Built once and never mutated, so one instance can be shared by any number of
/// concurrent decoders.
#[derive(Debug, Clone)]
pub struct TimezoneTable {
    zones: Vec<Zone>,
}

impl TimezoneTable {
    /// Builds a table from `(code, offset)` pairs such as `("PST", "-0800")`.
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, S)>,
        S: Into<String>,
    {
        let mut zones: Vec<Zone> = entries
            .into_iter()
            .map(|(code, offset)| Zone {
                code: code.into(),
                offset: offset.into(),
            })
            .filter(|zone| !zone.code.is_empty())
            .collect();
        // Longest first so "AKST" is never shadowed by "KST"; ties by code for a stable order.
        zones.sort_by(|a, b| b.code.len().cmp(&a.code.len()).then(a.code.cmp(&b.code)));
        Self { zones }
    }

    /// The process-wide table of common abbreviations.
    pub fn builtin() -> &'static TimezoneTable {
        &BUILTIN_TABLE
    }

    /// Replaces the first abbreviation found in `raw` with its offset.
    ///
    /// Returns `None` when no code in the table occurs in `raw`.
    pub fn substitute(&self, raw: &str) -> Option<String> {
        self.zones
            .iter()
            .find(|zone| raw.contains(zone.code.as_str()))
            .map(|zone| raw.replacen(zone.code.as_str(), &zone.offset, 1))
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}

/// Parses a feed date string using the builtin abbreviation table.
///
/// An empty (or all-whitespace) string is absent, not invalid: it yields `Ok(None)`.
///
/// # Errors
///
/// Returns [`TimestampError::Unrecognized`] carrying the original string when no
/// layout matches after every fallback.
///
/// # Examples
///
/// ```
/// use feedcanon::timestamp::parse_timestamp;
///
/// let ts = parse_timestamp("Mon, 02 Jan 2006 15:04:05 -0700").unwrap().unwrap();
/// assert_eq!(ts.to_rfc3339(), "2006-01-02T22:04:05+00:00");
///
/// assert_eq!(parse_timestamp("").unwrap(), None);
/// assert!(parse_timestamp("sometime last week").is_err());
/// ```
pub fn parse_timestamp(raw: &str) -> Result<Option<DateTime<Utc>>, TimestampError> {
    parse_timestamp_with(raw, TimezoneTable::builtin())
}

/// Same as [`parse_timestamp`] with a caller-supplied abbreviation table.
pub fn parse_timestamp_with(
    raw: &str,
    zones: &TimezoneTable,
) -> Result<Option<DateTime<Utc>>, TimestampError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    if let Some(parsed) = parse_layouts(trimmed) {
        return Ok(Some(parsed));
    }

    if let Some(parsed) = parse_utc_suffixed(trimmed) {
        tracing::debug!(raw = %trimmed, "Parsed timestamp after stripping GMT/UTC suffix");
        return Ok(Some(parsed));
    }

    if let Some(substituted) = zones.substitute(trimmed) {
        if let Some(parsed) = parse_layouts(&substituted) {
            tracing::debug!(
                raw = %trimmed,
                rewritten = %substituted,
                "Parsed timestamp via zone abbreviation"
            );
            return Ok(Some(parsed));
        }
    }

    Err(TimestampError::Unrecognized(raw.to_string()))
}

/// Handles `"... GMT"` and `"... UTC"` by dropping the zone name and reading the rest
/// with a zone-less layout.
fn parse_utc_suffixed(raw: &str) -> Option<DateTime<Utc>> {
    let body = raw
        .strip_suffix(" GMT")
        .or_else(|| raw.strip_suffix(" UTC"))?
        .trim_end();

    LAYOUTS
        .iter()
        .filter(|layout| layout.shape == Shape::Naive)
        .find_map(|layout| layout.parse(body))
}
