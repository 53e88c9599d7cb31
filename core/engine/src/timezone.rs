//! FILENAME: core/engine/src/timezone.rs
//! PURPOSE: Parses raw query timestamps and places them in a display time zone.
//! CONTEXT: The data layer returns timestamps as ISO-like strings, usually without
//! a zone suffix (`2024-01-01T00:00:00.000`) and sometimes date-only (`2024-01-01`).
//! A string without a suffix is wall-clock time; it is never shifted when rendered,
//! so a date-only value keeps its calendar date in every zone. Strings with `Z` or an
//! explicit offset are instants and are converted into the display zone.

use std::fmt;
use std::str::FromStr;

use chrono::{
    DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone, Timelike, Utc,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{EngineError, EngineResult};

static TIMESTAMP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(\d{4})-(\d{2})-(\d{2})(?:([T ])(\d{2}):(\d{2})(?::(\d{2})(?:\.(\d{1,9}))?)?)?(Z|z|[+-]\d{2}:?\d{2})?$",
    )
    .unwrap()
});

// ============================================================================
// ZONE OFFSET
// ============================================================================

/// A fixed UTC offset, named the way the time zone picker names them
/// (`UTC`, `UTC+1`, `UTC-9:30`, `UTC+5:45`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoneOffset(FixedOffset);

impl ZoneOffset {
    pub fn utc() -> Self {
        ZoneOffset(Utc.fix())
    }

    /// Builds an offset from signed minutes east of UTC.
    pub fn from_minutes(minutes: i32) -> EngineResult<Self> {
        FixedOffset::east_opt(minutes * 60)
            .map(ZoneOffset)
            .ok_or_else(|| EngineError::InvalidZone(format!("{} minutes", minutes)))
    }

    /// Parses `UTC`, `GMT`, `Z`, `UTC+0`, `UTC-9:30`, `+05:30`, `-0930`.
    pub fn parse(name: &str) -> EngineResult<Self> {
        let invalid = || EngineError::InvalidZone(name.to_string());
        let trimmed = name.trim();
        let rest = trimmed
            .strip_prefix("UTC")
            .or_else(|| trimmed.strip_prefix("GMT"))
            .unwrap_or(trimmed);

        if rest.is_empty() || rest == "Z" {
            return Ok(ZoneOffset::utc());
        }

        let (sign, body) = match rest.as_bytes()[0] {
            b'+' => (1, &rest[1..]),
            b'-' => (-1, &rest[1..]),
            _ => return Err(invalid()),
        };

        // ASCII digits only, so the byte split below stays on a char boundary.
        let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
        let (hours, minutes) = match body.split_once(':') {
            Some((h, m)) if digits(h) && digits(m) => (h, m),
            Some(_) => return Err(invalid()),
            None if digits(body) && body.len() == 4 => body.split_at(2),
            None if digits(body) => (body, "0"),
            None => return Err(invalid()),
        };

        let hours: i32 = hours.parse().map_err(|_| invalid())?;
        let minutes: i32 = minutes.parse().map_err(|_| invalid())?;
        if hours > 14 || minutes >= 60 {
            return Err(invalid());
        }

        ZoneOffset::from_minutes(sign * (hours * 60 + minutes)).map_err(|_| invalid())
    }

    pub fn fixed(&self) -> FixedOffset {
        self.0
    }

    pub fn minutes(&self) -> i32 {
        self.0.local_minus_utc() / 60
    }
}

impl Default for ZoneOffset {
    fn default() -> Self {
        ZoneOffset::utc()
    }
}

impl fmt::Display for ZoneOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let minutes = self.minutes();
        if minutes == 0 {
            return write!(f, "UTC");
        }
        let sign = if minutes < 0 { '-' } else { '+' };
        let abs = minutes.abs();
        if abs % 60 == 0 {
            write!(f, "UTC{}{}", sign, abs / 60)
        } else {
            write!(f, "UTC{}{}:{:02}", sign, abs / 60, abs % 60)
        }
    }
}

impl FromStr for ZoneOffset {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ZoneOffset::parse(s)
    }
}

impl Serialize for ZoneOffset {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ZoneOffset {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        ZoneOffset::parse(&s).map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// TIMESTAMP PARSING
// ============================================================================

/// The textual layout a timestamp was written in, so derived timestamps can be
/// written back the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampShape {
    /// `2024-01-01`
    DateOnly,
    /// `2024-01-01T10:00`, `2024-01-01 10:00:00`, `2024-01-01T10:00:00.000`, ...
    DateTime {
        separator: char,
        seconds: bool,
        fraction_digits: u8,
    },
}

/// An explicit zone suffix as written (`Z`, `+02:00`, `-0530`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoneSuffix {
    pub offset: FixedOffset,
    pub zulu: bool,
    pub colon: bool,
}

/// A parsed timestamp: wall-clock value, layout and optional zone suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedTimestamp {
    pub naive: NaiveDateTime,
    pub shape: TimestampShape,
    pub suffix: Option<ZoneSuffix>,
}

impl ParsedTimestamp {
    /// The instant as a UTC wall clock. Suffix-less values are taken as UTC.
    pub fn to_utc_naive(&self) -> NaiveDateTime {
        match self.suffix {
            Some(suffix) => self.naive - chrono::Duration::seconds(suffix.offset.local_minus_utc() as i64),
            None => self.naive,
        }
    }

    /// Calendar date anchored to UTC.
    pub fn utc_date(&self) -> NaiveDate {
        self.to_utc_naive().date()
    }

    /// Same shape and suffix, different wall-clock value.
    pub fn with_naive(&self, naive: NaiveDateTime) -> Self {
        ParsedTimestamp { naive, ..*self }
    }

    /// Renders the wall-clock value in the shape it was parsed from.
    pub fn render(&self) -> String {
        let mut out = self.naive.format("%Y-%m-%d").to_string();
        if let TimestampShape::DateTime { separator, seconds, fraction_digits } = self.shape {
            out.push(separator);
            out.push_str(&self.naive.format("%H:%M").to_string());
            if seconds {
                out.push_str(&format!(":{:02}", self.naive.second()));
                if fraction_digits > 0 {
                    let nanos = format!("{:09}", self.naive.nanosecond() % 1_000_000_000);
                    out.push('.');
                    out.push_str(&nanos[..fraction_digits as usize]);
                }
            }
        }
        if let Some(suffix) = self.suffix {
            out.push_str(&render_suffix(&suffix));
        }
        out
    }
}

fn render_suffix(suffix: &ZoneSuffix) -> String {
    if suffix.zulu {
        return "Z".to_string();
    }
    let secs = suffix.offset.local_minus_utc();
    let sign = if secs < 0 { '-' } else { '+' };
    let abs = secs.abs() / 60;
    if suffix.colon {
        format!("{}{:02}:{:02}", sign, abs / 60, abs % 60)
    } else {
        format!("{}{:02}{:02}", sign, abs / 60, abs % 60)
    }
}

fn parse_suffix(raw: &str) -> Option<ZoneSuffix> {
    if raw == "Z" || raw == "z" {
        return Some(ZoneSuffix { offset: Utc.fix(), zulu: true, colon: true });
    }
    let sign = if raw.starts_with('-') { -1 } else { 1 };
    let digits: String = raw[1..].chars().filter(|c| c.is_ascii_digit()).collect();
    let hours: i32 = digits.get(0..2)?.parse().ok()?;
    let minutes: i32 = digits.get(2..4)?.parse().ok()?;
    let offset = FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))?;
    Some(ZoneSuffix { offset, zulu: false, colon: raw.contains(':') })
}

/// Parses an ISO-like timestamp, keeping the layout it was written in.
pub fn parse_timestamp(raw: &str) -> EngineResult<ParsedTimestamp> {
    let invalid = || EngineError::InvalidTimestamp(raw.to_string());
    let caps = TIMESTAMP_RE.captures(raw.trim()).ok_or_else(invalid)?;

    let num = |i: usize| -> Option<u32> { caps.get(i).and_then(|m| m.as_str().parse().ok()) };

    let year: i32 = caps.get(1).and_then(|m| m.as_str().parse().ok()).ok_or_else(invalid)?;
    let month = num(2).ok_or_else(invalid)?;
    let day = num(3).ok_or_else(invalid)?;
    let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)?;

    let (time, shape) = match caps.get(4) {
        None => (NaiveTime::MIN, TimestampShape::DateOnly),
        Some(sep) => {
            let hour = num(5).ok_or_else(invalid)?;
            let minute = num(6).ok_or_else(invalid)?;
            let second = num(7);
            let (nanos, fraction_digits) = match caps.get(8) {
                Some(frac) => {
                    let digits = frac.as_str();
                    let padded = format!("{:0<9}", digits);
                    (padded.parse::<u32>().map_err(|_| invalid())?, digits.len() as u8)
                }
                None => (0, 0),
            };
            let time = NaiveTime::from_hms_nano_opt(hour, minute, second.unwrap_or(0), nanos)
                .ok_or_else(invalid)?;
            let separator = sep.as_str().chars().next().unwrap_or('T');
            (
                time,
                TimestampShape::DateTime {
                    separator,
                    seconds: second.is_some(),
                    fraction_digits,
                },
            )
        }
    };

    let suffix = match caps.get(9) {
        Some(m) => Some(parse_suffix(m.as_str()).ok_or_else(invalid)?),
        None => None,
    };

    Ok(ParsedTimestamp {
        naive: NaiveDateTime::new(date, time),
        shape,
        suffix,
    })
}

/// Interprets `raw` in `zone` (default UTC) and returns the instant in that zone.
///
/// Suffix-less strings are wall-clock time in `zone`; strings with a suffix are
/// instants converted into `zone`.
pub fn to_zoned_date(raw: &str, zone: Option<ZoneOffset>) -> EngineResult<DateTime<FixedOffset>> {
    let zone = zone.unwrap_or_default().fixed();
    let parsed = parse_timestamp(raw)?;

    match parsed.suffix {
        Some(_) => Ok(Utc.from_utc_datetime(&parsed.to_utc_naive()).with_timezone(&zone)),
        None => zone
            .from_local_datetime(&parsed.naive)
            .single()
            .ok_or_else(|| EngineError::InvalidTimestamp(raw.to_string())),
    }
}
