//! FILENAME: core/engine/src/time_range.rs
//! PURPOSE: Date ranges, relative range strings and comparison periods.
//! CONTEXT: A range may carry the relative string it was picked from
//! (`last 7 days`). When it does, that string is the source of truth and the
//! endpoints are recomputed from it against an injected `now`. Comparison periods
//! are the "previous period / week / month ..." ranges offered next to a range.

use chrono::{
    DateTime, Datelike, Duration, Months, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike,
    Utc,
};
use serde::{Deserialize, Serialize};

use crate::date_pattern::format_date;
use crate::granularity::Granularity;

/// A date range, always in UTC once normalized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimeRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub relative_time_string: Option<String>,
}

impl TimeRange {
    pub fn between(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        TimeRange {
            from: Some(from),
            to: Some(to),
            relative_time_string: None,
        }
    }

    pub fn relative(relative_time_string: impl Into<String>) -> Self {
        TimeRange {
            from: None,
            to: None,
            relative_time_string: Some(relative_time_string.into()),
        }
    }

    /// Recomputes the endpoints from the relative string (when recognised) and
    /// orders them so that `from <= to`.
    pub fn resolve(&self, now: DateTime<Utc>) -> TimeRange {
        let relative = self
            .relative_time_string
            .as_deref()
            .and_then(RelativeRange::parse);

        let (from, to) = match relative {
            Some(rel) => {
                let (from, to) = rel.bounds(now);
                (Some(from), Some(to))
            }
            None => (self.from, self.to),
        };

        let (from, to) = match (from, to) {
            (Some(a), Some(b)) if a > b => (Some(b), Some(a)),
            other => other,
        };

        TimeRange {
            from,
            to,
            relative_time_string: self.relative_time_string.clone(),
        }
    }
}

// ============================================================================
// RELATIVE RANGES
// ============================================================================

fn parse_unit(unit: &str) -> Option<Granularity> {
    unit.strip_suffix('s').unwrap_or(unit).parse().ok()
}

/// `t` moved back by `n` buckets of `unit`. Month-based units clamp to month end.
fn subtract(unit: Granularity, t: DateTime<Utc>, n: u32) -> DateTime<Utc> {
    let n64 = n as i64;
    let shifted = match unit {
        Granularity::Second => t.checked_sub_signed(Duration::seconds(n64)),
        Granularity::Minute => t.checked_sub_signed(Duration::minutes(n64)),
        Granularity::Hour => t.checked_sub_signed(Duration::hours(n64)),
        Granularity::Day => t.checked_sub_signed(Duration::days(n64)),
        Granularity::Week => t.checked_sub_signed(Duration::weeks(n64)),
        Granularity::Month => t.checked_sub_months(Months::new(n)),
        Granularity::Quarter => t.checked_sub_months(Months::new(n * 3)),
        Granularity::Year => t.checked_sub_months(Months::new(n * 12)),
    };
    shifted.unwrap_or(t)
}

/// Start of the calendar bucket containing `t`. Weeks start on Monday.
pub fn start_of(unit: Granularity, t: DateTime<Utc>) -> DateTime<Utc> {
    let naive = t.naive_utc();
    let date = naive.date();
    let start = match unit {
        Granularity::Second => naive.with_nanosecond(0),
        Granularity::Minute => naive.with_second(0).and_then(|n| n.with_nanosecond(0)),
        Granularity::Hour => naive
            .with_minute(0)
            .and_then(|n| n.with_second(0))
            .and_then(|n| n.with_nanosecond(0)),
        Granularity::Day => Some(date.and_time(NaiveTime::MIN)),
        Granularity::Week => {
            let monday = date - Duration::days(date.weekday().num_days_from_monday() as i64);
            Some(monday.and_time(NaiveTime::MIN))
        }
        Granularity::Month => first_of_month(date.year(), date.month()),
        Granularity::Quarter => first_of_month(date.year(), (date.month() - 1) / 3 * 3 + 1),
        Granularity::Year => first_of_month(date.year(), 1),
    };
    Utc.from_utc_datetime(&start.unwrap_or(naive))
}

/// Start of the bucket following the one containing `t`.
fn start_of_next(unit: Granularity, t: DateTime<Utc>) -> DateTime<Utc> {
    let start = start_of(unit, t);
    unit.step_forward(start.naive_utc())
        .map(|n| Utc.from_utc_datetime(&n))
        .unwrap_or(start)
}

fn first_of_month(year: i32, month: u32) -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(year, month, 1).map(|d| d.and_time(NaiveTime::MIN))
}

/// A parsed relative range string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelativeRange {
    Today,
    Yesterday,
    /// `this week`, `this month`, ...
    This(Granularity),
    /// `last week`, `last month`, ... (the previous full period)
    Previous(Granularity),
    /// `last 7 days`, `last 24 hours`, ...
    Last(u32, Granularity),
    /// `month to date`, ...
    ToDate(Granularity),
}

impl RelativeRange {
    pub fn parse(s: &str) -> Option<RelativeRange> {
        let lowered = s.trim().to_lowercase();
        let words: Vec<&str> = lowered.split_whitespace().collect();

        match words.as_slice() {
            ["today"] => Some(RelativeRange::Today),
            ["yesterday"] => Some(RelativeRange::Yesterday),
            ["this", unit] => parse_unit(unit).map(RelativeRange::This),
            ["last", unit] => parse_unit(unit).map(RelativeRange::Previous),
            ["last", n, unit] => {
                let n: u32 = n.parse().ok()?;
                parse_unit(unit).map(|g| RelativeRange::Last(n, g))
            }
            [unit, "to", "date"] => parse_unit(unit).map(RelativeRange::ToDate),
            _ => None,
        }
    }

    /// Inclusive bounds; period ends are the last millisecond of the period.
    pub fn bounds(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        let end_of = |next_start: DateTime<Utc>| next_start - Duration::milliseconds(1);

        match *self {
            RelativeRange::Today => (
                start_of(Granularity::Day, now),
                end_of(start_of_next(Granularity::Day, now)),
            ),
            RelativeRange::Yesterday => {
                let today = start_of(Granularity::Day, now);
                (today - Duration::days(1), end_of(today))
            }
            RelativeRange::This(g) => (start_of(g, now), end_of(start_of_next(g, now))),
            RelativeRange::Previous(g) => {
                let current = start_of(g, now);
                (start_of(g, subtract(g, current, 1)), end_of(current))
            }
            RelativeRange::Last(n, g) => (subtract(g, now, n), now),
            RelativeRange::ToDate(g) => (start_of(g, now), now),
        }
    }
}

// ============================================================================
// COMPARISON PERIODS
// ============================================================================

pub const NO_COMPARISON: &str = "No comparison";

/// One selectable comparison, with a human readable note of its dates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonOption {
    pub value: String,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    PreviousPeriod,
    PreviousWeek,
    PreviousMonth,
    PreviousQuarter,
    PreviousYear,
}

impl Comparison {
    pub const ALL: [Comparison; 5] = [
        Comparison::PreviousPeriod,
        Comparison::PreviousWeek,
        Comparison::PreviousMonth,
        Comparison::PreviousQuarter,
        Comparison::PreviousYear,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Comparison::PreviousPeriod => "Previous period",
            Comparison::PreviousWeek => "Previous week",
            Comparison::PreviousMonth => "Previous month",
            Comparison::PreviousQuarter => "Previous quarter",
            Comparison::PreviousYear => "Previous year",
        }
    }

    /// Unknown labels compare against the previous period.
    pub fn from_label(label: &str) -> Comparison {
        Comparison::ALL
            .iter()
            .copied()
            .find(|c| c.label() == label)
            .unwrap_or(Comparison::PreviousPeriod)
    }

    /// The shifted range for `from..=to`.
    pub fn shift(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        let days = calendar_days_inclusive(from, to);
        match self {
            Comparison::PreviousPeriod => (from - Duration::days(days), to - Duration::days(days)),
            Comparison::PreviousWeek => {
                // Longer ranges keep a 7 day span ending the day before `from`
                let start = from - Duration::days(7);
                let end = if days > 7 {
                    from - Duration::days(1)
                } else {
                    to - Duration::days(7)
                };
                (start, end)
            }
            Comparison::PreviousMonth => (sub_months(from, 1), sub_months(to, 1)),
            Comparison::PreviousQuarter => (sub_months(from, 3), sub_months(to, 3)),
            Comparison::PreviousYear => (sub_months(from, 12), sub_months(to, 12)),
        }
    }

    fn relative_label(&self) -> String {
        self.label().to_lowercase()
    }
}

fn sub_months(t: DateTime<Utc>, n: u32) -> DateTime<Utc> {
    t.checked_sub_months(Months::new(n)).unwrap_or(t)
}

fn calendar_days_inclusive(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    (to.date_naive() - from.date_naive()).num_days().abs() + 1
}

/// `d MMM`, with the year appended when it differs from the current year.
pub fn comparison_note(from: DateTime<Utc>, to: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let render = |t: DateTime<Utc>| {
        let pattern = if t.year() == now.year() { "d MMM" } else { "d MMM yyyy" };
        format_date(&t.naive_utc(), pattern).unwrap_or_default()
    };

    let formatted_from = render(from);
    let formatted_to = render(to);
    if formatted_from == formatted_to {
        formatted_from
    } else {
        format!("{} - {}", formatted_from, formatted_to)
    }
}

/// The comparison choices for a period, each with its date note.
pub fn comparison_options(period: Option<&TimeRange>, now: DateTime<Utc>) -> Vec<ComparisonOption> {
    let mut options = vec![ComparisonOption {
        value: NO_COMPARISON.to_string(),
        note: None,
    }];

    let resolved = period.map(|p| p.resolve(now));
    let (from, to) = match resolved.as_ref().map(|p| (p.from, p.to)) {
        Some((Some(from), Some(to))) => (from, to),
        _ => return options,
    };

    options.extend(Comparison::ALL.iter().map(|c| {
        let (start, end) = c.shift(from, to);
        ComparisonOption {
            value: c.label().to_string(),
            note: Some(comparison_note(start, end, now)),
        }
    }));

    options
}

/// The range to compare `period` against for the chosen comparison label.
pub fn comparison_period(label: &str, period: Option<&TimeRange>, now: DateTime<Utc>) -> TimeRange {
    let resolved = period.map(|p| p.resolve(now));
    let (from, to) = match resolved.as_ref().map(|p| (p.from, p.to)) {
        Some((Some(from), Some(to))) => (from, to),
        _ => {
            return TimeRange {
                from: Some(now),
                to: Some(now),
                relative_time_string: Some(NO_COMPARISON.to_string()),
            }
        }
    };

    let comparison = Comparison::from_label(label);
    let (start, end) = comparison.shift(from, to);
    TimeRange {
        from: Some(start),
        to: Some(end),
        relative_time_string: Some(comparison.relative_label()),
    }
}
