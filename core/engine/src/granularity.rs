//! FILENAME: core/engine/src/granularity.rs
//! PURPOSE: Time bucket sizes, their calendar arithmetic and which of them suit a range.
//! CONTEXT: A granularity is only offered when the selected range holds a sensible
//! number of buckets of that size. The bounds table below decides that, and the
//! recommended option is the penultimate qualifying one (coarse, but not the coarsest).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Months, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::time_range::TimeRange;

/// Named time bucket size, finest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

impl Granularity {
    pub const ALL: [Granularity; 8] = [
        Granularity::Second,
        Granularity::Minute,
        Granularity::Hour,
        Granularity::Day,
        Granularity::Week,
        Granularity::Month,
        Granularity::Quarter,
        Granularity::Year,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Second => "second",
            Granularity::Minute => "minute",
            Granularity::Hour => "hour",
            Granularity::Day => "day",
            Granularity::Week => "week",
            Granularity::Month => "month",
            Granularity::Quarter => "quarter",
            Granularity::Year => "year",
        }
    }

    /// Inclusive `[min, max]` range span, in seconds, for which this bucket size is offered.
    pub fn span_bounds(&self) -> (f64, f64) {
        match self {
            Granularity::Second => (2.0, 100.0),
            Granularity::Minute => (to_seconds(TimeUnit::Minute, 2.0), to_seconds(TimeUnit::Minute, 100.0)),
            Granularity::Hour => (to_seconds(TimeUnit::Hour, 2.0), to_seconds(TimeUnit::Hour, 100.0)),
            Granularity::Day => (to_seconds(TimeUnit::Day, 0.5), to_seconds(TimeUnit::Day, 168.0)),
            Granularity::Week => (to_seconds(TimeUnit::Week, 2.0), to_seconds(TimeUnit::Week, 365.0)),
            Granularity::Month => (to_seconds(TimeUnit::Month, 2.0), to_seconds(TimeUnit::Month, 730.0)),
            Granularity::Quarter => (to_seconds(TimeUnit::Quarter, 2.0), to_seconds(TimeUnit::Quarter, 36.0)),
            Granularity::Year => (to_seconds(TimeUnit::Year, 1.5), to_seconds(TimeUnit::Year, 1000.0)),
        }
    }

    /// Relative range the granularity picker applies when this option is chosen.
    /// `None` clears the range.
    pub fn default_relative_range(&self) -> Option<&'static str> {
        match self {
            Granularity::Second => Some("last 1 minute"),
            Granularity::Minute => Some("last 1 hour"),
            Granularity::Hour => Some("last 24 hours"),
            Granularity::Day => Some("last 30 days"),
            Granularity::Week => Some("last 12 months"),
            Granularity::Month => Some("last 24 months"),
            Granularity::Quarter => Some("last 24 months"),
            Granularity::Year => None,
        }
    }

    /// Moves `n` buckets from `t` (backwards when negative). Month-based steps
    /// clamp to the end of the month, and are taken from `t` in one go so that
    /// repeated offsets from the same anchor never drift.
    pub fn offset(&self, t: NaiveDateTime, n: i64) -> Option<NaiveDateTime> {
        let months = |per: i64| {
            let total = u32::try_from((n * per).unsigned_abs()).ok()?;
            if n < 0 {
                t.checked_sub_months(Months::new(total))
            } else {
                t.checked_add_months(Months::new(total))
            }
        };
        match self {
            Granularity::Second => t.checked_add_signed(Duration::seconds(n)),
            Granularity::Minute => t.checked_add_signed(Duration::minutes(n)),
            Granularity::Hour => t.checked_add_signed(Duration::hours(n)),
            Granularity::Day => t.checked_add_signed(Duration::days(n)),
            Granularity::Week => t.checked_add_signed(Duration::weeks(n)),
            Granularity::Month => months(1),
            Granularity::Quarter => months(3),
            Granularity::Year => months(12),
        }
    }

    pub fn step_forward(&self, t: NaiveDateTime) -> Option<NaiveDateTime> {
        self.offset(t, 1)
    }

    pub fn step_back(&self, t: NaiveDateTime) -> Option<NaiveDateTime> {
        self.offset(t, -1)
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Granularity::ALL
            .iter()
            .copied()
            .find(|g| g.as_str() == s)
            .ok_or_else(|| EngineError::InvalidConfig(format!("unknown granularity '{}'", s)))
    }
}

// ============================================================================
// UNIT CONVERSION
// ============================================================================

/// Calendar units with their average length in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Minute,
    Hour,
    Day,
    Week,
    /// 30.44 days
    Month,
    /// 91.31 days
    Quarter,
    /// Gregorian year, 365.25 days
    Year,
}

impl TimeUnit {
    pub fn seconds(&self) -> f64 {
        match self {
            TimeUnit::Minute => 60.0,
            TimeUnit::Hour => 3600.0,
            TimeUnit::Day => 86400.0,
            TimeUnit::Week => 604800.0,
            TimeUnit::Month => 2629800.0,
            TimeUnit::Quarter => 7889400.0,
            TimeUnit::Year => 31557600.0,
        }
    }
}

pub fn to_seconds(unit: TimeUnit, n: f64) -> f64 {
    n * unit.seconds()
}

// ============================================================================
// VALIDATION
// ============================================================================

/// Granularities valid for a range, plus the one to preselect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GranularityOptions {
    pub options: Vec<Granularity>,
    pub recommended: Granularity,
}

/// Returns the granularities whose span bounds contain the range length.
/// A relative range is resolved against `now` first; missing endpoints are `now`.
pub fn valid_granularities(range: Option<&TimeRange>, now: DateTime<Utc>) -> GranularityOptions {
    let resolved = range.map(|r| r.resolve(now));
    let from = resolved.as_ref().and_then(|r| r.from).unwrap_or(now);
    let to = resolved.as_ref().and_then(|r| r.to).unwrap_or(now);
    let diff = (to - from).num_seconds().abs() as f64;

    let options: Vec<Granularity> = Granularity::ALL
        .iter()
        .copied()
        .filter(|g| {
            let (min, max) = g.span_bounds();
            diff >= min && diff <= max
        })
        .collect();

    let recommended = if options.len() >= 2 {
        options[options.len() - 2]
    } else {
        Granularity::Day
    };

    GranularityOptions { options, recommended }
}

/// One entry of the granularity picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GranularityOption {
    pub value: String,
    /// Relative range applied alongside the choice; `None` clears the range.
    pub relative_time_string: Option<String>,
}

/// Builds the picker list: enabled built-ins in canonical order, then custom
/// granularities injected through configuration.
pub fn granularity_options(enabled: &[Granularity], custom: &[String]) -> Vec<GranularityOption> {
    let builtin = Granularity::ALL
        .iter()
        .filter(|g| enabled.contains(g))
        .map(|g| GranularityOption {
            value: g.as_str().to_string(),
            relative_time_string: g.default_relative_range().map(str::to_string),
        });

    let custom = custom
        .iter()
        .filter(|name| !enabled.iter().any(|g| g.as_str() == name.as_str()))
        .map(|name| GranularityOption {
            value: name.clone(),
            relative_time_string: None,
        });

    builtin.chain(custom).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    fn range_of(seconds: i64) -> TimeRange {
        TimeRange::between(now() - Duration::seconds(seconds), now())
    }

    #[test]
    fn test_empty_range_has_no_options() {
        let result = valid_granularities(None, now());
        assert!(result.options.is_empty());
        assert_eq!(result.recommended, Granularity::Day);

        let same = TimeRange::between(now(), now());
        assert!(valid_granularities(Some(&same), now()).options.is_empty());
    }

    #[test]
    fn test_three_days() {
        let result = valid_granularities(Some(&range_of(3 * 86400)), now());
        assert_eq!(result.options, vec![Granularity::Hour, Granularity::Day]);
        assert_eq!(result.recommended, Granularity::Hour);
    }

    #[test]
    fn test_seven_days_is_too_long_for_hours() {
        let result = valid_granularities(Some(&range_of(7 * 86400)), now());
        assert_eq!(result.options, vec![Granularity::Day]);
        assert_eq!(result.recommended, Granularity::Day);
    }

    #[test]
    fn test_one_year() {
        let result = valid_granularities(Some(&range_of(365 * 86400)), now());
        assert_eq!(
            result.options,
            vec![Granularity::Week, Granularity::Month, Granularity::Quarter]
        );
        assert_eq!(result.recommended, Granularity::Month);
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let result = valid_granularities(Some(&range_of(100)), now());
        assert_eq!(result.options, vec![Granularity::Second]);
        assert_eq!(result.recommended, Granularity::Day);

        let result = valid_granularities(Some(&range_of(43200)), now());
        assert_eq!(result.options, vec![Granularity::Hour, Granularity::Day]);
    }

    #[test]
    fn test_reversed_range_uses_absolute_span() {
        let reversed = TimeRange::between(now(), now() - Duration::seconds(3 * 86400));
        let result = valid_granularities(Some(&reversed), now());
        assert_eq!(result.options, vec![Granularity::Hour, Granularity::Day]);
    }

    #[test]
    fn test_span_table_uses_unit_conversions() {
        assert_eq!(Granularity::Day.span_bounds(), (43200.0, 14515200.0));
        assert_eq!(Granularity::Week.span_bounds(), (1209600.0, 220752000.0));
        assert_eq!(Granularity::Month.span_bounds().0, 5259600.0);
    }

    #[test]
    fn test_month_steps_clamp() {
        let jan31 = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let feb = Granularity::Month.step_forward(jan31).unwrap();
        assert_eq!(feb.date(), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        let back = Granularity::Quarter.step_back(jan31).unwrap();
        assert_eq!(back.date(), NaiveDate::from_ymd_opt(2023, 10, 31).unwrap());

        let mar = Granularity::Month.offset(jan31, 2).unwrap();
        assert_eq!(mar.date(), NaiveDate::from_ymd_opt(2024, 3, 31).unwrap());
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!("quarter".parse::<Granularity>().unwrap(), Granularity::Quarter);
        assert!("fortnight".parse::<Granularity>().is_err());
        assert_eq!(Granularity::Week.to_string(), "week");
    }

    #[test]
    fn test_picker_options_append_custom() {
        let custom = vec!["fiscal_quarter".to_string(), "day".to_string()];
        let options = granularity_options(&[Granularity::Month, Granularity::Day], &custom);
        let values: Vec<&str> = options.iter().map(|o| o.value.as_str()).collect();
        assert_eq!(values, vec!["day", "month", "fiscal_quarter"]);
        assert_eq!(options[0].relative_time_string.as_deref(), Some("last 30 days"));
        assert_eq!(options[2].relative_time_string, None);
    }
}
