//! FILENAME: core/series-engine/src/heat_grid.rs
//! PURPOSE: Builds the week x weekday matrix behind the activity heat grid.
//! CONTEXT: Each column of the grid is a Monday..Sunday week. Days inside the
//! requested span show their metric (or 0 when there is no row); days that
//! only exist to complete the first and last week hold the `-1` sentinel and
//! are left out of every statistic.

use std::collections::HashMap;

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use dash_engine::cell::Row;
use dash_engine::config::HeatGridConfig;
use dash_engine::time_range::TimeRange;
use dash_engine::timezone::parse_timestamp;
use dash_engine::{log_debug, log_warn};

/// Marks a padding cell outside the requested span.
pub const OUT_OF_RANGE: i64 = -1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeatCell {
    /// `YYYY-MM-DD`
    pub date: String,
    pub value: i64,
}

impl HeatCell {
    pub fn is_padding(&self) -> bool {
        self.value == OUT_OF_RANGE
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeatGridStats {
    pub min: i64,
    pub max: i64,
    pub avg: i64,
}

/// A built grid together with its statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeatGrid {
    pub weeks: Vec<Vec<HeatCell>>,
    pub stats: HeatGridStats,
}

impl HeatGrid {
    pub fn build(
        data: &[Row],
        time_property: &str,
        metric_property: &str,
        range: Option<&TimeRange>,
        config: &HeatGridConfig,
    ) -> Self {
        let weeks = build_matrix(data, time_property, metric_property, range);
        let stats = stats(&weeks, config.include_zero_in_average);
        HeatGrid { weeks, stats }
    }

    pub fn opacity_at(&self, week: usize, day: usize) -> Option<f64> {
        let cell = self.weeks.get(week)?.get(day)?;
        opacity(cell.value, &self.stats)
    }
}

// ============================================================================
// MATRIX
// ============================================================================

/// Builds `weeks[i][day]` with `day` 0 = Monday.
///
/// The span is the explicit range when it has both endpoints, otherwise the
/// first and last date found in `data`. Relative ranges must be resolved by
/// the caller. Dates are compared as UTC calendar dates.
pub fn build_matrix(
    data: &[Row],
    time_property: &str,
    metric_property: &str,
    range: Option<&TimeRange>,
) -> Vec<Vec<HeatCell>> {
    let mut by_date: HashMap<NaiveDate, i64> = HashMap::new();
    let mut data_span: Option<(NaiveDate, NaiveDate)> = None;

    for (i, row) in data.iter().enumerate() {
        let date = match row
            .get(time_property)
            .and_then(|c| c.as_raw())
            .and_then(|raw| parse_timestamp(&raw).ok())
        {
            Some(ts) => ts.utc_date(),
            None => {
                log_warn!("HEATGRID", "row {} has no parseable '{}'", i, time_property);
                continue;
            }
        };

        let mut value = row.get(metric_property).and_then(|c| c.as_i64()).unwrap_or(0);
        if value < 0 {
            log_warn!("HEATGRID", "row {} has negative '{}' ({}), using 0", i, metric_property, value);
            value = 0;
        }
        by_date.entry(date).or_insert(value);

        data_span = Some(match data_span {
            Some((lo, hi)) => (lo.min(date), hi.max(date)),
            None => (date, date),
        });
    }

    let explicit = range.and_then(|r| match (r.from, r.to) {
        (Some(from), Some(to)) => {
            let (a, b) = (from.date_naive(), to.date_naive());
            Some((a.min(b), a.max(b)))
        }
        _ => None,
    });

    let (span_start, span_end) = match explicit.or(data_span) {
        Some(span) => span,
        None => return Vec::new(),
    };

    let grid_start = span_start - Duration::days(span_start.weekday().num_days_from_monday() as i64);
    let grid_end = span_end + Duration::days(6 - span_end.weekday().num_days_from_monday() as i64);

    let mut weeks = Vec::new();
    let mut week = Vec::with_capacity(7);
    let mut day = grid_start;
    while day <= grid_end {
        let value = if day < span_start || day > span_end {
            OUT_OF_RANGE
        } else {
            by_date.get(&day).copied().unwrap_or(0)
        };
        week.push(HeatCell {
            date: day.format("%Y-%m-%d").to_string(),
            value,
        });
        if week.len() == 7 {
            weeks.push(std::mem::replace(&mut week, Vec::with_capacity(7)));
        }
        day += Duration::days(1);
    }

    log_debug!(
        "HEATGRID",
        "built {} weeks for {}..{} from {} rows",
        weeks.len(),
        span_start,
        span_end,
        data.len()
    );
    weeks
}

// ============================================================================
// STATISTICS
// ============================================================================

/// Min, max and average over the grid, ignoring padding.
///
/// The average is the sum of positive values over the number of counted
/// cells, rounded half up. With `include_zero_in_average` the counted cells
/// are all non-padding cells, otherwise only positive ones. Min and max are
/// taken over the counted cells. No counted cells gives all zeros.
pub fn stats(matrix: &[Vec<HeatCell>], include_zero_in_average: bool) -> HeatGridStats {
    let counted: Vec<i64> = matrix
        .iter()
        .flatten()
        .map(|c| c.value)
        .filter(|v| *v != OUT_OF_RANGE)
        .filter(|v| include_zero_in_average || *v > 0)
        .collect();

    if counted.is_empty() {
        return HeatGridStats::default();
    }

    let sum: i64 = counted.iter().filter(|v| **v > 0).sum();
    let count = counted.len() as i64;

    HeatGridStats {
        min: counted.iter().copied().min().unwrap_or(0),
        max: counted.iter().copied().max().unwrap_or(0),
        avg: (2 * sum + count) / (2 * count),
    }
}

/// Opacity for a cell: `None` for padding, the lowest step for zero, and
/// otherwise the position between min and max in 20%-wide bands. A value in
/// `(0%, 20%]` of the range gets 0.2, `(20%, 40%]` gets 0.4 and so on; the
/// minimum itself gets 0.2.
pub fn opacity(value: i64, stats: &HeatGridStats) -> Option<f64> {
    if value == OUT_OF_RANGE {
        return None;
    }
    if value == 0 {
        return Some(0.2);
    }
    let range = stats.max - stats.min;
    if range <= 0 {
        return Some(1.0);
    }
    let offset = (value - stats.min).max(0);
    let step = ((5 * offset + range - 1) / range).clamp(1, 5);
    Some(step as f64 / 5.0)
}
