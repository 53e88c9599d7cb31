//! FILENAME: core/series-engine/src/timeseries.rs
//! PURPOSE: Inserts placeholder rows for missing time buckets in a sorted result set.
//! CONTEXT: Chart layers draw one point or bar per row. A series with missing
//! days therefore needs synthetic rows so that gaps show up as gaps. Filling is
//! strictly interior: nothing is added before the first or after the last row.
//!
//! The filler is written as a fold step (`fill_gaps(acc, row, index, all)`) so
//! callers can drive it from an existing iterator pipeline, with `fill` as the
//! one-shot wrapper.

use serde::{Deserialize, Serialize};

use dash_engine::cell::{CellValue, Row};
use dash_engine::granularity::Granularity;
use dash_engine::timezone::{parse_timestamp, ParsedTimestamp};
use dash_engine::{log_debug, log_warn};

/// Upper bound on rows synthesized between two consecutive real rows.
pub const MAX_SYNTHETIC_ROWS_PER_GAP: usize = 10_000;

/// Order of the input rows by time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    fn sign(&self) -> i64 {
        match self {
            SortDirection::Asc => 1,
            SortDirection::Desc => -1,
        }
    }
}

/// Fills gaps in a time-ordered series at a fixed granularity.
///
/// Without `with_metric_fields`, a synthetic row nulls (or zeroes) every column
/// that reads as a number in the row after the gap and copies the others, so
/// dimension columns such as a segment label survive. Pass the metric fields
/// explicitly when a dimension can hold numeric text.
#[derive(Debug, Clone)]
pub struct GapFiller {
    time_field: String,
    granularity: Granularity,
    direction: SortDirection,
    /// Columns set to `fill_value` on synthetic rows. `None` means the numeric
    /// columns of the row that follows the gap.
    metric_fields: Option<Vec<String>>,
    fill_value: CellValue,
}

impl GapFiller {
    pub fn new(time_field: impl Into<String>, granularity: Granularity, direction: SortDirection) -> Self {
        GapFiller {
            time_field: time_field.into(),
            granularity,
            direction,
            metric_fields: None,
            fill_value: CellValue::Null,
        }
    }

    pub fn with_metric_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.metric_fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    /// Synthetic rows carry zeros instead of nulls.
    pub fn fill_with_zero(mut self) -> Self {
        self.fill_value = CellValue::Number(0.0);
        self
    }

    pub fn time_field(&self) -> &str {
        &self.time_field
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    /// Fold step: appends the synthetic rows between `all[index - 1]` and
    /// `row`, then `row` itself.
    pub fn fill_gaps(&self, mut acc: Vec<Row>, row: &Row, index: usize, all: &[Row]) -> Vec<Row> {
        let previous = match index.checked_sub(1).and_then(|i| all.get(i)) {
            Some(p) => p,
            None => {
                acc.push(row.clone());
                return acc;
            }
        };

        match (self.timestamp_of(previous), self.timestamp_of(row)) {
            (Some(prev_ts), Some(cur_ts)) => self.push_missing(&mut acc, &prev_ts, &cur_ts, row),
            _ => {
                log_warn!(
                    "TIMESERIES",
                    "row {} has no parseable '{}' value, passing it through",
                    index,
                    self.time_field
                );
            }
        }

        acc.push(row.clone());
        acc
    }

    /// Runs the fold over a whole series.
    pub fn fill(&self, rows: &[Row]) -> Vec<Row> {
        let filled = rows
            .iter()
            .enumerate()
            .fold(Vec::with_capacity(rows.len()), |acc, (i, row)| {
                self.fill_gaps(acc, row, i, rows)
            });
        log_debug!(
            "TIMESERIES",
            "filled {} rows to {} at {} granularity",
            rows.len(),
            filled.len(),
            self.granularity
        );
        filled
    }

    fn timestamp_of(&self, row: &Row) -> Option<ParsedTimestamp> {
        let raw = row.get(&self.time_field)?.as_raw()?;
        parse_timestamp(&raw).ok()
    }

    /// Steps from `prev` towards `cur` and pushes one row per bucket strictly
    /// between them. Rows that run against `direction` or share a bucket
    /// (segmented series) produce nothing.
    fn push_missing(&self, acc: &mut Vec<Row>, prev: &ParsedTimestamp, cur: &ParsedTimestamp, row: &Row) {
        let target = cur.to_utc_naive();
        let sign = self.direction.sign();
        let mut synthesized = 0;

        for k in 1.. {
            let next = match self.granularity.offset(prev.naive, k * sign) {
                Some(n) => prev.with_naive(n),
                None => break,
            };
            let instant = next.to_utc_naive();
            let between = match self.direction {
                SortDirection::Asc => instant < target,
                SortDirection::Desc => instant > target,
            };
            if !between {
                break;
            }
            if synthesized == MAX_SYNTHETIC_ROWS_PER_GAP {
                log_warn!(
                    "TIMESERIES",
                    "gap before {} exceeds {} buckets, truncating",
                    cur.render(),
                    MAX_SYNTHETIC_ROWS_PER_GAP
                );
                break;
            }
            acc.push(self.synthetic_row(&next, row));
            synthesized += 1;
        }
    }

    fn synthetic_row(&self, at: &ParsedTimestamp, template: &Row) -> Row {
        let mut synthetic = Row::new();
        synthetic.insert(self.time_field.clone(), CellValue::Text(at.render()));

        match &self.metric_fields {
            Some(fields) => {
                for field in fields {
                    synthetic.insert(field.clone(), self.fill_value.clone());
                }
            }
            None => {
                for (key, cell) in template.iter().filter(|(k, _)| **k != self.time_field) {
                    let value = match cell {
                        CellValue::Text(_) if cell.as_f64().is_none() => cell.clone(),
                        _ => self.fill_value.clone(),
                    };
                    synthetic.insert(key.clone(), value);
                }
            }
        }
        synthetic
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dash_engine::cell::row;

    fn day_rows(dates: &[(&str, &str)]) -> Vec<Row> {
        dates.iter().map(|(d, v)| row([("date", *d), ("v", *v)])).collect()
    }

    fn dates(rows: &[Row]) -> Vec<String> {
        rows.iter()
            .map(|r| r.get("date").and_then(|c| c.as_raw()).unwrap_or_default())
            .collect()
    }

    #[test]
    fn test_fills_single_missing_day() {
        let rows = day_rows(&[("2024-01-01", "10"), ("2024-01-03", "20")]);
        let filled = GapFiller::new("date", Granularity::Day, SortDirection::Asc).fill(&rows);

        assert_eq!(filled.len(), 3);
        assert_eq!(filled[0], rows[0]);
        assert_eq!(filled[1].get("date"), Some(&CellValue::text("2024-01-02")));
        assert_eq!(filled[1].get("v"), Some(&CellValue::Null));
        assert_eq!(filled[2], rows[1]);
    }

    #[test]
    fn test_descending_series() {
        let rows = day_rows(&[("2024-01-05", "1"), ("2024-01-02", "2")]);
        let filled = GapFiller::new("date", Granularity::Day, SortDirection::Desc).fill(&rows);
        assert_eq!(
            dates(&filled),
            vec!["2024-01-05", "2024-01-04", "2024-01-03", "2024-01-02"]
        );
    }

    #[test]
    fn test_direction_is_not_inferred() {
        // Descending data read as ascending never satisfies the step condition.
        let rows = day_rows(&[("2024-01-05", "1"), ("2024-01-02", "2")]);
        let filled = GapFiller::new("date", Granularity::Day, SortDirection::Asc).fill(&rows);
        assert_eq!(filled, rows);
    }

    #[test]
    fn test_dense_series_is_unchanged() {
        let rows = day_rows(&[("2024-01-01", "1"), ("2024-01-02", "2"), ("2024-01-03", "3")]);
        let filler = GapFiller::new("date", Granularity::Day, SortDirection::Asc);
        assert_eq!(filler.fill(&rows), rows);
    }

    #[test]
    fn test_filling_twice_is_idempotent() {
        let rows = day_rows(&[("2024-01-01", "1"), ("2024-01-06", "2")]);
        let filler = GapFiller::new("date", Granularity::Day, SortDirection::Asc);
        let once = filler.fill(&rows);
        let twice = filler.fill(&once);
        assert_eq!(once.len(), 6);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_duplicate_timestamps_are_not_gaps() {
        let rows = vec![
            row([("date", "2024-01-01"), ("segment", "a"), ("v", "1")]),
            row([("date", "2024-01-01"), ("segment", "b"), ("v", "2")]),
            row([("date", "2024-01-02"), ("segment", "a"), ("v", "3")]),
        ];
        let filler = GapFiller::new("date", Granularity::Day, SortDirection::Asc);
        assert_eq!(filler.fill(&rows), rows);
    }

    #[test]
    fn test_segment_labels_survive_default_fill() {
        let rows = vec![
            row([("date", "2024-01-01"), ("segment", "web"), ("v", "1")]),
            row([("date", "2024-01-03"), ("segment", "mobile"), ("v", "3")]),
        ];
        let filled = GapFiller::new("date", Granularity::Day, SortDirection::Asc).fill(&rows);

        assert_eq!(filled.len(), 3);
        assert_eq!(filled[1].get("segment"), Some(&CellValue::text("mobile")));
        assert_eq!(filled[1].get("v"), Some(&CellValue::Null));

        let explicit = GapFiller::new("date", Granularity::Day, SortDirection::Asc)
            .with_metric_fields(["v"])
            .fill(&rows);
        assert_eq!(explicit[1].get("segment"), None);
    }

    #[test]
    fn test_keeps_timestamp_shape() {
        let rows = vec![
            row([("month", "2024-01-01T00:00:00.000"), ("count", "4")]),
            row([("month", "2024-04-01T00:00:00.000"), ("count", "9")]),
        ];
        let filled = GapFiller::new("month", Granularity::Month, SortDirection::Asc)
            .with_metric_fields(["count"])
            .fill_with_zero()
            .fill(&rows);

        assert_eq!(filled.len(), 4);
        assert_eq!(filled[1].get("month"), Some(&CellValue::text("2024-02-01T00:00:00.000")));
        assert_eq!(filled[2].get("month"), Some(&CellValue::text("2024-03-01T00:00:00.000")));
        assert_eq!(filled[2].get("count"), Some(&CellValue::Number(0.0)));
    }

    #[test]
    fn test_month_end_anchor_does_not_drift() {
        let rows = day_rows(&[("2024-01-31", "1"), ("2024-04-30", "2")]);
        let filled = GapFiller::new("date", Granularity::Month, SortDirection::Asc).fill(&rows);
        assert_eq!(
            dates(&filled),
            vec!["2024-01-31", "2024-02-29", "2024-03-31", "2024-04-30"]
        );
    }

    #[test]
    fn test_zoned_timestamps_compare_as_instants() {
        let rows = vec![
            row([("ts", "2024-01-01T10:00:00Z"), ("v", "1")]),
            row([("ts", "2024-01-01T14:00:00+02:00"), ("v", "2")]),
        ];
        let filled = GapFiller::new("ts", Granularity::Hour, SortDirection::Asc).fill(&rows);
        let stamps: Vec<String> = filled
            .iter()
            .map(|r| r.get("ts").and_then(|c| c.as_raw()).unwrap_or_default())
            .collect();
        assert_eq!(
            stamps,
            vec!["2024-01-01T10:00:00Z", "2024-01-01T11:00:00Z", "2024-01-01T14:00:00+02:00"]
        );
    }

    #[test]
    fn test_unparseable_rows_pass_through() {
        let rows = day_rows(&[("2024-01-01", "1"), ("not a date", "2"), ("2024-01-04", "3")]);
        let filled = GapFiller::new("date", Granularity::Day, SortDirection::Asc).fill(&rows);
        assert_eq!(filled, rows);
    }

    #[test]
    fn test_empty_and_single() {
        let filler = GapFiller::new("date", Granularity::Day, SortDirection::Asc);
        assert!(filler.fill(&[]).is_empty());
        let one = day_rows(&[("2024-01-01", "1")]);
        assert_eq!(filler.fill(&one), one);
    }
}
