//! FILENAME: core/series-engine/src/segments.rs
//! PURPOSE: Per-category totals for stacked bars and the "Other" slice for pies.

use std::collections::HashMap;

use dash_engine::cell::{CellValue, Row};

/// Label of the slice that absorbs the long tail.
pub const OTHER_LABEL: &str = "Other";

/// Sum of `metric_field` per distinct `x_field` value, in first-seen order.
/// Rows without an x value are skipped; unparseable metrics count as 0.
pub fn stacked_totals(rows: &[Row], x_field: &str, metric_field: &str) -> Vec<(String, f64)> {
    let mut totals: Vec<(String, f64)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for row in rows {
        let x = match row.get(x_field).and_then(|c| c.as_raw()) {
            Some(x) => x,
            None => continue,
        };
        let y = row.get(metric_field).and_then(|c| c.as_f64()).unwrap_or(0.0);

        match index.get(&x) {
            Some(&i) => totals[i].1 += y,
            None => {
                index.insert(x.clone(), totals.len());
                totals.push((x, y));
            }
        }
    }
    totals
}

/// Keeps the `max_segments - 1` largest rows by metric and folds the rest
/// into one `Other` row. Input with at most `max_segments` rows, or a zero
/// limit, is returned unchanged.
pub fn merge_long_tail(rows: &[Row], slice_field: &str, metric_field: &str, max_segments: usize) -> Vec<Row> {
    if max_segments == 0 || rows.len() <= max_segments {
        return rows.to_vec();
    }

    let metric = |row: &Row| row.get(metric_field).and_then(|c| c.as_i64()).unwrap_or(0);

    let mut sorted: Vec<&Row> = rows.iter().collect();
    sorted.sort_by(|a, b| metric(b).cmp(&metric(a)));

    let keep = max_segments - 1;
    let tail: i64 = sorted[keep..].iter().map(|r| metric(r)).sum();

    let mut merged: Vec<Row> = sorted[..keep].iter().map(|r| (*r).clone()).collect();
    let mut other = Row::new();
    other.insert(slice_field.to_string(), CellValue::text(OTHER_LABEL));
    other.insert(metric_field.to_string(), CellValue::Number(tail as f64));
    merged.push(other);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use dash_engine::cell::row;

    fn slices(pairs: &[(&str, &str)]) -> Vec<Row> {
        pairs.iter().map(|(s, n)| row([("country", *s), ("n", *n)])).collect()
    }

    #[test]
    fn test_stacked_totals_first_seen_order() {
        let rows = vec![
            row([("month", "Feb"), ("seg", "a"), ("n", "2")]),
            row([("month", "Jan"), ("seg", "a"), ("n", "1.5")]),
            row([("month", "Feb"), ("seg", "b"), ("n", "3")]),
            row([("month", "Jan"), ("seg", "b"), ("n", "x")]),
        ];
        let totals = stacked_totals(&rows, "month", "n");
        assert_eq!(totals, vec![("Feb".to_string(), 5.0), ("Jan".to_string(), 1.5)]);
    }

    #[test]
    fn test_long_tail_merges_smallest() {
        let rows = slices(&[("FR", "5"), ("US", "40"), ("DE", "10"), ("IT", "2"), ("UK", "20")]);
        let merged = merge_long_tail(&rows, "country", "n", 3);

        let labels: Vec<String> = merged
            .iter()
            .map(|r| r.get("country").and_then(|c| c.as_raw()).unwrap_or_default())
            .collect();
        assert_eq!(labels, vec!["US", "UK", "Other"]);
        assert_eq!(merged[2].get("n"), Some(&CellValue::Number(17.0)));
    }

    #[test]
    fn test_short_input_is_unchanged() {
        let rows = slices(&[("FR", "5"), ("US", "40")]);
        assert_eq!(merge_long_tail(&rows, "country", "n", 2), rows);
        assert_eq!(merge_long_tail(&rows, "country", "n", 0), rows);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let rows = slices(&[("A", "1"), ("B", "1"), ("C", "1")]);
        let merged = merge_long_tail(&rows, "country", "n", 2);
        assert_eq!(merged[0].get("country"), Some(&CellValue::text("A")));
        assert_eq!(merged[1].get("n"), Some(&CellValue::Number(2.0)));
    }
}
