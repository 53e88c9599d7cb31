//! Query rows from JSON through gap filling and formatting.

use dash_engine::{format_cell, DashboardConfig, FormatOptions, Granularity, Row, ValueType};
use series_engine::{build_matrix, stats, GapFiller, SortDirection};

fn rows(json: &str) -> Vec<Row> {
    serde_json::from_str(json).unwrap()
}

#[test]
fn daily_series_gets_null_for_missing_day() {
    let data = rows(r#"[{"date": "2024-01-01", "v": "10"}, {"date": "2024-01-03", "v": "20"}]"#);
    let filled = GapFiller::new("date", Granularity::Day, SortDirection::Asc).fill(&data);

    let expected = rows(
        r#"[{"date": "2024-01-01", "v": "10"}, {"date": "2024-01-02", "v": null}, {"date": "2024-01-03", "v": "20"}]"#,
    );
    assert_eq!(filled, expected);
}

#[test]
fn filled_series_formats_with_theme_patterns() {
    let config = DashboardConfig::from_json_str(r#"{"dateFormats": {"week": "d MMM yy"}}"#).unwrap();
    let data = rows(
        r#"[{"week": "2024-01-01T00:00:00.000", "n": 1200}, {"week": "2024-01-22T00:00:00.000", "n": 15000000}]"#,
    );
    let filled = GapFiller::new("week", Granularity::Week, SortDirection::Asc)
        .fill_with_zero()
        .fill(&data);

    let pattern = config.date_formats.format_for(Granularity::Week);
    let labels: Vec<String> = filled
        .iter()
        .filter_map(|r| format_cell(&r["week"], FormatOptions::default().with_date_format(pattern)))
        .collect();
    assert_eq!(labels, vec!["1 Jan 24", "8 Jan 24", "15 Jan 24", "22 Jan 24"]);

    let values: Vec<String> = filled
        .iter()
        .filter_map(|r| format_cell(&r["n"], FormatOptions::number().abbreviated()))
        .collect();
    assert_eq!(values, vec!["1.2K", "0", "0", "15M"]);

    assert_eq!(format_cell(&filled[0]["n"], ValueType::Number), Some("1,200".to_string()));
}

#[test]
fn heat_grid_from_json_rows() {
    let data = rows(
        r#"[{"day": "2024-01-01", "n": "0"}, {"day": "2024-01-02", "n": "0"}, {"day": "2024-01-03", "n": 5}, {"day": "2024-01-04", "n": "10"}]"#,
    );
    let matrix = build_matrix(&data, "day", "n", None);
    assert_eq!(matrix.len(), 1);
    assert_eq!(stats(&matrix, false).avg, 8);
    assert_eq!(stats(&matrix, true).avg, 4);
}
