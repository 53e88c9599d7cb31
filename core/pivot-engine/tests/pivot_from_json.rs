//! Pivot trees built from JSON query results and rendered with the formatter.

use dash_engine::{format_cell, FormatOptions, Row};
use pivot_engine::{build_pivot_tree, flatten, PivotDefinition};

fn result_set(json: &str) -> Vec<Row> {
    serde_json::from_str(json).unwrap()
}

#[test]
fn table_rows_render_formatted_measures() {
    let definition: PivotDefinition = serde_json::from_str(
        r#"{
            "rowDimensions": [{"name": "country"}, {"name": "plan", "sortOrder": "dataSourceOrder"}],
            "measures": ["revenue"],
            "nullLabel": "-"
        }"#,
    )
    .unwrap();

    let results = vec![
        result_set(r#"[{"country": "US", "revenue": 1250000}, {"country": null, "revenue": 900}]"#),
        result_set(
            r#"[
                {"country": "US", "plan": "pro", "revenue": 1000000},
                {"country": "US", "plan": "free", "revenue": 250000},
                {"country": null, "plan": "pro", "revenue": 900}
            ]"#,
        ),
    ];

    let tree = build_pivot_tree(&definition, &results).unwrap();
    let rendered: Vec<(usize, String, String)> = flatten(&tree)
        .into_iter()
        .map(|row| {
            let revenue = format_cell(&row.values[0], FormatOptions::number().abbreviated())
                .unwrap_or_default();
            (row.depth, row.label, revenue)
        })
        .collect();

    assert_eq!(
        rendered,
        vec![
            (0, "-".to_string(), "900".to_string()),
            (1, "pro".to_string(), "900".to_string()),
            (0, "US".to_string(), "1.3M".to_string()),
            (1, "pro".to_string(), "1M".to_string()),
            (1, "free".to_string(), "250K".to_string()),
        ]
    );
}
