//! FILENAME: core/engine/src/lib.rs
//! PURPOSE: Main library entry point for the dashboard formatting engine.
//! CONTEXT: Re-exports public types and modules for use by other crates.

pub mod cell;
pub mod config;
pub mod date_pattern;
pub mod error;
pub mod format;
pub mod granularity;
pub mod links;
pub mod logging;
pub mod search;
pub mod time_range;
pub mod timezone;

// Re-export commonly used types at the crate root
pub use cell::{row, CellValue, Row};
pub use config::{DashboardConfig, DateFormats, HeatGridConfig};
pub use date_pattern::{format_date, parse_date_pattern, DatePattern};
pub use error::{EngineError, EngineResult};
pub use format::{format_cell, format_value, format_with, FormatMeta, FormatOptions, FormatSpec, ValueType};
pub use granularity::{
    granularity_options, to_seconds, valid_granularities, Granularity, GranularityOption,
    GranularityOptions, TimeUnit,
};
pub use links::{detect_link, Link};
pub use search::{filter_options, option_matches_search, SearchDebounce, SearchableOption};
pub use time_range::{
    comparison_options, comparison_period, ComparisonOption, RelativeRange, TimeRange,
    NO_COMPARISON,
};
pub use timezone::{parse_timestamp, to_zoned_date, ParsedTimestamp, TimestampShape, ZoneOffset};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_formats_with_theme_pattern() {
        let config = DashboardConfig::default();
        let options = FormatOptions::default()
            .with_date_format(config.date_formats.format_for(Granularity::Month));
        assert_eq!(
            format_value(Some("2024-03-05T00:00:00.000"), options),
            Some("Mar 24".to_string())
        );
    }

    #[test]
    fn it_formats_cells() {
        let cell = CellValue::from("1234.5");
        assert_eq!(format_cell(&cell, ValueType::Number), Some("1,234.5".to_string()));
        assert_eq!(format_cell(&CellValue::Null, ValueType::Number), None);
    }
}
