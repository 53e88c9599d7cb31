//! FILENAME: core/series-engine/src/lib.rs
//! Series shaping for dashboard charts.
//!
//! This crate repairs and reshapes query results before they are formatted.
//! It depends on `dash-engine` for rows, granularities, time parsing and logging.
//!
//! Layers:
//! - `timeseries`: Gap filling for time-ordered series
//! - `heat_grid`: Week x weekday matrix, statistics and opacity steps
//! - `segments`: Stacked bar totals and the pie chart long-tail merge

pub mod heat_grid;
pub mod segments;
pub mod timeseries;

pub use heat_grid::{build_matrix, opacity, stats, HeatCell, HeatGrid, HeatGridStats, OUT_OF_RANGE};
pub use segments::{merge_long_tail, stacked_totals, OTHER_LABEL};
pub use timeseries::{GapFiller, SortDirection, MAX_SYNTHETIC_ROWS_PER_GAP};
