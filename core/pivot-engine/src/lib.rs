//! FILENAME: core/pivot-engine/src/lib.rs
//! Pivot Table row tree for dashboard tables.
//!
//! This crate merges per-level query results into a nested row tree. It
//! depends on `dash-engine` only for shared types (CellValue, Row) and logging.
//!
//! Layers:
//! - `definition`: Serializable configuration (what the pivot table IS)
//! - `engine`: Tree construction and flattening (HOW we build it)
//! - `error`: Failures surfaced to the caller

pub mod definition;
pub mod engine;
pub mod error;

pub use definition::*;
pub use engine::{build_pivot_tree, compare_values, flatten, FlatPivotRow, GroupPath, PivotNode};
pub use error::PivotError;
