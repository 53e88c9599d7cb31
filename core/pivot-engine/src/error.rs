//! FILENAME: core/pivot-engine/src/error.rs

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PivotError {
    #[error("Pivot has no row dimensions")]
    NoRowDimensions,

    #[error("Missing result set for level {level} (dimension '{dimension}')")]
    MissingResultSet { level: usize, dimension: String },
}
