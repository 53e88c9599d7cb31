//! FILENAME: core/pivot-engine/src/definition.rs
//! Pivot Definition - The serializable configuration.
//!
//! This module contains the types needed to DESCRIBE a pivot table's row
//! hierarchy. These structures are designed to be:
//! - Serializable (sent alongside the query results)
//! - Immutable snapshots of user intent

use serde::{Deserialize, Serialize};

/// Label shown for null dimension values unless the definition overrides it.
pub const DEFAULT_NULL_LABEL: &str = "(blank)";

// ============================================================================
// SORTING
// ============================================================================

/// Sort order for the items of one dimension.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
    /// Order of first appearance in the result set.
    DataSourceOrder,
}

// ============================================================================
// DIMENSIONS
// ============================================================================

/// A row dimension. Its position in the definition is its nesting level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PivotDimension {
    /// Column name in the result rows.
    pub name: String,

    #[serde(default)]
    pub sort_order: SortOrder,
}

impl PivotDimension {
    pub fn new(name: impl Into<String>) -> Self {
        PivotDimension {
            name: name.into(),
            sort_order: SortOrder::Ascending,
        }
    }

    pub fn sorted(mut self, sort_order: SortOrder) -> Self {
        self.sort_order = sort_order;
        self
    }
}

// ============================================================================
// DEFINITION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PivotDefinition {
    /// Outermost grouping first.
    pub row_dimensions: Vec<PivotDimension>,

    /// Measure column names, in display order.
    pub measures: Vec<String>,

    #[serde(default = "default_null_label")]
    pub null_label: String,
}

fn default_null_label() -> String {
    DEFAULT_NULL_LABEL.to_string()
}

impl Default for PivotDefinition {
    fn default() -> Self {
        PivotDefinition {
            row_dimensions: Vec::new(),
            measures: Vec::new(),
            null_label: default_null_label(),
        }
    }
}

impl PivotDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dimension(mut self, dimension: PivotDimension) -> Self {
        self.row_dimensions.push(dimension);
        self
    }

    pub fn with_measure(mut self, measure: impl Into<String>) -> Self {
        self.measures.push(measure.into());
        self
    }

    pub fn with_null_label(mut self, label: impl Into<String>) -> Self {
        self.null_label = label.into();
        self
    }

    /// Number of nesting levels (and of result sets the engine expects).
    pub fn depth(&self) -> usize {
        self.row_dimensions.len()
    }

    pub fn measure_index(&self, measure: &str) -> Option<usize> {
        self.measures.iter().position(|m| m == measure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_with_defaults() {
        let def: PivotDefinition = serde_json::from_str(
            r#"{"rowDimensions": [{"name": "country"}, {"name": "city", "sortOrder": "descending"}], "measures": ["orders"]}"#,
        )
        .unwrap();
        assert_eq!(def.depth(), 2);
        assert_eq!(def.row_dimensions[0].sort_order, SortOrder::Ascending);
        assert_eq!(def.row_dimensions[1].sort_order, SortOrder::Descending);
        assert_eq!(def.null_label, DEFAULT_NULL_LABEL);
        assert_eq!(def.measure_index("orders"), Some(0));
    }
}
