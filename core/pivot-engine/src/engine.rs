//! FILENAME: core/pivot-engine/src/engine.rs
//! Pivot Engine - Merges per-level result sets into a row tree.
//!
//! The data layer runs one query per nesting level: result set `i` is grouped
//! by row dimensions `0..=i` and carries that level's measure values. This
//! module stitches them together.
//!
//! Algorithm:
//! 1. Index every result set by its group path (first row per path wins)
//! 2. Starting at level 0, sort the entries under each parent path
//! 3. Recurse into the next level using the child's path as the parent
//! 4. Optionally flatten the tree in pre-order for table rendering

use std::cmp::Ordering;

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use dash_engine::cell::{CellValue, Row};
use dash_engine::{log_debug, log_warn};

use crate::definition::{PivotDefinition, SortOrder};
use crate::error::PivotError;

/// Raw dimension values from the outermost level down. `None` is a null value.
pub type GroupPath = SmallVec<[Option<String>; 4]>;

// ============================================================================
// TREE STRUCTURES
// ============================================================================

/// A node in the row tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PivotNode {
    /// Dimension this node groups by.
    pub dimension: String,

    /// Raw dimension value; `None` for null.
    pub key: Option<String>,

    /// Display label (the null label for null keys).
    pub label: String,

    /// Depth in the tree (0 = root level).
    pub depth: usize,

    /// Keys from the root down to and including this node.
    pub path: GroupPath,

    /// Measure values from this level's result set, aligned with the
    /// definition's measures.
    pub values: Vec<CellValue>,

    /// Child nodes (next level of grouping).
    pub children: Vec<PivotNode>,
}

impl PivotNode {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn value(&self, definition: &PivotDefinition, measure: &str) -> Option<&CellValue> {
        definition.measure_index(measure).and_then(|i| self.values.get(i))
    }
}

/// A flattened representation of a tree node for rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatPivotRow {
    pub label: String,
    pub depth: usize,
    pub path: GroupPath,
    pub values: Vec<CellValue>,
    pub has_children: bool,
    /// Parent index in the flat list (-1 for root).
    pub parent_index: i32,
}

/// One distinct group path within a result set.
#[derive(Debug, Clone)]
struct LevelEntry {
    path: GroupPath,
    /// The dimension cell as first seen; used for sorting.
    sort_value: CellValue,
    values: Vec<CellValue>,
}

/// Entries of one level, bucketed by parent path in first-seen order.
#[derive(Debug, Default)]
struct LevelIndex {
    entries: Vec<LevelEntry>,
    by_parent: FxHashMap<GroupPath, Vec<usize>>,
}

// ============================================================================
// ENGINE
// ============================================================================

/// Builds the row tree from one result set per row dimension.
pub fn build_pivot_tree(
    definition: &PivotDefinition,
    result_sets: &[Vec<Row>],
) -> Result<Vec<PivotNode>, PivotError> {
    if definition.row_dimensions.is_empty() {
        return Err(PivotError::NoRowDimensions);
    }
    if result_sets.len() < definition.depth() {
        return Err(PivotError::MissingResultSet {
            level: result_sets.len(),
            dimension: definition.row_dimensions[result_sets.len()].name.clone(),
        });
    }

    let levels: Vec<LevelIndex> = (0..definition.depth())
        .map(|level| index_level(definition, level, &result_sets[level]))
        .collect();

    let tree = build_tree_level(definition, &levels, 0, &GroupPath::new());

    let orphans = count_orphans(&levels);
    if orphans > 0 {
        log_warn!("PIVOT", "{} groups have no parent in the level above and were dropped", orphans);
    }
    log_debug!(
        "PIVOT",
        "built tree with {} root nodes over {} levels",
        tree.len(),
        definition.depth()
    );

    Ok(tree)
}

/// Groups one result set by dimensions `0..=level`. Duplicate paths keep the
/// first row's measure values.
fn index_level(definition: &PivotDefinition, level: usize, rows: &[Row]) -> LevelIndex {
    let dimensions = &definition.row_dimensions[..=level];
    let mut index = LevelIndex::default();
    let mut seen: FxHashMap<GroupPath, usize> = FxHashMap::default();

    for row in rows {
        let path: GroupPath = dimensions
            .iter()
            .map(|d| row.get(&d.name).and_then(|c| c.as_raw()))
            .collect();

        if seen.contains_key(&path) {
            continue;
        }

        let sort_value = row
            .get(&dimensions[level].name)
            .cloned()
            .unwrap_or(CellValue::Null);
        let values = definition
            .measures
            .iter()
            .map(|m| row.get(m).cloned().unwrap_or(CellValue::Null))
            .collect();

        let entry_index = index.entries.len();
        seen.insert(path.clone(), entry_index);
        index
            .by_parent
            .entry(path[..level].iter().cloned().collect())
            .or_default()
            .push(entry_index);
        index.entries.push(LevelEntry {
            path,
            sort_value,
            values,
        });
    }

    index
}

/// Recursively builds one level of the tree under `parent_path`.
fn build_tree_level(
    definition: &PivotDefinition,
    levels: &[LevelIndex],
    level: usize,
    parent_path: &GroupPath,
) -> Vec<PivotNode> {
    let index = match levels.get(level) {
        Some(index) => index,
        None => return Vec::new(),
    };
    let mut ids = match index.by_parent.get(parent_path) {
        Some(ids) => ids.clone(),
        None => return Vec::new(),
    };

    let dimension = &definition.row_dimensions[level];
    sort_entry_ids(&mut ids, &index.entries, dimension.sort_order);

    ids.into_iter()
        .map(|id| {
            let entry = &index.entries[id];
            let key = entry.path[level].clone();
            PivotNode {
                dimension: dimension.name.clone(),
                label: key.clone().unwrap_or_else(|| definition.null_label.clone()),
                key,
                depth: level,
                path: entry.path.clone(),
                values: entry.values.clone(),
                children: build_tree_level(definition, levels, level + 1, &entry.path),
            }
        })
        .collect()
}

/// Stable sort, so ties keep their first-seen order.
fn sort_entry_ids(ids: &mut [usize], entries: &[LevelEntry], sort_order: SortOrder) {
    match sort_order {
        SortOrder::Ascending => {
            ids.sort_by(|&a, &b| compare_values(&entries[a].sort_value, &entries[b].sort_value));
        }
        SortOrder::Descending => {
            ids.sort_by(|&a, &b| compare_values(&entries[b].sort_value, &entries[a].sort_value));
        }
        SortOrder::DataSourceOrder => {
            // Keep original order (order of first appearance)
        }
    }
}

/// Compares two dimension values for sorting.
/// Nulls first, then numbers (including numeric text) by value, then text.
pub fn compare_values(a: &CellValue, b: &CellValue) -> Ordering {
    match (sort_class(a), sort_class(b)) {
        (SortClass::Null, SortClass::Null) => Ordering::Equal,
        (SortClass::Null, _) => Ordering::Less,
        (_, SortClass::Null) => Ordering::Greater,

        (SortClass::Number(na), SortClass::Number(nb)) => {
            na.partial_cmp(&nb).unwrap_or(Ordering::Equal)
        }
        (SortClass::Number(_), _) => Ordering::Less,
        (_, SortClass::Number(_)) => Ordering::Greater,

        (SortClass::Text(ta), SortClass::Text(tb)) => ta.cmp(tb),
    }
}

enum SortClass<'a> {
    Null,
    Number(f64),
    Text(&'a str),
}

fn sort_class(value: &CellValue) -> SortClass<'_> {
    match value {
        CellValue::Null => SortClass::Null,
        CellValue::Number(n) => SortClass::Number(*n),
        // Only text that is entirely a number sorts numerically
        CellValue::Text(s) => match s.trim().parse::<f64>() {
            Ok(n) if n.is_finite() => SortClass::Number(n),
            _ => SortClass::Text(s),
        },
    }
}

fn count_orphans(levels: &[LevelIndex]) -> usize {
    levels
        .windows(2)
        .map(|pair| {
            let parents: FxHashSet<&GroupPath> = pair[0].entries.iter().map(|e| &e.path).collect();
            pair[1]
                .by_parent
                .iter()
                .filter(|(parent, _)| !parents.contains(*parent))
                .map(|(_, ids)| ids.len())
                .sum::<usize>()
        })
        .sum()
}

// ============================================================================
// FLATTENING
// ============================================================================

/// Flattens the tree in pre-order (parent before its children).
pub fn flatten(tree: &[PivotNode]) -> Vec<FlatPivotRow> {
    let mut items = Vec::new();
    flatten_nodes(tree, &mut items, -1);
    items
}

fn flatten_nodes(nodes: &[PivotNode], items: &mut Vec<FlatPivotRow>, parent_index: i32) {
    for node in nodes {
        let index = items.len() as i32;
        items.push(FlatPivotRow {
            label: node.label.clone(),
            depth: node.depth,
            path: node.path.clone(),
            values: node.values.clone(),
            has_children: !node.children.is_empty(),
            parent_index,
        });
        flatten_nodes(&node.children, items, index);
    }
}
