//! Record ordering.
//!
//! Sorting works on positions into a dataset rather than on the records
//! themselves, the same way views keep an index mapping into their parent.
//!
//! Ordering rules:
//!
//! - nulls go last in both directions
//! - when every non-null value of the column reads as a number the column
//!   compares numerically, otherwise it compares the lower-cased string forms
//! - the sort is stable, so equal keys keep their previous relative order

use crate::table::Dataset;
use crate::value::FieldValue;
use log::debug;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::time::Instant;

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Ascending order (smallest first)
    #[default]
    #[serde(alias = "asc")]
    Ascending,
    /// Descending order (largest first)
    #[serde(alias = "desc")]
    Descending,
}

impl SortOrder {
    pub fn reversed(self) -> Self {
        match self {
            SortOrder::Ascending => SortOrder::Descending,
            SortOrder::Descending => SortOrder::Ascending,
        }
    }
}

/// The active sort of a view
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SortKey {
    pub column: String,
    pub order: SortOrder,
}

impl SortKey {
    pub fn ascending(column: impl Into<String>) -> Self {
        SortKey {
            column: column.into(),
            order: SortOrder::Ascending,
        }
    }

    pub fn descending(column: impl Into<String>) -> Self {
        SortKey {
            column: column.into(),
            order: SortOrder::Descending,
        }
    }

    /// The key that results from a header click on `column`.
    ///
    /// Clicking the sorted column again flips its direction; any other column
    /// starts ascending.
    pub fn toggle(current: Option<&SortKey>, column: &str) -> SortKey {
        match current {
            Some(key) if key.column == column => SortKey {
                column: key.column.clone(),
                order: key.order.reversed(),
            },
            _ => SortKey::ascending(column),
        }
    }
}

/// Comparable form of one cell.
#[derive(Debug, Clone, PartialEq)]
enum SortValue {
    Number(f64),
    Text(String),
    Null,
}

/// Extract comparable values for `column`, deciding once for the whole
/// column whether it is numeric.
fn sort_values(dataset: &Dataset, col_idx: usize, indices: &[usize]) -> Vec<SortValue> {
    let cells: Vec<Option<&FieldValue>> = indices
        .iter()
        .map(|&row| {
            dataset
                .get_record(row)
                .and_then(|r| r.get(col_idx))
                .filter(|v| !v.is_null())
        })
        .collect();

    let numeric = cells.iter().flatten().all(|v| v.parse_number().is_some());

    cells
        .into_iter()
        .map(|cell| match cell {
            None => SortValue::Null,
            Some(value) if numeric => value
                .parse_number()
                .map(SortValue::Number)
                .unwrap_or(SortValue::Null),
            Some(value) => SortValue::Text(value.display_text().to_lowercase()),
        })
        .collect()
}

fn compare(a: &SortValue, b: &SortValue, order: SortOrder) -> Ordering {
    let base = match (a, b) {
        (SortValue::Null, SortValue::Null) => return Ordering::Equal,
        (SortValue::Null, _) => return Ordering::Greater,
        (_, SortValue::Null) => return Ordering::Less,
        (SortValue::Number(x), SortValue::Number(y)) => x.total_cmp(y),
        (SortValue::Text(x), SortValue::Text(y)) => x.cmp(y),
        // A column is either all numbers or all text
        (SortValue::Number(_), SortValue::Text(_)) => Ordering::Less,
        (SortValue::Text(_), SortValue::Number(_)) => Ordering::Greater,
    };
    match order {
        SortOrder::Ascending => base,
        SortOrder::Descending => base.reverse(),
    }
}

/// Reorder `indices` (positions into `dataset`) by `key`.
///
/// An unknown column leaves the order untouched.
pub fn sort_indices(dataset: &Dataset, indices: &mut Vec<usize>, key: &SortKey) {
    let Some(col_idx) = dataset.schema().get_column_index(&key.column) else {
        return;
    };
    let start_time = Instant::now();

    let values = sort_values(dataset, col_idx, indices);
    let mut keyed: Vec<(SortValue, usize)> = values.into_iter().zip(indices.iter().copied()).collect();
    keyed.sort_by(|(a, _), (b, _)| compare(a, b, key.order));

    *indices = keyed.into_iter().map(|(_, idx)| idx).collect();
    debug!(
        "Sorted {} records by '{}' {:?} in {}ms",
        indices.len(),
        key.column,
        key.order,
        start_time.elapsed().as_millis()
    );
}

/// Positions of `dataset` in sorted order.
pub fn sorted(dataset: &Dataset, key: &SortKey) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..dataset.len()).collect();
    sort_indices(dataset, &mut indices, key);
    indices
}
