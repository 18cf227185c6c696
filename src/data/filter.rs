use std::collections::BTreeMap;

use log::debug;
use serde::Serialize;

use super::derive::ALL;
use super::model::{DeliveryRecord, DerivedTable, Dimension};

// ---------------------------------------------------------------------------
// Filter predicate: which value is selected per dimension
// ---------------------------------------------------------------------------

/// A single-select input: either `All` (no constraint) or one exact value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Selection {
    #[default]
    All,
    Value(String),
}

impl Selection {
    /// `"All"` maps to [`Selection::All`], anything else to an exact match.
    pub fn parse(raw: &str) -> Self {
        if raw == ALL {
            Selection::All
        } else {
            Selection::Value(raw.to_string())
        }
    }

    pub fn matches(&self, value: Option<&str>) -> bool {
        match self {
            Selection::All => true,
            Selection::Value(wanted) => value == Some(wanted.as_str()),
        }
    }
}

impl Serialize for Selection {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Selection::All => serializer.serialize_str(ALL),
            Selection::Value(v) => serializer.serialize_str(v),
        }
    }
}

/// Per-dimension selection. A dimension absent from the map is `All`.
pub type FilterSelection = BTreeMap<Dimension, Selection>;

/// Drop `All` entries so equal selections compare (and hash) equal.
pub fn normalized(selection: &FilterSelection) -> FilterSelection {
    selection
        .iter()
        .filter(|(_, sel)| **sel != Selection::All)
        .map(|(dim, sel)| (*dim, sel.clone()))
        .collect()
}

// ---------------------------------------------------------------------------
// Filtered view
// ---------------------------------------------------------------------------

/// A row subset of a [`DerivedTable`]. The table itself is never copied.
#[derive(Debug, Clone, Copy)]
pub struct FilteredView<'a> {
    pub table: &'a DerivedTable,
    pub indices: &'a [usize],
}

impl<'a> FilteredView<'a> {
    pub fn new(table: &'a DerivedTable, indices: &'a [usize]) -> Self {
        FilteredView { table, indices }
    }

    pub fn rows(&self) -> impl Iterator<Item = &'a DeliveryRecord> + 'a {
        let records: &'a [DeliveryRecord] = &self.table.records;
        let indices: &'a [usize] = self.indices;
        indices.iter().map(move |&i| &records[i])
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Return indices of rows that pass every active selection (logical AND).
pub fn filtered_indices(table: &DerivedTable, selection: &FilterSelection) -> Vec<usize> {
    let active = normalized(selection);
    let indices: Vec<usize> = table
        .records
        .iter()
        .enumerate()
        .filter(|(_, rec)| active.iter().all(|(dim, sel)| sel.matches(rec.dimension(*dim))))
        .map(|(i, _)| i)
        .collect();
    debug!(
        "filter {:?}: {} of {} rows",
        active,
        indices.len(),
        table.len()
    );
    indices
}

/// Indices of the rows of `table` not present in `indices` (sorted input).
pub fn complement(table: &DerivedTable, indices: &[usize]) -> Vec<usize> {
    let mut kept = indices.iter().peekable();
    (0..table.len())
        .filter(|i| {
            if kept.peek() == Some(&i) {
                kept.next();
                false
            } else {
                true
            }
        })
        .collect()
}
