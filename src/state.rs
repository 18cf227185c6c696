use std::num::NonZeroUsize;
use std::sync::Arc;

use log::debug;
use lru::LruCache;

use crate::data::filter::{filtered_indices, normalized, FilterSelection, FilteredView, Selection};
use crate::data::model::{DerivedTable, Dimension};
use crate::report::DashboardReport;

const VIEW_CACHE_CAPACITY: usize = 64;

// ---------------------------------------------------------------------------
// Session state
// ---------------------------------------------------------------------------

/// One user's interactive state over a shared, read-only derived table.
pub struct DashboardSession {
    table: Arc<DerivedTable>,

    /// Current per-dimension selections (normalized: no `All` entries).
    selection: FilterSelection,

    /// Indices of rows passing the current selection.
    visible_indices: Arc<Vec<usize>>,

    /// Previously computed views keyed by selection.
    view_cache: LruCache<FilterSelection, Arc<Vec<usize>>>,
}

impl DashboardSession {
    pub fn new(table: Arc<DerivedTable>) -> Self {
        let visible_indices = Arc::new((0..table.len()).collect());
        let capacity = NonZeroUsize::new(VIEW_CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN);
        Self {
            table,
            selection: FilterSelection::new(),
            visible_indices,
            view_cache: LruCache::new(capacity),
        }
    }

    pub fn table(&self) -> &DerivedTable {
        &self.table
    }

    pub fn selection(&self) -> &FilterSelection {
        &self.selection
    }

    pub fn selection_for(&self, dim: Dimension) -> &Selection {
        static ALL: Selection = Selection::All;
        self.selection.get(&dim).unwrap_or(&ALL)
    }

    /// The rows passing the current selection.
    pub fn view(&self) -> FilteredView<'_> {
        FilteredView::new(&self.table, &self.visible_indices)
    }

    /// Change a single dimension's selection and refilter.
    pub fn set_filter(&mut self, dim: Dimension, selection: Selection) {
        match selection {
            Selection::All => {
                self.selection.remove(&dim);
            }
            value => {
                self.selection.insert(dim, value);
            }
        }
        self.refilter();
    }

    /// Replace every selection at once.
    pub fn apply(&mut self, selection: &FilterSelection) {
        self.selection = normalized(selection);
        self.refilter();
    }

    /// Reset every dimension to `All`.
    pub fn clear_filters(&mut self) {
        self.selection.clear();
        self.refilter();
    }

    /// Snapshot of everything the presentation layer draws.
    pub fn report(&self) -> DashboardReport {
        DashboardReport::build(&self.view(), &self.selection)
    }

    /// Recompute `visible_indices` after a selection change.
    fn refilter(&mut self) {
        if let Some(cached) = self.view_cache.get(&self.selection) {
            debug!("view cache hit for {:?}", self.selection);
            self.visible_indices = Arc::clone(cached);
            return;
        }
        let indices = Arc::new(filtered_indices(&self.table, &self.selection));
        self.view_cache
            .put(self.selection.clone(), Arc::clone(&indices));
        self.visible_indices = indices;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::derive::derive;
    use crate::data::model::{CellValue, Row, Table};

    fn session() -> DashboardSession {
        let names = vec!["Weather".to_string(), "Delivery_Time".to_string()];
        let rows = [("Sunny", 10), ("Fog", 20), ("Sunny", 30)]
            .iter()
            .map(|(w, t)| {
                let mut row = Row::new();
                row.insert("Weather".into(), CellValue::String(w.to_string()));
                row.insert("Delivery_Time".into(), CellValue::Integer(*t));
                row
            })
            .collect();
        let table = derive(&Table::new(names, rows)).unwrap();
        DashboardSession::new(Arc::new(table))
    }

    #[test]
    fn starts_with_every_row_visible() {
        let s = session();
        assert_eq!(s.view().len(), 3);
        assert_eq!(s.selection_for(Dimension::Weather), &Selection::All);
    }

    #[test]
    fn set_and_clear_filters() {
        let mut s = session();
        s.set_filter(Dimension::Weather, Selection::parse("Sunny"));
        assert_eq!(s.view().indices, &[0, 2]);
        s.set_filter(Dimension::Weather, Selection::All);
        assert_eq!(s.view().len(), 3);
        s.set_filter(Dimension::Weather, Selection::parse("Fog"));
        s.clear_filters();
        assert!(s.selection().is_empty());
        assert_eq!(s.view().len(), 3);
    }

    #[test]
    fn repeated_selection_reuses_cached_view() {
        let mut s = session();
        s.set_filter(Dimension::Weather, Selection::parse("Sunny"));
        let first = Arc::clone(&s.visible_indices);
        s.clear_filters();
        s.set_filter(Dimension::Weather, Selection::parse("Sunny"));
        assert!(Arc::ptr_eq(&first, &s.visible_indices));
    }

    #[test]
    fn filters_never_move_the_threshold() {
        let mut s = session();
        let before = s.table().stats;
        s.set_filter(Dimension::Weather, Selection::parse("Fog"));
        assert_eq!(s.table().stats, before);
        assert_eq!(s.report().kpis.late_percentage, before.late_percentage);
    }
}
