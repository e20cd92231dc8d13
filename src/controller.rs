use std::rc::Rc;
use std::time::Instant;

use tracing::{debug, trace};

use crate::scope::{Collection, Scope};
use crate::table::{self, Row, SortDirection};

/// Keeps `display_rows` of a scope in sync with its rows, filters and sort.
///
/// Creating the controller registers one watcher each on `filters`,
/// `headers` and `rows`. Any transition on those recomputes the displayed
/// rows as `sort(filter(rows))`.
pub struct TableController {
    scope: Rc<Scope>,
}

impl TableController {
    pub fn new(scope: Rc<Scope>) -> Self {
        scope.watch_collection(Collection::Filters, |scope| Self::refresh_scope(scope));
        scope.watch_collection(Collection::Headers, |scope| {
            Self::prune_to_headers(scope);
            Self::refresh_scope(scope);
        });
        scope.watch_collection(Collection::Rows, |scope| {
            let rows = scope.read(|s| s.rows.clone());
            Self::set_display_rows(scope, rows);
            Self::refresh_scope(scope);
        });
        Self { scope }
    }

    pub fn scope(&self) -> &Rc<Scope> {
        &self.scope
    }

    /// Apply the scope's current filters to `rows`.
    pub fn filter_rows(&self, rows: &[Row]) -> Vec<Row> {
        self.scope.read(|s| table::filter_rows(rows, &s.filters))
    }

    /// Sort `rows` by the scope's current sort column and direction.
    pub fn sort_rows(&self, rows: &[Row]) -> Vec<Row> {
        self.scope.read(|s| {
            table::sort_rows(rows, s.sort_column.as_deref(), s.sort_direction)
        })
    }

    /// Show exactly `rows`, without filtering or sorting.
    pub fn update_rows(&self, rows: Vec<Row>) {
        Self::set_display_rows(&self.scope, rows);
    }

    pub fn refresh(&self) {
        Self::refresh_scope(&self.scope);
    }

    /// Cycle the sort on `key`: ascending, descending, unsorted.
    pub fn toggle_sort(&self, key: &str) {
        let changed = self.scope.update(|s| {
            if !s.enable_sort {
                return false;
            }
            if s.sort_column.as_deref() != Some(key) {
                s.sort_column = Some(key.to_string());
                s.sort_direction = Some(SortDirection::Ascending);
            } else if s.sort_direction == Some(SortDirection::Ascending) {
                s.sort_direction = Some(SortDirection::Descending);
            } else {
                s.sort_column = None;
                s.sort_direction = None;
            }
            true
        });
        if changed {
            self.refresh();
        }
    }

    /// Sort by `key` in the given direction, if sorting is enabled.
    pub fn set_sort(&self, key: &str, direction: SortDirection) {
        let changed = self.scope.update(|s| {
            if s.enable_sort {
                s.sort_column = Some(key.to_string());
                s.sort_direction = Some(direction);
            }
            s.enable_sort
        });
        if changed {
            self.refresh();
        }
    }

    /// Width of each header's column: the widest of the header name and the
    /// displayed texts under it, counted in characters.
    pub fn column_widths(&self) -> Vec<usize> {
        self.scope.read(|s| {
            s.headers
                .iter()
                .map(|header| {
                    s.display_rows
                        .iter()
                        .filter_map(|row| row.text(header))
                        .map(|text| text.chars().count())
                        .fold(header.chars().count(), usize::max)
                })
                .collect()
        })
    }

    fn set_display_rows(scope: &Scope, rows: Vec<Row>) {
        scope.update(|s| s.display_rows = rows);
    }

    fn refresh_scope(scope: &Scope) {
        let start_time = Instant::now();
        let displayed = scope.read(|s| {
            let filtered = table::filter_rows(&s.rows, &s.filters);
            table::sort_rows(&filtered, s.sort_column.as_deref(), s.sort_direction)
        });
        trace!(
            "Displaying {} rows in {}us",
            displayed.len(),
            start_time.elapsed().as_micros()
        );
        Self::set_display_rows(scope, displayed);
    }

    // Sorting and filtering on columns that went away makes no sense anymore.
    fn prune_to_headers(scope: &Scope) {
        scope.update(|s| {
            let headers = &s.headers;
            if let Some(column) = s.sort_column.as_deref()
                && !headers.iter().any(|h| h == column)
            {
                debug!("Sort column {column} is gone, clearing sort");
                s.sort_column = None;
                s.sort_direction = None;
            }
            s.filters.retain_keys(|k| headers.iter().any(|h| h == k));
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::TableState;
    use crate::table::tests::test_rows;
    use crate::table::FilterSet;

    fn setup() -> TableController {
        TableController::new(Scope::new(TableState::default()))
    }

    fn column<'a>(rows: &'a [Row], key: &str) -> Vec<&'a str> {
        rows.iter().map(|r| r.text(key).unwrap_or("-")).collect()
    }

    #[test]
    fn reacts_to_filters_headers_and_rows() {
        let controller = setup();
        let scope = controller.scope();
        assert_eq!(scope.watchers(Collection::Filters), 1);
        assert_eq!(scope.watchers(Collection::Headers), 1);
        assert_eq!(scope.watchers(Collection::Rows), 1);
    }

    #[test]
    fn filters_results_based_on_filter_input() {
        let controller = setup();
        let rows = test_rows();

        assert_eq!(controller.filter_rows(&rows).len(), 3);
        controller.scope().update(|s| s.filters.set("col1", "row1"));
        assert_eq!(controller.filter_rows(&rows).len(), 1);
        controller.scope().update(|s| s.filters.set("col1", "match"));
        assert_eq!(controller.filter_rows(&rows).len(), 2);
    }

    #[test]
    fn sets_rows_on_scope_when_rows_change() {
        let controller = setup();
        controller.scope().update(|s| s.display_rows = vec![Row::default()]);

        let rows = test_rows();
        controller.update_rows(rows.clone());
        let displayed = controller.scope().read(|s| s.display_rows.clone());
        assert_eq!(displayed.len(), 3);
        assert_eq!(displayed, rows);
    }

    #[test]
    fn sorts_rows_by_scope_sort_spec() {
        let controller = setup();
        let rows = test_rows();

        controller.scope().update(|s| {
            s.sort_column = Some("col1".into());
            s.sort_direction = Some(SortDirection::Ascending);
        });
        assert_eq!(
            column(&controller.sort_rows(&rows), "col1"),
            vec!["row1 col1 match", "row2 col1 match", "row3 col1"]
        );

        controller
            .scope()
            .update(|s| s.sort_direction = Some(SortDirection::Descending));
        assert_eq!(
            column(&controller.sort_rows(&rows), "col1"),
            vec!["row3 col1", "row2 col1 match", "row1 col1 match"]
        );

        controller.scope().update(|s| s.sort_column = Some("col2".into()));
        assert_eq!(
            column(&controller.sort_rows(&rows), "col2"),
            vec!["ghi", "def", "abc"]
        );
    }

    #[test]
    fn row_and_filter_transitions_recompute_display() {
        let controller = setup();
        let scope = controller.scope();

        scope.apply(Collection::Rows, |s| s.rows = test_rows());
        assert_eq!(scope.read(|s| s.display_rows.len()), 3);

        scope.apply(Collection::Filters, |s| s.filters.set("col1", "match"));
        assert_eq!(
            scope.read(|s| column(&s.display_rows, "col1").join("|")),
            "row1 col1 match|row2 col1 match"
        );

        controller.set_sort("col2", SortDirection::Ascending);
        assert_eq!(
            scope.read(|s| column(&s.display_rows, "col2").join("|")),
            "abc|def"
        );

        // New rows arrive, filter and sort still apply
        scope.apply(Collection::Rows, |s| {
            s.rows.push(Row::from_iter([("col1", "row4 match"), ("col2", "aaa")]))
        });
        assert_eq!(
            scope.read(|s| column(&s.display_rows, "col2").join("|")),
            "aaa|abc|def"
        );

        scope.apply(Collection::Filters, |s| s.filters = FilterSet::new());
        assert_eq!(scope.read(|s| s.display_rows.len()), 4);
    }

    #[test]
    fn toggle_sort_cycles_through_directions() {
        let controller = setup();
        let scope = controller.scope();
        scope.apply(Collection::Rows, |s| s.rows = test_rows());

        controller.toggle_sort("col2");
        assert_eq!(scope.read(|s| column(&s.display_rows, "col2").join("|")), "abc|def|ghi");
        controller.toggle_sort("col2");
        assert_eq!(scope.read(|s| column(&s.display_rows, "col2").join("|")), "ghi|def|abc");
        controller.toggle_sort("col2");
        assert_eq!(scope.read(|s| column(&s.display_rows, "col2").join("|")), "def|abc|ghi");
        assert_eq!(scope.read(|s| s.sort_column.clone()), None);

        // Switching column restarts at ascending
        controller.toggle_sort("col2");
        controller.toggle_sort("col3");
        assert_eq!(
            scope.read(|s| (s.sort_column.clone(), s.sort_direction)),
            (Some("col3".to_string()), Some(SortDirection::Ascending))
        );
    }

    #[test]
    fn sort_changes_refresh_without_notifying_watchers() {
        let controller = setup();
        let scope = controller.scope();
        scope.apply(Collection::Rows, |s| s.rows = test_rows());

        let fired = Rc::new(std::cell::Cell::new(0));
        for collection in [Collection::Filters, Collection::Headers, Collection::Rows] {
            let f = Rc::clone(&fired);
            scope.watch_collection(collection, move |_| f.set(f.get() + 1));
        }

        controller.set_sort("col2", SortDirection::Descending);
        assert_eq!(scope.read(|s| column(&s.display_rows, "col2").join("|")), "ghi|def|abc");
        controller.toggle_sort("col2");
        assert_eq!(scope.read(|s| column(&s.display_rows, "col2").join("|")), "def|abc|ghi");
        assert_eq!(fired.get(), 0);
    }

    #[test]
    fn toggle_sort_respects_enable_sort() {
        let controller = setup();
        let scope = controller.scope();
        scope.update(|s| s.enable_sort = false);
        scope.apply(Collection::Rows, |s| s.rows = test_rows());

        controller.toggle_sort("col2");
        controller.set_sort("col2", SortDirection::Descending);
        assert_eq!(scope.read(|s| s.sort_column.clone()), None);
        assert_eq!(scope.read(|s| column(&s.display_rows, "col2").join("|")), "def|abc|ghi");
    }

    #[test]
    fn header_change_drops_stale_sort_and_filters() {
        let controller = setup();
        let scope = controller.scope();
        scope.apply(Collection::Rows, |s| s.rows = test_rows());
        scope.apply(Collection::Headers, |s| {
            s.headers = vec!["col1".into(), "col2".into(), "col3".into()]
        });
        controller.set_sort("col3", SortDirection::Descending);
        scope.apply(Collection::Filters, |s| {
            s.filters.set("col3", "row");
            s.filters.set("col1", "match");
        });
        assert_eq!(scope.read(|s| s.display_rows.len()), 2);

        scope.apply(Collection::Headers, |s| s.headers = vec!["col1".into(), "col2".into()]);
        scope.read(|s| {
            assert_eq!(s.sort_column, None);
            assert_eq!(s.filters.get("col3"), None);
            assert_eq!(s.filters.get("col1"), Some("match"));
            assert_eq!(column(&s.display_rows, "col1"), vec!["row1 col1 match", "row2 col1 match"]);
        });
    }

    #[test]
    fn column_widths_follow_widest_displayed_text() {
        let controller = setup();
        let scope = controller.scope();
        scope.apply(Collection::Rows, |s| s.rows = test_rows());
        scope.apply(Collection::Headers, |s| {
            s.headers = vec!["col1".into(), "col2".into(), "a long header".into()]
        });
        assert_eq!(controller.column_widths(), vec![15, 4, 13]);

        scope.apply(Collection::Filters, |s| s.filters.set("col1", "row3"));
        assert_eq!(controller.column_widths(), vec![9, 4, 13]);
    }
}
