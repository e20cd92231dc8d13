use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A single value of a row. Only `text` takes part in filtering and sorting.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cell {
    pub text: String,
    pub class: Option<String>, // Rendering hint, e.g. "null" for missing values
}

impl Cell {
    pub fn new(text: impl Into<String>) -> Self {
        Cell {
            text: text.into(),
            class: None,
        }
    }

    pub fn with_class(text: impl Into<String>, class: impl Into<String>) -> Self {
        Cell {
            text: text.into(),
            class: Some(class.into()),
        }
    }
}

impl From<&str> for Cell {
    fn from(text: &str) -> Self {
        Cell::new(text)
    }
}

impl From<String> for Cell {
    fn from(text: String) -> Self {
        Cell::new(text)
    }
}

/// One table line: column key to cell.
///
/// Rows are immutable snapshots. The cells sit behind an `Arc` so the
/// filtered and sorted views can hold the same rows as the input without
/// copying their content.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    cells: Arc<HashMap<String, Cell>>,
}

impl Row {
    pub fn new(cells: HashMap<String, Cell>) -> Self {
        Row {
            cells: Arc::new(cells),
        }
    }

    pub fn cell(&self, key: &str) -> Option<&Cell> {
        self.cells.get(key)
    }

    /// Text of the cell under `key`, `None` if the row has no such column.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.cells.get(key).map(|c| c.text.as_str())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.cells.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for Row
where
    K: Into<String>,
    V: Into<Cell>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Row::new(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Per column substring criteria. Empty values are kept but match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSet {
    filters: HashMap<String, String>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.filters.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.filters.get(key).map(|v| v.as_str())
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.filters.remove(key)
    }

    pub fn clear(&mut self) {
        self.filters.clear();
    }

    /// Drop every filter whose key does not satisfy `keep`.
    pub fn retain_keys(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.filters.retain(|k, _| keep(k));
    }

    /// Filters that actually constrain rows, i.e. with a non-empty value.
    pub fn active(&self) -> impl Iterator<Item = (&str, &str)> {
        self.filters
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_active(&self) -> bool {
        self.active().next().is_some()
    }

    pub fn matches(&self, row: &Row) -> bool {
        self.active()
            .all(|(key, term)| row.text(key).is_some_and(|text| text.contains(term)))
    }
}

impl<K, V> FromIterator<(K, V)> for FilterSet
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        FilterSet {
            filters: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "asc",
            SortDirection::Descending => "desc",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub column: String,
    pub direction: SortDirection,
}

/// Keep the rows matching every active filter, in their input order.
///
/// A row without a cell for a filtered column never matches.
pub fn filter_rows(rows: &[Row], filters: &FilterSet) -> Vec<Row> {
    if !filters.is_active() {
        return rows.to_vec();
    }
    rows.iter()
        .filter(|row| filters.matches(row))
        .cloned()
        .collect()
}

/// Order rows by the text of `column`. Returns a new vector.
///
/// The sort is stable in both directions. Rows lacking the column go
/// after all others, in their input order. Without a column or a
/// direction the rows are returned as they are.
pub fn sort_rows(rows: &[Row], column: Option<&str>, direction: Option<SortDirection>) -> Vec<Row> {
    let mut sorted = rows.to_vec();
    let (Some(column), Some(direction)) = (column, direction) else {
        return sorted;
    };

    sorted.sort_by(|a, b| match (a.text(column), b.text(column)) {
        (Some(a), Some(b)) => direction.apply(a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    sorted
}
