use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::trace;

use crate::table::{FilterSet, Row, SortDirection, SortSpec};

/// The collections a controller can watch for changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Filters,
    Headers,
    Rows,
}

impl Collection {
    pub fn name(&self) -> &'static str {
        match self {
            Collection::Filters => "filters",
            Collection::Headers => "headers",
            Collection::Rows => "rows",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Everything the table shell and the controller share.
#[derive(Debug, Clone)]
pub struct TableState {
    pub filters: FilterSet,
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
    pub sort_column: Option<String>,
    pub sort_direction: Option<SortDirection>,
    pub enable_sort: bool,
    pub display_headers: bool,
    pub display_rows: Vec<Row>, // Written by the controller only
}

impl Default for TableState {
    fn default() -> Self {
        TableState {
            filters: FilterSet::new(),
            headers: Vec::new(),
            rows: Vec::new(),
            sort_column: None,
            sort_direction: None,
            enable_sort: true,
            display_headers: true,
            display_rows: Vec::new(),
        }
    }
}

impl TableState {
    /// The active sort, if both column and direction are set.
    pub fn sort_spec(&self) -> Option<SortSpec> {
        let column = self.sort_column.clone()?;
        let direction = self.sort_direction?;
        Some(SortSpec { column, direction })
    }
}

pub type WatchCallback = Rc<dyn Fn(&Scope)>;

/// Shared table state plus the watchers registered on its collections.
///
/// State transitions go through [`Scope::apply`], which runs every watcher
/// of the touched collection synchronously once the mutation is done. No
/// borrow of the state is held while a watcher runs, so watchers can read
/// and update the scope themselves.
#[derive(Default)]
pub struct Scope {
    state: RefCell<TableState>,
    watchers: RefCell<Vec<(Collection, WatchCallback)>>,
}

impl Scope {
    pub fn new(state: TableState) -> Rc<Self> {
        Rc::new(Scope {
            state: RefCell::new(state),
            watchers: RefCell::new(Vec::new()),
        })
    }

    pub fn watch_collection(&self, collection: Collection, callback: impl Fn(&Scope) + 'static) {
        trace!("Registering watcher on {collection}");
        self.watchers
            .borrow_mut()
            .push((collection, Rc::new(callback)));
    }

    pub fn watchers(&self, collection: Collection) -> usize {
        self.watchers
            .borrow()
            .iter()
            .filter(|(c, _)| *c == collection)
            .count()
    }

    pub fn read<R>(&self, f: impl FnOnce(&TableState) -> R) -> R {
        f(&self.state.borrow())
    }

    /// Mutate the state without notifying anybody.
    pub fn update<R>(&self, f: impl FnOnce(&mut TableState) -> R) -> R {
        f(&mut self.state.borrow_mut())
    }

    /// Mutate the state and notify the watchers of `collection`.
    pub fn apply<R>(&self, collection: Collection, f: impl FnOnce(&mut TableState) -> R) -> R {
        let result = self.update(f);
        self.notify(collection);
        result
    }

    pub fn notify(&self, collection: Collection) {
        // Collect first, a watcher may register further watchers.
        let callbacks: Vec<WatchCallback> = self
            .watchers
            .borrow()
            .iter()
            .filter(|(c, _)| *c == collection)
            .map(|(_, cb)| Rc::clone(cb))
            .collect();
        trace!("{collection} changed, notifying {} watchers", callbacks.len());
        for callback in callbacks {
            callback(self);
        }
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("state", &self.state.borrow())
            .field("watchers", &self.watchers.borrow().len())
            .finish()
    }
}
