//! A table view that keeps a displayed row set in sync with its rows,
//! per column substring filters and a single sort column.
//!
//! [`TableController`] is the core: it watches the `filters`, `headers` and
//! `rows` collections of a [`Scope`] and rewrites `display_rows` on every
//! change. The remaining modules make up a terminal viewer around it.

pub mod controller;
pub mod domain;
pub mod events;
pub mod inputter;
pub mod loader;
pub mod model;
pub mod scope;
pub mod table;
pub mod ui;

pub use controller::TableController;
pub use scope::{Collection, Scope, TableState};
pub use table::{Cell, FilterSet, Row, SortDirection, SortSpec, filter_rows, sort_rows};
