use std::path::PathBuf;
use std::rc::Rc;
use std::time::Instant;

use arboard::Clipboard;
use ratatui::crossterm::event::KeyEvent;
use tracing::{debug, error, info, trace};

use crate::controller::TableController;
use crate::domain::{CMDMode, HELP_TEXT, Message, TVConfig, TVError};
use crate::inputter::{InputResult, Inputter};
use crate::loader::{self, TableData};
use crate::scope::{Collection, Scope, TableState};
use crate::table::{Cell, SortDirection, SortSpec};
use crate::ui::{BORDER_SIZE, COLUMN_WIDTH_MARGIN, STATUSLINE_HEIGHT, TABLE_HEADER_HEIGHT};

#[derive(Debug, PartialEq)]
pub enum Status {
    READY,
    QUITTING,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Modus {
    TABLE,
    POPUP,
    CMDINPUT,
}

/// Everything the ui needs to draw one frame.
#[derive(Debug, Default)]
pub struct UIData {
    pub name: String,
    pub headers: Vec<String>,
    pub widths: Vec<usize>,
    pub display_headers: bool,
    pub rows: Vec<Vec<Cell>>, // Visible window of display rows, visible columns only
    pub selected_row: usize,
    pub selected_column: usize,
    pub abs_selected_row: usize,
    pub nrows: usize,
    pub total_rows: usize,
    pub sort: Option<SortSpec>,
    pub filters: Vec<(String, String)>,
    pub show_popup: bool,
    pub popup_message: String,
    pub cmdinput: InputResult,
    pub active_cmdinput: bool,
    pub cmd_label: String,
    pub status_message: String,
}

pub struct Model {
    path: Option<PathBuf>,
    config: TVConfig,
    pub status: Status,
    modus: Modus,
    previous_modus: Modus,
    controller: TableController,
    cursor_row: usize,
    selected_column: usize, // Absolute header index
    offset_row: usize,
    offset_column: usize,
    ui_width: usize,
    ui_height: usize,
    input: Inputter,
    cmd_mode: Option<CMDMode>,
    last_input: InputResult,
    popup_message: String,
    status_message: String,
    widths: Vec<usize>, // Capped column widths, follow the display rows
    clipboard: Option<Clipboard>,
}

impl Model {
    pub fn init(config: &TVConfig, ui_width: usize, ui_height: usize) -> Self {
        let scope = Scope::new(TableState {
            display_headers: config.display_headers,
            enable_sort: config.enable_sort,
            ..TableState::default()
        });
        Self {
            path: None,
            config: config.clone(),
            status: Status::READY,
            modus: Modus::TABLE,
            previous_modus: Modus::TABLE,
            controller: TableController::new(scope),
            cursor_row: 0,
            selected_column: 0,
            offset_row: 0,
            offset_column: 0,
            ui_width,
            ui_height,
            input: Inputter::default(),
            cmd_mode: None,
            last_input: InputResult::default(),
            popup_message: String::new(),
            status_message: "Started mcttable!".to_string(),
            widths: Vec::new(),
            clipboard: None,
        }
    }

    pub fn scope(&self) -> &Rc<Scope> {
        self.controller.scope()
    }

    pub fn load_data_file(&mut self, path: PathBuf) -> Result<(), TVError> {
        let start_time = Instant::now();
        let data = loader::load_data_file(&path)?;
        self.path = Some(path);
        self.set_data(data);
        self.set_status_message(format!(
            "Loaded data in {}ms ...",
            start_time.elapsed().as_millis()
        ));
        Ok(())
    }

    /// Hand a fresh snapshot to the scope. Headers go first so a stale sort
    /// is dropped before the rows are recomputed.
    pub fn set_data(&mut self, data: TableData) {
        let scope = self.scope();
        let headers_changed = scope.read(|s| s.headers != data.headers);
        if headers_changed {
            scope.apply(Collection::Headers, |s| s.headers = data.headers);
        }
        scope.apply(Collection::Rows, |s| s.rows = data.rows);
        self.update_column_widths();
        self.clamp_cursor();
    }

    pub fn raw_keyevents(&self) -> bool {
        self.modus == Modus::CMDINPUT
    }

    pub fn quit(&mut self) {
        self.status = Status::QUITTING;
    }

    pub fn update(&mut self, message: Option<Message>) -> Result<(), TVError> {
        let Some(msg) = message else {
            return Ok(());
        };
        trace!("Update: Modus {:?}, Message {:?}", self.modus, msg);
        match self.modus {
            Modus::TABLE => match msg {
                Message::Quit => self.quit(),
                Message::MoveUp => self.move_selection_up(1),
                Message::MoveDown => self.move_selection_down(1),
                Message::MoveLeft => self.move_selection_left(),
                Message::MoveRight => self.move_selection_right(),
                Message::MovePageUp => self.move_selection_up(self.table_height()),
                Message::MovePageDown => self.move_selection_down(self.table_height()),
                Message::MoveBeginning => self.move_selection_up(usize::MAX),
                Message::MoveEnd => self.move_selection_down(usize::MAX),
                Message::Filter => self.enter_cmd_mode(CMDMode::FilterColumn),
                Message::ClearFilters => self.clear_filters(),
                Message::SortAscending => self.sort_current_column(SortDirection::Ascending),
                Message::SortDescending => self.sort_current_column(SortDirection::Descending),
                Message::ToggleSort => self.toggle_sort(),
                Message::ToggleHeaders => self.toggle_headers(),
                Message::Reload => self.reload(),
                Message::CopyRow => self.copy_row(),
                Message::Help => self.show_help(),
                Message::Resize(width, height) => self.ui_resize(width, height),
                _ => (),
            },
            Modus::POPUP => match msg {
                Message::Quit => self.quit(),
                Message::Exit | Message::Help => self.exit(),
                Message::Resize(width, height) => self.ui_resize(width, height),
                _ => (),
            },
            Modus::CMDINPUT => match msg {
                Message::RawKey(key) => self.raw_input(key),
                Message::Resize(width, height) => self.ui_resize(width, height),
                _ => (),
            },
        }
        self.clamp_cursor();
        Ok(())
    }

    // -------------------- Control handling functions ---------------------- //

    fn exit(&mut self) {
        if self.modus == Modus::POPUP {
            trace!("Close popup ...");
            self.modus = self.previous_modus;
            self.previous_modus = Modus::POPUP;
        }
    }

    fn show_help(&mut self) {
        self.previous_modus = self.modus;
        self.modus = Modus::POPUP;
        self.popup_message = HELP_TEXT.to_string();
    }

    fn ui_resize(&mut self, width: usize, height: usize) {
        trace!(
            "UI was resized! w:{}->{}, h:{}->{}",
            self.ui_width, width, self.ui_height, height
        );
        self.ui_width = width;
        self.ui_height = height;
    }

    fn enter_cmd_mode(&mut self, mode: CMDMode) {
        let Some(key) = self.current_column() else {
            self.set_status_message("No column to filter!");
            return;
        };
        trace!("Entering command mode {mode:?} for {key}");
        let current = self
            .scope()
            .read(|s| s.filters.get(&key).unwrap_or_default().to_string());

        self.previous_modus = self.modus;
        self.modus = Modus::CMDINPUT;
        self.cmd_mode = Some(mode);
        self.input.set(&current);
        self.last_input = self.input.get();
    }

    fn raw_input(&mut self, key: KeyEvent) {
        self.last_input = self.input.read(key);
        if self.last_input.finished {
            self.handle_cmd_input();
        }
    }

    fn handle_cmd_input(&mut self) {
        trace!("Handle cmd input {}", self.last_input.input);
        self.modus = self.previous_modus;
        self.previous_modus = Modus::CMDINPUT;

        if !self.last_input.canceled {
            let term = self.last_input.input.clone();
            match (self.cmd_mode, self.current_column()) {
                (Some(CMDMode::FilterColumn), Some(key)) => self.filter(&key, &term),
                (mode, key) => info!("Nothing to do for {mode:?} on {key:?}"),
            }
        }
        self.cmd_mode = None;
        self.input.clear();
        self.last_input = self.input.get();
    }

    fn filter(&mut self, key: &str, term: &str) {
        trace!("Filter {key} for \"{term}\" ...");
        let start_time = Instant::now();
        self.scope().apply(Collection::Filters, |s| {
            if term.is_empty() {
                s.filters.remove(key);
            } else {
                s.filters.set(key, term);
            }
        });
        self.update_column_widths();
        let (shown, total) = self.scope().read(|s| (s.display_rows.len(), s.rows.len()));
        debug!(
            "Filter kept {shown}/{total} rows in {}ms",
            start_time.elapsed().as_millis()
        );
        self.cursor_row = 0;
        self.offset_row = 0;
        self.set_status_message(format!("Showing {shown} of {total} rows"));
    }

    fn clear_filters(&mut self) {
        self.scope().apply(Collection::Filters, |s| s.filters.clear());
        self.update_column_widths();
        self.set_status_message("Cleared filters");
    }

    fn sort_current_column(&mut self, direction: SortDirection) {
        if let Some(key) = self.current_column() {
            self.controller.set_sort(&key, direction);
            self.report_sort();
        }
    }

    fn toggle_sort(&mut self) {
        if let Some(key) = self.current_column() {
            self.controller.toggle_sort(&key);
            self.report_sort();
        }
    }

    fn report_sort(&mut self) {
        let (sort, enabled) = self.scope().read(|s| (s.sort_spec(), s.enable_sort));
        let message = match sort {
            _ if !enabled => "Sorting is disabled".to_string(),
            Some(SortSpec { column, direction }) => format!("Sorted by {column} {direction}"),
            None => "Unsorted".to_string(),
        };
        self.set_status_message(message);
    }

    fn toggle_headers(&mut self) {
        self.scope().update(|s| s.display_headers = !s.display_headers);
    }

    // A failed reload keeps the current data on screen.
    fn reload(&mut self) {
        let Some(path) = self.path.clone() else {
            self.set_status_message("Nothing to reload");
            return;
        };
        info!("Reloading {:?}", path);
        match loader::load_data_file(&path) {
            Ok(data) => {
                self.set_data(data);
                let rows = self.scope().read(|s| s.rows.len());
                self.set_status_message(format!("Reloaded {rows} rows"));
            }
            Err(e) => {
                error!("Reloading {path:?} failed: {e}");
                self.set_status_message(format!("Reload failed: {e}"));
            }
        }
    }

    fn copy_row(&mut self) {
        let Some(text) = self.selected_row_text() else {
            return;
        };
        let result = self
            .clipboard()
            .and_then(|clipboard| clipboard.set_text(text).map_err(TVError::from));
        match result {
            Ok(()) => self.set_status_message("Copied row to clipboard"),
            Err(e) => {
                error!("Copying row failed: {e}");
                self.set_status_message(e.to_string());
            }
        }
    }

    // Opened on first use, a terminal without a clipboard only fails the copy.
    fn clipboard(&mut self) -> Result<&mut Clipboard, TVError> {
        let clipboard = match self.clipboard.take() {
            Some(clipboard) => clipboard,
            None => Clipboard::new()?,
        };
        Ok(self.clipboard.insert(clipboard))
    }

    fn selected_row_text(&self) -> Option<String> {
        self.scope().read(|s| {
            s.display_rows.get(self.offset_row + self.cursor_row).map(|row| {
                s.headers
                    .iter()
                    .map(|h| row.text(h).unwrap_or_default())
                    .collect::<Vec<_>>()
                    .join("\t")
            })
        })
    }

    // -------------------- Selection ---------------------- //

    fn move_selection_up(&mut self, size: usize) {
        let abs = (self.offset_row + self.cursor_row).saturating_sub(size);
        self.select_row(abs);
    }

    fn move_selection_down(&mut self, size: usize) {
        let nrows = self.scope().read(|s| s.display_rows.len());
        let abs = (self.offset_row + self.cursor_row)
            .saturating_add(size)
            .min(nrows.saturating_sub(1));
        self.select_row(abs);
    }

    fn select_row(&mut self, row: usize) {
        let height = self.table_height().max(1);
        if row < self.offset_row {
            self.offset_row = row;
        } else if row >= self.offset_row + height {
            self.offset_row = row + 1 - height;
        }
        self.cursor_row = row - self.offset_row;
    }

    fn move_selection_left(&mut self) {
        self.select_column(self.selected_column.saturating_sub(1));
    }

    fn move_selection_right(&mut self) {
        let ncolumns = self.scope().read(|s| s.headers.len());
        if self.selected_column + 1 < ncolumns {
            self.select_column(self.selected_column + 1);
        }
    }

    // Scroll horizontally until `column` is at least partially visible, that
    // is until the columns in front of it leave some room in the table.
    fn select_column(&mut self, column: usize) {
        self.selected_column = column;
        if column <= self.offset_column {
            self.offset_column = column;
            return;
        }
        let table_width = self.table_width();
        let mut used: usize = self.widths[self.offset_column.min(self.widths.len())..]
            .iter()
            .take(column - self.offset_column)
            .map(|w| w + 1)
            .sum();
        while self.offset_column < column && used >= table_width {
            used -= self.widths.get(self.offset_column).map_or(0, |w| w + 1);
            self.offset_column += 1;
        }
    }

    // Keep the selection inside the displayed rows after they changed.
    fn clamp_cursor(&mut self) {
        let (nrows, ncolumns) = self.scope().read(|s| (s.display_rows.len(), s.headers.len()));
        let abs = (self.offset_row + self.cursor_row).min(nrows.saturating_sub(1));
        self.offset_row = self.offset_row.min(abs);
        self.select_row(abs);

        self.select_column(self.selected_column.min(ncolumns.saturating_sub(1)));
    }

    fn current_column(&self) -> Option<String> {
        self.scope()
            .read(|s| s.headers.get(self.selected_column).cloned())
    }

    // -------------------- Layout ---------------------- //

    fn table_width(&self) -> usize {
        self.ui_width.saturating_sub(2 * BORDER_SIZE)
    }

    fn table_height(&self) -> usize {
        let header = if self.scope().read(|s| s.display_headers) {
            TABLE_HEADER_HEIGHT
        } else {
            0
        };
        self.ui_height
            .saturating_sub(2 * BORDER_SIZE + STATUSLINE_HEIGHT + header)
    }

    /// Recompute the cached column widths. Needed after every transition that
    /// changes the display rows' content (filters, headers, rows). Sorting only
    /// reorders them and keeps the widths.
    fn update_column_widths(&mut self) {
        let start_time = Instant::now();
        self.widths = self
            .controller
            .column_widths()
            .into_iter()
            .map(|w| std::cmp::min(w + COLUMN_WIDTH_MARGIN, self.config.max_column_width))
            .collect();
        trace!(
            "Column widths {:?} in {}ms",
            self.widths,
            start_time.elapsed().as_millis()
        );
    }

    /// Header indices that fit into the table, starting at the column offset.
    /// A partially visible last column is included with a reduced width.
    fn visible_columns(&self) -> Vec<(usize, usize)> {
        let table_width = self.table_width();
        let mut visible = Vec::new();
        let mut used = 0;
        for (idx, &width) in self.widths.iter().enumerate().skip(self.offset_column) {
            if used + width + 1 <= table_width {
                visible.push((idx, width));
                used += width + 1;
            } else {
                if used < table_width || visible.is_empty() {
                    visible.push((idx, table_width.saturating_sub(used)));
                }
                break;
            }
        }
        visible
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
    }

    pub fn get_uidata(&self) -> UIData {
        let visible = self.visible_columns();
        let height = self.table_height();
        let name = self
            .path
            .as_ref()
            .and_then(|p| p.file_name())
            .and_then(|s| s.to_str())
            .unwrap_or("???")
            .to_string();

        self.scope().read(|s| {
            let rend = std::cmp::min(self.offset_row + height, s.display_rows.len());
            let rbegin = std::cmp::min(self.offset_row, rend);
            let rows = s.display_rows[rbegin..rend]
                .iter()
                .map(|row| {
                    visible
                        .iter()
                        .map(|&(idx, _)| row.cell(&s.headers[idx]).cloned().unwrap_or_default())
                        .collect()
                })
                .collect();
            let mut filters: Vec<(String, String)> = s
                .filters
                .active()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            filters.sort();

            UIData {
                name,
                headers: visible.iter().map(|&(idx, _)| s.headers[idx].clone()).collect(),
                widths: visible.iter().map(|&(_, w)| w).collect(),
                display_headers: s.display_headers,
                rows,
                selected_row: self.cursor_row,
                selected_column: self.selected_column.saturating_sub(self.offset_column),
                abs_selected_row: self.offset_row + self.cursor_row,
                nrows: s.display_rows.len(),
                total_rows: s.rows.len(),
                sort: s.sort_spec(),
                filters,
                show_popup: self.modus == Modus::POPUP,
                popup_message: self.popup_message.clone(),
                cmdinput: self.last_input.clone(),
                active_cmdinput: self.modus == Modus::CMDINPUT,
                cmd_label: self
                    .current_column()
                    .map(|c| format!("filter {c}: "))
                    .unwrap_or_default(),
                status_message: self.status_message.clone(),
            }
        })
    }
}
