use std::fmt;
use std::io::Error;

use arboard::Error as ClipboardError;
use derive_setters::Setters;
use polars::error::PolarsError;
use ratatui::crossterm::event::KeyEvent;

pub const HELP_TEXT: &str = "\
 Navigation
   j/k, Up/Down      move row
   h/l, Left/Right   move column
   PgUp/PgDown       move page
   g/G               first/last row

 Table
   f                 filter current column
   F                 clear all filters
   s                 cycle sort on current column
   a/d               sort current column asc/desc
   t                 toggle headers
   r                 reload file
   y                 copy row

 Esc closes, q quits";

#[derive(Debug)]
pub enum TVError {
    IoError(Error),
    PolarsError(PolarsError),
    ClipboardError(ClipboardError),
    LoadingFailed(String),
    FileNotFound,
    PermissionDenied,
    UnknownFileType,
}

impl fmt::Display for TVError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TVError::IoError(e) => write!(f, "I/O error: {e}"),
            TVError::PolarsError(e) => write!(f, "Failed reading data: {e}"),
            TVError::ClipboardError(e) => write!(f, "Clipboard unavailable: {e}"),
            TVError::LoadingFailed(reason) => write!(f, "Loading failed: {reason}"),
            TVError::FileNotFound => write!(f, "File not found"),
            TVError::PermissionDenied => write!(f, "Permission denied"),
            TVError::UnknownFileType => write!(f, "Unknown file type"),
        }
    }
}

impl std::error::Error for TVError {}

impl From<Error> for TVError {
    fn from(err: Error) -> Self {
        TVError::IoError(err)
    }
}

impl From<PolarsError> for TVError {
    fn from(err: PolarsError) -> Self {
        TVError::PolarsError(err)
    }
}

impl From<ClipboardError> for TVError {
    fn from(err: ClipboardError) -> Self {
        TVError::ClipboardError(err)
    }
}

#[derive(Debug, Clone, Setters)]
#[setters(prefix = "with_")]
pub struct TVConfig {
    pub event_poll_time: u64,
    pub max_column_width: usize,
    pub display_headers: bool,
    pub enable_sort: bool,
}

impl Default for TVConfig {
    fn default() -> Self {
        TVConfig {
            event_poll_time: 100,
            max_column_width: 40,
            display_headers: true,
            enable_sort: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CMDMode {
    FilterColumn,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Quit,
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    MovePageUp,
    MovePageDown,
    MoveBeginning,
    MoveEnd,
    Filter,
    ClearFilters,
    SortAscending,
    SortDescending,
    ToggleSort,
    ToggleHeaders,
    Reload,
    CopyRow,
    Help,
    Exit,
    Resize(usize, usize),
    RawKey(KeyEvent),
}
