use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use polars::prelude::*;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::domain::TVError;
use crate::table::{Cell, Row};

pub const NULL_TEXT: &str = "∅";
pub const NULL_CLASS: &str = "null";

#[derive(Debug, Clone, Copy, PartialEq)]
enum FileType {
    CSV,
    PARQUET,
    ARROW,
}

#[derive(Debug)]
struct FileInfo {
    path: PathBuf,
    file_size: u64,
    file_type: FileType,
}

struct Column {
    name: String,
    cells: Vec<Cell>,
}

/// A loaded snapshot: column keys in file order and one row per record.
#[derive(Debug, Default)]
pub struct TableData {
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
}

pub fn load_data_file(path: &Path) -> Result<TableData, TVError> {
    let file_info = get_file_info(path.to_path_buf())?;
    debug!("Loading {:?}", file_info);
    let frame = match file_info.file_type {
        FileType::CSV => load_csv(&file_info.path)?,
        FileType::PARQUET => load_parquet(&file_info.path)?,
        FileType::ARROW => load_arrow(&file_info.path)?,
    };

    // Each column is converted to text on its own rayon worker.
    let start_time = Instant::now();
    let df = Arc::new(frame.collect()?);
    let columns: Vec<Column> = df
        .get_column_names()
        .par_iter()
        .map(|name| load_column(&df, name))
        .collect::<Result<_, PolarsError>>()?;

    let data = into_rows(columns);
    info!(
        "Loaded {} rows, {} columns ({} bytes) in {}ms",
        data.rows.len(),
        data.headers.len(),
        file_info.file_size,
        start_time.elapsed().as_millis()
    );
    Ok(data)
}

fn into_rows(columns: Vec<Column>) -> TableData {
    let nrows = columns.first().map(|c| c.cells.len()).unwrap_or(0);
    let rows = (0..nrows)
        .map(|ridx| {
            columns
                .iter()
                .map(|c| (c.name.clone(), c.cells[ridx].clone()))
                .collect::<Row>()
        })
        .collect();
    TableData {
        headers: columns.into_iter().map(|c| c.name).collect(),
        rows,
    }
}

fn load_column(df: &DataFrame, col_name: &str) -> Result<Column, PolarsError> {
    let col = df.column(col_name)?.cast(&DataType::String)?;
    let series = col.str()?;
    let cells = series
        .into_iter()
        .map(|value| match value {
            Some(s) => Cell::new(s.replace("\r\n", " ↵ ").replace('\n', " ↵ ")),
            None => Cell::with_class(NULL_TEXT, NULL_CLASS),
        })
        .collect();

    Ok(Column {
        name: col_name.to_string(),
        cells,
    })
}

fn detect_file_type(path: &Path) -> Result<FileType, TVError> {
    match path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_uppercase())
        .as_deref()
    {
        Some("CSV") => Ok(FileType::CSV),
        Some("PARQUET") | Some("PQ") => Ok(FileType::PARQUET),
        Some("ARROW") | Some("IPC") | Some("FEATHER") => Ok(FileType::ARROW),
        _ => Err(TVError::UnknownFileType),
    }
}

fn get_file_info(path: PathBuf) -> Result<FileInfo, TVError> {
    let metadata = fs::metadata(&path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => TVError::FileNotFound,
        ErrorKind::PermissionDenied => TVError::PermissionDenied,
        _ => TVError::IoError(e),
    })?;
    if !metadata.is_file() {
        return Err(TVError::LoadingFailed("Not a file!".into()));
    }

    let file_type = detect_file_type(&path)?;
    Ok(FileInfo {
        path,
        file_size: metadata.len(),
        file_type,
    })
}

fn load_csv(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyCsvReader::new(PlPath::Local(path.into()))
        .with_has_header(true)
        .finish()
}

fn load_parquet(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyFrame::scan_parquet(PlPath::Local(path.into()), ScanArgsParquet::default())
}

fn load_arrow(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyFrame::scan_ipc(
        PlPath::Local(path.into()),
        polars::io::ipc::IpcScanOptions,
        UnifiedScanArgs::default(),
    )
}
