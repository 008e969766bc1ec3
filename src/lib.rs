//! xlsxlite - Pure-Rust XLSX import/export for SQLite tables
//!
//! This crate moves tabular data between SQLite databases and Excel workbooks (XLSX).
//! Import turns every selected worksheet into a table: the first row becomes the
//! column names and every following row is inserted as data. Export writes each
//! table as its own worksheet with a bold header row and an autofilter.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use rusqlite::Connection;
//! use xlsxlite::{ExportBuilder, ImportBuilder};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let conn = Connection::open("data.db")?;
//!
//!     // Import every sheet of a workbook as a table
//!     let importer = ImportBuilder::new().build()?;
//!     let report = importer.import_file(&conn, "input.xlsx")?;
//!     println!("{} table(s) created", report.tables_created());
//!
//!     // Export every table as a sheet
//!     let exporter = ExportBuilder::new().build()?;
//!     let report = exporter.export_file(&conn, "output.xlsx")?;
//!     println!("{}", report.summary("output.xlsx"));
//!
//!     Ok(())
//! }
//! ```
//!
//! # Selecting Sheets and Tables
//!
//! ```rust,no_run
//! use rusqlite::Connection;
//! use xlsxlite::{ExportBuilder, ImportBuilder, NamingPolicy, SheetSelector};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let conn = Connection::open("data.db")?;
//!
//!     // The second sheet (by position) and the sheet named "Summary"
//!     let importer = ImportBuilder::new()
//!         .with_sheet_selector(SheetSelector::Number(2))
//!         .with_sheet_selector(SheetSelector::Name("Summary".to_string()))
//!         .with_naming_policy(NamingPolicy::Sanitize)
//!         .build()?;
//!     importer.import_file(&conn, "input.xlsx")?;
//!
//!     // Export two tables, in this order
//!     let exporter = ExportBuilder::new()
//!         .with_table("customers")
//!         .with_table("orders")
//!         .build()?;
//!     exporter.export_file(&conn, "output.xlsx")?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Inspecting a Workbook
//!
//! ```rust,no_run
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     for (number, name) in xlsxlite::list_sheet_names_in_file("input.xlsx")? {
//!         println!("{}: {}", number, name);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Other Stores and Archives
//!
//! `Importer::import` and `Exporter::export` accept any `ArchiveReader`/`ArchiveWriter`
//! and `TableSink`/`TableSource`, so the XLSX logic can run against an in-memory
//! archive (`BTreeMap<String, Vec<u8>>`) or a table store other than SQLite.

mod api;
mod archive;
mod builder;
mod error;
mod export;
mod import;
mod names;
mod parser;
mod security;
mod storage;
mod types;

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

// 公開API
pub use api::{NamingPolicy, SheetSelector, StringStorage, TableConflict};
pub use archive::{ArchiveReader, ArchiveWriter, ZipArchiveReader, ZipArchiveWriter};
pub use builder::{ExportBuilder, Exporter, ImportBuilder, Importer};
pub use error::XlsxLiteError;
pub use export::{CellLocation, ExportReport, ExportedSheet, TruncationWarning};
pub use import::{ImportReport, ImportedTable, SkippedSheet};
pub use parser::{OutOfRange, SharedStringPool};
pub use security::SecurityConfig;
pub use storage::{SqliteStore, TableSink, TableSource};
pub use types::{
    column_letters, column_number, Cell, CellGrid, ColumnInfo, Row, SheetManifestEntry,
    StoredValue, TableSpec, MAX_CELL_CHARS, MAX_COLUMNS, MAX_ROWS, MAX_SHEET_NAME_CHARS,
};

/// ワークブックマニフェストのシート一覧を返す
///
/// # 戻り値
///
/// * `Ok(Vec<SheetManifestEntry>)` - マニフェスト順のシート一覧
/// * `Err(XlsxLiteError::EntryNotFound)` - `xl/workbook.xml`が存在しない場合
pub fn list_sheets<R: Read + Seek>(reader: R) -> Result<Vec<SheetManifestEntry>, XlsxLiteError> {
    let mut archive = ZipArchiveReader::open(reader)?;
    import::read_manifest(&mut archive)
}

/// シート番号（1始まり）とシート名の一覧を返す
///
/// # 使用例
///
/// ```rust,no_run
/// use std::fs::File;
///
/// # fn main() -> Result<(), xlsxlite::XlsxLiteError> {
/// let sheets = xlsxlite::list_sheet_names(File::open("input.xlsx")?)?;
/// assert!(sheets.iter().all(|(number, _)| *number >= 1));
/// # Ok(())
/// # }
/// ```
pub fn list_sheet_names<R: Read + Seek>(reader: R) -> Result<Vec<(u32, String)>, XlsxLiteError> {
    Ok(list_sheets(reader)?
        .into_iter()
        .map(|entry| (entry.position, entry.name))
        .collect())
}

/// ファイルのシート番号とシート名の一覧を返す
pub fn list_sheet_names_in_file<P: AsRef<Path>>(
    path: P,
) -> Result<Vec<(u32, String)>, XlsxLiteError> {
    let file = File::open(path.as_ref())?;
    list_sheet_names(BufReader::new(file))
}

/// クレート名とバージョン
pub fn version() -> &'static str {
    concat!("xlsxlite ", env!("CARGO_PKG_VERSION"))
}
