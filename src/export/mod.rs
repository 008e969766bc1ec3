//! Export Module
//!
//! テーブルストアのテーブルをXLSXパッケージとして書き出すモジュール。
//!
//! 処理の流れ:
//!
//! 1. 対象テーブルの決定（明示指定、または全テーブルを作成順）
//! 2. テーブルごとにカラムを取得し、シート名を決定
//! 3. テーブルを走査してワークシートXMLを生成（文字列は共有文字列テーブルへ）
//! 4. パッケージの各パートを生成し、アーカイブに書き込む
//!
//! アーカイブへの書き込みは全パートの生成に成功した後に行います。

mod package;
mod worksheet;

use crate::api::StringStorage;
use crate::archive::ArchiveWriter;
use crate::builder::ExportConfig;
use crate::error::XlsxLiteError;
use crate::names::{sanitize_sheet_name, NameUniquifier, SuffixStyle};
use crate::parser::SharedStringPool;
use crate::storage::TableSource;
use crate::types::{TableSpec, MAX_CELL_CHARS, MAX_SHEET_NAME_CHARS};
use package::PackageSheet;
use serde::Serialize;
use worksheet::{render_worksheet, CellStrings};

/// パッケージ内のディレクトリ
const DIRECTORIES: [&str; 5] = ["_rels/", "docProps/", "xl/", "xl/_rels/", "xl/worksheets/"];

/// セルの位置（テーブル名、シート上の行番号、1始まりの列番号）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CellLocation {
    /// テーブル名
    pub table: String,

    /// シート上の行番号（ヘッダーが1行目）
    pub row: u32,

    /// 列番号（1始まり）
    pub column: u32,
}

/// 切り詰めの記録
#[derive(Debug, Default)]
pub(crate) struct TruncationTracker {
    pub count: usize,
    pub first: Option<CellLocation>,
}

impl TruncationTracker {
    /// 切り詰めたセルを記録する
    pub fn record(&mut self, table: &str, row: u32, column: u32) {
        self.count += 1;
        if self.first.is_none() {
            self.first = Some(CellLocation {
                table: table.to_string(),
                row,
                column,
            });
        }
    }

    fn into_warning(self) -> Option<TruncationWarning> {
        self.first
            .map(|first| TruncationWarning {
                count: self.count,
                first,
            })
    }
}

/// 32,767文字を超えて切り詰めたセルの警告
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TruncationWarning {
    /// 切り詰めたセルの数
    pub count: usize,

    /// 最初に切り詰めたセルの位置
    pub first: CellLocation,
}

/// 書き出したシート
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportedSheet {
    /// 元のテーブル名
    pub table: String,

    /// シート名
    pub sheet_name: String,

    /// カラム数
    pub columns: usize,

    /// データ行の数
    pub rows: usize,
}

/// エクスポートの結果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExportReport {
    /// 書き出したシート（シート順）
    pub sheets: Vec<ExportedSheet>,

    /// 切り詰めの警告
    pub truncation: Option<TruncationWarning>,
}

impl ExportReport {
    /// 書き出したデータ行の合計
    pub fn rows_written(&self) -> usize {
        self.sheets.iter().map(|s| s.rows).sum()
    }

    /// 結果を1行のテキストにまとめる
    ///
    /// 切り詰めがなければファイル名をそのまま返し、あれば警告を付加します。
    ///
    /// # 使用例
    ///
    /// ```rust
    /// use xlsxlite::ExportReport;
    ///
    /// let report = ExportReport::default();
    /// assert_eq!(report.summary("out.xlsx"), "out.xlsx");
    /// ```
    pub fn summary(&self, filename: &str) -> String {
        match &self.truncation {
            None => filename.to_string(),
            Some(warning) => format!(
                "{} (WARNING: {} cell(s) exceeded Excel's {} character limit and were truncated. \
                 First occurrence: table '{}', row {}, column {})",
                filename,
                warning.count,
                MAX_CELL_CHARS,
                warning.first.table,
                warning.first.row,
                warning.first.column
            ),
        }
    }
}

/// テーブルをXLSXパッケージとしてアーカイブに書き込む
///
/// # 引数
///
/// * `config` - エクスポート設定
/// * `source` - テーブルの読み出し元
/// * `archive` - 書き込み先のアーカイブ
///
/// # 戻り値
///
/// * `Ok(ExportReport)` - エクスポートの結果
/// * `Err(XlsxLiteError::UnknownTarget)` - 指定されたテーブルが存在しない場合
/// * `Err(XlsxLiteError::Config)` - 書き出すテーブルがない場合
/// * `Err(XlsxLiteError::Storage)` - テーブルの読み出しに失敗した場合
pub(crate) fn export_workbook<S, A>(
    config: &ExportConfig,
    source: &S,
    archive: &mut A,
) -> Result<ExportReport, XlsxLiteError>
where
    S: TableSource + ?Sized,
    A: ArchiveWriter + ?Sized,
{
    // 1. 対象テーブルの決定
    let specs = resolve_targets(config, source)?;

    // 2. ワークシートの生成
    let mut pool = SharedStringPool::new();
    let mut truncation = TruncationTracker::default();
    let mut strings = CellStrings {
        storage: config.string_storage,
        pool: &mut pool,
        truncation: &mut truncation,
        references: 0,
    };

    let mut worksheets = Vec::with_capacity(specs.len());
    let mut package_sheets = Vec::with_capacity(specs.len());
    let mut sheets = Vec::with_capacity(specs.len());
    for spec in &specs {
        let rendered = render_worksheet(source, spec, config.autofilter, &mut strings)?;
        log::debug!(
            "table '{}': {} row(s) -> sheet '{}'",
            spec.source_table,
            rendered.data_rows,
            spec.sheet_name
        );

        package_sheets.push(PackageSheet {
            name: spec.sheet_name.clone(),
            filter_range: (config.autofilter && !spec.columns.is_empty())
                .then(|| rendered.range.clone()),
        });
        sheets.push(ExportedSheet {
            table: spec.source_table.clone(),
            sheet_name: spec.sheet_name.clone(),
            columns: spec.columns.len(),
            rows: rendered.data_rows,
        });
        worksheets.push(rendered.xml);
    }
    let references = strings.references;

    // 3. パッケージの組み立て
    let shared = config.string_storage == StringStorage::Shared;
    let mut parts: Vec<(String, String)> = vec![
        (
            "[Content_Types].xml".to_string(),
            package::content_types(worksheets.len(), shared),
        ),
        ("_rels/.rels".to_string(), package::root_relationships()),
        (
            "docProps/app.xml".to_string(),
            package::app_properties(&package_sheets),
        ),
        (
            "docProps/core.xml".to_string(),
            package::core_properties(&config.creator, chrono::Utc::now()),
        ),
        ("xl/workbook.xml".to_string(), package::workbook(&package_sheets)),
        (
            "xl/_rels/workbook.xml.rels".to_string(),
            package::workbook_relationships(worksheets.len(), shared),
        ),
        ("xl/styles.xml".to_string(), package::styles().to_string()),
    ];
    if shared {
        parts.push((
            "xl/sharedStrings.xml".to_string(),
            package::shared_strings(&pool, references),
        ));
    }
    for (i, xml) in worksheets.into_iter().enumerate() {
        parts.push((format!("xl/worksheets/sheet{}.xml", i + 1), xml));
    }

    // 4. アーカイブへの書き込み
    for directory in DIRECTORIES {
        archive.write_entry(directory, None)?;
    }
    for (name, xml) in &parts {
        archive.write_entry(name, Some(xml.as_bytes()))?;
    }

    let report = ExportReport {
        sheets,
        truncation: truncation.into_warning(),
    };
    if let Some(warning) = &report.truncation {
        log::warn!(
            "{} cell(s) truncated to {} characters, first at table '{}', row {}, column {}",
            warning.count,
            MAX_CELL_CHARS,
            warning.first.table,
            warning.first.row,
            warning.first.column
        );
    }
    Ok(report)
}

/// 対象テーブルを決定し、シート名とカラムを割り当てる
fn resolve_targets<S: TableSource + ?Sized>(
    config: &ExportConfig,
    source: &S,
) -> Result<Vec<TableSpec>, XlsxLiteError> {
    let tables = if config.tables.is_empty() {
        source.list_tables()?
    } else {
        config.tables.clone()
    };
    if tables.is_empty() {
        return Err(XlsxLiteError::Config(
            "No tables to export".to_string(),
        ));
    }

    let mut sheet_names =
        NameUniquifier::new(SuffixStyle::Parenthesized).with_max_chars(MAX_SHEET_NAME_CHARS);
    let mut specs = Vec::with_capacity(tables.len());
    for (i, table) in tables.into_iter().enumerate() {
        let columns = source.columns_of(&table)?;
        if columns.is_empty() {
            return Err(XlsxLiteError::UnknownTarget(format!(
                "table '{}' does not exist",
                table
            )));
        }
        let base = sanitize_sheet_name(&table, i + 1);
        specs.push(TableSpec {
            sheet_name: sheet_names.claim(&base),
            source_table: table,
            columns,
        });
    }
    Ok(specs)
}
