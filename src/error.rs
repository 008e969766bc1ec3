//! Error Types Module
//!
//! クレート全体で使用する構造化エラー型を定義するモジュール。
//! `thiserror`を使用して、エラーの自動変換とメッセージフォーマットを実現する。

use thiserror::Error;

/// xlsxliteクレート全体で使用するエラー型
///
/// XLSXアーカイブの読み書き、XMLの解析・生成、SQLiteへのアクセス中に発生する
/// すべてのエラーを統一的に扱うために使用されます。
///
/// # エラーの種類
///
/// - `Io` / `Zip` / `EntryNotFound`: アーカイブの読み書きに失敗した場合
/// - `MalformedXml`: XMLパートが不正な場合（インポート時はシート単位でスキップ）
/// - `UnknownTarget`: 指定されたテーブル・シートが存在しない場合
/// - `Storage`: SQLite側でエラーが発生した場合（テーブル名と操作を含む）
/// - `Config`: ビルダー設定の検証に失敗した場合
/// - `SecurityViolation`: アーカイブがセキュリティ制限を超えた場合
///
/// セル文字数の上限超過はエラーではなく、`ExportReport`の警告として報告されます。
///
/// # 使用例
///
/// ```rust,no_run
/// use xlsxlite::{ImportBuilder, XlsxLiteError};
///
/// # fn main() -> Result<(), XlsxLiteError> {
/// let conn = rusqlite::Connection::open_in_memory()
///     .map_err(|e| XlsxLiteError::Config(e.to_string()))?;
/// let importer = ImportBuilder::new().build()?;
/// match importer.import_file(&conn, "missing.xlsx") {
///     Err(XlsxLiteError::Io(e)) => println!("cannot open: {}", e),
///     Err(e) => println!("import failed: {}", e),
///     Ok(report) => println!("{} table(s)", report.tables_created()),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Error, Debug)]
pub enum XlsxLiteError {
    /// I/O操作中に発生したエラー
    ///
    /// `#[from]`属性により、`std::io::Error`から自動的に変換されます。
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// ZIPアーカイブの解析・書き込みエラー
    #[error("ZIP archive error: {0}")]
    Zip(String),

    /// アーカイブ内に必要なエントリが存在しない
    ///
    /// `xl/workbook.xml`が見つからない場合などに発生します。
    #[error("Archive entry not found: {entry}")]
    EntryNotFound {
        /// アーカイブ内のパス
        entry: String,
    },

    /// XMLパートの解析エラー
    ///
    /// メッセージには、可能な場合は問題のあるセル参照が含まれます。
    #[error("Malformed XML in '{part}': {message}")]
    MalformedXml {
        /// アーカイブ内のパート名（例: `xl/worksheets/sheet1.xml`）
        part: String,
        /// エラーの詳細
        message: String,
    },

    /// 指定されたテーブルまたはシートが解決できない
    #[error("Unknown target: {0}")]
    UnknownTarget(String),

    /// SQLite側で発生したエラー
    ///
    /// 診断のため、対象テーブル名と実行していた操作を保持します。
    #[error("Storage error on table '{table}' during {operation}: {source}")]
    Storage {
        /// 対象テーブル名
        table: String,
        /// 実行していた操作（例: `create table`, `insert row`）
        operation: &'static str,
        /// rusqlite由来のエラー
        #[source]
        source: rusqlite::Error,
    },

    /// 設定の検証に失敗したエラー
    ///
    /// `ImportBuilder::build()` / `ExportBuilder::build()`時に発生します。
    ///
    /// # 例
    ///
    /// ```rust,no_run
    /// use xlsxlite::{ImportBuilder, SheetSelector, XlsxLiteError};
    ///
    /// let result = ImportBuilder::new()
    ///     .with_sheet_selector(SheetSelector::Number(0))  // 1始まりなので無効
    ///     .build();
    ///
    /// if let Err(XlsxLiteError::Config(msg)) = result {
    ///     println!("設定エラー: {}", msg);
    /// }
    /// ```
    #[error("Configuration error: {0}")]
    Config(String),

    /// セキュリティ制限に違反したエラー
    ///
    /// ZIP bomb攻撃、パストラバーサル攻撃、ファイルサイズ制限などの
    /// セキュリティ制限に違反した場合に発生します。
    #[error("Security violation: {0}")]
    SecurityViolation(String),
}

impl XlsxLiteError {
    /// `MalformedXml`を生成するヘルパー
    pub(crate) fn malformed(part: &str, message: impl Into<String>) -> Self {
        XlsxLiteError::MalformedXml {
            part: part.to_string(),
            message: message.into(),
        }
    }

    /// `Storage`を生成するヘルパー
    pub(crate) fn storage(table: &str, operation: &'static str, source: rusqlite::Error) -> Self {
        XlsxLiteError::Storage {
            table: table.to_string(),
            operation,
            source,
        }
    }
}

impl From<zip::result::ZipError> for XlsxLiteError {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(e) => XlsxLiteError::Io(e),
            other => XlsxLiteError::Zip(other.to_string()),
        }
    }
}
