//! Builder Module
//!
//! Fluent Builder APIを提供し、`Importer`/`Exporter`インスタンスを段階的に構築する。

use crate::api::{NamingPolicy, SheetSelector, StringStorage, TableConflict};
use crate::archive::{ArchiveReader, ArchiveWriter, ZipArchiveReader, ZipArchiveWriter};
use crate::error::XlsxLiteError;
use crate::export::{export_workbook, ExportReport};
use crate::import::{import_workbook, ImportReport};
use crate::security::SecurityConfig;
use crate::storage::{SqliteStore, TableSink, TableSource};
use rusqlite::Connection;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek, Write};
use std::path::Path;

/// インポート処理の設定を保持する内部構造体
#[derive(Debug, Clone, Default)]
pub(crate) struct ImportConfig {
    /// シート選択子（空の場合は全シート）
    pub selectors: Vec<SheetSelector>,

    /// 一致しない選択子をエラーにするか
    pub strict_selectors: bool,

    /// 命名ポリシー
    pub naming_policy: NamingPolicy,

    /// スキップされた行を空行として挿入するか
    pub synthesize_skipped_rows: bool,

    /// 同名テーブルが存在する場合の動作
    pub table_conflict: TableConflict,

    /// アーカイブ読み込み時のセキュリティ制限
    pub security: SecurityConfig,
}

/// インポート用のFluent Builder
///
/// すべての設定項目にデフォルト値が設定されており、必要な設定のみをオーバーライドできます。
///
/// # 使用例
///
/// ```rust,no_run
/// use xlsxlite::{ImportBuilder, NamingPolicy, SheetSelector};
///
/// # fn main() -> Result<(), xlsxlite::XlsxLiteError> {
/// let importer = ImportBuilder::new()
///     .with_sheet_selector(SheetSelector::Name("Sales".to_string()))
///     .with_naming_policy(NamingPolicy::Sanitize)
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ImportBuilder {
    /// 内部設定（構築中）
    config: ImportConfig,
}

impl Default for ImportBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ImportBuilder {
    /// デフォルト設定を持つビルダーインスタンスを生成する
    ///
    /// # デフォルト設定
    ///
    /// - シート選択: すべてのシート（マニフェスト順）
    /// - 一致しない選択子: 無視
    /// - 命名ポリシー: `NamingPolicy::Quote`
    /// - スキップされた行: 挿入しない
    /// - 同名テーブル: `TableConflict::Append`
    pub fn new() -> Self {
        Self {
            config: ImportConfig::default(),
        }
    }

    /// インポート対象のシートを追加する
    ///
    /// 複数回呼び出すと、選択子が追加されます。
    ///
    /// # 使用例
    ///
    /// ```rust,no_run
    /// use xlsxlite::{ImportBuilder, SheetSelector};
    ///
    /// // 2番目のシートと"Summary"シート
    /// let builder = ImportBuilder::new()
    ///     .with_sheet_selector(SheetSelector::Number(2))
    ///     .with_sheet_selector(SheetSelector::Name("Summary".to_string()));
    /// ```
    pub fn with_sheet_selector(mut self, selector: SheetSelector) -> Self {
        self.config.selectors.push(selector);
        self
    }

    /// インポート対象のシートをまとめて指定する
    ///
    /// それまでに追加した選択子は置き換えられます。
    pub fn with_sheet_selectors(mut self, selectors: Vec<SheetSelector>) -> Self {
        self.config.selectors = selectors;
        self
    }

    /// どのシートにも一致しない選択子をエラーにするかを指定する
    ///
    /// * `true`: `XlsxLiteError::UnknownTarget`を返す
    /// * `false`: 警告ログを出力して続行（デフォルト）
    pub fn strict_selectors(mut self, strict: bool) -> Self {
        self.config.strict_selectors = strict;
        self
    }

    /// テーブル名・カラム名の命名ポリシーを指定する
    pub fn with_naming_policy(mut self, policy: NamingPolicy) -> Self {
        self.config.naming_policy = policy;
        self
    }

    /// ソースで省略された行を、すべてNULLの行として挿入するかを指定する
    ///
    /// デフォルトでは、宣言された行だけを挿入します。
    pub fn synthesize_skipped_rows(mut self, synthesize: bool) -> Self {
        self.config.synthesize_skipped_rows = synthesize;
        self
    }

    /// 同名のテーブルが既に存在する場合の動作を指定する
    pub fn with_table_conflict(mut self, conflict: TableConflict) -> Self {
        self.config.table_conflict = conflict;
        self
    }

    /// セキュリティ制限を指定する
    ///
    /// # 使用例
    ///
    /// ```rust,no_run
    /// use xlsxlite::{ImportBuilder, SecurityConfig};
    ///
    /// let builder = ImportBuilder::new().with_security_config(SecurityConfig {
    ///     max_file_size: 10 * 1024 * 1024,
    ///     ..SecurityConfig::default()
    /// });
    /// ```
    pub fn with_security_config(mut self, security: SecurityConfig) -> Self {
        self.config.security = security;
        self
    }

    /// 設定を検証し、`Importer`インスタンスを生成する
    ///
    /// # 発生し得るエラー
    ///
    /// * `XlsxLiteError::Config(String)`: 設定の検証に失敗した場合
    ///   * シート番号に0が指定された（シート番号は1始まり）
    ///   * シート名に空文字列が指定された
    pub fn build(self) -> Result<Importer, XlsxLiteError> {
        for selector in &self.config.selectors {
            match selector {
                SheetSelector::Number(0) => {
                    return Err(XlsxLiteError::Config(
                        "Invalid sheet number: 0 (sheet numbers start at 1)".to_string(),
                    ));
                }
                SheetSelector::Name(name) if name.is_empty() => {
                    return Err(XlsxLiteError::Config(
                        "Invalid sheet name: empty string".to_string(),
                    ));
                }
                _ => {}
            }
        }

        Ok(Importer {
            config: self.config,
        })
    }
}

/// インポート処理のファサード
///
/// # 使用例
///
/// ```rust,no_run
/// use rusqlite::Connection;
/// use xlsxlite::ImportBuilder;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let conn = Connection::open("data.db")?;
/// let importer = ImportBuilder::new().build()?;
/// let report = importer.import_file(&conn, "input.xlsx")?;
/// println!("{} table(s) created", report.tables_created());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Importer {
    /// インポート設定
    config: ImportConfig,
}

impl Importer {
    /// XLSXファイルをSQLiteデータベースに取り込む
    ///
    /// # 引数
    ///
    /// * `conn` - 取り込み先のデータベース接続
    /// * `path` - XLSXファイルのパス
    ///
    /// # 戻り値
    ///
    /// * `Ok(ImportReport)` - 取り込みの結果（スキップされたシートを含む）
    /// * `Err(XlsxLiteError)` - ファイルを開けない、マニフェストがない等、全体が失敗した場合
    pub fn import_file<P: AsRef<Path>>(
        &self,
        conn: &Connection,
        path: P,
    ) -> Result<ImportReport, XlsxLiteError> {
        let file = File::open(path.as_ref())?;
        self.import_reader(conn, BufReader::new(file))
    }

    /// リーダーからXLSXを読み込み、SQLiteデータベースに取り込む
    ///
    /// # 使用例
    ///
    /// ```rust,no_run
    /// use rusqlite::Connection;
    /// use std::io::Cursor;
    /// use xlsxlite::ImportBuilder;
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let conn = Connection::open_in_memory()?;
    /// let bytes: Vec<u8> = std::fs::read("input.xlsx")?;
    /// let report = ImportBuilder::new().build()?.import_reader(&conn, Cursor::new(bytes))?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn import_reader<R: Read + Seek>(
        &self,
        conn: &Connection,
        reader: R,
    ) -> Result<ImportReport, XlsxLiteError> {
        let mut archive = ZipArchiveReader::with_security(reader, self.config.security.clone())?;
        let mut store = SqliteStore::new(conn).with_conflict(self.config.table_conflict);
        self.import(&mut archive, &mut store)
    }

    /// 任意のアーカイブから任意の格納先へ取り込む
    pub fn import<A, S>(&self, archive: &mut A, sink: &mut S) -> Result<ImportReport, XlsxLiteError>
    where
        A: ArchiveReader + ?Sized,
        S: TableSink + ?Sized,
    {
        import_workbook(&self.config, archive, sink)
    }
}

/// エクスポート処理の設定を保持する内部構造体
#[derive(Debug, Clone)]
pub(crate) struct ExportConfig {
    /// 対象テーブル（空の場合は全テーブル）
    pub tables: Vec<String>,

    /// 文字列セルの格納方式
    pub string_storage: StringStorage,

    /// オートフィルタを設定するか
    pub autofilter: bool,

    /// `docProps/core.xml`の作成者
    pub creator: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            tables: Vec::new(),
            string_storage: StringStorage::Shared,
            autofilter: true,
            creator: "xlsxlite".to_string(),
        }
    }
}

/// エクスポート用のFluent Builder
///
/// # 使用例
///
/// ```rust,no_run
/// use xlsxlite::{ExportBuilder, StringStorage};
///
/// # fn main() -> Result<(), xlsxlite::XlsxLiteError> {
/// let exporter = ExportBuilder::new()
///     .with_table("customers")
///     .with_table("orders")
///     .with_string_storage(StringStorage::Inline)
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ExportBuilder {
    /// 内部設定（構築中）
    config: ExportConfig,
}

impl Default for ExportBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ExportBuilder {
    /// デフォルト設定を持つビルダーインスタンスを生成する
    ///
    /// # デフォルト設定
    ///
    /// - 対象テーブル: すべてのユーザーテーブル（作成順）
    /// - 文字列: 共有文字列テーブル（重複排除）
    /// - オートフィルタ: 有効
    /// - 作成者: `xlsxlite`
    pub fn new() -> Self {
        Self {
            config: ExportConfig::default(),
        }
    }

    /// エクスポート対象のテーブルを追加する
    ///
    /// シートは追加した順に並びます。
    pub fn with_table<S: Into<String>>(mut self, table: S) -> Self {
        self.config.tables.push(table.into());
        self
    }

    /// エクスポート対象のテーブルをまとめて指定する
    pub fn with_tables(mut self, tables: Vec<String>) -> Self {
        self.config.tables = tables;
        self
    }

    /// 文字列セルの格納方式を指定する
    pub fn with_string_storage(mut self, storage: StringStorage) -> Self {
        self.config.string_storage = storage;
        self
    }

    /// ヘッダーとデータの範囲にオートフィルタを設定するかを指定する
    pub fn with_autofilter(mut self, autofilter: bool) -> Self {
        self.config.autofilter = autofilter;
        self
    }

    /// ドキュメントプロパティの作成者を指定する
    pub fn with_creator<S: Into<String>>(mut self, creator: S) -> Self {
        self.config.creator = creator.into();
        self
    }

    /// 設定を検証し、`Exporter`インスタンスを生成する
    ///
    /// # 発生し得るエラー
    ///
    /// * `XlsxLiteError::Config(String)`: 設定の検証に失敗した場合
    ///   * 同じテーブルが2回指定された（大文字小文字を区別しない）
    ///   * 作成者が空文字列
    pub fn build(self) -> Result<Exporter, XlsxLiteError> {
        // 1. 対象テーブルの重複
        let mut seen = HashSet::new();
        for table in &self.config.tables {
            if !seen.insert(table.to_ascii_lowercase()) {
                return Err(XlsxLiteError::Config(format!(
                    "Duplicate table name: '{}'",
                    table
                )));
            }
        }

        // 2. 作成者
        if self.config.creator.trim().is_empty() {
            return Err(XlsxLiteError::Config(
                "Creator must not be empty".to_string(),
            ));
        }

        Ok(Exporter {
            config: self.config,
        })
    }
}

/// エクスポート処理のファサード
///
/// # 使用例
///
/// ```rust,no_run
/// use rusqlite::Connection;
/// use xlsxlite::ExportBuilder;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let conn = Connection::open("data.db")?;
/// let exporter = ExportBuilder::new().build()?;
/// let report = exporter.export_file(&conn, "output.xlsx")?;
/// println!("{}", report.summary("output.xlsx"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Exporter {
    /// エクスポート設定
    config: ExportConfig,
}

impl Exporter {
    /// SQLiteデータベースのテーブルをXLSXファイルに書き出す
    ///
    /// 出力先と同じディレクトリの一時ファイルに書き込み、成功した場合のみ
    /// 出力先に移動します。失敗した場合、出力先のファイルは変更されません。
    ///
    /// # 引数
    ///
    /// * `conn` - 読み出し元のデータベース接続
    /// * `path` - 出力先のパス
    pub fn export_file<P: AsRef<Path>>(
        &self,
        conn: &Connection,
        path: P,
    ) -> Result<ExportReport, XlsxLiteError> {
        let path = path.as_ref();
        let directory = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut temp = tempfile::NamedTempFile::new_in(directory)?;
        let report = self.export_writer(conn, temp.as_file_mut())?;
        temp.as_file_mut().flush()?;
        temp.persist(path).map_err(|e| XlsxLiteError::Io(e.error))?;

        log::debug!("wrote {}", path.display());
        Ok(report)
    }

    /// SQLiteデータベースのテーブルをXLSXとしてライターに書き出す
    pub fn export_writer<W: Write + Seek>(
        &self,
        conn: &Connection,
        writer: W,
    ) -> Result<ExportReport, XlsxLiteError> {
        let store = SqliteStore::new(conn);
        let mut archive = ZipArchiveWriter::new(writer);
        let report = self.export(&store, &mut archive)?;
        archive.finish()?;
        Ok(report)
    }

    /// SQLiteデータベースのテーブルをXLSXのバイト列として書き出す
    pub fn export_to_vec(
        &self,
        conn: &Connection,
    ) -> Result<(Vec<u8>, ExportReport), XlsxLiteError> {
        let mut buffer = Cursor::new(Vec::new());
        let report = self.export_writer(conn, &mut buffer)?;
        Ok((buffer.into_inner(), report))
    }

    /// 任意の読み出し元から任意のアーカイブへ書き出す
    pub fn export<S, A>(&self, source: &S, archive: &mut A) -> Result<ExportReport, XlsxLiteError>
    where
        S: TableSource + ?Sized,
        A: ArchiveWriter + ?Sized,
    {
        export_workbook(&self.config, source, archive)
    }
}
