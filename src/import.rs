//! Import Module
//!
//! XLSXパッケージの各シートをテーブルとして取り込むモジュール。
//!
//! # 処理フロー
//!
//! 1. 共有文字列テーブルの読み込み（存在しない場合は空）
//! 2. ワークブックマニフェストの読み込み（存在しない場合は全体がエラー）
//! 3. 選択子に従ったシートの選択
//! 4. シートごとに、グリッドの再構築 → テーブルの作成 → 行の挿入
//!
//! シート単位の失敗（ワークシートが存在しない、XMLが不正、格納エラー）は
//! そのシートだけをスキップし、`ImportReport`に理由を記録します。

use crate::api::{NamingPolicy, SheetSelector};
use crate::archive::ArchiveReader;
use crate::builder::ImportConfig;
use crate::error::XlsxLiteError;
use crate::names::{apply_naming_policy, header_column_names, NameUniquifier, SuffixStyle};
use crate::parser::{
    parse_manifest, parse_relationships, parse_shared_strings, parse_worksheet, resolve_target,
    SharedStringPool, SHARED_STRINGS_PART, WORKBOOK_PART, WORKBOOK_RELS_PART,
};
use crate::storage::TableSink;
use crate::types::{Cell, CellGrid, SheetManifestEntry};
use serde::Serialize;
use std::collections::HashMap;

/// インポート結果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    /// 作成されたテーブル（インポート順）
    pub tables: Vec<ImportedTable>,

    /// スキップされたシート
    pub skipped: Vec<SkippedSheet>,

    /// どのシートにも一致しなかった選択子
    pub unmatched_selectors: Vec<SheetSelector>,
}

impl ImportReport {
    /// 作成されたテーブルの数
    pub fn tables_created(&self) -> usize {
        self.tables.len()
    }

    /// 挿入された行の合計
    pub fn rows_inserted(&self) -> usize {
        self.tables.iter().map(|t| t.rows_inserted).sum()
    }
}

/// 取り込まれた1シートの情報
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportedTable {
    /// 元のシート名
    pub sheet_name: String,

    /// 作成したテーブル名
    pub table_name: String,

    /// カラム名
    pub columns: Vec<String>,

    /// 挿入した行数
    pub rows_inserted: usize,
}

/// スキップされた1シートの情報
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedSheet {
    /// シート名
    pub sheet_name: String,

    /// スキップの理由
    pub reason: String,
}

/// ワークブックマニフェストを読み込む
///
/// # 戻り値
///
/// * `Ok(Vec<SheetManifestEntry>)` - マニフェスト順のシート一覧
/// * `Err(XlsxLiteError::EntryNotFound)` - `xl/workbook.xml`が存在しない場合
pub(crate) fn read_manifest<A: ArchiveReader + ?Sized>(
    archive: &mut A,
) -> Result<Vec<SheetManifestEntry>, XlsxLiteError> {
    let bytes = archive
        .read_entry(WORKBOOK_PART)?
        .ok_or_else(|| XlsxLiteError::EntryNotFound {
            entry: WORKBOOK_PART.to_string(),
        })?;
    parse_manifest(&bytes)
}

/// ワークブックを取り込む
pub(crate) fn import_workbook<A, S>(
    config: &ImportConfig,
    archive: &mut A,
    sink: &mut S,
) -> Result<ImportReport, XlsxLiteError>
where
    A: ArchiveReader + ?Sized,
    S: TableSink + ?Sized,
{
    // 1. 共有文字列テーブル
    let pool = match archive.read_entry(SHARED_STRINGS_PART)? {
        Some(bytes) => parse_shared_strings(&bytes)?,
        None => SharedStringPool::new(),
    };

    // 2. マニフェストとリレーションシップ
    let manifest = read_manifest(archive)?;
    let relationships = match archive.read_entry(WORKBOOK_RELS_PART)? {
        Some(bytes) => parse_relationships(&bytes).unwrap_or_else(|e| {
            log::warn!("ignoring unreadable workbook relationships: {}", e);
            HashMap::new()
        }),
        None => HashMap::new(),
    };
    log::debug!("workbook declares {} sheet(s)", manifest.len());

    // 3. シートの選択
    let (selected, unmatched) = select_sheets(&manifest, &config.selectors);
    for selector in &unmatched {
        log::warn!("sheet selector {} did not match any sheet", selector);
    }
    if config.strict_selectors && !unmatched.is_empty() {
        let list = unmatched
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        return Err(XlsxLiteError::UnknownTarget(format!(
            "no sheet matches selector(s) {}",
            list
        )));
    }

    // 4. シートごとの取り込み
    let mut report = ImportReport {
        unmatched_selectors: unmatched,
        ..ImportReport::default()
    };
    let mut table_names = NameUniquifier::new(SuffixStyle::Underscore);

    for entry in selected {
        let grid = match load_grid(archive, entry, &relationships, &pool) {
            Ok(grid) => grid,
            Err(e @ XlsxLiteError::SecurityViolation(_)) => return Err(e),
            Err(e) => {
                log::warn!("skipping sheet '{}': {}", entry.name, e);
                report.skipped.push(SkippedSheet {
                    sheet_name: entry.name.clone(),
                    reason: e.to_string(),
                });
                continue;
            }
        };

        let table_name = table_names.claim(&table_name_for(config.naming_policy, entry));
        match materialize(config, sink, &table_name, &grid) {
            Ok((columns, rows_inserted)) => {
                log::debug!(
                    "sheet '{}' -> table '{}': {} column(s), {} row(s)",
                    entry.name,
                    table_name,
                    columns.len(),
                    rows_inserted
                );
                report.tables.push(ImportedTable {
                    sheet_name: entry.name.clone(),
                    table_name,
                    columns,
                    rows_inserted,
                });
            }
            Err(e) => {
                log::warn!("failed to import sheet '{}': {}", entry.name, e);
                report.skipped.push(SkippedSheet {
                    sheet_name: entry.name.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    Ok(report)
}

/// 選択子に一致するシートをマニフェスト順に返す
///
/// 番号の選択子はまずマニフェスト上の位置（1始まり）と照合し、範囲外の場合は
/// `sheetId`と照合します。名前の選択子は大文字小文字を区別する完全一致です。
/// 選択子が空の場合はすべてのシートを返します。
///
/// # 戻り値
///
/// (選択されたシート, どのシートにも一致しなかった選択子)
fn select_sheets<'m>(
    manifest: &'m [SheetManifestEntry],
    selectors: &[SheetSelector],
) -> (Vec<&'m SheetManifestEntry>, Vec<SheetSelector>) {
    if selectors.is_empty() {
        return (manifest.iter().collect(), Vec::new());
    }

    let mut chosen = vec![false; manifest.len()];
    let mut unmatched = Vec::new();

    for selector in selectors {
        let matches: Vec<usize> = match selector {
            SheetSelector::Number(n) => {
                let by_position = *n as usize;
                if (1..=manifest.len()).contains(&by_position) {
                    vec![by_position - 1]
                } else {
                    manifest
                        .iter()
                        .enumerate()
                        .filter(|(_, e)| e.sheet_id == *n)
                        .map(|(i, _)| i)
                        .collect()
                }
            }
            SheetSelector::Name(name) => manifest
                .iter()
                .enumerate()
                .filter(|(_, e)| &e.name == name)
                .map(|(i, _)| i)
                .collect(),
        };

        if matches.is_empty() {
            unmatched.push(selector.clone());
        }
        for i in matches {
            chosen[i] = true;
        }
    }

    let selected = manifest
        .iter()
        .zip(chosen)
        .filter(|(_, c)| *c)
        .map(|(e, _)| e)
        .collect();
    (selected, unmatched)
}

/// シートのワークシートパートの候補を優先順に返す
///
/// 1. `r:id`をリレーションシップで解決したパス
/// 2. `xl/worksheets/sheet<位置>.xml`
/// 3. `xl/worksheets/sheet<sheetId>.xml`
fn worksheet_candidates(
    entry: &SheetManifestEntry,
    relationships: &HashMap<String, String>,
) -> Vec<String> {
    let mut candidates = Vec::with_capacity(3);
    if let Some(path) = entry
        .relationship_id
        .as_ref()
        .and_then(|id| relationships.get(id))
        .and_then(|target| resolve_target(target))
    {
        candidates.push(path);
    }
    for n in [entry.position, entry.sheet_id] {
        let path = format!("xl/worksheets/sheet{}.xml", n);
        if !candidates.contains(&path) {
            candidates.push(path);
        }
    }
    candidates
}

fn load_grid<A: ArchiveReader + ?Sized>(
    archive: &mut A,
    entry: &SheetManifestEntry,
    relationships: &HashMap<String, String>,
    pool: &SharedStringPool,
) -> Result<CellGrid, XlsxLiteError> {
    let candidates = worksheet_candidates(entry, relationships);
    for part in &candidates {
        if let Some(bytes) = archive.read_entry(part)? {
            return parse_worksheet(part, &bytes, pool);
        }
    }
    Err(XlsxLiteError::EntryNotFound {
        entry: candidates.join(" | "),
    })
}

fn table_name_for(policy: NamingPolicy, entry: &SheetManifestEntry) -> String {
    let name = apply_naming_policy(policy, &entry.name);
    if name.trim().is_empty() {
        format!("sheet{}", entry.position)
    } else if is_reserved_table_name(&name) {
        format!("_{}", name)
    } else {
        name
    }
}

/// SQLiteが内部用に予約している名前（`sqlite_`で始まる、大文字・小文字を区別しない）か
fn is_reserved_table_name(name: &str) -> bool {
    name.get(..7)
        .map_or(false, |prefix| prefix.eq_ignore_ascii_case("sqlite_"))
}

/// グリッドをテーブルとして格納する
///
/// 行番号1をヘッダー行とし、それ以外の宣言された行をデータ行として挿入します。
///
/// # 戻り値
///
/// (カラム名, 挿入した行数)
fn materialize<S: TableSink + ?Sized>(
    config: &ImportConfig,
    sink: &mut S,
    table: &str,
    grid: &CellGrid,
) -> Result<(Vec<String>, usize), XlsxLiteError> {
    let width = grid.width();
    let columns = header_column_names(grid.header(), width, config.naming_policy);
    sink.create_table(table, &columns)?;

    // 列のないシートは主キーのみのテーブルになる
    if width == 0 {
        return Ok((columns, 0));
    }

    let mut inserted = 0;
    // ヘッダー行がない場合は行1からデータ行になる
    let mut previous = if grid.header().is_some() { 1 } else { 0 };
    let blank = vec![Cell::Null; width];
    let mut values = Vec::with_capacity(width);

    for row in grid.rows.iter().filter(|row| row.number != 1) {
        if config.synthesize_skipped_rows && row.number > previous {
            for _ in previous + 1..row.number {
                sink.insert_row(table, &blank)?;
                inserted += 1;
            }
        }
        previous = previous.max(row.number);

        values.clear();
        values.extend((0..width).map(|i| row.get(i).clone()));
        sink.insert_row(table, &values)?;
        inserted += 1;
    }

    Ok((columns, inserted))
}
