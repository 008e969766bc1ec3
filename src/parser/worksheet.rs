//! Worksheet Grid Reconstruction
//!
//! ワークシートのXML（`xl/worksheets/sheet<N>.xml`）から、行×列のセルグリッドを
//! 再構築するモジュール。
//!
//! ワークシートは空のセルを宣言しないため、セル参照（例: `AB67`）の列番号から
//! 省略された列を復元し、各行が0列目から最大宣言列までの`Cell`を持つようにします。
//! 省略された行は復元しません（宣言された行番号をそのまま保持します）。

use super::shared_strings::SharedStringPool;
use super::xml::{parse_part, Tag, XmlEvent, XmlHandler};
use crate::error::XlsxLiteError;
use crate::types::{column_letters, split_cell_ref, Cell, CellGrid, Row, MAX_COLUMNS};

/// セルの型属性（`t`）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellKind {
    /// 数値（`t`省略時または`t="n"`）
    Number,
    /// 共有文字列インデックス（`t="s"`）
    Shared,
    /// インライン文字列（`t="inlineStr"`）
    Inline,
    /// 論理値（`t="b"`）
    Boolean,
    /// 数式の文字列結果・エラー値・ISO日付（`t="str"`, `t="e"`, `t="d"`）
    Literal,
}

impl CellKind {
    fn from_attr(value: Option<&str>) -> Self {
        match value {
            Some("s") => CellKind::Shared,
            Some("inlineStr") => CellKind::Inline,
            Some("b") => CellKind::Boolean,
            Some("str") | Some("e") | Some("d") => CellKind::Literal,
            _ => CellKind::Number,
        }
    }
}

/// 処理中のセル
#[derive(Debug)]
struct PendingCell {
    column: u32,
    reference: String,
    kind: CellKind,
    value: String,
    has_value: bool,
}

/// ワークシートのイベント列からセルグリッドを構築する状態機械
pub(crate) struct GridBuilder<'p> {
    part: String,
    pool: &'p SharedStringPool,
    rows: Vec<Row>,

    in_sheet_data: bool,
    row: Option<Row>,
    last_row: u32,
    cell: Option<PendingCell>,
    last_column: u32,

    in_value: bool,
    in_inline: bool,
    in_text: bool,
    phonetic_depth: usize,

    /// 解決できなかった共有文字列参照の数
    unresolved: usize,
}

impl<'p> GridBuilder<'p> {
    /// 新しいビルダーを生成
    ///
    /// # 引数
    ///
    /// * `part` - ワークシートのパート名（エラーメッセージ用）
    /// * `pool` - 共有文字列プール
    pub fn new(part: &str, pool: &'p SharedStringPool) -> Self {
        Self {
            part: part.to_string(),
            pool,
            rows: Vec::new(),
            in_sheet_data: false,
            row: None,
            last_row: 0,
            cell: None,
            last_column: 0,
            in_value: false,
            in_inline: false,
            in_text: false,
            phonetic_depth: 0,
            unresolved: 0,
        }
    }

    /// 構築したグリッドを取り出す
    pub fn finish(self) -> CellGrid {
        if self.unresolved > 0 {
            log::warn!(
                "{}: {} shared string reference(s) could not be resolved and were imported as empty text",
                self.part,
                self.unresolved
            );
        }
        CellGrid { rows: self.rows }
    }

    fn open_row(&mut self, tag: &Tag) -> Result<(), XlsxLiteError> {
        let number = match tag.attr("r") {
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(XlsxLiteError::malformed(
                        &self.part,
                        format!("invalid row number '{}'", raw),
                    ))
                }
            },
            None => self.last_row + 1,
        };
        self.last_row = number;
        self.last_column = 0;
        self.row = Some(Row::new(number));
        Ok(())
    }

    fn open_cell(&mut self, tag: &Tag) -> Result<(), XlsxLiteError> {
        let row_number = self.last_row;
        let (column, reference) = match tag.attr("r") {
            Some(reference) => match split_cell_ref(reference) {
                Some((Some(column), _)) => (column, reference.to_string()),
                _ => {
                    return Err(XlsxLiteError::malformed(
                        &self.part,
                        format!("invalid cell reference '{}' in row {}", reference, row_number),
                    ))
                }
            },
            None => {
                let column = self.last_column.saturating_add(1);
                (column, format!("{}{}", column_letters(column), row_number))
            }
        };

        if column > MAX_COLUMNS {
            return Err(XlsxLiteError::malformed(
                &self.part,
                format!(
                    "cell {}: column {} exceeds the maximum of {} (XFD)",
                    reference, column, MAX_COLUMNS
                ),
            ));
        }

        self.last_column = column;
        self.cell = Some(PendingCell {
            column,
            reference,
            kind: CellKind::from_attr(tag.attr("t")),
            value: String::new(),
            has_value: false,
        });
        Ok(())
    }

    fn close_cell(&mut self) {
        let Some(pending) = self.cell.take() else {
            return;
        };
        let cell = self.resolve(&pending);
        if let Some(row) = self.row.as_mut() {
            row.set(pending.column, cell);
        }
    }

    /// セルの型属性に従って値を決定する
    fn resolve(&mut self, pending: &PendingCell) -> Cell {
        if !pending.has_value {
            return Cell::Null;
        }
        let raw = &pending.value;

        match pending.kind {
            CellKind::Number => {
                if raw.trim().is_empty() {
                    Cell::Null
                } else {
                    Cell::Number(raw.clone())
                }
            }
            CellKind::Shared => {
                let resolved = raw
                    .trim()
                    .parse::<usize>()
                    .ok()
                    .and_then(|index| self.pool.resolve(index).ok());
                match resolved {
                    Some(text) => Cell::Text(text.to_string()),
                    None => {
                        log::debug!(
                            "{}: cell {}: unresolved shared string reference '{}'",
                            self.part,
                            pending.reference,
                            raw
                        );
                        self.unresolved += 1;
                        Cell::Text(String::new())
                    }
                }
            }
            CellKind::Inline | CellKind::Literal => Cell::Text(raw.clone()),
            CellKind::Boolean => match raw.trim() {
                "1" | "true" | "TRUE" => Cell::Boolean(true),
                "0" | "false" | "FALSE" => Cell::Boolean(false),
                _ => Cell::Text(raw.clone()),
            },
        }
    }
}

impl XmlHandler for GridBuilder<'_> {
    fn handle(&mut self, event: XmlEvent) -> Result<(), XlsxLiteError> {
        match event {
            XmlEvent::Open(tag) => match tag.name.as_str() {
                "sheetData" => self.in_sheet_data = true,
                "row" if self.in_sheet_data => self.open_row(&tag)?,
                "c" if self.row.is_some() => self.open_cell(&tag)?,
                "v" if self.cell.is_some() => self.in_value = true,
                "is" if self.cell.is_some() => self.in_inline = true,
                "rPh" if self.in_inline => self.phonetic_depth += 1,
                "t" if self.in_inline && self.phonetic_depth == 0 => self.in_text = true,
                _ => {}
            },
            XmlEvent::Text(text) => {
                if self.in_value || self.in_text {
                    if let Some(cell) = self.cell.as_mut() {
                        cell.value.push_str(&text);
                        cell.has_value = true;
                    }
                }
            }
            XmlEvent::Close(name) => match name.as_str() {
                "v" => self.in_value = false,
                "t" => self.in_text = false,
                "rPh" => self.phonetic_depth = self.phonetic_depth.saturating_sub(1),
                "is" => {
                    self.in_inline = false;
                    // <is><t/></is> は空文字列として扱う
                    if let Some(cell) = self.cell.as_mut() {
                        cell.has_value = true;
                    }
                }
                "c" => self.close_cell(),
                "row" => {
                    if let Some(row) = self.row.take() {
                        self.rows.push(row);
                    }
                }
                "sheetData" => self.in_sheet_data = false,
                _ => {}
            },
        }
        Ok(())
    }
}

/// ワークシートのXMLを解析してセルグリッドを返す
///
/// # 引数
///
/// * `part` - ワークシートのパート名
/// * `bytes` - ワークシートのXML
/// * `pool` - 共有文字列プール
///
/// # 戻り値
///
/// * `Ok(CellGrid)` - 解析に成功した場合
/// * `Err(XlsxLiteError::MalformedXml)` - XMLが不正、またはセル参照が不正・範囲外の場合
pub(crate) fn parse_worksheet(
    part: &str,
    bytes: &[u8],
    pool: &SharedStringPool,
) -> Result<CellGrid, XlsxLiteError> {
    let mut builder = GridBuilder::new(part, pool);
    parse_part(part, bytes, &mut builder)?;
    let grid = builder.finish();
    log::debug!("{}: {} row(s), width {}", part, grid.rows.len(), grid.width());
    Ok(grid)
}
