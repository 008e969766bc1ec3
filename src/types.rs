//! Types Module
//!
//! クレート全体で使用する共通データ型と、列番号の文字列表現（A, B, ..., XFD）の
//! 相互変換を定義するモジュール。

use serde::Serialize;

/// 1シートあたりの最大列数（`XFD`列）
pub const MAX_COLUMNS: u32 = 16_384;

/// 1シートあたりの最大行数（ヘッダー行を含む）
pub const MAX_ROWS: u32 = 1_048_576;

/// 1セルに格納できる最大文字数
pub const MAX_CELL_CHARS: usize = 32_767;

/// シート名の最大文字数
pub const MAX_SHEET_NAME_CHARS: usize = 31;

/// 1始まりの列番号を列文字列に変換する
///
/// 各桁が1〜26の値をとる（0に対応する文字がない）26進表記です。
/// `0`を渡した場合は空文字列を返します。
///
/// # 使用例
///
/// ```rust
/// use xlsxlite::column_letters;
///
/// assert_eq!(column_letters(1), "A");
/// assert_eq!(column_letters(26), "Z");
/// assert_eq!(column_letters(27), "AA");
/// assert_eq!(column_letters(16384), "XFD");
/// ```
pub fn column_letters(column: u32) -> String {
    let mut letters = Vec::new();
    let mut n = column;
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    // ASCII大文字のみで構成されるため変換は失敗しない
    letters.into_iter().map(char::from).collect()
}

/// 列文字列を1始まりの列番号に変換する
///
/// 各文字について `value * 26 + (letter - 'A' + 1)` を累積します。
/// 大文字小文字は区別しません。空文字列、英字以外の文字、`u32`の範囲を超える値の場合は
/// `None`を返します。
///
/// # 使用例
///
/// ```rust
/// use xlsxlite::column_number;
///
/// assert_eq!(column_number("Z"), Some(26));
/// assert_eq!(column_number("AA"), Some(27));
/// assert_eq!(column_number("AZ"), Some(52));
/// assert_eq!(column_number("BA"), Some(53));
/// assert_eq!(column_number(""), None);
/// ```
pub fn column_number(letters: &str) -> Option<u32> {
    if letters.is_empty() {
        return None;
    }

    let mut value: u32 = 0;
    for b in letters.bytes() {
        if !b.is_ascii_alphabetic() {
            return None;
        }
        let digit = u32::from(b.to_ascii_uppercase() - b'A' + 1);
        value = value.checked_mul(26)?.checked_add(digit)?;
    }
    Some(value)
}

/// セル参照（例: `AB67`）を列番号と行番号（いずれも1始まり）に分解する
///
/// 先頭の英字部分を列、末尾の数字部分を行として解釈します。
/// どちらかの部分が省略されている場合（例: `AB`や`67`）は、その部分が`None`になります。
/// 英字・数字以外の文字が含まれる、または数字の後に英字が続く場合は`None`を返します。
pub(crate) fn split_cell_ref(reference: &str) -> Option<(Option<u32>, Option<u32>)> {
    let split = reference
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(reference.len());
    let (letters, digits) = reference.split_at(split);

    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let column = if letters.is_empty() {
        None
    } else {
        Some(column_number(letters)?)
    };
    let row = if digits.is_empty() {
        None
    } else {
        Some(digits.parse::<u32>().ok()?)
    };
    Some((column, row))
}

/// インポート時のセル値
///
/// 数値はこの層では型付けせず、XML上の文字列をそのまま保持します。
/// 型推論は格納時（`TableSink::insert_row`）に行われます。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    /// 空セル（宣言されていない、または値を持たないセル）
    Null,

    /// 数値（10進表記の文字列をそのまま保持）
    Number(String),

    /// 文字列
    Text(String),

    /// 論理値
    Boolean(bool),
}

impl Cell {
    /// 空セルかどうかを判定
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    /// 表示用テキストを取得（空セルは`None`）
    pub fn as_text(&self) -> Option<String> {
        match self {
            Cell::Null => None,
            Cell::Number(n) => Some(n.clone()),
            Cell::Text(s) => Some(s.clone()),
            Cell::Boolean(b) => Some(if *b { "1" } else { "0" }.to_string()),
        }
    }
}

/// 再構築された1行分のセル
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    /// ワークシート上で宣言された行番号（1始まり）
    pub number: u32,

    /// 列インデックス0から最大宣言列までのセル（未宣言の列は`Cell::Null`）
    pub cells: Vec<Cell>,
}

impl Row {
    /// 空の行を生成
    pub fn new(number: u32) -> Self {
        Self {
            number,
            cells: Vec::new(),
        }
    }

    /// 1始まりの列番号にセルを配置する
    ///
    /// 既存の末尾と指定列の間にある未宣言の列は`Cell::Null`で埋められます。
    /// 同じ列が複数回宣言された場合は後の値で上書きします。
    pub fn set(&mut self, column: u32, cell: Cell) {
        let index = column.saturating_sub(1) as usize;
        if index >= self.cells.len() {
            self.cells.resize(index + 1, Cell::Null);
        }
        self.cells[index] = cell;
    }

    /// 0始まりの列インデックスのセルを取得（範囲外は`Cell::Null`）
    pub fn get(&self, index: usize) -> &Cell {
        self.cells.get(index).unwrap_or(&Cell::Null)
    }

    /// 行の幅（最大宣言列）
    pub fn width(&self) -> usize {
        self.cells.len()
    }
}

/// 1シート分のセルグリッド
///
/// 行は宣言順に保持されます。ワークシートで省略された行は含まれません。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CellGrid {
    /// 宣言された行
    pub rows: Vec<Row>,
}

impl CellGrid {
    /// すべての行の中で最大の幅
    pub fn width(&self) -> usize {
        self.rows.iter().map(Row::width).max().unwrap_or(0)
    }

    /// 行番号1（ヘッダー行）を取得
    pub fn header(&self) -> Option<&Row> {
        self.rows.iter().find(|row| row.number == 1)
    }
}

/// ワークブックマニフェスト（`xl/workbook.xml`）の1シート分のエントリ
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SheetManifestEntry {
    /// シートの表示名
    pub name: String,

    /// マニフェスト上の位置（1始まり）
    pub position: u32,

    /// `sheetId`属性の値
    pub sheet_id: u32,

    /// `r:id`属性の値（リレーションシップID）
    pub relationship_id: Option<String>,
}

/// テーブルのカラム情報
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnInfo {
    /// カラム名
    pub name: String,

    /// 宣言された型（型宣言がない場合は空文字列）
    pub declared_type: String,
}

/// エクスポート対象1テーブル分の仕様
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSpec {
    /// サニタイズ・一意化済みのシート名（31文字以内）
    pub sheet_name: String,

    /// 元のテーブル名
    pub source_table: String,

    /// カラム一覧（宣言順）
    pub columns: Vec<ColumnInfo>,
}

/// ストレージから読み出した型付きの値
#[derive(Debug, Clone, PartialEq)]
pub enum StoredValue {
    /// NULL
    Null,

    /// 整数
    Integer(i64),

    /// 浮動小数点数
    Real(f64),

    /// 文字列
    Text(String),

    /// バイナリ
    Blob(Vec<u8>),
}
