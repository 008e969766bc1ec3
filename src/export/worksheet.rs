//! Worksheet Generation
//!
//! 1テーブル分のワークシートXML（`xl/worksheets/sheet<N>.xml`）を生成するモジュール。

use super::TruncationTracker;
use crate::api::StringStorage;
use crate::error::XlsxLiteError;
use crate::parser::SharedStringPool;
use crate::storage::TableSource;
use crate::types::{column_letters, StoredValue, TableSpec, MAX_CELL_CHARS, MAX_COLUMNS, MAX_ROWS};
use std::borrow::Cow;

/// ヘッダーセルのスタイル（`xl/styles.xml`の`cellXfs`の2番目、太字）
const HEADER_STYLE: u32 = 1;

/// 生成したワークシート
#[derive(Debug)]
pub(super) struct RenderedSheet {
    /// ワークシートXML
    pub xml: String,

    /// データ行の数（ヘッダー行を除く）
    pub data_rows: usize,

    /// ヘッダーとデータを含む範囲（例: `A1:C4`）
    pub range: String,
}

/// 文字列セルの出力先
pub(super) struct CellStrings<'a> {
    pub storage: StringStorage,
    pub pool: &'a mut SharedStringPool,
    pub truncation: &'a mut TruncationTracker,

    /// 共有文字列テーブルへの参照の総数
    pub references: usize,
}

impl CellStrings<'_> {
    /// 文字列セルを書き込む
    ///
    /// 32,767文字を超える値は切り詰め、その位置を記録します。
    fn write_text(
        &mut self,
        out: &mut String,
        reference: &str,
        style: Option<u32>,
        text: &str,
        location: (&str, u32, u32),
    ) {
        let text = match truncate_chars(text, MAX_CELL_CHARS) {
            Some(head) => {
                self.truncation.record(location.0, location.1, location.2);
                head
            }
            None => text,
        };

        let style = style
            .map(|s| format!(" s=\"{}\"", s))
            .unwrap_or_default();
        match self.storage {
            StringStorage::Shared => {
                let index = self.pool.intern(text);
                self.references += 1;
                out.push_str(&format!(
                    "<c r=\"{}\"{} t=\"s\"><v>{}</v></c>",
                    reference, style, index
                ));
            }
            StringStorage::Inline => {
                out.push_str(&format!(
                    "<c r=\"{}\"{} t=\"inlineStr\"><is>{}</is></c>",
                    reference,
                    style,
                    text_element(text)
                ));
            }
        }
    }
}

/// テーブルを走査してワークシートXMLを生成する
///
/// # 引数
///
/// * `source` - テーブルの読み出し元
/// * `spec` - 対象テーブルの仕様
/// * `autofilter` - オートフィルタを設定するか
/// * `strings` - 文字列セルの出力先
///
/// # 戻り値
///
/// * `Ok(RenderedSheet)` - 生成したワークシート
/// * `Err(XlsxLiteError::Storage)` - テーブルの走査に失敗した場合
/// * `Err(XlsxLiteError::Config)` - 列数または行数がシートの上限を超える場合
pub(super) fn render_worksheet<S: TableSource + ?Sized>(
    source: &S,
    spec: &TableSpec,
    autofilter: bool,
    strings: &mut CellStrings<'_>,
) -> Result<RenderedSheet, XlsxLiteError> {
    let table = spec.source_table.as_str();
    if spec.columns.len() > MAX_COLUMNS as usize {
        return Err(XlsxLiteError::Config(format!(
            "Table '{}' has {} columns; a worksheet holds at most {}",
            table,
            spec.columns.len(),
            MAX_COLUMNS
        )));
    }
    let width = spec.columns.len() as u32;
    let letters: Vec<String> = (1..=width).map(column_letters).collect();

    // 1. ヘッダー行（太字）
    let mut sheet_data = String::from("<sheetData><row r=\"1\">");
    for (i, column) in spec.columns.iter().enumerate() {
        let reference = format!("{}1", letters[i]);
        strings.write_text(
            &mut sheet_data,
            &reference,
            Some(HEADER_STYLE),
            &column.name,
            (table, 1, i as u32 + 1),
        );
    }
    sheet_data.push_str("</row>");

    // 2. データ行
    let mut row_number: u32 = 1;
    source.scan(table, &mut |values| {
        check_row_limit(table, row_number)?;
        row_number += 1;
        sheet_data.push_str(&format!("<row r=\"{}\">", row_number));
        for (i, value) in values.iter().enumerate().take(letters.len()) {
            let reference = format!("{}{}", letters[i], row_number);
            let location = (table, row_number, i as u32 + 1);
            match value {
                StoredValue::Null => {
                    sheet_data.push_str(&format!("<c r=\"{}\"/>", reference));
                }
                StoredValue::Integer(n) => {
                    sheet_data.push_str(&format!("<c r=\"{}\"><v>{}</v></c>", reference, n));
                }
                StoredValue::Real(f) if f.is_finite() => {
                    sheet_data.push_str(&format!(
                        "<c r=\"{}\"><v>{}</v></c>",
                        reference,
                        format_real(*f)
                    ));
                }
                StoredValue::Real(f) => {
                    strings.write_text(&mut sheet_data, &reference, None, &f.to_string(), location);
                }
                StoredValue::Text(s) => {
                    strings.write_text(&mut sheet_data, &reference, None, s, location);
                }
                StoredValue::Blob(bytes) => {
                    strings.write_text(&mut sheet_data, &reference, None, &hex_upper(bytes), location);
                }
            }
        }
        sheet_data.push_str("</row>");
        Ok(())
    })?;
    sheet_data.push_str("</sheetData>");

    // 3. 範囲・ディメンション・オートフィルタ
    let last_column = letters.last().map(String::as_str).unwrap_or("A");
    let range = format!("A1:{}{}", last_column, row_number);

    let mut xml = String::with_capacity(sheet_data.len() + 512);
    xml.push_str(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
         <worksheet xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\" \
         xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\">",
    );
    xml.push_str(&format!("<dimension ref=\"{}\"/>", range));
    xml.push_str(&sheet_data);
    if autofilter && width > 0 {
        xml.push_str(&format!("<autoFilter ref=\"{}\"/>", range));
    }
    xml.push_str("</worksheet>");

    Ok(RenderedSheet {
        xml,
        data_rows: (row_number - 1) as usize,
        range,
    })
}

/// 上限を超える場合、先頭`max`文字を返す
///
/// 上限以内の場合は`None`を返します。
pub(super) fn truncate_chars(text: &str, max: usize) -> Option<&str> {
    // バイト長が上限以内なら文字数も上限以内
    if text.len() <= max {
        return None;
    }
    text.char_indices().nth(max).map(|(i, _)| &text[..i])
}

/// 次のデータ行がシートの最大行数に収まるか確認する
fn check_row_limit(table: &str, last_row: u32) -> Result<(), XlsxLiteError> {
    if last_row >= MAX_ROWS {
        return Err(XlsxLiteError::Config(format!(
            "Table '{}' has more than {} data rows; a worksheet holds at most {} rows",
            table,
            MAX_ROWS - 1,
            MAX_ROWS
        )));
    }
    Ok(())
}

/// 実数を`<v>`要素の10進表記に変換する
fn format_real(value: f64) -> String {
    let magnitude = value.abs();
    if magnitude != 0.0 && !(1e-5..1e15).contains(&magnitude) {
        format!("{:e}", value)
    } else {
        value.to_string()
    }
}

/// バイナリを大文字の16進文字列に変換する
fn hex_upper(bytes: &[u8]) -> String {
    const DIGITS: &[u8; 16] = b"0123456789ABCDEF";
    let mut hex = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        hex.push(char::from(DIGITS[usize::from(b >> 4)]));
        hex.push(char::from(DIGITS[usize::from(b & 0x0F)]));
    }
    hex
}

/// XML 1.0で使用できる文字かどうか
fn is_xml_char(c: char) -> bool {
    matches!(
        c,
        '\t' | '\n' | '\r' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}'
    )
}

/// テキストをXMLの文字データ・属性値としてエスケープする
///
/// XML 1.0で使用できない制御文字は除去し、`\r`は文字参照にします。
pub(crate) fn escape_xml(text: &str) -> String {
    let cleaned: Cow<'_, str> = if text.chars().all(is_xml_char) {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(text.chars().filter(|c| is_xml_char(*c)).collect())
    };
    let escaped = quick_xml::escape::escape(cleaned.as_ref());
    if escaped.contains('\r') {
        escaped.replace('\r', "&#xD;")
    } else {
        escaped.into_owned()
    }
}

/// `<t>`要素を生成する
///
/// 先頭・末尾に空白がある場合は`xml:space="preserve"`を付けます。
pub(crate) fn text_element(text: &str) -> String {
    let preserve = text.starts_with(char::is_whitespace) || text.ends_with(char::is_whitespace);
    if preserve {
        format!("<t xml:space=\"preserve\">{}</t>", escape_xml(text))
    } else {
        format!("<t>{}</t>", escape_xml(text))
    }
}
