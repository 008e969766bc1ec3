//! Archive Tests
//!
//! `zip::ZipWriter`で直接組み立てたパッケージを使い、他のツールが生成しうる
//! 最小限・不完全なXLSXの取り込みを検証します。

use rusqlite::types::Value;
use rusqlite::Connection;
use std::io::{Cursor, Write};
use xlsxlite::{ImportBuilder, ImportReport, SheetSelector, XlsxLiteError};
use zip::write::{FileOptions, ZipWriter};
use zip::CompressionMethod;

/// パート名と内容からZIPアーカイブを作成
fn build_package(parts: &[(&str, &str)]) -> Vec<u8> {
    let mut zip_data = Vec::new();
    {
        let mut zip = ZipWriter::new(Cursor::new(&mut zip_data));
        let options = FileOptions::default().compression_method(CompressionMethod::Stored);
        for (name, content) in parts {
            zip.start_file(*name, options).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }
    zip_data
}

fn workbook_xml(sheets: &[(&str, u32)]) -> String {
    let entries: String = sheets
        .iter()
        .map(|(name, id)| format!("<sheet name=\"{}\" sheetId=\"{}\"/>", name, id))
        .collect();
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <workbook xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\">\
         <sheets>{}</sheets></workbook>",
        entries
    )
}

fn sheet_xml(rows: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <worksheet xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\">\
         <sheetData>{}</sheetData></worksheet>",
        rows
    )
}

const SIMPLE_ROWS: &str = "<row r=\"1\"><c r=\"A1\" t=\"inlineStr\"><is><t>v</t></is></c></row>\
                           <row r=\"2\"><c r=\"A2\"><v>10</v></c></row>";

fn import_with(builder: ImportBuilder, bytes: Vec<u8>) -> Result<(Connection, ImportReport), XlsxLiteError> {
    let conn = Connection::open_in_memory().unwrap();
    let report = builder.build()?.import_reader(&conn, Cursor::new(bytes))?;
    Ok((conn, report))
}

fn query_rows(conn: &Connection, sql: &str) -> Vec<Vec<Value>> {
    let mut stmt = conn.prepare(sql).unwrap();
    let width = stmt.column_count();
    let rows = stmt
        .query_map([], |row| {
            (0..width)
                .map(|i| row.get::<_, Value>(i))
                .collect::<rusqlite::Result<Vec<Value>>>()
        })
        .unwrap();
    rows.map(Result::unwrap).collect()
}

// 番号の選択子はsheetIdより位置を優先するテスト
#[test]
fn test_number_selector_matches_position_before_sheet_id() {
    let workbook = workbook_xml(&[("First", 1), ("Second", 5)]);
    let second = sheet_xml(
        "<row r=\"1\"><c r=\"A1\" t=\"inlineStr\"><is><t>name</t></is></c></row>\
         <row r=\"2\"><c r=\"A2\" t=\"inlineStr\"><is><t>from second</t></is></c></row>",
    );
    let bytes = build_package(&[
        ("xl/workbook.xml", &workbook),
        ("xl/worksheets/sheet1.xml", &sheet_xml(SIMPLE_ROWS)),
        ("xl/worksheets/sheet2.xml", &second),
    ]);

    let (conn, report) = import_with(
        ImportBuilder::new().with_sheet_selector(SheetSelector::Number(2)),
        bytes,
    )
    .unwrap();

    assert_eq!(report.tables_created(), 1);
    assert_eq!(report.tables[0].sheet_name, "Second");
    assert_eq!(
        query_rows(&conn, "SELECT name FROM \"Second\""),
        vec![vec![Value::Text("from second".to_string())]]
    );
}

#[test]
fn test_number_selector_falls_back_to_sheet_id() {
    let workbook = workbook_xml(&[("First", 1), ("Second", 5)]);
    let bytes = build_package(&[
        ("xl/workbook.xml", &workbook),
        ("xl/worksheets/sheet1.xml", &sheet_xml(SIMPLE_ROWS)),
        ("xl/worksheets/sheet2.xml", &sheet_xml(SIMPLE_ROWS)),
    ]);

    let (_conn, report) = import_with(
        ImportBuilder::new().with_sheet_selector(SheetSelector::Number(5)),
        bytes,
    )
    .unwrap();
    assert_eq!(report.tables[0].sheet_name, "Second");
}

// 共有文字列の範囲外インデックスは空文字列になるテスト
#[test]
fn test_out_of_range_shared_string_becomes_empty() {
    let sst = "<sst xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\" count=\"1\" uniqueCount=\"1\">\
               <si><t>header</t></si></sst>";
    let rows = "<row r=\"1\"><c r=\"A1\" t=\"s\"><v>0</v></c><c r=\"B1\" t=\"s\"><v>0</v></c></row>\
                <row r=\"2\"><c r=\"A2\" t=\"s\"><v>7</v></c><c r=\"B2\"><v>1</v></c></row>";
    let bytes = build_package(&[
        ("xl/workbook.xml", &workbook_xml(&[("S", 1)])),
        ("xl/sharedStrings.xml", sst),
        ("xl/worksheets/sheet1.xml", &sheet_xml(rows)),
    ]);

    let (conn, report) = import_with(ImportBuilder::new(), bytes).unwrap();
    assert_eq!(report.tables[0].columns, vec!["header", "header_1"]);
    assert_eq!(
        query_rows(&conn, "SELECT * FROM \"S\""),
        vec![vec![Value::Text(String::new()), Value::Integer(1)]]
    );
}

// 不正なシートはスキップして続行するテスト
#[test]
fn test_malformed_sheet_is_skipped() {
    let bytes = build_package(&[
        ("xl/workbook.xml", &workbook_xml(&[("Broken", 1), ("Good", 2)])),
        ("xl/worksheets/sheet1.xml", "<worksheet><sheetData><row r=\"1\">"),
        ("xl/worksheets/sheet2.xml", &sheet_xml(SIMPLE_ROWS)),
    ]);

    let (_conn, report) = import_with(ImportBuilder::new(), bytes).unwrap();
    assert_eq!(report.tables_created(), 1);
    assert_eq!(report.tables[0].table_name, "Good");
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].sheet_name, "Broken");
    assert!(report.skipped[0].reason.contains("xl/worksheets/sheet1.xml"));
}

#[test]
fn test_missing_sheet_is_skipped() {
    let bytes = build_package(&[
        ("xl/workbook.xml", &workbook_xml(&[("Present", 1), ("Absent", 2)])),
        ("xl/worksheets/sheet1.xml", &sheet_xml(SIMPLE_ROWS)),
    ]);

    let (_conn, report) = import_with(ImportBuilder::new(), bytes).unwrap();
    assert_eq!(report.tables_created(), 1);
    assert_eq!(report.skipped[0].sheet_name, "Absent");
    assert!(report.skipped[0].reason.contains("not found"));
}

// 列がXFDを超えるシートのテスト
#[test]
fn test_column_beyond_xfd_is_skipped() {
    let rows = "<row r=\"1\"><c r=\"XFE1\"><v>1</v></c></row>";
    let bytes = build_package(&[
        ("xl/workbook.xml", &workbook_xml(&[("Wide", 1)])),
        ("xl/worksheets/sheet1.xml", &sheet_xml(rows)),
    ]);

    let (_conn, report) = import_with(ImportBuilder::new(), bytes).unwrap();
    assert_eq!(report.tables_created(), 0);
    assert!(report.skipped[0].reason.contains("XFE1"));
}

#[test]
fn test_missing_workbook_is_fatal() {
    let bytes = build_package(&[("xl/worksheets/sheet1.xml", &sheet_xml(SIMPLE_ROWS))]);

    let result = import_with(ImportBuilder::new(), bytes);
    match result {
        Err(XlsxLiteError::EntryNotFound { entry }) => assert_eq!(entry, "xl/workbook.xml"),
        other => panic!("Expected EntryNotFound, got {:?}", other.map(|(_, r)| r)),
    }
}

// リレーションシップによるワークシートの解決のテスト
#[test]
fn test_relationship_target_is_used() {
    let workbook = "<workbook xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\" \
                    xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\">\
                    <sheets><sheet name=\"Data\" sheetId=\"1\" r:id=\"rId3\"/></sheets></workbook>";
    let rels = "<Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\
                <Relationship Id=\"rId3\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet\" Target=\"/xl/worksheets/data.xml\"/>\
                </Relationships>";
    let bytes = build_package(&[
        ("xl/workbook.xml", workbook),
        ("xl/_rels/workbook.xml.rels", rels),
        ("xl/worksheets/data.xml", &sheet_xml(SIMPLE_ROWS)),
    ]);

    let (conn, report) = import_with(ImportBuilder::new(), bytes).unwrap();
    assert_eq!(report.tables_created(), 1);
    assert_eq!(
        query_rows(&conn, "SELECT v FROM \"Data\""),
        vec![vec![Value::Integer(10)]]
    );
}

// r属性のないセル・行と各種セル型のテスト
#[test]
fn test_cells_without_references_and_cell_types() {
    let rows = "<row><c t=\"inlineStr\"><is><t>a</t></is></c><c t=\"inlineStr\"><is><t>b</t></is></c>\
                <c t=\"inlineStr\"><is><t>c</t></is></c><c t=\"inlineStr\"><is><t>d</t></is></c></row>\
                <row><c t=\"b\"><v>0</v></c><c t=\"e\"><v>#DIV/0!</v></c>\
                <c t=\"str\"><f>A1&amp;\"x\"</f><v>ax</v></c><c/></row>";
    let bytes = build_package(&[
        ("xl/workbook.xml", &workbook_xml(&[("Types", 1)])),
        ("xl/worksheets/sheet1.xml", &sheet_xml(rows)),
    ]);

    let (conn, report) = import_with(ImportBuilder::new(), bytes).unwrap();
    assert_eq!(report.tables[0].columns, vec!["a", "b", "c", "d"]);
    assert_eq!(
        query_rows(&conn, "SELECT a, b, c, d FROM \"Types\""),
        vec![vec![
            Value::Integer(0),
            Value::Text("#DIV/0!".to_string()),
            Value::Text("ax".to_string()),
            Value::Null
        ]]
    );
}

// 行番号1がないシートのテスト
#[test]
fn test_sheet_without_header_row() {
    let rows = "<row r=\"2\"><c r=\"A2\"><v>1</v></c><c r=\"B2\"><v>2</v></c></row>\
                <row r=\"3\"><c r=\"A3\"><v>3</v></c></row>";
    let bytes = build_package(&[
        ("xl/workbook.xml", &workbook_xml(&[("NoHeader", 1)])),
        ("xl/worksheets/sheet1.xml", &sheet_xml(rows)),
    ]);

    let (conn, report) = import_with(ImportBuilder::new(), bytes).unwrap();
    assert_eq!(report.tables[0].columns, vec!["col1", "col2"]);
    assert_eq!(
        query_rows(&conn, "SELECT col1, col2 FROM \"NoHeader\" ORDER BY rowid"),
        vec![
            vec![Value::Integer(1), Value::Integer(2)],
            vec![Value::Integer(3), Value::Null]
        ]
    );
}

#[test]
fn test_list_sheets() {
    let bytes = build_package(&[("xl/workbook.xml", &workbook_xml(&[("A", 3), ("B", 1)]))]);

    let sheets = xlsxlite::list_sheets(Cursor::new(bytes.clone())).unwrap();
    assert_eq!(sheets[0].sheet_id, 3);
    assert_eq!(sheets[1].position, 2);

    let names = xlsxlite::list_sheet_names(Cursor::new(bytes)).unwrap();
    assert_eq!(names, vec![(1, "A".to_string()), (2, "B".to_string())]);
}
