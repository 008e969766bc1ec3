//! Package Parts
//!
//! ワークシート以外のパッケージパート（コンテンツタイプ、リレーションシップ、
//! ドキュメントプロパティ、ワークブック、スタイル、共有文字列テーブル）を生成するモジュール。

use super::worksheet::{escape_xml, text_element};
use crate::parser::SharedStringPool;
use chrono::{DateTime, Utc};

const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n";

const MAIN_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const PACKAGE_RELS_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const OFFICE_RELS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// ヘッダー用の太字スタイルを含むスタイルシート
const STYLES_XML: &str = concat!(
    "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n",
    "<styleSheet xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\">",
    "<fonts count=\"2\">",
    "<font><sz val=\"11\"/><color theme=\"1\"/><name val=\"Calibri\"/><family val=\"2\"/></font>",
    "<font><b/><sz val=\"11\"/><color theme=\"1\"/><name val=\"Calibri\"/><family val=\"2\"/></font>",
    "</fonts>",
    "<fills count=\"2\"><fill><patternFill patternType=\"none\"/></fill>",
    "<fill><patternFill patternType=\"gray125\"/></fill></fills>",
    "<borders count=\"1\"><border/></borders>",
    "<cellStyleXfs count=\"1\"><xf numFmtId=\"0\" fontId=\"0\" fillId=\"0\" borderId=\"0\"/></cellStyleXfs>",
    "<cellXfs count=\"2\">",
    "<xf numFmtId=\"0\" fontId=\"0\" fillId=\"0\" borderId=\"0\" xfId=\"0\"/>",
    "<xf numFmtId=\"0\" fontId=\"1\" fillId=\"0\" borderId=\"0\" xfId=\"0\" applyFont=\"1\"/>",
    "</cellXfs>",
    "<cellStyles count=\"1\"><cellStyle name=\"Normal\" xfId=\"0\" builtinId=\"0\"/></cellStyles>",
    "</styleSheet>"
);

/// ワークブックに登録するシート
#[derive(Debug, Clone)]
pub(super) struct PackageSheet {
    /// シート名
    pub name: String,

    /// オートフィルタの範囲（例: `A1:C4`）
    pub filter_range: Option<String>,
}

/// `[Content_Types].xml`
pub(super) fn content_types(sheet_count: usize, shared_strings: bool) -> String {
    let mut xml = String::from(XML_DECLARATION);
    xml.push_str(
        "<Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">\
         <Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>\
         <Default Extension=\"xml\" ContentType=\"application/xml\"/>\
         <Override PartName=\"/xl/workbook.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml\"/>\
         <Override PartName=\"/xl/styles.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml\"/>",
    );
    if shared_strings {
        xml.push_str(
            "<Override PartName=\"/xl/sharedStrings.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml\"/>",
        );
    }
    for n in 1..=sheet_count {
        xml.push_str(&format!(
            "<Override PartName=\"/xl/worksheets/sheet{}.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml\"/>",
            n
        ));
    }
    xml.push_str(
        "<Override PartName=\"/docProps/core.xml\" ContentType=\"application/vnd.openxmlformats-package.core-properties+xml\"/>\
         <Override PartName=\"/docProps/app.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.extended-properties+xml\"/>\
         </Types>",
    );
    xml
}

/// `_rels/.rels`
pub(super) fn root_relationships() -> String {
    format!(
        "{}<Relationships xmlns=\"{}\">\
         <Relationship Id=\"rId1\" Type=\"{}/officeDocument\" Target=\"xl/workbook.xml\"/>\
         <Relationship Id=\"rId2\" Type=\"{}/metadata/core-properties\" Target=\"docProps/core.xml\"/>\
         <Relationship Id=\"rId3\" Type=\"{}/extended-properties\" Target=\"docProps/app.xml\"/>\
         </Relationships>",
        XML_DECLARATION, PACKAGE_RELS_NS, OFFICE_RELS, PACKAGE_RELS_NS, OFFICE_RELS
    )
}

/// `docProps/core.xml`
pub(super) fn core_properties(creator: &str, created: DateTime<Utc>) -> String {
    let creator = escape_xml(creator);
    let timestamp = created.format("%Y-%m-%dT%H:%M:%SZ");
    format!(
        "{}<cp:coreProperties \
         xmlns:cp=\"http://schemas.openxmlformats.org/package/2006/metadata/core-properties\" \
         xmlns:dc=\"http://purl.org/dc/elements/1.1/\" \
         xmlns:dcterms=\"http://purl.org/dc/terms/\" \
         xmlns:dcmitype=\"http://purl.org/dc/dcmitype/\" \
         xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\">\
         <dc:creator>{}</dc:creator>\
         <cp:lastModifiedBy>{}</cp:lastModifiedBy>\
         <dcterms:created xsi:type=\"dcterms:W3CDTF\">{}</dcterms:created>\
         <dcterms:modified xsi:type=\"dcterms:W3CDTF\">{}</dcterms:modified>\
         </cp:coreProperties>",
        XML_DECLARATION, creator, creator, timestamp, timestamp
    )
}

/// `docProps/app.xml`
pub(super) fn app_properties(sheets: &[PackageSheet]) -> String {
    let mut xml = String::from(XML_DECLARATION);
    xml.push_str(
        "<Properties xmlns=\"http://schemas.openxmlformats.org/officeDocument/2006/extended-properties\" \
         xmlns:vt=\"http://schemas.openxmlformats.org/officeDocument/2006/docPropsVTypes\">\
         <Application>Microsoft Excel</Application>\
         <DocSecurity>0</DocSecurity>\
         <ScaleCrop>false</ScaleCrop>",
    );
    xml.push_str(&format!(
        "<HeadingPairs><vt:vector size=\"2\" baseType=\"variant\">\
         <vt:variant><vt:lpstr>Worksheets</vt:lpstr></vt:variant>\
         <vt:variant><vt:i4>{}</vt:i4></vt:variant>\
         </vt:vector></HeadingPairs>",
        sheets.len()
    ));
    xml.push_str(&format!(
        "<TitlesOfParts><vt:vector size=\"{}\" baseType=\"lpstr\">",
        sheets.len()
    ));
    for sheet in sheets {
        xml.push_str(&format!("<vt:lpstr>{}</vt:lpstr>", escape_xml(&sheet.name)));
    }
    xml.push_str(
        "</vt:vector></TitlesOfParts>\
         <LinksUpToDate>false</LinksUpToDate>\
         <SharedDoc>false</SharedDoc>\
         <HyperlinksChanged>false</HyperlinksChanged>\
         <AppVersion>16.0300</AppVersion>\
         </Properties>",
    );
    xml
}

/// `xl/workbook.xml`
///
/// オートフィルタを持つシートごとに、非表示の定義名`_xlnm._FilterDatabase`を登録します。
pub(super) fn workbook(sheets: &[PackageSheet]) -> String {
    let mut xml = String::from(XML_DECLARATION);
    xml.push_str(&format!(
        "<workbook xmlns=\"{}\" xmlns:r=\"{}\">\
         <bookViews><workbookView xWindow=\"0\" yWindow=\"0\" windowWidth=\"16384\" windowHeight=\"8192\"/></bookViews>\
         <sheets>",
        MAIN_NS, OFFICE_RELS
    ));
    for (i, sheet) in sheets.iter().enumerate() {
        xml.push_str(&format!(
            "<sheet name=\"{}\" sheetId=\"{}\" r:id=\"rId{}\"/>",
            escape_xml(&sheet.name),
            i + 1,
            i + 1
        ));
    }
    xml.push_str("</sheets>");

    let filters: Vec<String> = sheets
        .iter()
        .enumerate()
        .filter_map(|(i, sheet)| {
            sheet.filter_range.as_deref().map(|range| {
                format!(
                    "<definedName name=\"_xlnm._FilterDatabase\" localSheetId=\"{}\" hidden=\"1\">{}</definedName>",
                    i,
                    escape_xml(&sheet_range_reference(&sheet.name, range))
                )
            })
        })
        .collect();
    if !filters.is_empty() {
        xml.push_str("<definedNames>");
        xml.push_str(&filters.concat());
        xml.push_str("</definedNames>");
    }

    xml.push_str("<calcPr calcId=\"191029\"/></workbook>");
    xml
}

/// `xl/_rels/workbook.xml.rels`
///
/// シートが`rId1`〜`rIdN`、続いてスタイルと共有文字列テーブルです。
pub(super) fn workbook_relationships(sheet_count: usize, shared_strings: bool) -> String {
    let mut xml = String::from(XML_DECLARATION);
    xml.push_str(&format!("<Relationships xmlns=\"{}\">", PACKAGE_RELS_NS));
    for n in 1..=sheet_count {
        xml.push_str(&format!(
            "<Relationship Id=\"rId{}\" Type=\"{}/worksheet\" Target=\"worksheets/sheet{}.xml\"/>",
            n, OFFICE_RELS, n
        ));
    }
    xml.push_str(&format!(
        "<Relationship Id=\"rId{}\" Type=\"{}/styles\" Target=\"styles.xml\"/>",
        sheet_count + 1,
        OFFICE_RELS
    ));
    if shared_strings {
        xml.push_str(&format!(
            "<Relationship Id=\"rId{}\" Type=\"{}/sharedStrings\" Target=\"sharedStrings.xml\"/>",
            sheet_count + 2,
            OFFICE_RELS
        ));
    }
    xml.push_str("</Relationships>");
    xml
}

/// `xl/styles.xml`
pub(super) fn styles() -> &'static str {
    STYLES_XML
}

/// `xl/sharedStrings.xml`
///
/// `count`は参照の総数、`uniqueCount`はプールのサイズです。
pub(super) fn shared_strings(pool: &SharedStringPool, references: usize) -> String {
    let mut xml = String::from(XML_DECLARATION);
    xml.push_str(&format!(
        "<sst xmlns=\"{}\" count=\"{}\" uniqueCount=\"{}\">",
        MAIN_NS,
        references,
        pool.len()
    ));
    for text in pool.iter() {
        xml.push_str("<si>");
        xml.push_str(&text_element(text));
        xml.push_str("</si>");
    }
    xml.push_str("</sst>");
    xml
}

/// `'Sheet Name'!$A$1:$C$4`形式の参照を作る
fn sheet_range_reference(sheet: &str, range: &str) -> String {
    let absolute: Vec<String> = range.split(':').map(absolute_cell).collect();
    format!("'{}'!{}", sheet.replace('\'', "''"), absolute.join(":"))
}

/// `C4` → `$C$4`
fn absolute_cell(cell: &str) -> String {
    let split = cell
        .find(|c: char| c.is_ascii_digit())
        .unwrap_or(cell.len());
    let (letters, digits) = cell.split_at(split);
    format!("${}${}", letters, digits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sheet(name: &str, range: Option<&str>) -> PackageSheet {
        PackageSheet {
            name: name.to_string(),
            filter_range: range.map(str::to_string),
        }
    }

    #[test]
    fn test_content_types() {
        let xml = content_types(2, true);
        assert!(xml.contains("/xl/worksheets/sheet1.xml"));
        assert!(xml.contains("/xl/worksheets/sheet2.xml"));
        assert!(!xml.contains("/xl/worksheets/sheet3.xml"));
        assert!(xml.contains("/xl/sharedStrings.xml"));
        assert!(!content_types(1, false).contains("sharedStrings"));
    }

    #[test]
    fn test_workbook_lists_sheets_in_order() {
        let xml = workbook(&[sheet("users", Some("A1:B3")), sheet("R&D", None)]);
        let first = xml.find("name=\"users\" sheetId=\"1\" r:id=\"rId1\"").unwrap();
        let second = xml.find("name=\"R&amp;D\" sheetId=\"2\" r:id=\"rId2\"").unwrap();
        assert!(first < second);
        assert!(xml.contains(
            "<definedName name=\"_xlnm._FilterDatabase\" localSheetId=\"0\" hidden=\"1\">&apos;users&apos;!$A$1:$B$3</definedName>"
        ));
        assert_eq!(xml.matches("_xlnm._FilterDatabase").count(), 1);
    }

    #[test]
    fn test_workbook_without_filters() {
        let xml = workbook(&[sheet("a", None)]);
        assert!(!xml.contains("definedNames"));
    }

    #[test]
    fn test_workbook_relationships() {
        let xml = workbook_relationships(2, true);
        assert!(xml.contains("Id=\"rId2\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet\" Target=\"worksheets/sheet2.xml\""));
        assert!(xml.contains("Id=\"rId3\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles\""));
        assert!(xml.contains("Id=\"rId4\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings\""));
        assert!(!workbook_relationships(1, false).contains("sharedStrings"));
    }

    #[test]
    fn test_core_properties() {
        let created = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        let xml = core_properties("a <b>", created);
        assert!(xml.contains("<dc:creator>a &lt;b&gt;</dc:creator>"));
        assert!(xml.contains(
            "<dcterms:created xsi:type=\"dcterms:W3CDTF\">2024-03-01T12:30:00Z</dcterms:created>"
        ));
    }

    #[test]
    fn test_app_properties() {
        let xml = app_properties(&[sheet("one", None), sheet("two", None)]);
        assert!(xml.contains("<vt:i4>2</vt:i4>"));
        assert!(xml.contains("<vt:lpstr>one</vt:lpstr><vt:lpstr>two</vt:lpstr>"));
    }

    #[test]
    fn test_shared_strings() {
        let mut pool = SharedStringPool::new();
        pool.intern("name");
        pool.intern(" x");
        let xml = shared_strings(&pool, 5);
        assert!(xml.contains("count=\"5\" uniqueCount=\"2\""));
        assert!(xml.contains("<si><t>name</t></si><si><t xml:space=\"preserve\"> x</t></si>"));
    }

    #[test]
    fn test_sheet_range_reference() {
        assert_eq!(sheet_range_reference("Data", "A1:C4"), "'Data'!$A$1:$C$4");
        assert_eq!(sheet_range_reference("It's", "A1:AB10"), "'It''s'!$A$1:$AB$10");
    }
}
