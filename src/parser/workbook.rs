//! Workbook Manifest
//!
//! ワークブックマニフェスト（`xl/workbook.xml`）とワークブックのリレーションシップ
//! （`xl/_rels/workbook.xml.rels`）を解析するモジュール。

use super::xml::{parse_part, XmlEvent, XmlHandler};
use crate::error::XlsxLiteError;
use crate::types::SheetManifestEntry;
use std::collections::HashMap;

/// ワークブックマニフェストのパート名
pub(crate) const WORKBOOK_PART: &str = "xl/workbook.xml";

/// ワークブックのリレーションシップのパート名
pub(crate) const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";

/// `<sheets>`内の`<sheet>`要素からマニフェストを構築する状態機械
#[derive(Debug, Default)]
pub(crate) struct ManifestBuilder {
    in_sheets: bool,
    entries: Vec<SheetManifestEntry>,
}

impl ManifestBuilder {
    /// マニフェスト順のエントリを取り出す
    pub fn finish(self) -> Vec<SheetManifestEntry> {
        self.entries
    }
}

impl XmlHandler for ManifestBuilder {
    fn handle(&mut self, event: XmlEvent) -> Result<(), XlsxLiteError> {
        match event {
            XmlEvent::Open(tag) if tag.name == "sheets" => self.in_sheets = true,
            XmlEvent::Close(name) if name == "sheets" => self.in_sheets = false,
            XmlEvent::Open(tag) if tag.name == "sheet" && self.in_sheets => {
                let position = self.entries.len() as u32 + 1;
                let sheet_id = match tag.attr("sheetId") {
                    Some(raw) => raw.trim().parse::<u32>().map_err(|_| {
                        XlsxLiteError::malformed(
                            WORKBOOK_PART,
                            format!("sheet #{}: invalid sheetId '{}'", position, raw),
                        )
                    })?,
                    None => position,
                };
                self.entries.push(SheetManifestEntry {
                    name: tag.attr("name").unwrap_or_default().to_string(),
                    position,
                    sheet_id,
                    relationship_id: tag.attr("id").map(str::to_string),
                });
            }
            _ => {}
        }
        Ok(())
    }
}

/// `<Relationship>`要素からId→Targetの対応表を構築する状態機械
///
/// 外部リソースを指すリレーションシップ（`TargetMode="External"`）は無視します。
#[derive(Debug, Default)]
pub(crate) struct RelationshipsBuilder {
    targets: HashMap<String, String>,
}

impl RelationshipsBuilder {
    /// 対応表を取り出す
    pub fn finish(self) -> HashMap<String, String> {
        self.targets
    }
}

impl XmlHandler for RelationshipsBuilder {
    fn handle(&mut self, event: XmlEvent) -> Result<(), XlsxLiteError> {
        if let XmlEvent::Open(tag) = event {
            if tag.name == "Relationship" && tag.attr("TargetMode") != Some("External") {
                if let (Some(id), Some(target)) = (tag.attr("Id"), tag.attr("Target")) {
                    self.targets.insert(id.to_string(), target.to_string());
                }
            }
        }
        Ok(())
    }
}

/// `xl/workbook.xml`を解析してマニフェストを返す
pub(crate) fn parse_manifest(bytes: &[u8]) -> Result<Vec<SheetManifestEntry>, XlsxLiteError> {
    let mut builder = ManifestBuilder::default();
    parse_part(WORKBOOK_PART, bytes, &mut builder)?;
    Ok(builder.finish())
}

/// `xl/_rels/workbook.xml.rels`を解析してId→Targetの対応表を返す
pub(crate) fn parse_relationships(bytes: &[u8]) -> Result<HashMap<String, String>, XlsxLiteError> {
    let mut builder = RelationshipsBuilder::default();
    parse_part(WORKBOOK_RELS_PART, bytes, &mut builder)?;
    Ok(builder.finish())
}

/// `xl/workbook.xml`からの相対ターゲットをアーカイブ内のパスに変換する
///
/// - `worksheets/sheet1.xml` → `xl/worksheets/sheet1.xml`
/// - `/xl/worksheets/sheet1.xml` → `xl/worksheets/sheet1.xml`
/// - `../xl/worksheets/sheet1.xml` → `xl/worksheets/sheet1.xml`
///
/// パッケージの外を指す場合は`None`を返します。
pub(crate) fn resolve_target(target: &str) -> Option<String> {
    let joined = match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{}", target),
    };

    let mut segments: Vec<&str> = Vec::new();
    for segment in joined.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            other => segments.push(other),
        }
    }

    if segments.is_empty() {
        None
    } else {
        Some(segments.join("/"))
    }
}
