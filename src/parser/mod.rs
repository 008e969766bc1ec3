//! Parser Module
//!
//! XLSXパッケージ内のXMLパートを解析するモジュール群。
//! `xml`が`quick-xml`を型付きイベント列に変換し、各パートの解析は
//! そのイベント列を消費する状態機械として実装されています。

mod shared_strings;
mod workbook;
mod worksheet;
mod xml;

pub use shared_strings::{OutOfRange, SharedStringPool};

pub(crate) use shared_strings::{parse_shared_strings, SHARED_STRINGS_PART};
pub(crate) use workbook::{
    parse_manifest, parse_relationships, resolve_target, WORKBOOK_PART, WORKBOOK_RELS_PART,
};
pub(crate) use worksheet::parse_worksheet;
