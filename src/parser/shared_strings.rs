//! Shared String Table
//!
//! 共有文字列テーブル（`xl/sharedStrings.xml`）の文字列プールと、
//! そのXMLからプールを構築する状態機械を提供するモジュール。
//!
//! インポート時は文書中の順序をそのままインデックスとし、
//! エクスポート時は`intern`で重複を排除しながらプールを構築します。

use super::xml::{parse_part, XmlEvent, XmlHandler};
use crate::error::XlsxLiteError;
use std::collections::HashMap;
use thiserror::Error;

/// 共有文字列テーブルのパート名
pub(crate) const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";

/// プールの範囲外のインデックスが参照された
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("shared string index {index} is out of range (pool size {len})")]
pub struct OutOfRange {
    /// 参照されたインデックス
    pub index: usize,
    /// プールのサイズ
    pub len: usize,
}

/// 順序付きの文字列プール
///
/// インデックスは1回のインポート/エクスポートの間だけ安定です。
#[derive(Debug, Clone, Default)]
pub struct SharedStringPool {
    strings: Vec<String>,
    index: HashMap<String, usize>,
}

impl SharedStringPool {
    /// 空のプールを生成
    pub fn new() -> Self {
        Self::default()
    }

    /// 文字列を登録し、そのインデックスを返す
    ///
    /// 完全に一致する文字列が既に登録されている場合は既存のインデックスを返します。
    pub fn intern(&mut self, text: &str) -> usize {
        if let Some(&i) = self.index.get(text) {
            return i;
        }
        let i = self.strings.len();
        self.strings.push(text.to_string());
        self.index.insert(text.to_string(), i);
        i
    }

    /// 重複の有無にかかわらず末尾に追加する
    ///
    /// 読み込んだテーブルのインデックスを保つために使用します。
    pub(crate) fn push(&mut self, text: String) {
        let i = self.strings.len();
        self.index.entry(text.clone()).or_insert(i);
        self.strings.push(text);
    }

    /// インデックスから文字列を取得
    pub fn resolve(&self, index: usize) -> Result<&str, OutOfRange> {
        self.strings
            .get(index)
            .map(String::as_str)
            .ok_or(OutOfRange {
                index,
                len: self.strings.len(),
            })
    }

    /// 登録されている文字列の数
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// プールが空かどうか
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// インデックス順に文字列を走査
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.strings.iter().map(String::as_str)
    }
}

/// `<sst>`のイベント列からプールを構築する状態機械
///
/// `<si>`ごとに1エントリを作り、その中の`<t>`の文字データだけを連結します。
/// リッチテキストの書式（`<rPr>`）やふりがな（`<rPh>`）は無視されます。
#[derive(Debug, Default)]
pub(crate) struct SharedStringsBuilder {
    pool: SharedStringPool,
    in_item: bool,
    in_text: bool,
    phonetic_depth: usize,
    current: String,
}

impl SharedStringsBuilder {
    /// 構築したプールを取り出す
    pub fn finish(self) -> SharedStringPool {
        self.pool
    }
}

impl XmlHandler for SharedStringsBuilder {
    fn handle(&mut self, event: XmlEvent) -> Result<(), XlsxLiteError> {
        match event {
            XmlEvent::Open(tag) => match tag.name.as_str() {
                "si" => {
                    self.in_item = true;
                    self.current.clear();
                }
                "rPh" => self.phonetic_depth += 1,
                "t" if self.in_item && self.phonetic_depth == 0 => self.in_text = true,
                _ => {}
            },
            XmlEvent::Text(text) => {
                if self.in_text {
                    self.current.push_str(&text);
                }
            }
            XmlEvent::Close(name) => match name.as_str() {
                "t" => self.in_text = false,
                "rPh" => self.phonetic_depth = self.phonetic_depth.saturating_sub(1),
                "si" if self.in_item => {
                    self.in_item = false;
                    self.pool.push(std::mem::take(&mut self.current));
                }
                _ => {}
            },
        }
        Ok(())
    }
}

/// `xl/sharedStrings.xml`を解析してプールを構築する
pub(crate) fn parse_shared_strings(bytes: &[u8]) -> Result<SharedStringPool, XlsxLiteError> {
    let mut builder = SharedStringsBuilder::default();
    parse_part(SHARED_STRINGS_PART, bytes, &mut builder)?;
    let pool = builder.finish();
    log::debug!("loaded {} shared string(s)", pool.len());
    Ok(pool)
}
