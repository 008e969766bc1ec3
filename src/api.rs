//! Public API Types
//!
//! 公開APIで使用する列挙型を定義するモジュール。

use serde::Serialize;
use std::fmt;

/// インポート対象シートの選択子
///
/// 選択子を1つも指定しない場合、ワークブック内のすべてのシートが
/// マニフェスト順にインポートされます。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[non_exhaustive]
pub enum SheetSelector {
    /// シート番号指定（1始まり）
    ///
    /// まずマニフェスト上の位置（1始まり）と照合し、該当がなければ
    /// `sheetId`属性の値と照合します。
    ///
    /// 例: `SheetSelector::Number(2)` は2番目のシートを選択（`sheetId`が5であっても）
    Number(u32),

    /// シート名指定
    ///
    /// 大文字小文字を区別する完全一致で照合します。部分一致は行いません。
    ///
    /// 例: `SheetSelector::Name("Sheet1".to_string())`
    Name(String),
}

impl fmt::Display for SheetSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SheetSelector::Number(n) => write!(f, "#{}", n),
            SheetSelector::Name(name) => write!(f, "'{}'", name),
        }
    }
}

impl From<u32> for SheetSelector {
    fn from(n: u32) -> Self {
        SheetSelector::Number(n)
    }
}

impl From<&str> for SheetSelector {
    fn from(name: &str) -> Self {
        SheetSelector::Name(name.to_string())
    }
}

/// テーブル名・カラム名の命名ポリシー
///
/// シート名やヘッダーセルのテキストをSQL識別子に変換する方法を指定します。
/// 1回のインポートでは、テーブル名とカラム名の両方に同じポリシーが適用されます。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[non_exhaustive]
pub enum NamingPolicy {
    /// 元のテキストをそのまま使用し、SQL発行時に引用符で囲む（デフォルト）
    ///
    /// 例: `Sales Q1` → `"Sales Q1"`
    #[default]
    Quote,

    /// `[A-Za-z0-9_]`のみからなる識別子に変換する
    ///
    /// それ以外の文字は`_`に置換され、数字で始まる場合は先頭に`_`が付きます。
    ///
    /// 例: `Sales Q1` → `Sales_Q1`
    Sanitize,
}

/// エクスポート時の文字列セルの格納方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[non_exhaustive]
pub enum StringStorage {
    /// 共有文字列テーブル（`xl/sharedStrings.xml`）で重複排除する（デフォルト）
    ///
    /// 同じ値が繰り返される場合に出力サイズが大きく削減されます。
    #[default]
    Shared,

    /// 各セルにインライン文字列として埋め込む
    ///
    /// `xl/sharedStrings.xml`は生成されません。
    Inline,
}

/// インポート先テーブルが既に存在する場合の扱い
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[non_exhaustive]
pub enum TableConflict {
    /// 既存テーブルに行を追加する（デフォルト、`CREATE TABLE IF NOT EXISTS`）
    #[default]
    Append,

    /// 既存テーブルを削除してから作成し直す
    Replace,

    /// 既存テーブルがある場合は`Storage`エラーとする
    Fail,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        assert_eq!(NamingPolicy::default(), NamingPolicy::Quote);
        assert_eq!(StringStorage::default(), StringStorage::Shared);
        assert_eq!(TableConflict::default(), TableConflict::Append);
    }

    // 選択子の変換と表示のテスト
    #[test]
    fn test_selector_conversions() {
        assert_eq!(SheetSelector::from(2), SheetSelector::Number(2));
        assert_eq!(
            SheetSelector::from("Sheet1"),
            SheetSelector::Name("Sheet1".to_string())
        );
        assert_eq!(SheetSelector::Number(3).to_string(), "#3");
        assert_eq!(SheetSelector::from("Data").to_string(), "'Data'");
    }
}
