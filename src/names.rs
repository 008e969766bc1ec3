//! Names Module
//!
//! シート名・ヘッダーテキストとSQL識別子、およびテーブル名とExcelシート名の
//! 相互変換を行うモジュール。
//!
//! - SQL識別子の引用（`quote_identifier`）とサニタイズ（`sanitize_identifier`）
//! - 重複する名前への連番サフィックス付与（`NameUniquifier`）
//! - Excelのシート名制約（禁止文字、31文字制限、予約名）への適合（`sanitize_sheet_name`）

use crate::api::NamingPolicy;
use crate::types::{Row, MAX_SHEET_NAME_CHARS};
use std::collections::HashSet;

/// Excelのシート名に使用できない文字
const FORBIDDEN_SHEET_CHARS: [char; 7] = [':', '\\', '/', '?', '*', '[', ']'];

/// Excelが予約しているシート名（大文字小文字を区別しない）
const RESERVED_SHEET_NAME: &str = "History";

/// 識別子をSQLの二重引用符で囲む
///
/// 識別子内の`"`は`""`にエスケープされます。
///
/// # 使用例
///
/// ```rust,ignore
/// assert_eq!(quote_identifier("Sales Q1"), "\"Sales Q1\"");
/// assert_eq!(quote_identifier("a\"b"), "\"a\"\"b\"");
/// ```
pub(crate) fn quote_identifier(name: &str) -> String {
    let mut quoted = String::with_capacity(name.len() + 2);
    quoted.push('"');
    for c in name.chars() {
        if c == '"' {
            quoted.push('"');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

/// テキストを`[A-Za-z0-9_]`のみからなる識別子に変換する
///
/// 許可されない文字は`_`に置換し、数字で始まる場合は先頭に`_`を付加します。
/// 空文字列は空文字列のまま返します（呼び出し側でプレースホルダーに置き換える）。
pub(crate) fn sanitize_identifier(raw: &str) -> String {
    let mut out: String = raw
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

/// 命名ポリシーに従ってテキストを識別子に変換する
///
/// `Quote`の場合は元のテキストをそのまま返し、引用はSQL発行時に行います。
pub(crate) fn apply_naming_policy(policy: NamingPolicy, raw: &str) -> String {
    match policy {
        NamingPolicy::Quote => raw.to_string(),
        NamingPolicy::Sanitize => sanitize_identifier(raw),
    }
}

/// 重複時に付与するサフィックスの形式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SuffixStyle {
    /// `name_1`, `name_2`, ...（テーブル名・カラム名）
    Underscore,

    /// `name (1)`, `name (2)`, ...（シート名）
    Parenthesized,
}

/// 名前の一意化を行う
///
/// 既に払い出した名前と衝突する場合、連番サフィックスを付与します。
/// 比較はASCIIの大文字小文字を区別しません（SQLiteの識別子およびExcelのシート名の比較規則）。
#[derive(Debug, Clone)]
pub(crate) struct NameUniquifier {
    /// 払い出し済みの名前（小文字化）
    seen: HashSet<String>,

    /// サフィックス形式
    style: SuffixStyle,

    /// 最大文字数（サフィックス込み）
    max_chars: Option<usize>,
}

impl NameUniquifier {
    /// 新しいUniquifierを生成
    pub fn new(style: SuffixStyle) -> Self {
        Self {
            seen: HashSet::new(),
            style,
            max_chars: None,
        }
    }

    /// サフィックス込みの最大文字数を設定する
    ///
    /// サフィックスを付与する際は、上限に収まるよう元の名前を切り詰めます。
    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = Some(max_chars);
        self
    }

    /// 一意な名前を払い出す
    pub fn claim(&mut self, base: &str) -> String {
        let base = self.fit(base, "");
        if self.seen.insert(self.fold(&base)) {
            return base;
        }

        let mut k: u32 = 1;
        loop {
            let suffix = match self.style {
                SuffixStyle::Underscore => format!("_{}", k),
                SuffixStyle::Parenthesized => format!(" ({})", k),
            };
            let candidate = self.fit(&base, &suffix);
            if self.seen.insert(self.fold(&candidate)) {
                return candidate;
            }
            k += 1;
        }
    }

    /// 比較用に大文字・小文字を畳み込む
    ///
    /// SQLiteの識別子はASCIIのみ、Excelのシート名はUnicode全体で大文字・小文字を区別しません。
    fn fold(&self, name: &str) -> String {
        match self.style {
            SuffixStyle::Underscore => name.to_ascii_lowercase(),
            SuffixStyle::Parenthesized => name.to_lowercase(),
        }
    }

    /// `base + suffix`が最大文字数に収まるよう`base`を切り詰めて連結する
    fn fit(&self, base: &str, suffix: &str) -> String {
        match self.max_chars {
            Some(max) => {
                let room = max.saturating_sub(suffix.chars().count());
                let mut name: String = base.chars().take(room).collect();
                name.push_str(suffix);
                name
            }
            None => format!("{}{}", base, suffix),
        }
    }
}

/// ヘッダー行からカラム名の一覧を生成する
///
/// # 引数
///
/// * `header` - 行番号1の行（存在しない場合は`None`）
/// * `width` - テーブルの列数（シート内の最大列）
/// * `policy` - 命名ポリシー
///
/// # 戻り値
///
/// 一意なカラム名の一覧（`width`個）。空またはNULLのヘッダーセルには
/// `col`+1始まりの列番号のプレースホルダーを使用します。
pub(crate) fn header_column_names(
    header: Option<&Row>,
    width: usize,
    policy: NamingPolicy,
) -> Vec<String> {
    let mut uniquifier = NameUniquifier::new(SuffixStyle::Underscore);

    (0..width)
        .map(|index| {
            let raw = header
                .and_then(|row| row.get(index).as_text())
                .unwrap_or_default();
            let name = apply_naming_policy(policy, &raw);
            let name = if name.trim().is_empty() {
                format!("col{}", index + 1)
            } else {
                name
            };
            uniquifier.claim(&name)
        })
        .collect()
}

/// テーブル名からExcelのシート名を導出する
///
/// 1. 禁止文字（`: \ / ? * [ ]`）を除去
/// 2. 先頭・末尾のアポストロフィを除去
/// 3. 31文字に切り詰め
/// 4. 空になった場合は`Sheet<N>`（`position`は1始まりの処理順）
/// 5. 予約名`History`（大文字小文字を区別しない）は`History_`に変更
///
/// 衝突の解消は`NameUniquifier`で別途行います。
pub(crate) fn sanitize_sheet_name(raw: &str, position: usize) -> String {
    let stripped: String = raw
        .chars()
        .filter(|c| !FORBIDDEN_SHEET_CHARS.contains(c) && !c.is_control())
        .collect();
    let truncated: String = stripped
        .trim_matches('\'')
        .chars()
        .take(MAX_SHEET_NAME_CHARS)
        .collect();
    let name = truncated.trim_end_matches('\'');

    if name.is_empty() {
        return format!("Sheet{}", position);
    }
    if name.eq_ignore_ascii_case(RESERVED_SHEET_NAME) {
        return format!("{}_", name);
    }
    name.to_string()
}
