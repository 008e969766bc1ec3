//! XML Event Stream
//!
//! `quick-xml`のプル型パーサーを、型付きイベント列（`XmlEvent`）に変換するモジュール。
//! 各パーサー（共有文字列・マニフェスト・ワークシート）は`XmlHandler`を実装した
//! 小さな状態機械として記述され、XML層から独立してテストできます。

use crate::error::XlsxLiteError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// 開始タグ
///
/// 要素名・属性名は名前空間プレフィックスを除いたローカル名で保持します
/// （例: `r:id` → `id`）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Tag {
    /// ローカル名
    pub name: String,

    /// 属性（ローカル名, アンエスケープ済みの値）
    pub attributes: Vec<(String, String)>,
}

impl Tag {
    /// 属性値を取得
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// XMLイベント
///
/// 空要素（`<c r="A1"/>`）は`Open`と`Close`の組として通知されます。
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum XmlEvent {
    /// 開始タグ
    Open(Tag),

    /// 終了タグ（ローカル名）
    Close(String),

    /// 文字データ（アンエスケープ済み）
    Text(String),
}

/// XMLイベントを受け取る状態機械
pub(crate) trait XmlHandler {
    /// 1イベントを処理する
    fn handle(&mut self, event: XmlEvent) -> Result<(), XlsxLiteError>;
}

/// XMLパートを解析し、イベントを順に`handler`へ渡す
///
/// # 引数
///
/// * `part` - パート名（エラーメッセージ用）
/// * `bytes` - XMLのバイト列
/// * `handler` - イベントを受け取る状態機械
///
/// # 戻り値
///
/// * `Ok(())` - 文書の終端まで処理した場合
/// * `Err(XlsxLiteError::MalformedXml)` - XMLが不正な場合（終了タグの不一致、閉じられていない要素など）
/// * `handler`が返したエラー
pub(crate) fn parse_part<H: XmlHandler + ?Sized>(
    part: &str,
    bytes: &[u8],
    handler: &mut H,
) -> Result<(), XlsxLiteError> {
    let mut reader = Reader::from_reader(bytes);
    reader.trim_text(false);
    reader.expand_empty_elements(true);
    reader.check_end_names(true);

    let mut buf = Vec::new();
    let mut depth: usize = 0;

    loop {
        let event = reader.read_event_into(&mut buf).map_err(|e| {
            XlsxLiteError::malformed(
                part,
                format!("at byte {}: {}", reader.buffer_position(), e),
            )
        })?;

        match event {
            Event::Start(e) => {
                depth += 1;
                handler.handle(XmlEvent::Open(open_tag(part, &e)?))?;
            }
            Event::End(e) => {
                depth = depth.saturating_sub(1);
                let name = utf8(part, e.local_name().as_ref())?.to_string();
                handler.handle(XmlEvent::Close(name))?;
            }
            Event::Text(e) => {
                let text = e
                    .unescape()
                    .map_err(|err| XlsxLiteError::malformed(part, err.to_string()))?;
                if !text.is_empty() {
                    handler.handle(XmlEvent::Text(text.into_owned()))?;
                }
            }
            Event::CData(e) => {
                let text = utf8(part, &e)?.to_string();
                handler.handle(XmlEvent::Text(text))?;
            }
            Event::Eof => break,
            // 宣言・コメント・処理命令・DOCTYPEは無視
            _ => {}
        }
        buf.clear();
    }

    if depth != 0 {
        return Err(XlsxLiteError::malformed(
            part,
            format!("unexpected end of document ({} unclosed element(s))", depth),
        ));
    }
    Ok(())
}

fn open_tag(part: &str, e: &BytesStart<'_>) -> Result<Tag, XlsxLiteError> {
    let name = utf8(part, e.local_name().as_ref())?.to_string();

    let mut attributes = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| {
            XlsxLiteError::malformed(part, format!("attribute error in <{}>: {}", name, err))
        })?;
        let key = utf8(part, attr.key.local_name().as_ref())?.to_string();
        let value = quick_xml::escape::unescape(utf8(part, &attr.value)?)
            .map_err(|err| XlsxLiteError::malformed(part, err.to_string()))?
            .into_owned();
        attributes.push((key, value));
    }

    Ok(Tag { name, attributes })
}

fn utf8<'a>(part: &str, bytes: &'a [u8]) -> Result<&'a str, XlsxLiteError> {
    std::str::from_utf8(bytes)
        .map_err(|e| XlsxLiteError::malformed(part, format!("invalid UTF-8: {}", e)))
}
