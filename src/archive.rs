//! Archive Module
//!
//! XLSXパッケージ（ZIPアーカイブ）の読み書きを抽象化するモジュール。
//!
//! インポート・エクスポートの処理本体は`ArchiveReader` / `ArchiveWriter`トレイトのみに依存し、
//! ZIPの圧縮・展開は`zip`クレートを用いた実装（`ZipArchiveReader` / `ZipArchiveWriter`）が担当します。

use crate::error::XlsxLiteError;
use crate::security::{validate_zip_path, SecurityConfig};
use std::collections::BTreeMap;
use std::io::{Read, Seek, SeekFrom, Write};
use zip::result::ZipError;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// アーカイブからエントリを読み出す機能
pub trait ArchiveReader {
    /// 指定したエントリのバイト列を読み出す
    ///
    /// # 戻り値
    ///
    /// * `Ok(Some(bytes))` - エントリが存在する場合
    /// * `Ok(None)` - エントリが存在しない場合
    /// * `Err(XlsxLiteError)` - アーカイブが読み込めない、または制限に違反した場合
    fn read_entry(&mut self, name: &str) -> Result<Option<Vec<u8>>, XlsxLiteError>;
}

/// アーカイブへエントリを書き込む機能
pub trait ArchiveWriter {
    /// エントリを書き込む
    ///
    /// `data`が`None`の場合はディレクトリマーカーとして書き込みます。
    fn write_entry(&mut self, name: &str, data: Option<&[u8]>) -> Result<(), XlsxLiteError>;
}

/// メモリ上のエントリ表（主にテスト用）
impl ArchiveReader for BTreeMap<String, Vec<u8>> {
    fn read_entry(&mut self, name: &str) -> Result<Option<Vec<u8>>, XlsxLiteError> {
        Ok(self.get(name).cloned())
    }
}

impl ArchiveWriter for BTreeMap<String, Vec<u8>> {
    fn write_entry(&mut self, name: &str, data: Option<&[u8]>) -> Result<(), XlsxLiteError> {
        self.insert(name.to_string(), data.map(<[u8]>::to_vec).unwrap_or_default());
        Ok(())
    }
}

/// ZIPアーカイブのリーダー
///
/// オープン時にエントリ数・エントリパス・宣言された展開後サイズを検証し、
/// 読み込み時には実際に展開したバイト数で再度検証します。
pub struct ZipArchiveReader<R: Read + Seek> {
    archive: ZipArchive<R>,
    security: SecurityConfig,
    /// これまでに展開した合計バイト数
    inflated: u64,
}

impl<R: Read + Seek> ZipArchiveReader<R> {
    /// デフォルトのセキュリティ制限でアーカイブを開く
    pub fn open(reader: R) -> Result<Self, XlsxLiteError> {
        Self::with_security(reader, SecurityConfig::default())
    }

    /// 指定したセキュリティ制限でアーカイブを開く
    ///
    /// # 処理フロー
    ///
    /// 1. 入力サイズの検証
    /// 2. ZIPの中央ディレクトリの読み込み
    /// 3. エントリ数の検証
    /// 4. 各エントリのパスと宣言サイズの検証
    pub fn with_security(mut reader: R, security: SecurityConfig) -> Result<Self, XlsxLiteError> {
        // 1. 入力サイズ
        let input_size = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(0))?;
        security.check_input_size(input_size)?;

        // 2. 中央ディレクトリ
        let mut archive = ZipArchive::new(reader)?;

        // 3. エントリ数
        security.check_entry_count(archive.len())?;

        // 4. エントリパスと宣言サイズ
        let mut declared_total: u64 = 0;
        for i in 0..archive.len() {
            let file = archive.by_index(i)?;
            let name = file.name().to_string();
            validate_zip_path(&name)?;
            security.check_entry_size(&name, file.size())?;
            declared_total = declared_total.saturating_add(file.size());
            security.check_total_size(declared_total)?;
        }

        log::debug!(
            "opened archive: {} entries, {} bytes declared",
            archive.len(),
            declared_total
        );

        Ok(Self {
            archive,
            security,
            inflated: 0,
        })
    }

    /// アーカイブ内のエントリ名の一覧
    pub fn entry_names(&self) -> Vec<String> {
        self.archive.file_names().map(str::to_string).collect()
    }
}

impl<R: Read + Seek> ArchiveReader for ZipArchiveReader<R> {
    fn read_entry(&mut self, name: &str) -> Result<Option<Vec<u8>>, XlsxLiteError> {
        let file = match self.archive.by_name(name) {
            Ok(file) => file,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        // 宣言サイズを信用せず、上限+1バイトまでしか展開しない
        let limit = self.security.max_file_size;
        let mut data = Vec::new();
        file.take(limit.saturating_add(1)).read_to_end(&mut data)?;
        let size = data.len() as u64;
        self.security.check_entry_size(name, size)?;

        self.inflated = self.inflated.saturating_add(size);
        self.security.check_total_size(self.inflated)?;

        Ok(Some(data))
    }
}

/// ZIPアーカイブのライター
///
/// すべてのエントリをDeflate圧縮で書き込みます。
pub struct ZipArchiveWriter<W: Write + Seek> {
    zip: ZipWriter<W>,
    options: FileOptions,
}

impl<W: Write + Seek> ZipArchiveWriter<W> {
    /// 新しいライターを生成
    pub fn new(writer: W) -> Self {
        Self {
            zip: ZipWriter::new(writer),
            options: FileOptions::default().compression_method(CompressionMethod::Deflated),
        }
    }

    /// 中央ディレクトリを書き込んでアーカイブを完成させ、内部のライターを返す
    pub fn finish(self) -> Result<W, XlsxLiteError> {
        let mut zip = self.zip;
        Ok(zip.finish()?)
    }
}

impl<W: Write + Seek> ArchiveWriter for ZipArchiveWriter<W> {
    fn write_entry(&mut self, name: &str, data: Option<&[u8]>) -> Result<(), XlsxLiteError> {
        match data {
            Some(bytes) => {
                self.zip.start_file(name, self.options)?;
                self.zip.write_all(bytes)?;
            }
            None => {
                self.zip.add_directory(name, self.options)?;
            }
        }
        Ok(())
    }
}
