//! Security Module
//!
//! 信頼できないXLSXアーカイブを読み込む際の制限を実装するモジュール。
//! ZIP bomb攻撃（展開後サイズ・エントリ数）とパストラバーサル攻撃への対策を提供します。

use crate::error::XlsxLiteError;

/// アーカイブ読み込み時のセキュリティ制限
///
/// `ZipArchiveReader`がアーカイブのオープン時とエントリの読み込み時に検証します。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityConfig {
    /// 展開後の合計最大サイズ（バイト）
    /// デフォルト: 1GB (1_073_741_824 bytes)
    pub max_decompressed_size: u64,
    /// アーカイブ内の最大エントリ数
    /// デフォルト: 10000
    pub max_file_count: usize,
    /// 単一エントリの展開後最大サイズ（バイト）
    /// デフォルト: 100MB (104_857_600 bytes)
    pub max_file_size: u64,
    /// 入力ファイルの最大サイズ（バイト）
    /// デフォルト: 2GB (2_147_483_648 bytes)
    pub max_input_file_size: u64,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_decompressed_size: 1_073_741_824, // 1GB
            max_file_count: 10_000,
            max_file_size: 104_857_600,         // 100MB
            max_input_file_size: 2_147_483_648, // 2GB
        }
    }
}

impl SecurityConfig {
    /// 入力サイズを検証する
    pub(crate) fn check_input_size(&self, size: u64) -> Result<(), XlsxLiteError> {
        if size > self.max_input_file_size {
            return Err(XlsxLiteError::SecurityViolation(format!(
                "Input file size exceeds maximum: {} bytes (max: {} bytes)",
                size, self.max_input_file_size
            )));
        }
        Ok(())
    }

    /// エントリ数を検証する
    pub(crate) fn check_entry_count(&self, count: usize) -> Result<(), XlsxLiteError> {
        if count > self.max_file_count {
            return Err(XlsxLiteError::SecurityViolation(format!(
                "Too many entries in archive: {} (max: {})",
                count, self.max_file_count
            )));
        }
        Ok(())
    }

    /// 単一エントリの展開後サイズを検証する
    pub(crate) fn check_entry_size(&self, name: &str, size: u64) -> Result<(), XlsxLiteError> {
        if size > self.max_file_size {
            return Err(XlsxLiteError::SecurityViolation(format!(
                "Entry '{}' exceeds maximum size: {} bytes (max: {} bytes)",
                name, size, self.max_file_size
            )));
        }
        Ok(())
    }

    /// 展開後の合計サイズを検証する
    pub(crate) fn check_total_size(&self, total: u64) -> Result<(), XlsxLiteError> {
        if total > self.max_decompressed_size {
            return Err(XlsxLiteError::SecurityViolation(format!(
                "Decompressed size exceeds maximum: {} bytes (max: {} bytes)",
                total, self.max_decompressed_size
            )));
        }
        Ok(())
    }
}

/// アーカイブ内のエントリパスの検証
///
/// パストラバーサル攻撃を防ぐため、エントリパスを検証します。
///
/// # 引数
///
/// * `path` - 検証するエントリパス
///
/// # 戻り値
///
/// * `Ok(())` - パスが安全な場合
/// * `Err(XlsxLiteError::SecurityViolation)` - パスが危険な場合（`..`や絶対パスを含む）
pub(crate) fn validate_zip_path(path: &str) -> Result<(), XlsxLiteError> {
    let reject = |reason: String| Err(XlsxLiteError::SecurityViolation(reason));

    if path.is_empty() {
        return reject("Empty entry path is not allowed".to_string());
    }

    // 絶対パス（`/`始まり、またはドライブレター付き）
    let bytes = path.as_bytes();
    let has_drive = bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':';
    if path.starts_with('/') || has_drive {
        return reject(format!("Absolute entry path is not allowed: {}", path));
    }

    // `..`セグメント（ディレクトリトラバーサル）
    if path.split('/').any(|segment| segment == "..") {
        return reject(format!("Path traversal detected: {}", path));
    }

    if path.contains('\\') {
        return reject(format!("Backslash in entry path is not allowed: {}", path));
    }

    Ok(())
}
