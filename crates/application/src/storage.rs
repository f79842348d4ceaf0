use async_trait::async_trait;

use crate::error::ApplicationError;

/// 文件对象存储端口，键形如 `resume/{folder}/resume-{id}-{version}.pdf`。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FileStorage: Send + Sync {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), ApplicationError>;
    /// 键不存在时视为成功
    async fn delete(&self, key: &str) -> Result<(), ApplicationError>;
    fn public_url(&self, key: &str) -> String;
}

/// 从原始文件名取小写扩展名，缺省为 `bin`。
pub fn file_extension(filename: Option<&str>) -> String {
    filename
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.trim().to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| "bin".to_string())
}

/// PDF 文件以 `%PDF` 开头。
pub fn looks_like_pdf(bytes: &[u8]) -> bool {
    bytes.starts_with(b"%PDF")
}
