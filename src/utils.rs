use thiserror::Error;
use std::path::{Path, PathBuf};

/// 自定义错误类型
#[derive(Error, Debug)]
pub enum ViewerError {
    #[error("{codec} decode error: {source}")]
    Decode {
        codec: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("{codec} encode error: {source}")]
    Encode {
        codec: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("Compression algorithm not supported: {0}")]
    CodecUnavailable(String),

    #[error("Unknown compression algorithm: {0}")]
    UnknownCodec(String),

    #[error("Cannot convert text to {encoding}: {reason}")]
    EncodingConversion {
        encoding: &'static str,
        reason: String,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl ViewerError {
    /// 是否为解压失败（自动探测时视为"不是这种压缩格式"）
    pub fn is_decode_failure(&self) -> bool {
        matches!(self, ViewerError::Decode { .. })
    }
}

pub type Result<T> = std::result::Result<T, ViewerError>;

/// 检查路径是否以给定后缀结尾（忽略大小写）
///
/// 与扩展名解析不同，这里按原始字符串比较，因此 `.tar.gz` 之类的多段后缀也能匹配。
pub fn path_has_suffix(path: &Path, suffix: &str) -> bool {
    if suffix.is_empty() {
        return false;
    }
    let path = path.to_string_lossy();
    let (path, suffix) = (path.as_bytes(), suffix.as_bytes());
    path.len() >= suffix.len()
        && path[path.len() - suffix.len()..].eq_ignore_ascii_case(suffix)
}

/// 创建文件备份
pub fn create_backup(file_path: &Path) -> Result<PathBuf> {
    if !file_path.exists() {
        return Err(ViewerError::IoError(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "原文件不存在"
        )));
    }

    let timestamp = chrono::Local::now().format("%Y-%m-%d-%H-%M-%S");
    let file_name = file_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let backup_path = file_path.with_file_name(format!("{}.{}.bak", file_name, timestamp));

    std::fs::copy(file_path, &backup_path)?;

    Ok(backup_path)
}
