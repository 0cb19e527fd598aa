//! 布局加载错误

use ctvd_core::DecodeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LayoutError {
    /// 布局文件读取失败
    #[error("Failed to read layout file: {0}")]
    Io(#[from] std::io::Error),
    /// JSON格式或字段类型错误
    #[error("Failed to parse layout JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// 字段定义缺少位置信息或同时给出多种位置信息
    #[error("Field '{field}': {reason}")]
    Field { field: String, reason: String },
    /// 表达式或字段描述校验失败
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl LayoutError {
    /// 错误类别标签，用于日志与退出状态
    pub fn category(&self) -> &'static str {
        match self {
            LayoutError::Io(_) => "LAYOUT_IO",
            LayoutError::Json(_) => "LAYOUT_JSON",
            LayoutError::Field { .. } => "INVALID_DESCRIPTOR",
            LayoutError::Decode(e) => e.category(),
        }
    }
}
