//! 解码错误定义
//!
//! 只有结构性问题（长度、越界、非法符号、令牌数量）才是错误；
//! 限值失败属于正常的测试数据，通过 `Verdict::Fail` 报告。

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
pub enum DecodeError {
    /// 捕获长度与布局要求的长度不一致
    #[error("Capture length mismatch: expected {expected} symbols, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
    /// 字段计算出的符号位置超出捕获边界
    #[error("Field '{field}' position {position} exceeds capture length {length}")]
    OutOfBounds {
        field: String,
        position: usize,
        length: usize,
    },
    /// 符号不属于声明的字母表
    #[error("Field '{field}' has invalid {alphabet} symbol {symbol:?} at position {position}")]
    InvalidSymbol {
        field: String,
        position: usize,
        symbol: char,
        alphabet: &'static str,
    },
    /// 令牌数量与产生的数值数量不一致
    #[error("Token count mismatch: {tokens} tokens supplied for {values} values")]
    TokenCountMismatch { tokens: usize, values: usize },
    /// 字段描述本身不合法
    #[error("Invalid descriptor for field '{field}': {reason}")]
    InvalidDescriptor { field: String, reason: String },
    /// 十进制数字串超出u64范围
    #[error("Field '{field}' value '{digits}' does not fit in 64 bits")]
    ValueOverflow { field: String, digits: String },
    /// 无效的位范围表达式
    #[error("Invalid bit range expression: {0}")]
    InvalidExpression(String),
    /// 无效的令牌名称
    #[error("Invalid token name: {0}")]
    InvalidToken(String),
    /// 未知的统计函数
    #[error("Unknown statistic '{0}', valid values are [AVG, MAX, MIN, RANGE]")]
    UnknownStatistic(String),
    /// 结果输出端写入失败
    #[error("Result sink failure: {0}")]
    Sink(String),
}

impl DecodeError {
    /// 是否只影响单个字段（best-effort模式下可以继续解码其他字段）
    pub fn is_field_local(&self) -> bool {
        matches!(
            self,
            DecodeError::InvalidSymbol { .. } | DecodeError::ValueOverflow { .. }
        )
    }

    /// 稳定的错误分类标签，供上层报告使用
    pub fn category(&self) -> &'static str {
        match self {
            DecodeError::LengthMismatch { .. } => "LENGTH_MISMATCH",
            DecodeError::OutOfBounds { .. } => "OUT_OF_BOUNDS",
            DecodeError::InvalidSymbol { .. } => "INVALID_SYMBOL",
            DecodeError::TokenCountMismatch { .. } => "TOKEN_COUNT_MISMATCH",
            DecodeError::InvalidDescriptor { .. } => "INVALID_DESCRIPTOR",
            DecodeError::ValueOverflow { .. } => "VALUE_OVERFLOW",
            DecodeError::InvalidExpression(_) => "INVALID_EXPRESSION",
            DecodeError::InvalidToken(_) => "INVALID_TOKEN",
            DecodeError::UnknownStatistic(_) => "UNKNOWN_STATISTIC",
            DecodeError::Sink(_) => "SINK",
        }
    }
}
