//! 令牌持久化
//!
//! 把字段族的逐occurrence数值写入键值存储，供后续测试步骤读取。
//! 写入是全有或全无的：数量和名称全部校验通过后才开始写。

use std::sync::OnceLock;

use ctvd_core::{DecodeError, TokenStore};
use tracing::debug;

#[allow(clippy::expect_used)] // 固定的正则表达式
fn token_regex() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| {
        regex::Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*$")
            .expect("valid regex")
    })
}

/// 校验令牌名称，例如 `SCVars.SC_BIN_TC1`
pub fn validate_token(token: &str) -> Result<(), DecodeError> {
    if token_regex().is_match(token) {
        Ok(())
    } else {
        Err(DecodeError::InvalidToken(token.to_string()))
    }
}

/// 解析逗号分隔的令牌列表，忽略空白和空项
pub fn parse_token_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// 按顺序把每个数值写入对应的令牌
///
/// # 参数
/// - `store`: 键值存储
/// - `tokens`: 目标令牌名称，顺序与数值一一对应
/// - `values`: 解码得到的数值
///
/// # 返回
/// - `Ok(usize)`: 写入的令牌数量
/// - `Err(DecodeError)`: 数量不符或名称非法时不写入任何值
pub fn persist_tokens<S, T>(store: &mut S, tokens: &[T], values: &[i128]) -> Result<usize, DecodeError>
where
    S: TokenStore + ?Sized,
    T: AsRef<str>,
{
    if tokens.len() != values.len() {
        return Err(DecodeError::TokenCountMismatch {
            tokens: tokens.len(),
            values: values.len(),
        });
    }
    for token in tokens {
        validate_token(token.as_ref())?;
    }

    for (token, value) in tokens.iter().zip(values) {
        debug!(token = token.as_ref(), value, "writing token");
        store.write_token(token.as_ref(), *value)?;
    }

    Ok(tokens.len())
}
