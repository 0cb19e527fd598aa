//! 工具模块
//!
//! 提供捕获数据常用的进制转换函数

use crate::error::DecodeError;

/// 将十六进制文本展开为二进制字符串（每位4bit，MSB在前）
///
/// 支持可选的 `0x` 前缀，奇数长度时首位按半字节处理
pub fn hex_to_binary(hex_str: &str) -> Result<String, DecodeError> {
    let clean = hex_str.trim();
    let clean = clean
        .strip_prefix("0x")
        .or_else(|| clean.strip_prefix("0X"))
        .unwrap_or(clean);

    // 奇数长度时补一个0，展开后再去掉多出的4bit
    let odd = clean.len() % 2 == 1;
    let padded = if odd {
        format!("0{clean}")
    } else {
        clean.to_string()
    };

    let bytes = hex::decode(&padded).map_err(|e| match e {
        hex::FromHexError::InvalidHexCharacter { c, index } => DecodeError::InvalidSymbol {
            field: "<capture>".to_string(),
            position: if odd { index - 1 } else { index },
            symbol: c,
            alphabet: "hex",
        },
        other => DecodeError::InvalidExpression(format!("invalid hex capture: {other}")),
    })?;

    let mut bits: String = bytes.iter().map(|b| format!("{b:08b}")).collect();
    if odd {
        bits.drain(..4);
    }
    Ok(bits)
}

/// 将二进制字符串转换为大写十六进制，宽度为 ceil(len/4)
pub fn binary_to_hex(bits: &str) -> Result<String, DecodeError> {
    if let Some((position, symbol)) = bits.chars().enumerate().find(|(_, c)| *c != '0' && *c != '1') {
        return Err(DecodeError::InvalidSymbol {
            field: "<hex>".to_string(),
            position,
            symbol,
            alphabet: "binary",
        });
    }

    let pad = (4 - bits.len() % 4) % 4;
    let padded = format!("{}{bits}", "0".repeat(pad));
    Ok(padded
        .as_bytes()
        .chunks(4)
        .map(|nibble| {
            let value = nibble.iter().fold(0u8, |acc, b| (acc << 1) | (b - b'0'));
            format!("{value:X}")
        })
        .collect())
}

/// 将数值用分隔符拼接为一个字符串
pub fn join_values<T: ToString>(values: &[T], delimiter: &str) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(delimiter)
}

// 2^52：绝对值不小于该值的f64都是整数
const F64_INTEGRAL: f64 = 4_503_599_627_370_496.0;

/// 按小数位数舍入
///
/// 放大后已没有小数部分（含溢出为无穷大）时原样返回
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(i32::try_from(decimals).unwrap_or(i32::MAX));
    let scaled = value * factor;
    if scaled.is_nan() || scaled.abs() >= F64_INTEGRAL {
        return value;
    }
    scaled.round() / factor
}
