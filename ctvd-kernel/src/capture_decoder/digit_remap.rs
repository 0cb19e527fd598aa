//! 数字重映射
//!
//! 按首位数字从补零后的十进制串中挑选指定位置，拼接后重新解析为整数，
//! 用于把较长的bin码压缩为短码

use ctvd_core::{DecodeError, DigitRemap};
use tracing::debug;

/// 对补零后的数字串执行重映射
///
/// # 参数
/// - `field_name`: 字段名称（用于错误信息）
/// - `remap`: 重映射配置
/// - `digits`: 长度为 `pad_width` 的数字（0..9）
pub fn remap_digits(field_name: &str, remap: &DigitRemap, digits: &[u8]) -> Result<u64, DecodeError> {
    let text: String = digits.iter().map(|d| char::from(b'0' + d)).collect();

    // 有效数字不超过阈值时原样通过
    let significant = text.trim_start_matches('0').len();
    if significant <= remap.passthrough_digits {
        return parse_digits(field_name, &text);
    }

    let leading = text.chars().next().unwrap_or('0');
    let positions = remap
        .positions_for(leading)
        .ok_or_else(|| DecodeError::InvalidDescriptor {
            field: field_name.to_string(),
            reason: format!("no digit selection matches leading digit '{leading}'"),
        })?;

    let selected = positions
        .iter()
        .map(|&p| {
            text.as_bytes()
                .get(p)
                .map(|b| char::from(*b))
                .ok_or_else(|| DecodeError::OutOfBounds {
                    field: field_name.to_string(),
                    position: p,
                    length: text.len(),
                })
        })
        .collect::<Result<String, _>>()?;

    debug!(field = field_name, input = %text, selected = %selected, "digit remap");
    parse_digits(field_name, &selected)
}

/// 对一个十进制数值执行重映射（独立的bin码转换入口）
///
/// # 示例
/// ```
/// use ctvd_core::{DigitRemap, DigitSelection};
/// use ctvd_kernel::capture_decoder::apply_remap;
///
/// let remap = DigitRemap {
///     pad_width: 8,
///     passthrough_digits: 4,
///     selections: vec![
///         DigitSelection { leading: Some('9'), positions: vec![4, 5, 6, 7] },
///         DigitSelection { leading: None, positions: vec![2, 3, 4, 5] },
///     ],
/// };
/// assert_eq!(apply_remap(&remap, 90191904).unwrap(), 1904);
/// assert_eq!(apply_remap(&remap, 10011234).unwrap(), 112);
/// assert_eq!(apply_remap(&remap, 1234).unwrap(), 1234);
/// ```
pub fn apply_remap(remap: &DigitRemap, value: u64) -> Result<u64, DecodeError> {
    let text = value.to_string();
    if text.len() > remap.pad_width {
        return Err(DecodeError::ValueOverflow {
            field: "bin".to_string(),
            digits: text,
        });
    }

    let padded = format!("{value:0width$}", width = remap.pad_width);
    let digits: Vec<u8> = padded.bytes().map(|b| b - b'0').collect();
    remap_digits("bin", remap, &digits)
}

fn parse_digits(field_name: &str, text: &str) -> Result<u64, DecodeError> {
    if text.is_empty() {
        return Ok(0);
    }
    text.parse::<u64>().map_err(|_| DecodeError::ValueOverflow {
        field: field_name.to_string(),
        digits: text.to_string(),
    })
}
