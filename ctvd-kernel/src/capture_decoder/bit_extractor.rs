//! 字段符号提取器
//!
//! 按字段描述从捕获缓冲区中提取符号并转换为数值

use ctvd_core::{
    Alphabet, BitOrder, CaptureBuffer, DecodeError, FieldDescriptor, FieldLayout, NumericKind,
};

use super::digit_remap::remap_digits;

/// 计算某个occurrence需要提取的绝对位置（按提取顺序）
///
/// # 参数
/// - `field`: 字段描述
/// - `occurrence`: occurrence序号（不重复时为0）
///
/// 任何位置超出usize范围时返回None
pub fn occurrence_positions(field: &FieldDescriptor, occurrence: usize) -> Option<Vec<usize>> {
    let base = field.occurrence_offset(occurrence)?;
    match &field.layout {
        FieldLayout::Contiguous { width, .. } => Some((base..base.checked_add(*width)?).collect()),
        FieldLayout::Positions(positions) => {
            positions.iter().map(|p| base.checked_add(*p)).collect()
        }
        FieldLayout::DigitRemap(remap) => {
            Some((base..base.checked_add(remap.pad_width)?).collect())
        }
    }
}

/// 提取某个occurrence的符号数字（按提取顺序，未重排）
///
/// # 返回
/// - `Ok(Vec<u8>)`: 每个符号对应的数字值
/// - `Err(DecodeError)`: 位置越界或符号不属于字母表
pub fn extract_symbols(
    buffer: &CaptureBuffer,
    field: &FieldDescriptor,
    occurrence: usize,
) -> Result<Vec<u8>, DecodeError> {
    let alphabet = buffer.alphabet();
    occurrence_positions(field, occurrence)
        .ok_or_else(|| field.overflow_error(buffer.len()))?
        .into_iter()
        .map(|position| {
            let symbol = buffer
                .symbol_at(position)
                .ok_or_else(|| DecodeError::OutOfBounds {
                    field: field.name.clone(),
                    position,
                    length: buffer.len(),
                })?;
            alphabet
                .symbol_value(symbol)
                .ok_or_else(|| DecodeError::InvalidSymbol {
                    field: field.name.clone(),
                    position,
                    symbol: symbol as char,
                    alphabet: alphabet.name(),
                })
        })
        .collect()
}

/// 解码字段的一个occurrence
///
/// 纯函数：结果只取决于缓冲区、字段描述和occurrence序号
///
/// # 示例
/// ```
/// use ctvd_core::{BitOrder, CaptureBuffer, FieldDescriptor};
/// use ctvd_kernel::capture_decoder::decode_occurrence;
///
/// // bit 4-10，第一个提取的bit为最低位
/// let capture = CaptureBuffer::binary("0000101000000000");
/// let field = FieldDescriptor::contiguous("min", 4, 7, BitOrder::LsbFirst);
/// assert_eq!(decode_occurrence(&capture, &field, 0).unwrap(), 5);
/// ```
pub fn decode_occurrence(
    buffer: &CaptureBuffer,
    field: &FieldDescriptor,
    occurrence: usize,
) -> Result<i128, DecodeError> {
    let mut digits = extract_symbols(buffer, field, occurrence)?;

    match &field.layout {
        FieldLayout::Contiguous { order, .. } => {
            if *order == BitOrder::LsbFirst {
                digits.reverse();
            }
            digits_to_value(&field.name, &digits, buffer.alphabet(), field.kind)
        }
        FieldLayout::Positions(_) => {
            digits_to_value(&field.name, &digits, buffer.alphabet(), field.kind)
        }
        FieldLayout::DigitRemap(remap) => {
            remap_digits(&field.name, remap, &digits).map(i128::from)
        }
    }
}

/// 将按有效位排序（最高位在前）的数字转换为数值
pub fn digits_to_value(
    field_name: &str,
    digits: &[u8],
    alphabet: Alphabet,
    kind: NumericKind,
) -> Result<i128, DecodeError> {
    let radix = u64::from(alphabet.radix());
    let mut value = 0u64;
    for &digit in digits {
        value = value
            .checked_mul(radix)
            .and_then(|v| v.checked_add(u64::from(digit)))
            .ok_or_else(|| DecodeError::ValueOverflow {
                field: field_name.to_string(),
                digits: digits.iter().map(|d| char::from(b'0' + d)).collect(),
            })?;
    }

    // 补码：最高位为1时为负数
    if kind == NumericKind::TwosComplement && digits.first() == Some(&1) {
        return Ok(i128::from(value) - (1i128 << digits.len()));
    }

    Ok(i128::from(value))
}

/// 按字段宽度输出大写十六进制，宽度为 ceil(bits/4)
pub fn format_hex(value: i128, bit_count: usize) -> String {
    let width = bit_count.div_ceil(4);
    // 负数按补码宽度截断
    let masked = if bit_count >= 128 {
        value as u128
    } else {
        (value as u128) & ((1u128 << bit_count) - 1)
    };
    format!("{masked:0width$X}")
}
