//! 位范围表达式解析
//!
//! 表达式形式：`"0,5-7,9"` 依次选取 bit 0,5,6,7,9；
//! 降序范围 `"10-4"` 依次选取 bit 10,9,...,4（第一个选取的bit为最高位）

use ctvd_core::{BitOrder, DecodeError, FieldLayout};
use nom::{
    character::complete::{char, digit1, space0},
    combinator::{all_consuming, map_res, opt},
    multi::separated_list1,
    sequence::{delimited, pair, preceded},
    IResult,
};

/// 表达式中的一项：单个位置或闭区间
type Term = (usize, Option<usize>);

fn index(input: &str) -> IResult<&str, usize> {
    map_res(delimited(space0, digit1, space0), |s: &str| s.parse::<usize>())(input)
}

fn term(input: &str) -> IResult<&str, Term> {
    pair(index, opt(preceded(char('-'), index)))(input)
}

fn expression(input: &str) -> IResult<&str, Vec<Term>> {
    separated_list1(char(','), term)(input)
}

/// 将位范围表达式展开为有序的位置列表
///
/// # 参数
/// - `expr`: 位范围表达式
///
/// # 返回
/// - `Ok(Vec<usize>)`: 按提取顺序排列的位置（相对于occurrence起点）
/// - `Err(DecodeError::InvalidExpression)`: 表达式格式错误
///
/// # 示例
/// ```
/// use ctvd_layout::dsl::bit_range_parser::parse_bit_range;
///
/// assert_eq!(parse_bit_range("0,5-7,9").unwrap(), vec![0, 5, 6, 7, 9]);
/// assert_eq!(parse_bit_range("10-8").unwrap(), vec![10, 9, 8]);
/// ```
pub fn parse_bit_range(expr: &str) -> Result<Vec<usize>, DecodeError> {
    let (_, terms) = all_consuming(expression)(expr)
        .map_err(|e| DecodeError::InvalidExpression(format!("'{expr}': {e}")))?;

    let mut positions = Vec::new();
    for (start, end) in terms {
        match end {
            None => positions.push(start),
            Some(end) if start <= end => positions.extend(start..=end),
            Some(end) => positions.extend((end..=start).rev()),
        }
    }
    Ok(positions)
}

/// 把位置列表规整为字段布局
///
/// 连续升序的位置等价于MSB在前的连续字段，连续降序的位置等价于
/// LSB在前的连续字段；其余情况保留位置列表。
///
/// # 返回
/// `(相对起点, 字段布局)`，连续字段的起点为最小位置，位置列表的起点为0
pub fn to_field_layout(positions: Vec<usize>) -> (usize, FieldLayout) {
    let ascending = positions.windows(2).all(|w| w[0].checked_add(1) == Some(w[1]));
    let descending = positions.windows(2).all(|w| w[1].checked_add(1) == Some(w[0]));

    match (positions.first(), positions.last()) {
        (Some(&first), Some(_)) if ascending => (
            first,
            FieldLayout::Contiguous {
                width: positions.len(),
                order: BitOrder::MsbFirst,
            },
        ),
        (Some(_), Some(&last)) if descending => (
            last,
            FieldLayout::Contiguous {
                width: positions.len(),
                order: BitOrder::LsbFirst,
            },
        ),
        _ => (0, FieldLayout::Positions(positions)),
    }
}
