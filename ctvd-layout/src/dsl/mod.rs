//! 布局定义语言
//!
//! JSON布局文件与位范围表达式的解析

pub mod bit_range_parser;
pub mod json_parser;

pub use bit_range_parser::{parse_bit_range, to_field_layout};
pub use json_parser::{FieldSpec, JsonParser, LayoutFile};
