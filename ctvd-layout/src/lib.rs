//! CTV Decode Layout Language
//!
//! This crate loads capture layouts from JSON definition files and parses the
//! compact bit-range expressions used to address capture fields.

pub mod dsl;
pub mod error;

use std::path::Path;

pub use dsl::json_parser::LayoutDefinition;
pub use dsl::{parse_bit_range, to_field_layout, FieldSpec, JsonParser, LayoutFile};
pub use error::LayoutError;

/// 从文件加载布局定义
pub fn load_layout(path: impl AsRef<Path>) -> Result<LayoutDefinition, LayoutError> {
    let text = std::fs::read_to_string(path)?;
    JsonParser::parse_layout(&text)
}
