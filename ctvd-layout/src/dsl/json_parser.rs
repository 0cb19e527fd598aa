//! JSON解析器模块
//!
//! 用于解析JSON格式的捕获布局定义，并转换为内部的 `CaptureLayout`

use ctvd_core::{
    Alphabet, BitOrder, CaptureLayout, DecodeMode, DecodeOptions, DigitRemap, EmitConfig,
    FieldDescriptor, FieldLayout, LimitCheck, NumericKind,
};
use serde::Deserialize;

use super::bit_range_parser::{parse_bit_range, to_field_layout};
use crate::error::LayoutError;

/// 布局文件
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LayoutFile {
    pub name: String,
    #[serde(default)]
    pub alphabet: Alphabet,
    #[serde(default)]
    pub capture_length: Option<usize>,
    #[serde(default)]
    pub delimiter: Option<String>,
    #[serde(default)]
    pub rounding: Option<u32>,
    #[serde(default)]
    pub mode: DecodeMode,
    pub fields: Vec<FieldSpec>,
}

/// 布局文件中的字段定义
///
/// 位置信息三选一：`bits` 位范围表达式、`width`(+`order`) 连续字段、`remap` 数字重映射
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldSpec {
    pub name: String,
    #[serde(default)]
    pub offset: usize,
    #[serde(default)]
    pub bits: Option<String>,
    #[serde(default)]
    pub width: Option<usize>,
    #[serde(default)]
    pub order: Option<BitOrder>,
    #[serde(default)]
    pub remap: Option<DigitRemap>,
    #[serde(default = "default_repeat")]
    pub repeat: usize,
    #[serde(default)]
    pub stride: usize,
    #[serde(default)]
    pub kind: NumericKind,
    #[serde(default)]
    pub limit: Option<LimitCheck>,
    #[serde(default)]
    pub emit: EmitConfig,
}

fn default_repeat() -> usize {
    1
}

/// 解析后的布局：字段布局与解码选项
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutDefinition {
    pub layout: CaptureLayout,
    pub options: DecodeOptions,
}

impl FieldSpec {
    fn error(&self, reason: impl Into<String>) -> LayoutError {
        LayoutError::Field {
            field: self.name.clone(),
            reason: reason.into(),
        }
    }

    /// 转换为字段描述
    pub fn to_descriptor(&self) -> Result<FieldDescriptor, LayoutError> {
        let (relative, layout) = match (&self.bits, self.width, &self.remap) {
            (Some(expr), None, None) => {
                if self.order.is_some() {
                    return Err(self.error("'order' is implied by 'bits' and cannot be set"));
                }
                to_field_layout(parse_bit_range(expr)?)
            }
            (None, Some(width), None) => (
                0,
                FieldLayout::Contiguous {
                    width,
                    order: self.order.unwrap_or_default(),
                },
            ),
            (None, None, Some(remap)) => (0, FieldLayout::DigitRemap(remap.clone())),
            (None, None, None) => {
                return Err(self.error("one of 'bits', 'width' or 'remap' is required"))
            }
            _ => return Err(self.error("only one of 'bits', 'width' or 'remap' may be set")),
        };

        if self.repeat > 1 && self.stride == 0 {
            return Err(self.error("'stride' is required when 'repeat' is greater than 1"));
        }
        let Some(start_offset) = self.offset.checked_add(relative) else {
            return Err(self.error("'offset' plus bit range exceeds the addressable range"));
        };

        Ok(FieldDescriptor {
            name: self.name.clone(),
            start_offset,
            layout,
            repeat_count: self.repeat,
            stride: self.stride,
            kind: self.kind,
            limit: self.limit,
            emit: self.emit.clone(),
        })
    }
}

impl LayoutFile {
    /// 转换为捕获布局与解码选项，并校验每个字段
    pub fn into_definition(self) -> Result<LayoutDefinition, LayoutError> {
        let mut layout = CaptureLayout::new(&self.name, self.alphabet);
        layout.capture_length = self.capture_length;

        for spec in &self.fields {
            if layout.fields.iter().any(|f| f.name == spec.name) {
                return Err(spec.error("duplicate field name"));
            }
            let descriptor = spec.to_descriptor()?;
            descriptor.validate(self.alphabet)?;
            layout.add_field(descriptor);
        }

        let defaults = DecodeOptions::default();
        let options = DecodeOptions {
            mode: self.mode,
            rounding: self.rounding,
            delimiter: self.delimiter.unwrap_or(defaults.delimiter),
        };

        Ok(LayoutDefinition { layout, options })
    }
}

/// JSON解析器
pub struct JsonParser;

impl JsonParser {
    /// 解析布局文件JSON
    pub fn parse_layout_file(json_str: &str) -> Result<LayoutFile, LayoutError> {
        Ok(serde_json::from_str(json_str)?)
    }

    /// 解析布局JSON并转换为内部布局
    ///
    /// # 示例
    /// ```
    /// use ctvd_layout::dsl::json_parser::JsonParser;
    ///
    /// let json = r#"{
    ///     "name": "DEMO",
    ///     "fields": [ { "name": "max", "offset": 0, "bits": "17-11", "repeat": 2, "stride": 192 } ]
    /// }"#;
    /// let definition = JsonParser::parse_layout(json).unwrap();
    /// assert_eq!(definition.layout.fields[0].start_offset, 11);
    /// assert_eq!(definition.layout.required_length().unwrap(), 192 + 18);
    /// ```
    pub fn parse_layout(json_str: &str) -> Result<LayoutDefinition, LayoutError> {
        Self::parse_layout_file(json_str)?.into_definition()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctvd_core::{DecodeError, LimitSpec, LimitTarget, RawEmit, Statistic};

    #[test]
    fn test_parse_contiguous_field() {
        let json = r#"{
            "name": "T",
            "capture_length": 32,
            "rounding": 6,
            "fields": [
                {
                    "name": "v",
                    "offset": 8,
                    "width": 4,
                    "order": "lsb_first",
                    "repeat": 3,
                    "stride": 8,
                    "limit": { "target": "max", "upper": 10 },
                    "emit": { "raw": "per_occurrence", "statistics": ["avg", "range"] }
                }
            ]
        }"#;
        let definition = JsonParser::parse_layout(json).unwrap();
        let field = &definition.layout.fields[0];

        assert_eq!(definition.layout.capture_length, Some(32));
        assert_eq!(definition.options.rounding, Some(6));
        assert_eq!(definition.options.delimiter, "|");
        assert_eq!(field.start_offset, 8);
        assert_eq!(
            field.layout,
            FieldLayout::Contiguous {
                width: 4,
                order: BitOrder::LsbFirst,
            }
        );
        assert_eq!(field.repeat_count, 3);
        assert_eq!(
            field.limit,
            Some(LimitCheck {
                target: LimitTarget::Maximum,
                spec: LimitSpec::at_most(10),
            })
        );
        assert_eq!(field.emit.raw, RawEmit::PerOccurrence);
        assert_eq!(
            field.emit.statistics,
            vec![Statistic::Average, Statistic::Range]
        );
    }

    #[test]
    fn test_scattered_bits_relative_to_offset() {
        let json = r#"{ "name": "T", "fields": [ { "name": "f", "offset": 16, "bits": "0,5-7,9" } ] }"#;
        let definition = JsonParser::parse_layout(json).unwrap();
        let field = &definition.layout.fields[0];

        assert_eq!(field.start_offset, 16);
        assert_eq!(field.layout, FieldLayout::Positions(vec![0, 5, 6, 7, 9]));
    }

    #[test]
    fn test_missing_and_conflicting_location() {
        let missing = r#"{ "name": "T", "fields": [ { "name": "f" } ] }"#;
        assert!(matches!(
            JsonParser::parse_layout(missing),
            Err(LayoutError::Field { .. })
        ));

        let both = r#"{ "name": "T", "fields": [ { "name": "f", "bits": "1-3", "width": 3 } ] }"#;
        assert!(matches!(
            JsonParser::parse_layout(both),
            Err(LayoutError::Field { .. })
        ));
    }

    #[test]
    fn test_repeat_without_stride() {
        let json = r#"{ "name": "T", "fields": [ { "name": "f", "width": 2, "repeat": 4 } ] }"#;
        assert!(matches!(
            JsonParser::parse_layout(json),
            Err(LayoutError::Field { .. })
        ));
    }

    #[test]
    fn test_duplicate_field_names() {
        let json = r#"{ "name": "T", "fields": [
            { "name": "f", "width": 2 },
            { "name": "f", "offset": 2, "width": 2 }
        ] }"#;
        assert!(JsonParser::parse_layout(json).is_err());
    }

    #[test]
    fn test_unknown_key_rejected() {
        let json = r#"{ "name": "T", "fields": [ { "name": "f", "width": 2, "lenght": 3 } ] }"#;
        assert!(matches!(
            JsonParser::parse_layout(json),
            Err(LayoutError::Json(_))
        ));
    }

    #[test]
    fn test_misspelled_limit_key_rejected() {
        let json = r#"{ "name": "T", "fields": [ { "name": "f", "width": 4,
            "limit": { "target": "each", "lowr": 5 } } ] }"#;
        let err = JsonParser::parse_layout(json).unwrap_err();
        assert!(matches!(err, LayoutError::Json(_)));
        assert!(err.to_string().contains("lowr"));

        // 没有任何边界的限值也是配置错误
        let json = r#"{ "name": "T", "fields": [ { "name": "f", "width": 4,
            "limit": { "target": "each" } } ] }"#;
        assert!(matches!(
            JsonParser::parse_layout(json),
            Err(LayoutError::Decode(DecodeError::InvalidDescriptor { .. }))
        ));
    }

    #[test]
    fn test_address_overflow_rejected() {
        let json = format!(
            r#"{{ "name": "T", "fields": [ {{ "name": "f", "offset": {}, "bits": "7-4" }} ] }}"#,
            usize::MAX
        );
        assert!(matches!(
            JsonParser::parse_layout(&json),
            Err(LayoutError::Field { .. })
        ));

        let json = format!(
            r#"{{ "name": "T", "fields": [ {{ "name": "f", "width": 4, "repeat": 2, "stride": {} }} ] }}"#,
            usize::MAX
        );
        let err = JsonParser::parse_layout(&json).unwrap_err();
        assert_eq!(err.category(), "OUT_OF_BOUNDS");
    }

    #[test]
    fn test_descriptor_validation_runs() {
        // 数字重映射只能用于十进制捕获
        let json = r#"{ "name": "T", "fields": [ { "name": "bin",
            "remap": { "pad_width": 8, "passthrough_digits": 4, "selections": [ { "positions": [0] } ] } } ] }"#;
        assert!(matches!(
            JsonParser::parse_layout(json),
            Err(LayoutError::Decode(_))
        ));
    }
}
