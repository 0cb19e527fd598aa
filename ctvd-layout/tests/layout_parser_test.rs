//! 布局文件解析与解码集成测试

use ctvd_core::{
    Alphabet, BitOrder, CaptureBuffer, FieldLayout, LimitTarget, RecordValue, Verdict,
};
use ctvd_kernel::CaptureDecoder;
use ctvd_layout::{load_layout, JsonParser, LayoutError};

const KILL_LAYOUT: &str = include_str!("fixtures/ccc_mm_bs_kill.json");
const SOFT_BIN_LAYOUT: &str = include_str!("fixtures/soft_bin_remap.json");
const REGISTER_LAYOUT: &str = include_str!("fixtures/register_dump.json");

#[test]
fn test_kill_layout_structure() {
    println!("\n=== 测试CCC_MM_BS_KILL布局解析 ===\n");

    let definition = JsonParser::parse_layout(KILL_LAYOUT).unwrap();
    let layout = &definition.layout;

    assert_eq!(layout.name, "CCC_MM_BS_KILL");
    assert_eq!(layout.alphabet, Alphabet::Binary);
    assert_eq!(layout.required_length().unwrap(), 9216);
    assert_eq!(layout.fields.len(), 12);
    assert_eq!(definition.options.rounding, Some(6));

    // "17-11" 降序范围等价于起点11、宽度7、LSB在前
    let max = &layout.fields[1];
    assert_eq!(max.name, "MaxVal_TC1");
    assert_eq!(max.start_offset, 11);
    assert_eq!(
        max.layout,
        FieldLayout::Contiguous {
            width: 7,
            order: BitOrder::LsbFirst,
        }
    );

    let checked: Vec<&str> = layout
        .fields
        .iter()
        .filter(|f| f.limit.map(|c| c.target) == Some(LimitTarget::Minimum))
        .map(|f| f.name.as_str())
        .collect();
    assert_eq!(
        checked,
        vec!["MaxVal_TC1", "MaxVal_TC2", "MaxVal_TC3", "MaxVal_TC4", "MaxVal_TC5"]
    );
    println!("✓ 12个字段，5个检查字段");
}

#[test]
fn test_kill_layout_decodes_capture() {
    let definition = JsonParser::parse_layout(KILL_LAYOUT).unwrap();
    let decoder = CaptureDecoder::new(definition.layout)
        .unwrap()
        .with_options(definition.options);

    let ones = CaptureBuffer::binary(&"1".repeat(9216));
    assert!(decoder.decode(&ones).unwrap().passed);

    let zeros = CaptureBuffer::binary(&"0".repeat(9216));
    let outcome = decoder.decode(&zeros).unwrap();
    assert!(!outcome.passed);
    assert_eq!(outcome.failed_fields().count(), 5);
    assert_eq!(
        outcome.record("MaxVal_TC0_MIN").unwrap().verdict,
        Verdict::Unchecked
    );
}

#[test]
fn test_soft_bin_layout() {
    let definition = JsonParser::parse_layout(SOFT_BIN_LAYOUT).unwrap();
    let decoder = CaptureDecoder::new(definition.layout).unwrap();

    for (input, expected) in [(90191904u64, 1904i128), (10011234, 112), (1234, 1234)] {
        let outcome = decoder
            .decode(&CaptureBuffer::from_decimal_value(input, 8))
            .unwrap();
        assert_eq!(
            outcome.record("SOFT_BIN").unwrap().value,
            RecordValue::Integer(expected)
        );
        assert!(outcome.passed);
    }
}

#[test]
fn test_register_dump_layout() {
    let definition = JsonParser::parse_layout(REGISTER_LAYOUT).unwrap();
    assert_eq!(definition.layout.required_length().unwrap(), 26);

    let decoder = CaptureDecoder::new(definition.layout).unwrap();
    // STATUS=0xA5, TEMP=-2, FLAGS取bit 0,5,6,7,9 => 1,1,0,1,1
    let capture = CaptureBuffer::binary("10100101111111101000010101");
    let outcome = decoder.decode(&capture).unwrap();

    assert_eq!(
        outcome.record("STATUS").unwrap().value,
        RecordValue::Text("A5".to_string())
    );
    assert_eq!(outcome.occurrence_values("TEMP").unwrap(), &[-2i128]);
    assert_eq!(outcome.field("TEMP").unwrap().verdict, Verdict::Pass);
    assert_eq!(
        outcome.record("FLAGS_0").unwrap().value,
        RecordValue::Integer(0b11011)
    );
}

#[test]
fn test_invalid_bit_expression() {
    let json = r#"{ "name": "T", "fields": [ { "name": "f", "bits": "3-" } ] }"#;
    let err = JsonParser::parse_layout(json).unwrap_err();
    assert!(matches!(err, LayoutError::Decode(_)));
    assert!(err.to_string().contains("Invalid bit range expression"));
}

#[test]
fn test_load_missing_file() {
    let err = load_layout("does/not/exist.json").unwrap_err();
    assert!(matches!(err, LayoutError::Io(_)));
}

#[test]
fn test_integer_limit_from_json_is_exact() {
    println!("\n=== 测试64位字段的整数限值 ===\n");

    let json = r#"{ "name": "WIDE", "fields": [ { "name": "v", "width": 64,
        "limit": { "target": "each", "upper": 9223372036854775808 } } ] }"#;
    let definition = JsonParser::parse_layout(json).unwrap();
    let decoder = CaptureDecoder::new(definition.layout).unwrap();

    // 2^63 通过，2^63+1 失败
    let at_limit = format!("1{}", "0".repeat(63));
    assert!(decoder.decode(&CaptureBuffer::binary(&at_limit)).unwrap().passed);
    let above = format!("1{}1", "0".repeat(62));
    assert!(!decoder.decode(&CaptureBuffer::binary(&above)).unwrap().passed);
    println!("✓ 2^63+1 超出上限");
}
