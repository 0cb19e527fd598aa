//! 捕获元数据模块
//!
//! 定义捕获缓冲区、字段描述、限值与结果记录等数据结构

use std::fmt;
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::DecodeError;
use crate::utils::hex_to_binary;

/// 符号字母表
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alphabet {
    #[default]
    Binary, // {0,1}
    Decimal, // {0..9}
}

impl Alphabet {
    pub fn radix(self) -> u32 {
        match self {
            Alphabet::Binary => 2,
            Alphabet::Decimal => 10,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Alphabet::Binary => "binary",
            Alphabet::Decimal => "decimal",
        }
    }

    /// 将ASCII符号转换为数字，不属于字母表时返回None
    pub fn symbol_value(self, symbol: u8) -> Option<u8> {
        match self {
            Alphabet::Binary => match symbol {
                b'0' => Some(0),
                b'1' => Some(1),
                _ => None,
            },
            Alphabet::Decimal => symbol.is_ascii_digit().then(|| symbol - b'0'),
        }
    }
}

/// 捕获缓冲区
///
/// 一次测试执行产生的定长符号序列，解码期间只读
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureBuffer {
    alphabet: Alphabet,
    symbols: Vec<u8>,
}

impl CaptureBuffer {
    pub fn new(alphabet: Alphabet, symbols: impl Into<Vec<u8>>) -> Self {
        Self {
            alphabet,
            symbols: symbols.into(),
        }
    }

    /// 二进制捕获，字符串第0个字符为bit 0
    pub fn binary(data: &str) -> Self {
        Self::new(Alphabet::Binary, data.trim().as_bytes())
    }

    /// 十进制数字捕获
    pub fn decimal(data: &str) -> Self {
        Self::new(Alphabet::Decimal, data.trim().as_bytes())
    }

    /// 由十六进制文本展开为二进制捕获，每个十六进制位展开为4bit（MSB在前）
    pub fn from_hex(data: &str) -> Result<Self, DecodeError> {
        let bits = hex_to_binary(data)?;
        Ok(Self::new(Alphabet::Binary, bits.into_bytes()))
    }

    /// 将十进制数值补零到固定宽度，用于数字重映射布局
    pub fn from_decimal_value(value: u64, pad_width: usize) -> Self {
        Self::new(Alphabet::Decimal, format!("{value:0pad_width$}").into_bytes())
    }

    pub fn alphabet(&self) -> Alphabet {
        self.alphabet
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn symbols(&self) -> &[u8] {
        &self.symbols
    }

    pub fn symbol_at(&self, position: usize) -> Option<u8> {
        self.symbols.get(position).copied()
    }
}

/// 位序
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BitOrder {
    #[default]
    MsbFirst, // 第一个提取的符号为最高位
    LsbFirst, // 第一个提取的符号为最低位
}

/// 数值类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericKind {
    #[default]
    Unsigned,
    TwosComplement, // 二进制补码，仅限二进制字母表
    Hex,            // 按无符号解码，额外输出十六进制字符串
}

/// 数字选择规则
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigitSelection {
    /// 补零后首位数字匹配时生效，None表示通配
    #[serde(default)]
    pub leading: Option<char>,
    pub positions: Vec<usize>,
}

/// 数字重映射（bin码压缩）配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigitRemap {
    pub pad_width: usize,
    /// 有效数字位数不超过该值时原样通过
    pub passthrough_digits: usize,
    pub selections: Vec<DigitSelection>,
}

impl DigitRemap {
    /// 按首位数字选择位置列表，第一条匹配的规则生效
    pub fn positions_for(&self, leading: char) -> Option<&[usize]> {
        self.selections
            .iter()
            .find(|s| s.leading.map_or(true, |c| c == leading))
            .map(|s| s.positions.as_slice())
    }
}

/// 字段在单个occurrence内的布局策略
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldLayout {
    /// 连续符号区间 [offset, offset+width)
    Contiguous { width: usize, order: BitOrder },
    /// 显式相对位置列表，按列表顺序拼接，第一个为最高位
    Positions(Vec<usize>),
    /// 十进制数字重映射
    DigitRemap(DigitRemap),
}

impl FieldLayout {
    /// 单个occurrence占用的相对跨度（最大相对位置+1）
    pub fn extent(&self) -> usize {
        match self {
            FieldLayout::Contiguous { width, .. } => *width,
            FieldLayout::Positions(positions) => {
                positions.iter().max().map_or(0, |p| p.saturating_add(1))
            }
            FieldLayout::DigitRemap(remap) => remap.pad_width,
        }
    }

    /// 提取的符号个数
    pub fn symbol_count(&self) -> usize {
        match self {
            FieldLayout::Contiguous { width, .. } => *width,
            FieldLayout::Positions(positions) => positions.len(),
            FieldLayout::DigitRemap(remap) => remap.pad_width,
        }
    }
}

/// 统计量
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Statistic {
    #[serde(rename = "avg")]
    Average,
    #[serde(rename = "max")]
    Maximum,
    #[serde(rename = "min")]
    Minimum,
    #[serde(rename = "range")]
    Range,
}

impl Statistic {
    pub const ALL: [Statistic; 4] = [
        Statistic::Average,
        Statistic::Maximum,
        Statistic::Minimum,
        Statistic::Range,
    ];

    /// 结果记录名称后缀
    pub fn suffix(self) -> &'static str {
        match self {
            Statistic::Average => "_AVG",
            Statistic::Maximum => "_MAX",
            Statistic::Minimum => "_MIN",
            Statistic::Range => "_RANGE",
        }
    }
}

impl FromStr for Statistic {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "avg" | "average" => Ok(Statistic::Average),
            "max" | "maximum" => Ok(Statistic::Maximum),
            "min" | "minimum" => Ok(Statistic::Minimum),
            "range" => Ok(Statistic::Range),
            _ => Err(DecodeError::UnknownStatistic(s.to_string())),
        }
    }
}

/// 限值边界
///
/// 布局中的整数边界保持为整数，与解码值精确比较；
/// 带小数的边界按浮点处理
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LimitValue {
    Integer(i128),
    Float(f64),
}

// i128 能表示的上界 2^127
const I128_BOUND: f64 = 170_141_183_460_469_231_731_687_303_715_884_105_728.0;

impl LimitValue {
    /// 整数值 `value >= self`，精确比较
    pub fn admits_from_above(self, value: i128) -> bool {
        match self {
            LimitValue::Integer(lower) => value >= lower,
            LimitValue::Float(lower) => {
                let lower = lower.ceil();
                if lower.is_nan() || lower >= I128_BOUND {
                    false
                } else if lower < -I128_BOUND {
                    true
                } else {
                    value >= lower as i128
                }
            }
        }
    }

    /// 整数值 `value <= self`，精确比较
    pub fn admits_from_below(self, value: i128) -> bool {
        match self {
            LimitValue::Integer(upper) => value <= upper,
            LimitValue::Float(upper) => {
                let upper = upper.floor();
                if upper.is_nan() || upper < -I128_BOUND {
                    false
                } else if upper >= I128_BOUND {
                    true
                } else {
                    value <= upper as i128
                }
            }
        }
    }

    pub fn as_f64(self) -> f64 {
        match self {
            LimitValue::Integer(v) => v as f64,
            LimitValue::Float(v) => v,
        }
    }

    pub fn is_finite(self) -> bool {
        match self {
            LimitValue::Integer(_) => true,
            LimitValue::Float(v) => v.is_finite(),
        }
    }
}

impl From<i32> for LimitValue {
    fn from(value: i32) -> Self {
        LimitValue::Integer(value.into())
    }
}

impl From<i64> for LimitValue {
    fn from(value: i64) -> Self {
        LimitValue::Integer(value.into())
    }
}

impl From<u64> for LimitValue {
    fn from(value: u64) -> Self {
        LimitValue::Integer(value.into())
    }
}

impl From<i128> for LimitValue {
    fn from(value: i128) -> Self {
        LimitValue::Integer(value)
    }
}

impl From<f64> for LimitValue {
    fn from(value: f64) -> Self {
        LimitValue::Float(value)
    }
}

impl fmt::Display for LimitValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LimitValue::Integer(v) => write!(f, "{v}"),
            LimitValue::Float(v) => write!(f, "{v}"),
        }
    }
}

impl<'de> Deserialize<'de> for LimitValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct LimitValueVisitor;

        impl<'v> Visitor<'v> for LimitValueVisitor {
            type Value = LimitValue;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a numeric limit")
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<LimitValue, E> {
                Ok(LimitValue::Integer(v.into()))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<LimitValue, E> {
                Ok(LimitValue::Integer(v.into()))
            }

            fn visit_i128<E: de::Error>(self, v: i128) -> Result<LimitValue, E> {
                Ok(LimitValue::Integer(v))
            }

            fn visit_u128<E: de::Error>(self, v: u128) -> Result<LimitValue, E> {
                i128::try_from(v)
                    .map(LimitValue::Integer)
                    .map_err(|_| E::custom(format!("limit {v} exceeds 128-bit range")))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<LimitValue, E> {
                Ok(LimitValue::Float(v))
            }
        }

        deserializer.deserialize_any(LimitValueVisitor)
    }
}

/// 限值
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LimitSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lower: Option<LimitValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upper: Option<LimitValue>,
}

impl LimitSpec {
    pub fn new(lower: Option<LimitValue>, upper: Option<LimitValue>) -> Self {
        Self { lower, upper }
    }

    pub fn at_least(lower: impl Into<LimitValue>) -> Self {
        Self::new(Some(lower.into()), None)
    }

    pub fn at_most(upper: impl Into<LimitValue>) -> Self {
        Self::new(None, Some(upper.into()))
    }

    pub fn between(lower: impl Into<LimitValue>, upper: impl Into<LimitValue>) -> Self {
        Self::new(Some(lower.into()), Some(upper.into()))
    }

    pub fn is_unbounded(&self) -> bool {
        self.lower.is_none() && self.upper.is_none()
    }

    /// 整数值是否在闭区间内
    pub fn contains_integer(&self, value: i128) -> bool {
        self.lower.map_or(true, |lower| lower.admits_from_above(value))
            && self.upper.map_or(true, |upper| upper.admits_from_below(value))
    }

    /// 浮点值（平均值）是否在闭区间内
    pub fn contains_float(&self, value: f64) -> bool {
        self.lower.map_or(true, |lower| value >= lower.as_f64())
            && self.upper.map_or(true, |upper| value <= upper.as_f64())
    }

    /// 结果值是否在闭区间内，文本值返回None
    pub fn contains(&self, value: &RecordValue) -> Option<bool> {
        match value {
            RecordValue::Integer(v) => Some(self.contains_integer(*v)),
            RecordValue::Float(v) => Some(self.contains_float(*v)),
            RecordValue::Text(_) => None,
        }
    }
}

/// 限值检查对象
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitTarget {
    /// 每个occurrence单独检查
    Each,
    #[serde(rename = "avg")]
    Average,
    #[serde(rename = "max")]
    Maximum,
    #[serde(rename = "min")]
    Minimum,
    Range,
}

impl LimitTarget {
    pub fn statistic(self) -> Option<Statistic> {
        match self {
            LimitTarget::Each => None,
            LimitTarget::Average => Some(Statistic::Average),
            LimitTarget::Maximum => Some(Statistic::Maximum),
            LimitTarget::Minimum => Some(Statistic::Minimum),
            LimitTarget::Range => Some(Statistic::Range),
        }
    }
}

/// 字段限值检查配置
///
/// 文件格式为 `{"target": ..., "lower": ..., "upper": ...}`，未知键报错
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "LimitCheckFile", into = "LimitCheckFile")]
pub struct LimitCheck {
    pub target: LimitTarget,
    pub spec: LimitSpec,
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct LimitCheckFile {
    target: LimitTarget,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    lower: Option<LimitValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    upper: Option<LimitValue>,
}

impl From<LimitCheckFile> for LimitCheck {
    fn from(file: LimitCheckFile) -> Self {
        LimitCheck {
            target: file.target,
            spec: LimitSpec::new(file.lower, file.upper),
        }
    }
}

impl From<LimitCheck> for LimitCheckFile {
    fn from(check: LimitCheck) -> Self {
        LimitCheckFile {
            target: check.target,
            lower: check.spec.lower,
            upper: check.spec.upper,
        }
    }
}

/// 判定结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Pass,
    Fail,
    /// 未配置限值，不参与综合判定
    Unchecked,
}

impl Verdict {
    pub fn is_checked(self) -> bool {
        self != Verdict::Unchecked
    }

    /// 逻辑与，Unchecked为单位元
    pub fn and(self, other: Verdict) -> Verdict {
        match (self, other) {
            (Verdict::Fail, _) | (_, Verdict::Fail) => Verdict::Fail,
            (Verdict::Pass, _) | (_, Verdict::Pass) => Verdict::Pass,
            _ => Verdict::Unchecked,
        }
    }

    pub fn from_passed(passed: bool) -> Verdict {
        if passed {
            Verdict::Pass
        } else {
            Verdict::Fail
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Pass => write!(f, "PASS"),
            Verdict::Fail => write!(f, "FAIL"),
            Verdict::Unchecked => write!(f, "UNCHECKED"),
        }
    }
}

/// 原始值输出方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RawEmit {
    /// 所有occurrence用分隔符拼接为一条记录
    #[default]
    Joined,
    /// 每个occurrence一条记录，名称为 `{name}_{i}`
    PerOccurrence,
    None,
}

/// 字段输出配置
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EmitConfig {
    #[serde(default)]
    pub raw: RawEmit,
    #[serde(default)]
    pub statistics: Vec<Statistic>,
}

/// 字段描述
///
/// occurrence `i` 位于 `start_offset + i * stride`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub start_offset: usize,
    pub layout: FieldLayout,
    pub repeat_count: usize,
    pub stride: usize,
    pub kind: NumericKind,
    pub limit: Option<LimitCheck>,
    pub emit: EmitConfig,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, start_offset: usize, layout: FieldLayout) -> Self {
        Self {
            name: name.into(),
            start_offset,
            layout,
            repeat_count: 1,
            stride: 0,
            kind: NumericKind::Unsigned,
            limit: None,
            emit: EmitConfig::default(),
        }
    }

    /// 连续区间字段
    pub fn contiguous(
        name: impl Into<String>,
        start_offset: usize,
        width: usize,
        order: BitOrder,
    ) -> Self {
        Self::new(name, start_offset, FieldLayout::Contiguous { width, order })
    }

    pub fn with_repeat(mut self, repeat_count: usize, stride: usize) -> Self {
        self.repeat_count = repeat_count;
        self.stride = stride;
        self
    }

    pub fn with_kind(mut self, kind: NumericKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_limit(mut self, target: LimitTarget, spec: LimitSpec) -> Self {
        self.limit = Some(LimitCheck { target, spec });
        self
    }

    pub fn with_emit(mut self, raw: RawEmit, statistics: &[Statistic]) -> Self {
        self.emit = EmitConfig {
            raw,
            statistics: statistics.to_vec(),
        };
        self
    }

    /// occurrence的起始位置，溢出usize时返回None
    pub fn occurrence_offset(&self, occurrence: usize) -> Option<usize> {
        occurrence
            .checked_mul(self.stride)?
            .checked_add(self.start_offset)
    }

    /// 所有occurrence覆盖的总跨度，溢出usize时返回None
    pub fn span(&self) -> Option<usize> {
        self.occurrence_offset(self.repeat_count.saturating_sub(1))?
            .checked_add(self.layout.extent())
    }

    /// 跨度溢出时的越界错误
    pub fn overflow_error(&self, length: usize) -> DecodeError {
        DecodeError::OutOfBounds {
            field: self.name.clone(),
            position: usize::MAX,
            length,
        }
    }

    /// 检查描述自身是否合法（与具体缓冲区无关）
    pub fn validate(&self, alphabet: Alphabet) -> Result<(), DecodeError> {
        let invalid = |reason: String| DecodeError::InvalidDescriptor {
            field: self.name.clone(),
            reason,
        };

        if self.repeat_count == 0 {
            return Err(invalid("repeat_count must be at least 1".to_string()));
        }

        match &self.layout {
            FieldLayout::Contiguous { width, .. } => {
                if *width == 0 {
                    return Err(invalid("width must be at least 1".to_string()));
                }
            }
            FieldLayout::Positions(positions) => {
                if positions.is_empty() {
                    return Err(invalid("position list is empty".to_string()));
                }
            }
            FieldLayout::DigitRemap(remap) => {
                if alphabet != Alphabet::Decimal {
                    return Err(invalid("digit remap requires a decimal capture".to_string()));
                }
                if remap.selections.is_empty() {
                    return Err(invalid("digit remap has no selections".to_string()));
                }
                if let Some(p) = remap
                    .selections
                    .iter()
                    .flat_map(|s| s.positions.iter())
                    .find(|p| **p >= remap.pad_width)
                {
                    return Err(invalid(format!(
                        "digit position {p} outside pad width {}",
                        remap.pad_width
                    )));
                }
            }
        }

        let count = self.layout.symbol_count();
        if alphabet == Alphabet::Binary && count > 64 {
            return Err(invalid(format!("{count} bits exceed 64-bit precision")));
        }
        if alphabet == Alphabet::Decimal && count > 20 {
            return Err(invalid(format!("{count} digits exceed 64-bit precision")));
        }
        if self.kind == NumericKind::TwosComplement && alphabet != Alphabet::Binary {
            return Err(invalid("two's complement requires a binary capture".to_string()));
        }

        if let Some(check) = &self.limit {
            if check.spec.is_unbounded() {
                return Err(invalid("limit has neither lower nor upper bound".to_string()));
            }
            if check
                .spec
                .lower
                .iter()
                .chain(check.spec.upper.iter())
                .any(|bound| !bound.is_finite())
            {
                return Err(invalid("limit bound is not a finite number".to_string()));
            }
        }

        if self.span().is_none() {
            return Err(self.overflow_error(usize::MAX));
        }

        Ok(())
    }
}

/// 解码模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodeMode {
    #[default]
    FailFast,
    /// 非法符号只影响所在字段，综合判定强制为失败
    BestEffort,
}

/// 解码选项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodeOptions {
    pub mode: DecodeMode,
    /// 平均值保留的小数位数，None表示不舍入
    pub rounding: Option<u32>,
    pub delimiter: String,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            mode: DecodeMode::FailFast,
            rounding: None,
            delimiter: "|".to_string(),
        }
    }
}

/// 捕获布局：一组字段描述及捕获长度
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureLayout {
    pub name: String,
    pub alphabet: Alphabet,
    /// 固定捕获长度，None时取所有字段跨度的最大值
    pub capture_length: Option<usize>,
    pub fields: Vec<FieldDescriptor>,
}

impl CaptureLayout {
    pub fn new(name: impl Into<String>, alphabet: Alphabet) -> Self {
        Self {
            name: name.into(),
            alphabet,
            capture_length: None,
            fields: Vec::new(),
        }
    }

    pub fn with_capture_length(mut self, length: usize) -> Self {
        self.capture_length = Some(length);
        self
    }

    pub fn add_field(&mut self, field: FieldDescriptor) {
        self.fields.push(field);
    }

    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.add_field(field);
        self
    }

    /// 所有字段跨度的最大值
    pub fn total_span(&self) -> Result<usize, DecodeError> {
        self.fields.iter().try_fold(0, |max, field| {
            field
                .span()
                .map(|span| max.max(span))
                .ok_or_else(|| field.overflow_error(usize::MAX))
        })
    }

    pub fn required_length(&self) -> Result<usize, DecodeError> {
        match self.capture_length {
            Some(length) => Ok(length),
            None => self.total_span(),
        }
    }
}

/// 统计记录
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatisticRecord {
    pub average: f64,
    pub maximum: i128,
    pub minimum: i128,
    pub range: i128,
}

impl StatisticRecord {
    pub fn get(&self, statistic: Statistic) -> RecordValue {
        match statistic {
            Statistic::Average => RecordValue::Float(self.average),
            Statistic::Maximum => RecordValue::Integer(self.maximum),
            Statistic::Minimum => RecordValue::Integer(self.minimum),
            Statistic::Range => RecordValue::Integer(self.range),
        }
    }
}

/// 结果记录的值
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RecordValue {
    Integer(i128),
    Float(f64),
    Text(String),
}

impl fmt::Display for RecordValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordValue::Integer(v) => write!(f, "{v}"),
            RecordValue::Float(v) => write!(f, "{v}"),
            RecordValue::Text(v) => write!(f, "{v}"),
        }
    }
}

/// 结果记录，转发给结果输出端
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRecord {
    pub name: String,
    pub value: RecordValue,
    pub verdict: Verdict,
}

impl ResultRecord {
    pub fn new(name: impl Into<String>, value: RecordValue) -> Self {
        Self {
            name: name.into(),
            value,
            verdict: Verdict::Unchecked,
        }
    }

    pub fn with_verdict(mut self, verdict: Verdict) -> Self {
        self.verdict = verdict;
        self
    }
}

/// 单个字段族的解码结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldResult {
    pub name: String,
    pub values: Vec<i128>,
    pub statistics: Option<StatisticRecord>,
    pub verdict: Verdict,
}

/// 一次解码的完整结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodeOutcome {
    pub layout: String,
    pub fields: Vec<FieldResult>,
    pub records: Vec<ResultRecord>,
    /// best-effort模式下被跳过的字段错误
    pub field_errors: Vec<DecodeError>,
    pub passed: bool,
}

impl DecodeOutcome {
    pub fn verdict(&self) -> Verdict {
        Verdict::from_passed(self.passed)
    }

    pub fn field(&self, name: &str) -> Option<&FieldResult> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn occurrence_values(&self, name: &str) -> Option<&[i128]> {
        self.field(name).map(|f| f.values.as_slice())
    }

    pub fn record(&self, name: &str) -> Option<&ResultRecord> {
        self.records.iter().find(|r| r.name == name)
    }

    /// 参与限值检查且失败的字段
    pub fn failed_fields(&self) -> impl Iterator<Item = &FieldResult> {
        self.fields.iter().filter(|f| f.verdict == Verdict::Fail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alphabet_symbols() {
        assert_eq!(Alphabet::Binary.symbol_value(b'1'), Some(1));
        assert_eq!(Alphabet::Binary.symbol_value(b'2'), None);
        assert_eq!(Alphabet::Decimal.symbol_value(b'7'), Some(7));
        assert_eq!(Alphabet::Decimal.symbol_value(b'L'), None);
    }

    #[test]
    fn test_capture_constructors() {
        let capture = CaptureBuffer::from_decimal_value(1234, 8);
        assert_eq!(capture.symbols(), b"00001234");
        assert_eq!(capture.alphabet(), Alphabet::Decimal);

        let capture = CaptureBuffer::from_hex("0xA5").unwrap();
        assert_eq!(capture.symbols(), b"10100101");
        assert_eq!(capture.len(), 8);
    }

    #[test]
    fn test_descriptor_span() {
        // 8个occurrence，步长192，相对bit 11-17
        let field = FieldDescriptor::contiguous("max", 7680 + 11, 7, BitOrder::LsbFirst)
            .with_repeat(8, 192);
        assert_eq!(field.occurrence_offset(7), Some(7680 + 11 + 7 * 192));
        assert_eq!(field.span(), Some(7680 + 11 + 7 * 192 + 7));

        let field = FieldDescriptor::new("bits", 4, FieldLayout::Positions(vec![10, 2, 6]));
        assert_eq!(field.span(), Some(15));
    }

    #[test]
    fn test_span_overflow_is_out_of_bounds() {
        let field = FieldDescriptor::contiguous("v", 0, 4, BitOrder::MsbFirst)
            .with_repeat(2, usize::MAX);
        assert_eq!(field.occurrence_offset(1), Some(usize::MAX));
        assert_eq!(field.span(), None);

        let err = field.validate(Alphabet::Binary).unwrap_err();
        assert_eq!(err.category(), "OUT_OF_BOUNDS");

        let layout = CaptureLayout::new("T", Alphabet::Binary).field(field);
        assert!(matches!(
            layout.required_length(),
            Err(DecodeError::OutOfBounds { .. })
        ));
        // 固定长度时直接返回，越界由解码器检查
        assert_eq!(layout.with_capture_length(16).required_length().unwrap(), 16);
    }

    #[test]
    fn test_descriptor_validation() {
        let field = FieldDescriptor::contiguous("zero", 0, 0, BitOrder::MsbFirst);
        assert!(field.validate(Alphabet::Binary).is_err());

        let field = FieldDescriptor::contiguous("wide", 0, 65, BitOrder::MsbFirst);
        assert!(field.validate(Alphabet::Binary).is_err());

        let field = FieldDescriptor::contiguous("ok", 0, 64, BitOrder::MsbFirst);
        assert!(field.validate(Alphabet::Binary).is_ok());

        let field = FieldDescriptor::contiguous("none", 0, 4, BitOrder::MsbFirst).with_repeat(0, 4);
        assert!(field.validate(Alphabet::Binary).is_err());

        let field = FieldDescriptor::contiguous("signed", 0, 4, BitOrder::MsbFirst)
            .with_kind(NumericKind::TwosComplement);
        assert!(field.validate(Alphabet::Decimal).is_err());
    }

    #[test]
    fn test_verdict_and() {
        assert_eq!(Verdict::Unchecked.and(Verdict::Pass), Verdict::Pass);
        assert_eq!(Verdict::Pass.and(Verdict::Fail), Verdict::Fail);
        assert_eq!(Verdict::Unchecked.and(Verdict::Unchecked), Verdict::Unchecked);
        assert!(!Verdict::Unchecked.is_checked());
    }

    #[test]
    fn test_statistic_from_str() {
        assert_eq!("AVG".parse::<Statistic>().unwrap(), Statistic::Average);
        assert_eq!("range".parse::<Statistic>().unwrap(), Statistic::Range);
        assert!("median".parse::<Statistic>().is_err());
        assert_eq!(Statistic::Range.suffix(), "_RANGE");
    }

    #[test]
    fn test_digit_remap_selection() {
        let remap = DigitRemap {
            pad_width: 8,
            passthrough_digits: 4,
            selections: vec![
                DigitSelection {
                    leading: Some('9'),
                    positions: vec![4, 5, 6, 7],
                },
                DigitSelection {
                    leading: None,
                    positions: vec![2, 3, 4, 5],
                },
            ],
        };
        assert_eq!(remap.positions_for('9'), Some(&[4, 5, 6, 7][..]));
        assert_eq!(remap.positions_for('1'), Some(&[2, 3, 4, 5][..]));
    }

    #[test]
    fn test_limit_check_json() {
        let check: LimitCheck =
            serde_json::from_str(r#"{ "target": "min", "lower": 1 }"#).unwrap();
        assert_eq!(check.target, LimitTarget::Minimum);
        assert_eq!(check.spec, LimitSpec::at_least(1));

        let check: LimitCheck =
            serde_json::from_str(r#"{ "target": "each", "lower": -0.5, "upper": 9223372036854775808 }"#)
                .unwrap();
        assert_eq!(check.spec.lower, Some(LimitValue::Float(-0.5)));
        assert_eq!(check.spec.upper, Some(LimitValue::Integer(1 << 63)));
        assert_eq!(
            serde_json::to_string(&check).unwrap(),
            r#"{"target":"each","lower":-0.5,"upper":9223372036854775808}"#
        );
    }

    #[test]
    fn test_limit_check_rejects_unknown_keys() {
        let err = serde_json::from_str::<LimitCheck>(r#"{ "target": "each", "lowr": 5 }"#)
            .unwrap_err();
        assert!(err.to_string().contains("unknown field `lowr`"));
    }

    #[test]
    fn test_unbounded_limit_is_invalid() {
        let field = FieldDescriptor::contiguous("v", 0, 4, BitOrder::MsbFirst)
            .with_limit(LimitTarget::Each, LimitSpec::default());
        assert!(matches!(
            field.validate(Alphabet::Binary),
            Err(DecodeError::InvalidDescriptor { .. })
        ));

        let field = FieldDescriptor::contiguous("v", 0, 4, BitOrder::MsbFirst)
            .with_limit(LimitTarget::Each, LimitSpec::at_most(f64::NAN));
        assert!(field.validate(Alphabet::Binary).is_err());
    }

    #[test]
    fn test_integer_limits_are_exact() {
        let limit = LimitSpec::at_most(1i128 << 63);
        assert!(limit.contains_integer(1 << 63));
        assert!(!limit.contains_integer((1 << 63) + 1));

        // 浮点边界按取整后的整数比较
        let limit = LimitSpec::between(0.5, 9.5);
        assert!(!limit.contains_integer(0));
        assert!(limit.contains_integer(1));
        assert!(limit.contains_integer(9));
        assert!(!limit.contains_integer(10));

        let limit = LimitSpec::at_least(-1e300);
        assert!(limit.contains_integer(i128::MIN));
        assert!(!LimitSpec::at_least(1e300).contains_integer(i128::MAX));

        assert!(LimitSpec::between(1, 2).contains_float(1.5));
        assert_eq!(
            LimitSpec::at_most(3).contains(&RecordValue::Text("A5".to_string())),
            None
        );
    }

    #[test]
    fn test_record_value_serializes_untagged() {
        let record = ResultRecord::new("v_AVG", RecordValue::Float(1.5)).with_verdict(Verdict::Fail);
        assert_eq!(
            serde_json::to_string(&record).unwrap(),
            r#"{"name":"v_AVG","value":1.5,"verdict":"Fail"}"#
        );
    }
}
