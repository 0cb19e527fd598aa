//! CaptureDecoder核心实现
//!
//! 解码入口：校验捕获长度，逐字段提取、聚合、检查限值，并生成结果记录

use ctvd_core::utils::join_values;
use ctvd_core::{
    CaptureBuffer, CaptureLayout, DecodeError, DecodeMode, DecodeOptions, DecodeOutcome,
    FieldDescriptor, FieldResult, NumericKind, RawEmit, RecordValue, ResultRecord, ResultSink,
    Statistic, StatisticRecord, Verdict,
};
use tracing::{debug, error, warn};

use super::aggregator::Aggregator;
use super::bit_extractor::{decode_occurrence, format_hex};
use super::limit_evaluator::{FieldVerdict, LimitEvaluator};

/// 捕获解码器
///
/// 布局在构造时校验一次，之后可以对任意多个捕获重复使用
#[derive(Debug, Clone)]
pub struct CaptureDecoder {
    layout: CaptureLayout,
    options: DecodeOptions,
}

impl CaptureDecoder {
    /// 创建新的解码器并校验所有字段描述
    pub fn new(layout: CaptureLayout) -> Result<Self, DecodeError> {
        for field in &layout.fields {
            field.validate(layout.alphabet)?;
        }

        // 固定捕获长度时，字段跨度超出即为布局配置错误
        if let Some(length) = layout.capture_length {
            Self::check_bounds(&layout.fields, length)?;
        }

        Ok(Self {
            layout,
            options: DecodeOptions::default(),
        })
    }

    pub fn with_options(mut self, options: DecodeOptions) -> Self {
        self.options = options;
        self
    }

    pub fn layout(&self) -> &CaptureLayout {
        &self.layout
    }

    pub fn options(&self) -> &DecodeOptions {
        &self.options
    }

    /// 解码一个捕获缓冲区
    ///
    /// # 返回
    /// - `Ok(DecodeOutcome)`: 结果记录与综合判定（限值失败也在这里返回）
    /// - `Err(DecodeError)`: 长度不符、越界、非法符号等结构性错误
    pub fn decode(&self, buffer: &CaptureBuffer) -> Result<DecodeOutcome, DecodeError> {
        let layout = &self.layout;

        if buffer.alphabet() != layout.alphabet {
            return Err(DecodeError::InvalidDescriptor {
                field: layout.name.clone(),
                reason: format!(
                    "layout expects a {} capture, got {}",
                    layout.alphabet.name(),
                    buffer.alphabet().name()
                ),
            });
        }

        // 先检查长度，不解码任何字段
        let expected = layout.required_length()?;
        if buffer.len() != expected {
            return Err(DecodeError::LengthMismatch {
                expected,
                actual: buffer.len(),
            });
        }
        Self::check_bounds(&layout.fields, buffer.len())?;

        debug!(
            layout = %layout.name,
            length = buffer.len(),
            fields = layout.fields.len(),
            "decoding capture"
        );

        let aggregator = Aggregator::new(self.options.rounding);
        let mut fields = Vec::with_capacity(layout.fields.len());
        let mut records = Vec::new();
        let mut field_errors = Vec::new();

        for field in &layout.fields {
            let values = match Self::decode_family(buffer, field) {
                Ok(values) => values,
                Err(e) if self.options.mode == DecodeMode::BestEffort && e.is_field_local() => {
                    warn!(field = %field.name, error = %e, "skipping field");
                    field_errors.push(e);
                    continue;
                }
                Err(e) => return Err(e),
            };
            debug!(field = %field.name, values = ?values, "decoded field");

            // 单个occurrence也汇总，统计量退化为该值本身
            let statistics = aggregator.summarize(&values);

            let checked = LimitEvaluator::evaluate_field(field, &values, statistics.as_ref());
            if checked.verdict == Verdict::Fail {
                self.log_violation(field, &values, &checked);
            }

            records.extend(self.build_records(field, &values, statistics.as_ref(), &checked));
            fields.push(FieldResult {
                name: field.name.clone(),
                values,
                statistics,
                verdict: checked.verdict,
            });
        }

        // 非法符号强制综合判定为失败
        let passed =
            field_errors.is_empty() && LimitEvaluator::composite(fields.iter().map(|f| f.verdict));
        let verdict = Verdict::from_passed(passed);
        records.push(
            ResultRecord::new(
                format!("{}_VERDICT", layout.name),
                RecordValue::Text(verdict.to_string()),
            )
            .with_verdict(verdict),
        );

        debug!(layout = %layout.name, verdict = %verdict, records = records.len(), "decode finished");

        Ok(DecodeOutcome {
            layout: layout.name.clone(),
            fields,
            records,
            field_errors,
            passed,
        })
    }

    /// 解码并把所有记录写入结果输出端
    pub fn decode_into<S: ResultSink + ?Sized>(
        &self,
        buffer: &CaptureBuffer,
        sink: &mut S,
    ) -> Result<DecodeOutcome, DecodeError> {
        let outcome = self.decode(buffer)?;
        sink.emit_all(&outcome.records)?;
        Ok(outcome)
    }

    /// 解码字段族的所有occurrence
    fn decode_family(
        buffer: &CaptureBuffer,
        field: &FieldDescriptor,
    ) -> Result<Vec<i128>, DecodeError> {
        (0..field.repeat_count)
            .map(|occurrence| decode_occurrence(buffer, field, occurrence))
            .collect()
    }

    fn check_bounds(fields: &[FieldDescriptor], length: usize) -> Result<(), DecodeError> {
        for field in fields {
            match field.span() {
                Some(span) if span <= length => {}
                Some(span) => {
                    return Err(DecodeError::OutOfBounds {
                        field: field.name.clone(),
                        position: span - 1,
                        length,
                    })
                }
                None => return Err(field.overflow_error(length)),
            }
        }
        Ok(())
    }

    /// 根据输出配置生成字段的结果记录
    fn build_records(
        &self,
        field: &FieldDescriptor,
        values: &[i128],
        statistics: Option<&StatisticRecord>,
        checked: &FieldVerdict,
    ) -> Vec<ResultRecord> {
        let mut records = Vec::new();
        let render = |value: i128| match field.kind {
            NumericKind::Hex => RecordValue::Text(format_hex(value, field.layout.symbol_count())),
            _ => RecordValue::Integer(value),
        };
        let per_value_checked = field.limit.is_some_and(|c| c.target.statistic().is_none());

        match field.emit.raw {
            RawEmit::Joined if values.len() == 1 => {
                let record = ResultRecord::new(&field.name, render(values[0]));
                records.push(if per_value_checked {
                    record.with_verdict(checked.verdict)
                } else {
                    record
                });
            }
            RawEmit::Joined => {
                let joined = match field.kind {
                    NumericKind::Hex => {
                        let width = field.layout.symbol_count();
                        let hex: Vec<String> = values.iter().map(|v| format_hex(*v, width)).collect();
                        join_values(&hex, &self.options.delimiter)
                    }
                    _ => join_values(values, &self.options.delimiter),
                };
                let record = ResultRecord::new(&field.name, RecordValue::Text(joined));
                records.push(if per_value_checked {
                    record.with_verdict(checked.verdict)
                } else {
                    record
                });
            }
            RawEmit::PerOccurrence => {
                for (i, value) in values.iter().enumerate() {
                    let verdict = checked.occurrences.get(i).copied().unwrap_or(Verdict::Unchecked);
                    records.push(
                        ResultRecord::new(format!("{}_{i}", field.name), render(*value))
                            .with_verdict(verdict),
                    );
                }
            }
            RawEmit::None => {}
        }

        let Some(stats) = statistics else {
            return records;
        };

        // 被检查的统计量即使未配置输出也要报告
        let checked_statistic = field.limit.and_then(|c| c.target.statistic());
        let mut emitted: Vec<Statistic> = field.emit.statistics.clone();
        if let Some(statistic) = checked_statistic {
            if !emitted.contains(&statistic) {
                emitted.push(statistic);
            }
        }

        for statistic in emitted {
            let verdict = if checked_statistic == Some(statistic) {
                checked.verdict
            } else {
                Verdict::Unchecked
            };
            records.push(
                ResultRecord::new(
                    format!("{}{}", field.name, statistic.suffix()),
                    stats.get(statistic),
                )
                .with_verdict(verdict),
            );
        }

        records
    }

    fn log_violation(&self, field: &FieldDescriptor, values: &[i128], checked: &FieldVerdict) {
        let Some(check) = &field.limit else {
            return;
        };
        error!(
            "{}: Name={} Offset={} violates {} [{}] (checked {})",
            self.layout.name,
            field.name,
            field.start_offset,
            LimitEvaluator::describe(check.target, &check.spec),
            join_values(values, ","),
            join_values(&checked.checked_values, ",")
        );
    }
}

/// 使用默认选项解码一个捕获缓冲区
pub fn decode(buffer: &CaptureBuffer, layout: &CaptureLayout) -> Result<DecodeOutcome, DecodeError> {
    CaptureDecoder::new(layout.clone())?.decode(buffer)
}
