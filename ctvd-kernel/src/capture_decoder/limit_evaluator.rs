//! 限值检查器
//!
//! 将解码值或统计值与上下限比较，产生通过/失败判定。
//! 限值失败是正常输出数据，不会作为错误返回。

use ctvd_core::{FieldDescriptor, LimitSpec, LimitTarget, RecordValue, StatisticRecord, Verdict};

/// 单个字段族的检查结果
#[derive(Debug, Clone, PartialEq)]
pub struct FieldVerdict {
    /// 字段整体判定
    pub verdict: Verdict,
    /// 每个occurrence的判定（仅在逐个检查时为Pass/Fail）
    pub occurrences: Vec<Verdict>,
    /// 参与检查的值
    pub checked_values: Vec<RecordValue>,
}

/// 限值检查器
pub struct LimitEvaluator;

impl LimitEvaluator {
    /// 检查单个数值
    ///
    /// 两侧边界都是闭区间，整数值与整数边界精确比较；
    /// 没有限值或值为文本时返回 `Verdict::Unchecked`
    pub fn evaluate(value: &RecordValue, limit: Option<&LimitSpec>) -> Verdict {
        limit
            .and_then(|limit| limit.contains(value))
            .map_or(Verdict::Unchecked, Verdict::from_passed)
    }

    /// 按字段配置检查一个字段族
    ///
    /// # 参数
    /// - `field`: 字段描述（包含可选的限值检查配置）
    /// - `values`: 所有occurrence的解码值
    /// - `statistics`: 字段族的统计记录（检查统计量时必需）
    pub fn evaluate_field(
        field: &FieldDescriptor,
        values: &[i128],
        statistics: Option<&StatisticRecord>,
    ) -> FieldVerdict {
        let unchecked = || FieldVerdict {
            verdict: Verdict::Unchecked,
            occurrences: vec![Verdict::Unchecked; values.len()],
            checked_values: Vec::new(),
        };

        let Some(check) = &field.limit else {
            return unchecked();
        };

        match check.target.statistic() {
            None => {
                let occurrences: Vec<Verdict> = values
                    .iter()
                    .map(|v| Verdict::from_passed(check.spec.contains_integer(*v)))
                    .collect();
                FieldVerdict {
                    verdict: Self::reduce(occurrences.iter().copied()),
                    occurrences,
                    checked_values: values.iter().copied().map(RecordValue::Integer).collect(),
                }
            }
            Some(statistic) => {
                let Some(value) = statistics.map(|s| s.get(statistic)) else {
                    return unchecked();
                };
                FieldVerdict {
                    verdict: Self::evaluate(&value, Some(&check.spec)),
                    occurrences: vec![Verdict::Unchecked; values.len()],
                    checked_values: vec![value],
                }
            }
        }
    }

    /// 对一组判定做逻辑与，Unchecked不参与
    pub fn reduce(verdicts: impl IntoIterator<Item = Verdict>) -> Verdict {
        verdicts
            .into_iter()
            .fold(Verdict::Unchecked, Verdict::and)
    }

    /// 综合判定：所有参与检查的字段都通过时为true
    pub fn composite(verdicts: impl IntoIterator<Item = Verdict>) -> bool {
        Self::reduce(verdicts) != Verdict::Fail
    }

    /// 限值描述，用于日志
    pub fn describe(target: LimitTarget, limit: &LimitSpec) -> String {
        let target = match target {
            LimitTarget::Each => "value",
            LimitTarget::Average => "average",
            LimitTarget::Maximum => "maximum",
            LimitTarget::Minimum => "minimum",
            LimitTarget::Range => "range",
        };
        match (limit.lower, limit.upper) {
            (Some(lower), Some(upper)) => format!("{target} in [{lower}, {upper}]"),
            (Some(lower), None) => format!("{target} >= {lower}"),
            (None, Some(upper)) => format!("{target} <= {upper}"),
            (None, None) => format!("{target} unconstrained"),
        }
    }
}
