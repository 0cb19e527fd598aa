//! 统计聚合器
//!
//! 对重复字段族的所有occurrence计算平均值、最大值、最小值和极差

use ctvd_core::utils::round_to;
use ctvd_core::StatisticRecord;

/// 统计聚合器
#[derive(Debug, Clone, Copy, Default)]
pub struct Aggregator {
    /// 平均值保留的小数位数，None表示全精度
    rounding: Option<u32>,
}

impl Aggregator {
    pub fn new(rounding: Option<u32>) -> Self {
        Self { rounding }
    }

    /// 计算统计记录，空序列返回None
    ///
    /// # 示例
    /// ```
    /// use ctvd_kernel::capture_decoder::Aggregator;
    ///
    /// let stats = Aggregator::new(Some(6)).summarize(&[1, 2, 2]).unwrap();
    /// assert_eq!(stats.average, 1.666667);
    /// assert_eq!(stats.range, 1);
    /// ```
    pub fn summarize(&self, values: &[i128]) -> Option<StatisticRecord> {
        let maximum = *values.iter().max()?;
        let minimum = *values.iter().min()?;

        let sum: i128 = values.iter().sum();
        let mean = sum as f64 / values.len() as f64;
        let average = match self.rounding {
            Some(decimals) => round_to(mean, decimals),
            None => mean,
        };

        Some(StatisticRecord {
            average,
            maximum,
            minimum,
            range: maximum - minimum,
        })
    }
}
