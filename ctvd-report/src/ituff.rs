//! ITUFF风格结果输出
//!
//! 每条记录输出为一对行：
//! ```text
//! 0_tname_{instance}_{name}
//! 0_strgval_{value}
//! ```

use std::io::Write;

use ctvd_core::{DecodeError, ResultRecord, ResultSink};
use tracing::debug;

/// ITUFF结果写入器
pub struct ItuffWriter<W: Write> {
    writer: W,
    instance: String,
    written: usize,
}

impl<W: Write> ItuffWriter<W> {
    /// 创建写入器
    ///
    /// # 参数
    /// - `writer`: 输出目标
    /// - `instance`: 测试实例名，作为tname前缀；为空时不加前缀
    pub fn new(writer: W, instance: impl Into<String>) -> Self {
        Self {
            writer,
            instance: instance.into(),
            written: 0,
        }
    }

    /// 已写入的记录数
    pub fn written(&self) -> usize {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn tname(&self, name: &str) -> String {
        if self.instance.is_empty() {
            name.to_string()
        } else {
            format!("{}_{}", self.instance, name)
        }
    }
}

impl<W: Write> ResultSink for ItuffWriter<W> {
    fn emit(&mut self, record: &ResultRecord) -> Result<(), DecodeError> {
        let tname = self.tname(&record.name);
        debug!(tname = %tname, value = %record.value, "ituff record");

        writeln!(self.writer, "0_tname_{tname}")
            .and_then(|_| writeln!(self.writer, "0_strgval_{}", record.value))
            .map_err(|e| DecodeError::Sink(e.to_string()))?;
        self.written += 1;
        Ok(())
    }
}
