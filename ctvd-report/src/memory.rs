//! 内存结果输出端与令牌存储

use std::collections::BTreeMap;
use std::io::Write;

use ctvd_core::{DecodeError, ResultRecord, ResultSink, TokenStore};

/// 收集所有记录的内存输出端
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Vec<ResultRecord>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[ResultRecord] {
        &self.records
    }

    pub fn find(&self, name: &str) -> Option<&ResultRecord> {
        self.records.iter().find(|r| r.name == name)
    }

    pub fn into_records(self) -> Vec<ResultRecord> {
        self.records
    }
}

impl ResultSink for MemorySink {
    fn emit(&mut self, record: &ResultRecord) -> Result<(), DecodeError> {
        self.records.push(record.clone());
        Ok(())
    }
}

/// 每条记录输出一行JSON
pub struct JsonLinesSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> ResultSink for JsonLinesSink<W> {
    fn emit(&mut self, record: &ResultRecord) -> Result<(), DecodeError> {
        serde_json::to_writer(&mut self.writer, record)
            .map_err(|e| DecodeError::Sink(e.to_string()))?;
        writeln!(self.writer).map_err(|e| DecodeError::Sink(e.to_string()))
    }
}

/// 内存键值存储
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    tokens: BTreeMap<String, i128>,
    order: Vec<String>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, token: &str) -> Option<i128> {
        self.tokens.get(token).copied()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// 按写入顺序返回令牌
    pub fn iter(&self) -> impl Iterator<Item = (&str, i128)> {
        self.order
            .iter()
            .filter_map(|token| self.tokens.get(token).map(|v| (token.as_str(), *v)))
    }
}

impl TokenStore for MemoryTokenStore {
    fn write_token(&mut self, token: &str, value: i128) -> Result<(), DecodeError> {
        if self.tokens.insert(token.to_string(), value).is_none() {
            self.order.push(token.to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctvd_core::{RecordValue, Verdict};

    #[test]
    fn test_memory_sink_keeps_order() {
        let mut sink = MemorySink::new();
        sink.emit_all(&[
            ResultRecord::new("b", RecordValue::Integer(2)),
            ResultRecord::new("a", RecordValue::Integer(1)),
        ])
        .unwrap();

        let names: Vec<&str> = sink.records().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert_eq!(sink.find("a").unwrap().value, RecordValue::Integer(1));
    }

    #[test]
    fn test_json_lines() {
        let mut sink = JsonLinesSink::new(Vec::new());
        sink.emit(
            &ResultRecord::new("T_VERDICT", RecordValue::Text("PASS".to_string()))
                .with_verdict(Verdict::Pass),
        )
        .unwrap();
        let text = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(
            text,
            "{\"name\":\"T_VERDICT\",\"value\":\"PASS\",\"verdict\":\"Pass\"}\n"
        );
    }

    #[test]
    fn test_token_store_overwrite() {
        let mut store = MemoryTokenStore::new();
        store.write_token("A.x", 1).unwrap();
        store.write_token("B.y", 2).unwrap();
        store.write_token("A.x", 3).unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.get("A.x"), Some(3));
        let order: Vec<(&str, i128)> = store.iter().collect();
        assert_eq!(order, vec![("A.x", 3), ("B.y", 2)]);
    }
}
