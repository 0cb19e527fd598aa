//! CTV Decode Core Library
//!
//! This crate provides the capture data model, error taxonomy and collaborator
//! interfaces shared by the CTV decode workspace.

pub mod capture_meta;
pub mod error;
pub mod utils;

// 导出错误类型
pub use error::DecodeError;

// 导出捕获元数据类型，便于其他模块使用
pub use capture_meta::*;

/// 结果输出端接口 - 接收按名称标识的结果记录
pub trait ResultSink {
    /// 写入单条记录
    fn emit(&mut self, record: &ResultRecord) -> Result<(), DecodeError>;

    /// 按顺序写入一组记录
    fn emit_all(&mut self, records: &[ResultRecord]) -> Result<(), DecodeError> {
        records.iter().try_for_each(|record| self.emit(record))
    }
}

/// 键值存储接口 - 跨测试步骤保存单个解码数值
pub trait TokenStore {
    fn write_token(&mut self, token: &str, value: i128) -> Result<(), DecodeError>;
}

impl<S: ResultSink + ?Sized> ResultSink for &mut S {
    fn emit(&mut self, record: &ResultRecord) -> Result<(), DecodeError> {
        (**self).emit(record)
    }
}
