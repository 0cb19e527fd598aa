//! 捕获解码模块
//!
//! 将ATE捕获缓冲区按字段布局解码为数值，支持：
//! - 连续位段、位置列表及十进制数字重映射三种字段形式
//! - 多occurrence字段族的统计聚合
//! - 逐值或统计量的闭区间限值判定

pub mod aggregator;
pub mod bit_extractor;
pub mod core;
pub mod digit_remap;
pub mod limit_evaluator;

pub use aggregator::Aggregator;
pub use bit_extractor::{decode_occurrence, digits_to_value, extract_symbols, format_hex};
pub use core::{decode, CaptureDecoder};
pub use digit_remap::{apply_remap, remap_digits};
pub use limit_evaluator::{FieldVerdict, LimitEvaluator};
