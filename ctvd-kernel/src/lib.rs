//! CTV Decode Kernel
//!
//! This crate decodes ATE capture buffers into named values, summarizes repeated
//! field families and evaluates them against limits.

pub mod capture_decoder;
pub mod persistence;

pub use capture_decoder::{
    apply_remap, decode, decode_occurrence, Aggregator, CaptureDecoder, FieldVerdict,
    LimitEvaluator,
};
pub use persistence::{parse_token_list, persist_tokens, validate_token};
